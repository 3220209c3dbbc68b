//! Position source that replays recorded fixes through the recorder.
//!
//! Stands in for a live location provider: fixes are paced by a fixed interval and
//! thinned by a minimum distance, the two knobs a platform provider is configured with.

use commute_trip_lib::{Fix, IngestOutcome, PositionSource, TripError, TripRecorder};
use geo::{Distance, Haversine, Point};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Delivery settings for a replay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayConfig {
    /// Pause before each delivered fix
    pub interval: Duration,
    /// Fixes closer than this to the last delivered one are skipped
    pub min_distance_m: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            min_distance_m: 3.0,
        }
    }
}

/// Counters published while a replay runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayProgress {
    pub delivered: usize,
    pub skipped: usize,
    pub finished: bool,
}

pub struct ReplaySource {
    fixes: Arc<[Fix]>,
    config: ReplayConfig,
    task: Option<JoinHandle<()>>,
    progress: watch::Sender<ReplayProgress>,
}

impl ReplaySource {
    pub fn new(fixes: Vec<Fix>, config: ReplayConfig) -> Self {
        let (progress, _) = watch::channel(ReplayProgress::default());
        Self {
            fixes: fixes.into(),
            config,
            task: None,
            progress,
        }
    }

    /// Receiver that observes delivery counts and completion
    pub fn progress(&self) -> watch::Receiver<ReplayProgress> {
        self.progress.subscribe()
    }
}

impl PositionSource for ReplaySource {
    fn start(&mut self, recorder: Arc<TripRecorder>) -> commute_trip_lib::Result<()> {
        if self.task.is_some() {
            return Err(TripError::Source("replay already running".to_string()));
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| TripError::Source(format!("no async runtime: {e}")))?;

        self.progress.send_replace(ReplayProgress::default());
        let fixes = self.fixes.clone();
        let config = self.config;
        let progress = self.progress.clone();
        self.task = Some(handle.spawn(replay(fixes, config, recorder, progress)));

        tracing::info!(
            "Replaying {} fixes (interval {:?}, min distance {} m)",
            self.fixes.len(),
            self.config.interval,
            self.config.min_distance_m
        );
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.progress.send_modify(|p| p.finished = true);
            tracing::debug!("Replay stopped");
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn replay(
    fixes: Arc<[Fix]>,
    config: ReplayConfig,
    recorder: Arc<TripRecorder>,
    progress: watch::Sender<ReplayProgress>,
) {
    let mut last_delivered: Option<Point<f64>> = None;

    for fix in fixes.iter() {
        profiling::scope!("replay_fix");

        if let Some(prev) = last_delivered
            && Haversine.distance(prev, fix.point()) < config.min_distance_m
        {
            progress.send_modify(|p| p.skipped += 1);
            continue;
        }

        if !config.interval.is_zero() {
            tokio::time::sleep(config.interval).await;
        }

        if recorder.ingest(*fix) == IngestOutcome::NotRecording {
            tracing::debug!("Recorder no longer recording; ending replay");
            break;
        }
        last_delivered = Some(fix.point());
        progress.send_modify(|p| p.delivered += 1);
    }

    progress.send_modify(|p| p.finished = true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use commute_trip_lib::{RecorderConfig, RecorderState};

    fn instant_config() -> ReplayConfig {
        ReplayConfig {
            interval: Duration::ZERO,
            min_distance_m: 3.0,
        }
    }

    fn create_test_fixes() -> Vec<Fix> {
        vec![
            Fix::new(0, 29.7000, -95.4000).with_accuracy(5.0),
            // ~1 m north of the first fix
            Fix::new(1_000, 29.70001, -95.4000).with_accuracy(5.0),
            Fix::new(2_000, 29.7010, -95.4000).with_accuracy(5.0),
            Fix::new(3_000, 29.7020, -95.4000).with_accuracy(80.0),
        ]
    }

    #[tokio::test]
    async fn test_replay_delivers_and_skips() {
        let recorder = Arc::new(TripRecorder::new(RecorderConfig::default()));
        recorder.start().unwrap();

        let mut source = ReplaySource::new(create_test_fixes(), instant_config());
        let mut progress = source.progress();
        source.start(recorder.clone()).unwrap();

        let done = *progress.wait_for(|p| p.finished).await.unwrap();
        assert_eq!(done.delivered, 3);
        assert_eq!(done.skipped, 1);

        // Delivered fixes still pass through the recorder's accuracy filter
        assert_eq!(recorder.status().fix_count, 2);
        source.stop();
    }

    #[tokio::test]
    async fn test_stop_aborts_pending_replay() {
        let recorder = Arc::new(TripRecorder::new(RecorderConfig::default()));
        recorder.start().unwrap();

        let mut source = ReplaySource::new(
            create_test_fixes(),
            ReplayConfig {
                interval: Duration::from_secs(3_600),
                min_distance_m: 0.0,
            },
        );
        let progress = source.progress();
        source.start(recorder.clone()).unwrap();
        source.stop();

        assert!(progress.borrow().finished);
        assert_eq!(recorder.status().fix_count, 0);
        assert_eq!(recorder.state(), RecorderState::Recording);
    }

    #[tokio::test]
    async fn test_replay_ends_when_recorder_stops() {
        let recorder = Arc::new(TripRecorder::new(RecorderConfig::default()));
        recorder.start().unwrap();
        recorder.stop().unwrap();

        let mut source = ReplaySource::new(create_test_fixes(), instant_config());
        let mut progress = source.progress();
        source.start(recorder.clone()).unwrap();

        let done = *progress.wait_for(|p| p.finished).await.unwrap();
        assert_eq!(done.delivered, 0);
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let recorder = Arc::new(TripRecorder::new(RecorderConfig::default()));
        let mut source = ReplaySource::new(create_test_fixes(), instant_config());
        assert!(matches!(
            source.start(recorder),
            Err(TripError::Source(_))
        ));
    }
}
