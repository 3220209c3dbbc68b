//! TripSession - Controller for a position source, recorder and sink
//!
//! This is the command surface a UI or service calls: `start` begins recording and
//! switches the source on, `stop` switches the source off and freezes the trip, and
//! `export` saves the trip under the caller's label.

use crate::{RecorderState, Result, SavedTrip, TripRecorder, TripSink};
use std::sync::Arc;

/// Supplier of fixes, such as a platform location provider or a file replay
///
/// Once started, the source delivers every fix it produces to
/// [`TripRecorder::ingest`]. Rate limiting and minimum distance are properties of the
/// source; the recorder enforces neither.
pub trait PositionSource: Send {
    /// Begin delivering fixes into `recorder`
    fn start(&mut self, recorder: Arc<TripRecorder>) -> Result<()>;

    /// Stop delivering fixes; safe to call when not started
    fn stop(&mut self);
}

/// Top-level manager tying the recording lifecycle to its collaborators
pub struct TripSession<S, K> {
    recorder: Arc<TripRecorder>,
    source: S,
    sink: K,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<S: PositionSource, K: TripSink> TripSession<S, K> {
    pub fn new(recorder: TripRecorder, source: S, sink: K) -> Self {
        Self {
            recorder: Arc::new(recorder),
            source,
            sink,
        }
    }

    /// Shared handle to the recorder, e.g. for status polling
    #[inline]
    pub fn recorder(&self) -> &Arc<TripRecorder> {
        &self.recorder
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Start a trip and switch the source on
    ///
    /// If the source fails to start, the recorder is left recording an empty trip; the
    /// caller can still `stop` and `export` (which writes nothing).
    pub fn start(&mut self) -> Result<()> {
        self.recorder.start()?;
        self.source.start(self.recorder.clone())
    }

    /// Switch the source off and freeze the trip
    pub fn stop(&mut self) -> Result<()> {
        self.source.stop();
        self.recorder.stop()
    }

    /// Save the trip under `label`
    ///
    /// A session still recording is stopped first when the recorder tolerates it.
    pub fn export(&mut self, label: &str) -> Result<Option<SavedTrip>> {
        if self.recorder.state() == RecorderState::Recording
            && !self.recorder.config().require_explicit_stop
        {
            self.source.stop();
        }
        self.recorder.export_to(label, &self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fix, IngestOutcome, RecorderConfig, TripError};
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Source that delivers a fixed batch of fixes synchronously on start
    struct BatchSource {
        fixes: Vec<Fix>,
        running: bool,
        outcomes: Vec<IngestOutcome>,
    }

    impl BatchSource {
        fn new(fixes: Vec<Fix>) -> Self {
            Self {
                fixes,
                running: false,
                outcomes: Vec::new(),
            }
        }
    }

    impl PositionSource for BatchSource {
        fn start(&mut self, recorder: Arc<TripRecorder>) -> Result<()> {
            self.running = true;
            self.outcomes = self.fixes.iter().map(|f| recorder.ingest(*f)).collect();
            Ok(())
        }

        fn stop(&mut self) {
            self.running = false;
        }
    }

    #[derive(Default)]
    struct MemorySink {
        names: Mutex<Vec<String>>,
    }

    impl TripSink for MemorySink {
        fn write(&self, filename: &str, _bytes: &[u8]) -> io::Result<PathBuf> {
            self.names.lock().unwrap().push(filename.to_string());
            Ok(PathBuf::from(filename))
        }
    }

    fn create_test_fixes() -> Vec<Fix> {
        vec![
            Fix::new(0, 29.7, -95.40).with_accuracy(10.0),
            Fix::new(1_000, 29.7, -95.39).with_accuracy(60.0),
            Fix::new(2_000, 29.7, -95.38).with_accuracy(10.0),
        ]
    }

    #[test]
    fn test_session_lifecycle() {
        let source = BatchSource::new(create_test_fixes());
        let mut session = TripSession::new(
            TripRecorder::new(RecorderConfig::default()),
            source,
            MemorySink::default(),
        );

        session.start().unwrap();
        assert!(session.source().running);
        assert_eq!(
            session.source().outcomes,
            vec![
                IngestOutcome::Accepted,
                IngestOutcome::Filtered,
                IngestOutcome::Accepted
            ]
        );

        session.stop().unwrap();
        assert!(!session.source().running);

        let saved = session.export("commute").unwrap().unwrap();
        assert_eq!(saved.artifact.properties.point_count, 2);
        assert_eq!(session.sink().names.lock().unwrap().len(), 1);
        assert_eq!(session.recorder().state(), RecorderState::Idle);
    }

    #[test]
    fn test_session_export_stops_source() {
        let mut session = TripSession::new(
            TripRecorder::new(RecorderConfig::default()),
            BatchSource::new(create_test_fixes()),
            MemorySink::default(),
        );

        session.start().unwrap();
        let saved = session.export("implicit").unwrap();
        assert!(saved.is_some());
        assert!(!session.source().running);
    }

    #[test]
    fn test_session_export_without_start() {
        let mut session = TripSession::new(
            TripRecorder::new(RecorderConfig::default()),
            BatchSource::new(Vec::new()),
            MemorySink::default(),
        );

        assert!(matches!(
            session.export("x"),
            Err(TripError::InvalidStateTransition { .. })
        ));
        assert!(session.sink().names.lock().unwrap().is_empty());
    }

    #[test]
    fn test_session_double_start_keeps_source_untouched() {
        let mut session = TripSession::new(
            TripRecorder::new(RecorderConfig::default()),
            BatchSource::new(create_test_fixes()),
            MemorySink::default(),
        );

        session.start().unwrap();
        session.source.outcomes.clear();
        assert!(session.start().is_err());
        assert!(session.source().outcomes.is_empty());
        assert_eq!(session.recorder().status().fix_count, 2);
    }
}
