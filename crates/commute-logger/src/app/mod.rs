mod input;
mod replay;
mod settings;

pub use input::load_fixes;
pub use replay::{ReplayConfig, ReplayProgress, ReplaySource};
pub use settings::Settings;

use commute_trip_lib::{
    DirectorySink, RecorderState, RecorderStatus, SavedTrip, StatusListener, TripError,
    TripRecorder, TripSession, TripSink,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Errors surfaced by the command-line application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported trace format: {0} (expected .gpx or .jsonl)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid fix on line {line}: {source}")]
    FixLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error(transparent)]
    Trip(#[from] TripError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Reports recorder progress through the log
///
/// State changes are logged at info, per-fix updates at debug.
#[derive(Default)]
pub struct LogStatusListener {
    last_state: Mutex<Option<RecorderState>>,
}

impl StatusListener for LogStatusListener {
    fn on_status(&self, status: &RecorderStatus) {
        let changed = {
            let mut last = match self.last_state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            last.replace(status.state) != Some(status.state)
        };

        let accuracy = status
            .last_accuracy_m
            .map(|a| format!("{a:.0} m"))
            .unwrap_or_else(|| "n/a".to_string());

        if changed {
            info!(
                "Recorder {}: {} fixes, {:.0} s elapsed",
                status.state,
                status.fix_count,
                status.elapsed_ms as f64 / 1000.0
            );
        } else {
            debug!(
                "Fixes: {} | accuracy {} | t+{:.0} s",
                status.fix_count,
                accuracy,
                status.elapsed_ms as f64 / 1000.0
            );
        }
    }
}

/// Prints the artifact to stdout instead of persisting it
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl TripSink for StdoutSink {
    fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        debug!("Wrote {} to stdout", filename);
        Ok(PathBuf::from("-"))
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Record one trip from `settings.input` and save it
///
/// Returns `None` when nothing survived filtering and no file was written.
pub async fn run(settings: Settings) -> Result<Option<SavedTrip>, AppError> {
    let fixes = load_fixes(&settings.input)?;
    info!(
        "Loaded {} fixes from {}",
        fixes.len(),
        settings.input.display()
    );

    let sink: Arc<dyn TripSink> = if settings.dry_run {
        Arc::new(StdoutSink)
    } else {
        tokio::fs::create_dir_all(&settings.output_dir)
            .await
            .map_err(|source| AppError::CreateDir {
                path: settings.output_dir.clone(),
                source,
            })?;
        Arc::new(DirectorySink::new(&settings.output_dir))
    };

    let recorder = TripRecorder::new(settings.recorder_config())
        .with_listener(Arc::new(LogStatusListener::default()));
    let source = ReplaySource::new(fixes, settings.replay_config());
    let mut progress = source.progress();
    let mut session = TripSession::new(recorder, source, sink);

    session.start()?;
    tokio::select! {
        _ = progress.wait_for(|p| p.finished) => debug!("Replay finished"),
        () = interrupted() => warn!("Interrupted; saving the trip recorded so far"),
    }
    session.stop()?;

    let counts = *progress.borrow();
    info!(
        "Delivered {} fixes, skipped {} below the minimum distance",
        counts.delivered, counts.skipped
    );

    let label = settings.label.clone();
    let saved = tokio::task::spawn_blocking(move || session.export(&label)).await??;

    match &saved {
        Some(trip) => info!(
            "Saved {} points ({:?}, {} to {}) to {}",
            trip.artifact.properties.point_count,
            trip.artifact.properties.direction,
            trip.artifact.properties.start_time,
            trip.artifact.properties.end_time,
            trip.path.display()
        ),
        None => warn!("No fixes were recorded; nothing saved"),
    }

    Ok(saved)
}
