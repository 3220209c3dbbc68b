//! Commute Trip Library - Core Trip Recording and Export
//!
//! This library records a commuter's GPS trace, filters noisy samples, and turns the
//! finished trip into a compact GeoJSON Feature whose path is stored as an encoded
//! polyline. Platform concerns (location providers, notifications, storage locations)
//! plug in through small traits so the core runs without any platform runtime.
//!
//! # Architecture
//!
//! - **[`Fix`]**: Immutable position sample
//! - **[`polyline`]**: Encoded Polyline Algorithm Format codec (precision 1e5)
//! - **[`export`]**: GeoJSON [`TripArtifact`] builder, filename derivation and sink writes
//! - **[`TripRecorder`]**: Lifecycle state machine owning the in-progress fix buffer
//! - **[`TripSession`]**: Controller wiring a [`PositionSource`], a recorder and a [`TripSink`]
//!
//! # Lifecycle
//!
//! `Idle → Recording → AwaitingExport → Idle`. Fixes are accepted only while recording,
//! the trip is frozen at `stop`, and `export` consumes it exactly once.

pub mod export;
mod fix;
pub mod polyline;
mod recorder;
mod session;
mod sink;
pub mod utils;

// Public API exports
pub use export::{Direction, TripArtifact, TripProperties};
pub use fix::{Fix, Trip};
pub use recorder::{
    Clock, IngestOutcome, RecorderConfig, RecorderState, RecorderStatus, SavedTrip,
    StatusListener, SystemClock, TripRecorder,
};
pub use session::{PositionSource, TripSession};
pub use sink::{DirectorySink, TripSink};

/// Error types for trip recording and export
#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("Cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: RecorderState,
    },

    #[error("Sink write failed: {0}")]
    SinkWrite(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timestamp out of range: {0} ms")]
    InvalidTimestamp(i64),

    #[error("Invalid polyline: {0}")]
    InvalidPolyline(String),

    #[error("Position source failed: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, TripError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(RecorderConfig) -> TripRecorder = TripRecorder::new;
        let _: fn() -> RecorderConfig = RecorderConfig::default;
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = TripError::InvalidStateTransition {
            operation: "export",
            state: RecorderState::Idle,
        };
        assert_eq!(err.to_string(), "Cannot export while idle");
    }

    #[test]
    fn test_error_kinds() {
        fn kind(err: &TripError) -> &'static str {
            match err {
                TripError::InvalidStateTransition { .. } => "state",
                TripError::SinkWrite(_) => "sink",
                TripError::Serialization(_) => "serialization",
                TripError::InvalidTimestamp(_) => "timestamp",
                TripError::InvalidPolyline(_) => "polyline",
                TripError::Source(_) => "source",
            }
        }

        let io_err: TripError = std::io::Error::other("disk full").into();
        assert_eq!(kind(&io_err), "sink");
        assert_eq!(kind(&TripError::Source("offline".to_string())), "source");
    }
}
