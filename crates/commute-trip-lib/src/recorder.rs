//! TripRecorder - Lifecycle state machine for one commute at a time
//!
//! The recorder owns the in-progress [`Trip`] and moves through
//! `Idle → Recording → AwaitingExport → Idle`. State and buffer share one mutex, so a
//! position callback thread may call [`TripRecorder::ingest`] while a command thread
//! calls [`TripRecorder::stop`] or [`TripRecorder::export`].

use crate::{Fix, Result, Trip, TripArtifact, TripError, TripSink, export};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorder lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    /// No trip in progress
    Idle,
    /// Collecting fixes
    Recording,
    /// Trip frozen, waiting for a label and export
    AwaitingExport,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "idle"),
            RecorderState::Recording => write!(f, "recording"),
            RecorderState::AwaitingExport => write!(f, "awaiting export"),
        }
    }
}

/// What happened to a fix passed to [`TripRecorder::ingest`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Appended to the trip
    Accepted,
    /// Dropped by the accuracy filter
    Filtered,
    /// Dropped because no trip is recording
    NotRecording,
}

/// Configuration for the recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Fixes reporting an accuracy radius above this many meters are discarded.
    /// Fixes without an accuracy value are always kept.
    /// Default: 50.0
    pub max_accuracy_m: f32,
    /// Reject `export` while still recording instead of stopping implicitly.
    /// Default: false
    pub require_explicit_stop: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 50.0,
            require_explicit_stop: false,
        }
    }
}

/// Point-in-time view of the recorder, suitable for a status line or notification
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderStatus {
    pub state: RecorderState,
    /// Number of accepted fixes in the current trip
    pub fix_count: usize,
    /// Accuracy of the most recently accepted fix, if it had one
    pub last_accuracy_m: Option<f32>,
    /// Milliseconds since `start`; zero while idle
    pub elapsed_ms: i64,
}

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Observer notified after each accepted fix and each state transition
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: &RecorderStatus);
}

/// An exported trip and the location the sink stored it at
#[derive(Debug, Clone)]
pub struct SavedTrip {
    pub path: PathBuf,
    pub artifact: TripArtifact,
}

/// State and buffer, always locked together
#[derive(Debug)]
struct Inner {
    state: RecorderState,
    trip: Trip,
}

/// Stateful recording core
pub struct TripRecorder {
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
    listener: Option<Arc<dyn StatusListener>>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for TripRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripRecorder")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TripRecorder {
    /// Create an idle recorder using the system clock
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            listener: None,
            inner: Mutex::new(Inner {
                state: RecorderState::Idle,
                trip: Trip::default(),
            }),
        }
    }

    /// Replace the clock used for trip start and end times
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a status observer
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    #[inline]
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn state(&self) -> RecorderState {
        self.lock().state
    }

    pub fn status(&self) -> RecorderStatus {
        let inner = self.lock();
        self.snapshot(&inner)
    }

    /// Begin a new trip
    ///
    /// Only valid from `Idle`. Any residual buffer is discarded. From any other state
    /// nothing changes and `InvalidStateTransition` is returned.
    pub fn start(&self) -> Result<()> {
        let status = {
            let mut inner = self.lock();
            if inner.state != RecorderState::Idle {
                tracing::debug!("Ignoring start while {}", inner.state);
                return Err(TripError::InvalidStateTransition {
                    operation: "start",
                    state: inner.state,
                });
            }

            inner.trip = Trip::new(self.clock.now_millis());
            inner.state = RecorderState::Recording;
            self.snapshot(&inner)
        };

        tracing::info!("Trip recording started");
        self.notify(&status);
        Ok(())
    }

    /// Offer a fix to the current trip
    ///
    /// Never fails: fixes arriving outside `Recording` or above the accuracy limit are
    /// dropped and the outcome says why.
    pub fn ingest(&self, fix: Fix) -> IngestOutcome {
        let status = {
            let mut inner = self.lock();
            if inner.state != RecorderState::Recording {
                tracing::trace!("Dropping fix while {}", inner.state);
                return IngestOutcome::NotRecording;
            }

            if let Some(accuracy) = fix.accuracy_m()
                && accuracy > self.config.max_accuracy_m
            {
                tracing::debug!(
                    "Filtered fix at {} with accuracy {} m",
                    fix.timestamp_millis(),
                    accuracy
                );
                return IngestOutcome::Filtered;
            }

            if !fix.has_valid_coordinates() {
                tracing::warn!(
                    "Accepting fix outside WGS84 bounds: ({}, {})",
                    fix.lat(),
                    fix.lon()
                );
            }

            inner.trip.push(fix);
            self.snapshot(&inner)
        };

        self.notify(&status);
        IngestOutcome::Accepted
    }

    /// Freeze the current trip until it is exported
    ///
    /// Repeating `stop` while awaiting export is a no-op.
    pub fn stop(&self) -> Result<()> {
        let status = {
            let mut inner = self.lock();
            match inner.state {
                RecorderState::Recording => {
                    inner.state = RecorderState::AwaitingExport;
                    self.snapshot(&inner)
                }
                RecorderState::AwaitingExport => return Ok(()),
                RecorderState::Idle => {
                    return Err(TripError::InvalidStateTransition {
                        operation: "stop",
                        state: inner.state,
                    });
                }
            }
        };

        tracing::info!("Trip recording stopped with {} fixes", status.fix_count);
        self.notify(&status);
        Ok(())
    }

    /// Consume the frozen trip and build its artifact
    ///
    /// Returns `Ok(None)` when the trip has no fixes. Either way the recorder is back in
    /// `Idle` afterwards, so a second call fails with `InvalidStateTransition`.
    pub fn export(&self, label: &str) -> Result<Option<TripArtifact>> {
        let mut trip = self.take_trip("export")?;
        trip.finish(self.clock.now_millis());

        if trip.is_empty() {
            tracing::info!("Trip has no fixes; nothing to export");
            return Ok(None);
        }

        tracing::debug!(
            "Exporting {} fixes over {:.0} m",
            trip.len(),
            trip.distance_meters()
        );
        export::from_trip(&trip, label)
    }

    /// Export the frozen trip and write it to `sink`
    ///
    /// Nothing is written for an empty trip. Sink failures are returned unchanged; the
    /// recorder is already idle, so the next `start` is unaffected.
    pub fn export_to(&self, label: &str, sink: &dyn TripSink) -> Result<Option<SavedTrip>> {
        let Some(artifact) = self.export(label)? else {
            return Ok(None);
        };
        let path = export::write(&artifact, sink)?;
        Ok(Some(SavedTrip { path, artifact }))
    }

    /// Move the trip out of the recorder and return to `Idle`
    fn take_trip(&self, operation: &'static str) -> Result<Trip> {
        let (trip, status) = {
            let mut inner = self.lock();
            match inner.state {
                RecorderState::AwaitingExport => {}
                RecorderState::Recording if !self.config.require_explicit_stop => {
                    tracing::debug!("Export while recording; stopping implicitly");
                }
                state => {
                    return Err(TripError::InvalidStateTransition { operation, state });
                }
            }

            let trip = std::mem::take(&mut inner.trip);
            inner.state = RecorderState::Idle;
            (trip, self.snapshot(&inner))
        };

        self.notify(&status);
        Ok(trip)
    }

    fn snapshot(&self, inner: &Inner) -> RecorderStatus {
        let elapsed_ms = match inner.state {
            RecorderState::Idle => 0,
            _ => self.clock.now_millis() - inner.trip.start_utc_millis(),
        };
        RecorderStatus {
            state: inner.state,
            fix_count: inner.trip.len(),
            last_accuracy_m: inner.trip.last().and_then(Fix::accuracy_m),
            elapsed_ms,
        }
    }

    fn notify(&self, status: &RecorderStatus) {
        if let Some(listener) = &self.listener {
            listener.on_status(status);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Recorder mutex poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }
}
