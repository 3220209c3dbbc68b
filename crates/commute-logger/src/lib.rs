//! Commute Logger - Application Library
//!
//! Command-line front end for the trip recorder: replays a recorded trace as if it were
//! a live location provider, then saves the finished trip as a GeoJSON artifact.

mod app;
mod logging;

pub use app::{
    AppError, LogStatusListener, ReplayConfig, ReplayProgress, ReplaySource, Settings,
    StdoutSink, load_fixes, run,
};
pub use logging::{LoggingGuard, setup_logging};
