/*!
Logging and trace capture for the commute logger.

Two implementations share one API:

- real: compiled when `feature = "profiling"` is set. Adds a tracing-chrome layer
  that records every `profiling::scope!` into a trace file viewable in Perfetto.
- stub: compiled in all other configurations. Plain formatted logging only.

Logs go to stderr so `--dry-run` output on stdout stays machine readable.
*/

use std::path::Path;

/// Keeps trace capture alive; dropping it flushes the trace file.
#[must_use = "dropping the guard stops trace capture"]
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _flush: Option<tracing_chrome::FlushGuard>,
}

fn set_default_filter() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }
}

#[cfg(feature = "profiling")]
mod inner {
    use super::LoggingGuard;
    use std::path::Path;
    use tracing_chrome::ChromeLayerBuilder;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    pub fn setup_logging(trace_file: Option<&Path>) -> LoggingGuard {
        super::set_default_filter();

        let (chrome_layer, flush) = match trace_file {
            Some(path) => {
                let (layer, guard) = ChromeLayerBuilder::new().file(path).build();
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env());
        tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .init();

        match trace_file {
            Some(path) => tracing::info!("Recording trace to {}", path.display()),
            None => tracing::debug!("Logging initialized (no trace file requested)"),
        }

        LoggingGuard { _flush: flush }
    }
}

#[cfg(not(feature = "profiling"))]
mod inner {
    use super::LoggingGuard;
    use std::path::Path;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    pub fn setup_logging(trace_file: Option<&Path>) -> LoggingGuard {
        super::set_default_filter();

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env());
        tracing_subscriber::registry().with(fmt_layer).init();

        if let Some(path) = trace_file {
            tracing::warn!(
                "Ignoring trace file {}: built without the `profiling` feature",
                path.display()
            );
        }

        LoggingGuard {}
    }
}

/// Install the global subscriber. Call once, before the runtime starts.
pub fn setup_logging(trace_file: Option<&Path>) -> LoggingGuard {
    inner::setup_logging(trace_file)
}
