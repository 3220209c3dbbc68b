//! Persistence collaborator for finished trips.
//!
//! The core never decides where trips are stored. It hands a filename and the
//! serialized bytes to a `TripSink`; the caller picks the implementation and owns the
//! destination (including creating directories).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Destination for trip artifacts.
pub trait TripSink: Send + Sync {
    /// Persist `bytes` under `filename`, returning where it ended up.
    fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Writes each artifact as a file inside an existing directory.
///
/// The directory is not created here; a missing directory surfaces as an I/O error.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TripSink for DirectorySink {
    fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

impl<T: TripSink + ?Sized> TripSink for std::sync::Arc<T> {
    fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        (**self).write(filename, bytes)
    }
}
