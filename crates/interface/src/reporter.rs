use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use gnd_types::nanos_since_epoch;

/// Persistence collaborator for unexpected link failures. The supervisor
/// deduplicates by message before calling this, so implementations see each
/// novel failure once per category.
pub trait ExceptionSink: Send + Sync {
    /// Persists a failure report and returns where it landed.
    fn write_exception(&self, interface: &str, context: &str, detail: &str)
        -> io::Result<PathBuf>;
}

/// Writes one timestamped report file per novel failure.
pub struct FsExceptionSink {
    dir: PathBuf,
}

impl FsExceptionSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExceptionSink for FsExceptionSink {
    fn write_exception(
        &self,
        interface: &str,
        context: &str,
        detail: &str,
    ) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stamp = nanos_since_epoch(SystemTime::now());
        let path = self.dir.join(format!("exception_{interface}_{stamp}.txt"));
        fs::write(&path, format!("{context}\n{detail}\n"))?;

        Ok(path)
    }
}
