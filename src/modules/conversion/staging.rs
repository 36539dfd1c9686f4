use std::fs;
use std::path::{Path, PathBuf};

use super::job::{basename, ConversionJob};

/// Allocates job-scoped scratch paths under one fixed directory.
#[derive(Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Paths are derived from the key basenames, like the artifacts they
    /// hold. Only one job is in flight per process, so collisions across
    /// jobs cannot happen; collisions across worker processes are fine
    /// because each runs in its own filesystem namespace.
    pub fn allocate(&self, job: &ConversionJob) -> StagingPair {
        StagingPair {
            input_path: self.dir.join(basename(&job.input_key)),
            output_path: self.dir.join(basename(&job.output_key)),
        }
    }
}

/// Scratch input/output paths for one job. Removal runs on drop, so
/// every exit path out of the dispatcher cleans up, converter panics
/// included.
pub struct StagingPair {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl StagingPair {
    /// Removing a path that was never created is not an error.
    pub fn remove(&self) {
        remove_if_present(&self.input_path);
        remove_if_present(&self.output_path);
    }
}

impl Drop for StagingPair {
    fn drop(&mut self) {
        self.remove();
    }
}

fn remove_if_present(path: &Path) {
    let _ = fs::remove_file(path);
}
