use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a launch. Anything here maps to exit status 1.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("could not allocate bookkeeping for {count} units: {source}")]
    Bookkeeping {
        count: usize,
        source: TryReserveError,
    },

    #[error("failed to spawn unit {id}: {source}")]
    Spawn { id: usize, source: SpawnError },
}

/// The concurrency primitive refused to create another unit.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SpawnError(#[from] pub io::Error);

/// Failures inside a single unit. These never abort the run.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("allocation of {bytes} bytes failed: {source}")]
    Alloc {
        bytes: usize,
        source: TryReserveError,
    },

    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
