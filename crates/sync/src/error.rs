//! Run error types.

use std::path::PathBuf;

/// Errors produced during an upload run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote error: {0}")]
    Remote(#[from] cloudpush_api::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read upload root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
