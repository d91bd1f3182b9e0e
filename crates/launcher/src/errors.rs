use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("binary not found: {0}")]
    MissingBinary(PathBuf),
    #[error("failed to start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
