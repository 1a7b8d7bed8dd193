use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Generic I/O error (creating the log directory, appending a line).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured log path has no parent directory.
    #[error("Invalid transaction log path: {0}")]
    InvalidPath(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
