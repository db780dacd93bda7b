use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`LogWriter`](crate::LogWriter) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// `max_size` was less than 1.
    #[error("max_size must be at least 1")]
    InvalidMaxSize,

    /// `max_files` was less than 1.
    #[error("max_files must be at least 1")]
    InvalidMaxFiles,

    /// The target path exists but is not a plain file (directory, symlink,
    /// device, ...).
    #[error("{} is not a regular file", .0.display())]
    NotRegularFile(PathBuf),

    /// Operation attempted after [`close`](crate::LogWriter::close).
    #[error("writer is closed")]
    Closed,

    /// A previous write or rotation failed; the writer refuses all further
    /// work. Reopen the file to continue writing.
    #[error("write cannot complete due to previous error: {0}")]
    Sticky(String),

    /// Underlying filesystem or compression failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
