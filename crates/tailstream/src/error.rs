//! Error taxonomy for tailing sessions
//!
//! Every variant here is fatal to the session that reports it; the
//! engine never retries internally. Resuming is the caller's job
//! (start a new session, optionally reusing the last known position).

use thiserror::Error;

/// Errors surfaced by a tailing or watching session.
#[derive(Debug, Error)]
pub enum TailError {
    /// A delete notification for the tailed file was observed.
    #[error("file has been deleted")]
    FileDeleted,

    /// The native watch mechanism could not be created or registered.
    #[error("failed to set up file watch: {0}")]
    WatchUnavailable(#[from] notify::Error),

    /// An I/O error occurred while reading new file content.
    #[error("failed to read from tailed file: {0}")]
    Read(#[from] std::io::Error),

    /// An entry point was called with an invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
