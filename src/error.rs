//! Fatal error kinds shared by both process roles.

use std::io;
use thiserror::Error;

/// Errors that end the current process instance.
///
/// None of these are retried; the caller reports the error once and exits.
#[derive(Debug, Error)]
pub enum BlinkError {
    /// The file is missing or unreadable, or standard input is unusable.
    #[error("{target}: {source}")]
    InputUnavailable {
        /// Display form of the invocation target.
        target: String,
        #[source]
        source: io::Error,
    },
    /// No listener could be created.
    #[error("failed to bind listener: {0}")]
    BindFailure(#[source] io::Error),
    /// The background process could not be created.
    #[error("failed to spawn background process: {0}")]
    SpawnFailure(#[source] io::Error),
    /// The background process went away before reporting an address.
    #[error("background process did not report an address: {0}")]
    RendezvousFailure(#[source] io::Error),
    /// The HTTP server loop failed.
    #[error("server failed: {0}")]
    Serve(#[source] io::Error),
}

impl BlinkError {
    /// Build an [`BlinkError::InputUnavailable`] for `target`.
    pub fn input(target: impl ToString, source: io::Error) -> Self {
        Self::InputUnavailable {
            target: target.to_string(),
            source,
        }
    }
}
