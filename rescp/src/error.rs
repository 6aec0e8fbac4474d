//! Error types
// (c) 2026 rescp developers

use std::io::ErrorKind;
use std::time::Duration;

use thiserror::Error;

/// The ways a single transfer attempt can fail.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Transport-level connect or authentication failure
    #[error("could not connect to {address}: {source:#}")]
    Dial {
        /// The address we tried to reach
        address: String,
        /// What went wrong
        #[source]
        source: anyhow::Error,
    },
    /// Session creation failed on an otherwise live connection
    #[error("could not open session: {0:#}")]
    Session(#[source] anyhow::Error),
    /// The local source could not be opened or read
    #[error("local source: {0}")]
    Source(#[source] std::io::Error),
    /// Reading the source or writing to the remote stream failed part way
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    /// The destination path cannot name a file
    #[error("invalid destination {0:?}: it must end in a file name")]
    Destination(String),
    /// The remote sink process reported failure
    #[error("remote command failed (status {status}){}", fmt_message(.message))]
    RemoteCommand {
        /// Exit status reported by the remote, if any
        status: i32,
        /// Diagnostic text from the remote receiver, if any
        message: String,
    },
    /// The caller's cancellation token fired
    #[error("cancelled")]
    Cancelled,
    /// The overall deadline passed
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

fn fmt_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

impl TransferError {
    /// Is this error something that a further attempt cannot fix?
    ///
    /// Only problems with the local source or the destination path are considered permanent,
    /// along with cancellation. Everything on the far side of the network might recover.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Source(e) => matches!(
                e.kind(),
                ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::IsADirectory
            ),
            Self::Destination(_) | Self::Cancelled | Self::TimedOut(_) => true,
            _ => false,
        }
    }

    pub(crate) fn dial<S: Into<String>>(address: S, source: anyhow::Error) -> Self {
        Self::Dial {
            address: address.into(),
            source,
        }
    }
}

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError {
    /// The bounded policy gave up
    #[error("copy failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        #[source]
        last_error: TransferError,
    },
    /// Cancelled, or the overall deadline passed, before success
    #[error("copy abandoned after {attempts} attempt(s): {}", fmt_last(.last_error.as_ref()))]
    Cancelled {
        /// Number of attempts started
        attempts: u32,
        /// The reason we stopped (usually [`TransferError::Cancelled`] or [`TransferError::TimedOut`])
        last_error: Option<TransferError>,
    },
    /// An attempt failed with an error we were told not to retry
    #[error("copy failed permanently after {attempts} attempt(s): {last_error}")]
    Aborted {
        /// Number of attempts made
        attempts: u32,
        /// The permanent error
        #[source]
        last_error: TransferError,
    },
}

fn fmt_last(e: Option<&TransferError>) -> String {
    e.map_or_else(|| "cancelled".to_owned(), ToString::to_string)
}

impl RetryError {
    /// Number of attempts that were made before giving up
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// The last error seen, if any
    #[must_use]
    pub fn last_error(&self) -> Option<&TransferError> {
        match self {
            Self::Exhausted { last_error, .. } | Self::Aborted { last_error, .. } => {
                Some(last_error)
            }
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }
}
