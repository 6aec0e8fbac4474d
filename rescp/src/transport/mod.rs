//! The secure transport, seen from the outside
// (c) 2026 rescp developers
//!
//! rescp does not implement ssh itself. It needs exactly three capabilities:
//!
//! * a [`Dialer`] that establishes an authenticated [`Connection`];
//! * a [`Connection`] that can open command-execution [`Session`]s;
//! * a [`Session`] that exposes an input pipe and runs a single remote command.
//!
//! Two implementations are provided: [`libssh2`] (in-process, supports key material or password)
//! and [`ssh_client`] (drives the system `ssh` binary, key files only).

use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWrite;

mod credentials;
pub use credentials::{Credentials, DEFAULT_PORT, Identity, split_host_port};

#[cfg(feature = "libssh2")]
pub mod libssh2;
pub mod ssh_client;

/// Write half handed to the envelope writer
pub type InputPipe = Box<dyn AsyncWrite + Send + Unpin>;

/// Failure modes of [`Session::run`]
#[derive(Debug, Error)]
pub enum RunError {
    /// The remote command ran and reported failure
    #[error("remote command exited with status {status}")]
    Exit {
        /// Exit status
        status: i32,
        /// Everything the command wrote to its standard output (for the sink, these are acknowledgements)
        stdout: Vec<u8>,
        /// Anything the command wrote to its standard error
        stderr: String,
    },
    /// The transport broke while the command was running
    #[error("transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),
}

/// Establishes connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dialer: Send + Sync + Debug {
    /// Connects and authenticates
    async fn dial(&self) -> Result<Box<dyn Connection>>;
    /// Where we are dialing, for diagnostics
    fn address(&self) -> String;
}

/// An established, authenticated transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync + Debug {
    /// Opens a fresh command-execution session
    async fn open_session(&self) -> Result<Box<dyn Session>>;
    /// Tears down the connection. Best-effort; callers generally ignore the result.
    async fn close(&self) -> Result<()>;
}

/// A single command-execution context
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send + Debug {
    /// Accessor for the command's standard input.
    /// Note that this can only be called once; future calls error.
    fn input_pipe(&mut self) -> Result<InputPipe>;

    /// Runs `command` on the remote and waits for it to exit.
    ///
    /// On success, returns whatever the command wrote to its standard output.
    async fn run(&mut self, command: &str) -> Result<Vec<u8>, RunError>;

    /// Releases the session. Idempotent.
    async fn close(&mut self);
}
