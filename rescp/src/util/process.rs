//! Subprocess management
// (c) 2026 rescp developers

use std::process::Stdio;

use anyhow::{Context as _, Result, anyhow};
use tokio::io::AsyncReadExt as _;
use tokio::process::{ChildStdin, Command};
use tracing::warn;

/// A child process (usually ssh) that runs a remote command on our behalf
#[derive(Debug)]
pub(crate) struct ProcessWrapper {
    process: tokio::process::Child,
}

impl Drop for ProcessWrapper {
    fn drop(&mut self) {
        // Tidy up as best we can.
        if let Ok(Some(_)) = self.process.try_wait() {
            return;
        }
        let _ = self
            .process
            .start_kill()
            .map_err(|e| warn!("killing connection process: {e}"));
        let _ = self
            .process
            .try_wait()
            .map_err(|e| warn!("reaping connection process: {e}"));
    }
}

/// What a finished child process left behind
#[derive(Debug)]
pub(crate) struct Finished {
    /// Exit code; `None` if the process was killed by a signal
    pub(crate) code: Option<i32>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: String,
}

impl ProcessWrapper {
    /// Spawns a [`tokio::process::Command`] with all three standard streams piped.
    pub(crate) fn spawn(mut cmd: Command) -> Result<Self> {
        let process = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("could not spawn child process: {e}"))?;
        Ok(Self { process })
    }

    /// Accessor for the child process stdin.
    /// Note that this can only be called once; future calls error.
    pub(crate) fn stdin(&mut self) -> Result<ChildStdin> {
        self.process
            .stdin
            .take()
            .ok_or_else(|| anyhow!("could not access process stdin"))
    }

    /// Waits for the process to exit, collecting its output.
    ///
    /// stdout and stderr are drained concurrently so a chatty child cannot block on a full pipe.
    pub(crate) async fn wait(&mut self) -> Result<Finished> {
        let mut out = self
            .process
            .stdout
            .take()
            .ok_or_else(|| anyhow!("could not access process stdout"))?;
        let mut err = self
            .process
            .stderr
            .take()
            .ok_or_else(|| anyhow!("could not access process stderr"))?;
        let mut stdout = Vec::new();
        let mut stderr = String::new();
        let (r1, r2) = tokio::join!(out.read_to_end(&mut stdout), err.read_to_string(&mut stderr));
        let _ = r1.context("reading process output")?;
        let _ = r2.context("reading process errors")?;
        let status = self.process.wait().await.context("waiting for process")?;
        Ok(Finished {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}
