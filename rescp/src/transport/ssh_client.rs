//! Transport that drives the system ssh client
// (c) 2026 rescp developers
//!
//! Each session is one `ssh` process. There is no persistent connection underneath, so a
//! "connection" here is a verified set of ssh arguments: dialing runs a trivial remote command
//! to prove that the host is reachable and will let us in.
//!
//! ssh prompts are disabled (`BatchMode=yes`), so only key-based authentication is possible.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt as _, DuplexStream, duplex};
use tracing::{debug, trace};

use super::credentials::split_host_port;
use super::{Connection, Dialer, InputPipe, RunError, Session};
use crate::util::process::ProcessWrapper;

/// Exit status ssh uses for its own failures, as opposed to those of the remote command
const SSH_FAILURE_STATUS: i32 = 255;

const PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Settings for the `ssh` client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshClientSettings {
    /// The ssh program to run
    pub program: String,
    /// Extra arguments for ssh, inserted before the hostname
    pub options: Vec<String>,
    /// Remote user; empty to let ssh decide
    pub user: String,
    /// `host[:port]`
    pub address: String,
    /// Private key file
    pub identity_file: Option<PathBuf>,
    /// How long ssh may take to connect
    pub connect_timeout: Duration,
}

impl SshClientSettings {
    /// Computes the ssh command line, up to and including the hostname
    pub(crate) fn ssh_cli_args(&self) -> Vec<String> {
        let (host, port) = split_host_port(&self.address);
        let mut args = vec![
            "-o".to_owned(),
            "BatchMode=yes".to_owned(),
            "-o".to_owned(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-p".to_owned(),
            port.to_string(),
        ];
        if !self.user.is_empty() {
            args.push("-l".to_owned());
            args.push(self.user.clone());
        }
        if let Some(key) = &self.identity_file {
            args.push("-i".to_owned());
            args.push(key.to_string_lossy().to_string());
        }
        args.extend_from_slice(&self.options);
        args.push(host.to_owned());
        args
    }

    fn command(&self, remote_command: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        let _ = cmd.args(self.ssh_cli_args()).arg(remote_command);
        debug!("spawning command: {:?}", cmd);
        cmd
    }
}

/// Dials by running `ssh <host> true`
#[derive(Debug, Clone)]
pub struct SshClientDialer {
    settings: Arc<SshClientSettings>,
}

impl SshClientDialer {
    /// Constructor
    #[must_use]
    pub fn new(settings: SshClientSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

#[async_trait]
impl Dialer for SshClientDialer {
    async fn dial(&self) -> Result<Box<dyn Connection>> {
        let mut probe = ProcessWrapper::spawn(self.settings.command("true"))
            .context("could not launch ssh client")?;
        drop(probe.stdin()?);
        let fin = probe.wait().await?;
        if fin.code != Some(0) {
            bail!(
                "ssh exited with {}: {}",
                fin.code
                    .map_or_else(|| "a signal".to_owned(), |c| format!("status {c}")),
                fin.stderr.trim()
            );
        }
        Ok(Box::new(SshClientConnection {
            settings: self.settings.clone(),
        }))
    }

    fn address(&self) -> String {
        self.settings.address.clone()
    }
}

#[derive(Debug)]
struct SshClientConnection {
    settings: Arc<SshClientSettings>,
}

#[async_trait]
impl Connection for SshClientConnection {
    async fn open_session(&self) -> Result<Box<dyn Session>> {
        let (tx, rx) = duplex(PIPE_BUFFER_SIZE);
        Ok(Box::new(SshClientSession {
            settings: self.settings.clone(),
            pipe_rx: Some(rx),
            pipe_tx: Some(tx),
            process: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct SshClientSession {
    settings: Arc<SshClientSettings>,
    pipe_rx: Option<DuplexStream>,
    pipe_tx: Option<DuplexStream>,
    process: Option<ProcessWrapper>,
}

#[async_trait]
impl Session for SshClientSession {
    fn input_pipe(&mut self) -> Result<InputPipe> {
        let tx = self
            .pipe_tx
            .take()
            .ok_or_else(|| anyhow!("input pipe already taken"))?;
        Ok(Box::new(tx))
    }

    async fn run(&mut self, command: &str) -> Result<Vec<u8>, RunError> {
        let mut rx = self
            .pipe_rx
            .take()
            .ok_or_else(|| RunError::Transport(anyhow!("session already used")))?;
        let process = ProcessWrapper::spawn(self.settings.command(command))
            .context("could not launch ssh client")
            .map_err(RunError::Transport)?;
        let process = self.process.insert(process);
        let mut stdin = process.stdin().map_err(RunError::Transport)?;

        let pump = async move {
            let n = tokio::io::copy(&mut rx, &mut stdin).await;
            // Dropping our end fails any further writes into the pipe
            drop(rx);
            // Closing stdin tells the remote there is no more data
            let _ = stdin.shutdown().await;
            drop(stdin);
            n
        };
        let (pumped, finished) = tokio::join!(pump, process.wait());
        // A failed pump shows up in the remote's exit status; report that instead.
        if let Ok(n) = pumped {
            trace!("pumped {n} bytes");
        }
        let fin = finished.map_err(RunError::Transport)?;
        match fin.code {
            Some(0) => Ok(fin.stdout),
            Some(SSH_FAILURE_STATUS) => Err(RunError::Transport(anyhow!(
                "ssh failed: {}",
                fin.stderr.trim()
            ))),
            Some(status) => Err(RunError::Exit {
                status,
                stdout: fin.stdout,
                stderr: fin.stderr,
            }),
            None => Err(RunError::Transport(anyhow!("ssh was killed by a signal"))),
        }
    }

    async fn close(&mut self) {
        if let Some(mut tx) = self.pipe_tx.take() {
            let _ = tx.shutdown().await;
        }
        drop(self.pipe_rx.take());
        // ProcessWrapper kills the child on drop if it is still running
        drop(self.process.take());
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::SshClientSettings;

    fn vec_contains(v: &[String], s: &str) -> bool {
        v.iter().any(|x| x == s)
    }

    fn vec_subslice_strings(haystack: &[String], needle: &[&str]) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w.iter().zip(needle).all(|(a, b)| a == b))
    }

    fn settings() -> SshClientSettings {
        SshClientSettings {
            program: "ssh".into(),
            address: "myserver".into(),
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let args = settings().ssh_cli_args();
        assert!(vec_subslice_strings(&args, &["-o", "BatchMode=yes"]));
        assert!(vec_subslice_strings(&args, &["-o", "ConnectTimeout=5"]));
        assert!(vec_subslice_strings(&args, &["-p", "22"]));
        assert!(!vec_contains(&args, "-l"));
        assert!(!vec_contains(&args, "-i"));
        assert_eq!(args.last().unwrap(), "myserver");
    }

    #[test]
    fn user_port_key() {
        let s = SshClientSettings {
            user: "xyzy".into(),
            address: "myserver:2222".into(),
            identity_file: Some("/home/me/.ssh/id_ed25519".into()),
            ..settings()
        };
        let args = s.ssh_cli_args();
        assert!(vec_subslice_strings(&args, &["-l", "xyzy"]));
        assert!(vec_subslice_strings(&args, &["-p", "2222"]));
        assert!(vec_subslice_strings(&args, &["-i", "/home/me/.ssh/id_ed25519"]));
        assert_eq!(args.last().unwrap(), "myserver");
    }

    #[test]
    fn extra_options_before_host() {
        let xopts = ["-oCompression=yes", "-v"];
        let s = SshClientSettings {
            options: xopts.map(String::from).to_vec(),
            ..settings()
        };
        let args = s.ssh_cli_args();
        assert!(vec_subslice_strings(&args, &[xopts[0], xopts[1], "myserver"]));
    }
}
