//! In-process ssh transport built on libssh2
// (c) 2026 rescp developers
//!
//! libssh2 is a blocking library, so every call into it happens on tokio's blocking pool.
//! The session input pipe is an in-memory duplex stream; the blocking side drains it into
//! the ssh channel through a [`SyncIoBridge`]. Either end of the pipe closes it when dropped.
//!
//! Every blocking libssh2 call is bounded by the connect timeout, so a connection that has
//! died silently fails in good time instead of holding up the caller.

use std::io::Read as _;
use std::net::{TcpStream, ToSocketAddrs as _};
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt as _, DuplexStream, duplex};
use tokio_util::io::SyncIoBridge;
use tracing::{debug, trace, warn};

use super::{Connection, Credentials, Dialer, Identity, InputPipe, RunError, Session};

/// Size of the buffer between the envelope writer and the ssh channel
const PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Dials using libssh2
#[derive(Debug, Clone)]
pub struct Libssh2Dialer {
    credentials: Credentials,
    connect_timeout: Duration,
}

impl Libssh2Dialer {
    /// Constructor
    #[must_use]
    pub fn new(credentials: Credentials, connect_timeout: Duration) -> Self {
        Self {
            credentials,
            connect_timeout,
        }
    }
}

/// libssh2 takes its timeout in milliseconds, and treats zero as "wait forever"
fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1)
}

fn host_key_fingerprint(hash: &[u8]) -> String {
    hex::encode(hash)
}

fn connect(credentials: &Credentials, connect_timeout: Duration) -> Result<ssh2::Session> {
    let target = credentials.host_port();
    let addr = target
        .to_socket_addrs()
        .with_context(|| format!("resolving {target}"))?
        .next()
        .ok_or_else(|| anyhow!("{target} did not resolve to any address"))?;
    debug!("connecting to {addr}");
    let tcp = TcpStream::connect_timeout(&addr, connect_timeout)
        .with_context(|| format!("connecting to {addr}"))?;

    let mut session = ssh2::Session::new().context("creating ssh session")?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout_millis(connect_timeout));
    session.handshake().context("ssh handshake")?;

    // Host key verification is outside our remit; record what we saw.
    if let Some(hash) = session.host_key_hash(ssh2::HashType::Sha256) {
        debug!("host key SHA256 {}", host_key_fingerprint(hash));
    }

    match &credentials.identity {
        Identity::PrivateKey(key) => session
            .userauth_pubkey_memory(&credentials.user, None, key, None)
            .context("public key authentication")?,
        Identity::Password(password) => session
            .userauth_password(&credentials.user, password)
            .context("password authentication")?,
    }
    if !session.authenticated() {
        bail!("authentication as {} was not accepted", credentials.user);
    }
    Ok(session)
}

#[async_trait]
impl Dialer for Libssh2Dialer {
    async fn dial(&self) -> Result<Box<dyn Connection>> {
        let credentials = self.credentials.clone();
        let timeout = self.connect_timeout;
        let session = tokio::task::spawn_blocking(move || connect(&credentials, timeout))
            .await
            .context("dial task failed")??;
        Ok(Box::new(Libssh2Connection { session }))
    }

    fn address(&self) -> String {
        self.credentials.address.clone()
    }
}

/// An authenticated libssh2 session
struct Libssh2Connection {
    session: ssh2::Session,
}

impl std::fmt::Debug for Libssh2Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Libssh2Connection").finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for Libssh2Connection {
    async fn open_session(&self) -> Result<Box<dyn Session>> {
        let session = self.session.clone();
        let channel = tokio::task::spawn_blocking(move || session.channel_session())
            .await
            .context("session task failed")?
            .context("opening channel")?;
        let (tx, rx) = duplex(PIPE_BUFFER_SIZE);
        Ok(Box::new(Libssh2Session {
            channel: Some(channel),
            pipe_rx: Some(rx),
            pipe_tx: Some(tx),
        }))
    }

    async fn close(&self) -> Result<()> {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || session.disconnect(None, "closing", None))
            .await
            .context("disconnect task failed")?
            .context("disconnecting")
    }
}

/// A libssh2 channel, plus the pipe that feeds its standard input
struct Libssh2Session {
    channel: Option<ssh2::Channel>,
    pipe_rx: Option<DuplexStream>,
    pipe_tx: Option<DuplexStream>,
}

impl std::fmt::Debug for Libssh2Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Libssh2Session")
            .field("open", &self.channel.is_some())
            .finish_non_exhaustive()
    }
}

/// Blocking half of [`Libssh2Session::run`]
///
/// If the remote stops accepting input, its output and exit status are still collected,
/// as they say why.
fn exec_blocking(
    mut channel: ssh2::Channel,
    mut input: SyncIoBridge<DuplexStream>,
    command: &str,
) -> Result<(i32, Vec<u8>, String)> {
    channel.exec(command).context("starting remote command")?;
    match std::io::copy(&mut input, &mut channel) {
        Ok(sent) => trace!("sent {sent} bytes"),
        Err(e) => debug!("remote stopped accepting input: {e}"),
    }
    // The envelope writer sees a broken pipe from here on
    drop(input);
    if let Err(e) = channel.send_eof() {
        debug!("sending eof: {e}");
    }

    let mut stdout = Vec::new();
    let _ = channel
        .read_to_end(&mut stdout)
        .context("reading remote output")?;
    let mut stderr = String::new();
    let _ = channel
        .stderr()
        .read_to_string(&mut stderr)
        .context("reading remote errors")?;
    channel.wait_close().context("closing channel")?;
    let status = channel.exit_status().context("reading exit status")?;
    Ok((status, stdout, stderr))
}

#[async_trait]
impl Session for Libssh2Session {
    fn input_pipe(&mut self) -> Result<InputPipe> {
        let tx = self
            .pipe_tx
            .take()
            .ok_or_else(|| anyhow!("input pipe already taken"))?;
        Ok(Box::new(tx))
    }

    async fn run(&mut self, command: &str) -> Result<Vec<u8>, RunError> {
        let channel = self
            .channel
            .take()
            .ok_or_else(|| RunError::Transport(anyhow!("session already used")))?;
        let rx = self
            .pipe_rx
            .take()
            .ok_or_else(|| RunError::Transport(anyhow!("session already used")))?;
        let input = SyncIoBridge::new(rx);
        let command = command.to_owned();
        debug!("exec {command:?}");
        let (status, stdout, stderr) =
            tokio::task::spawn_blocking(move || exec_blocking(channel, input, &command))
                .await
                .map_err(|e| RunError::Transport(e.into()))?
                .map_err(RunError::Transport)?;
        if status == 0 {
            Ok(stdout)
        } else {
            Err(RunError::Exit {
                status,
                stdout,
                stderr,
            })
        }
    }

    async fn close(&mut self) {
        if let Some(mut tx) = self.pipe_tx.take() {
            let _ = tx.shutdown().await;
        }
        drop(self.pipe_rx.take());
        if let Some(mut channel) = self.channel.take() {
            let result = tokio::task::spawn_blocking(move || channel.close()).await;
            if !matches!(result, Ok(Ok(()))) {
                warn!("closing unused channel failed");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{host_key_fingerprint, timeout_millis};

    #[rstest]
    #[case(Duration::from_secs(10), 10_000)]
    #[case(Duration::from_millis(250), 250)]
    #[case(Duration::ZERO, 1)]
    #[case(Duration::from_secs(u64::MAX), u32::MAX)]
    fn session_timeout(#[case] timeout: Duration, #[case] expected: u32) {
        assert_eq!(timeout_millis(timeout), expected);
    }

    #[test]
    fn fingerprint() {
        assert_eq!(host_key_fingerprint(&[0x00, 0x0f, 0xa5, 0xff]), "000fa5ff");
    }
}
