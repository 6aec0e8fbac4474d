//! One transfer attempt
// (c) 2026 rescp developers

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

use human_repr::{HumanCount as _, HumanDuration as _, HumanThroughput as _};
use tokio::io::AsyncWriteExt as _;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, info, trace_span, warn};

use super::descriptor::Descriptor;
use crate::connection::ConnectionManager;
use crate::error::TransferError;
use crate::protocol::{Flags, ack, encode, remote_command};
use crate::transport::{InputPipe, RunError, Session};

/// How long the envelope writer may linger after the remote command has exited
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Runs single transfer attempts over sessions from a [`ConnectionManager`]
#[derive(Debug, Clone)]
pub struct Executor {
    connections: Arc<ConnectionManager>,
}

impl Executor {
    /// Constructor
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Accessor
    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Pushes one file to the remote sink.
    ///
    /// The envelope is written by a separate task while the remote command runs; the remote
    /// will not exit until it has read everything, so writing first would deadlock.
    /// The session is always closed before returning.
    ///
    /// Returns the number of payload bytes sent.
    pub async fn execute(
        &self,
        descriptor: Descriptor,
        flags: Flags,
        cancel: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let span = trace_span!("PUT", file = descriptor.file_name.clone());
        self.execute_inner(descriptor, flags, cancel)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        descriptor: Descriptor,
        flags: Flags,
        cancel: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let mut session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransferError::Cancelled),
            s = self.connections.acquire_session() => s?,
        };
        let result = run_attempt(session.as_mut(), descriptor, flags, cancel).await;
        session.close().await;
        result
    }
}

async fn run_attempt(
    session: &mut dyn Session,
    descriptor: Descriptor,
    flags: Flags,
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let pipe = session.input_pipe().map_err(TransferError::Session)?;
    let command = remote_command(flags, &descriptor.destination_dir);
    debug!("remote command: {command}");

    let start = Instant::now();
    let stop_writer = cancel.child_token();
    let writer = tokio::spawn(write_envelope(descriptor, pipe, stop_writer.clone()));

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        r = session.run(&command) => Some(r),
    };
    let Some(outcome) = outcome else {
        // The writer closes the pipe on its way out, so the remote side sees end of input
        stop_writer.cancel();
        let _ = join_writer(writer).await;
        return Err(TransferError::Cancelled);
    };

    let written = join_writer(writer).await;
    let result = merge(outcome, written);
    if let Ok(n) = result {
        let elapsed = start.elapsed();
        info!(
            "Transferred {} in {}; average {}",
            n.human_count_bytes(),
            elapsed.human_duration(),
            rate(n, elapsed)
        );
    }
    result
}

/// Writer task body. Always closes the pipe, so the remote sees end of input.
async fn write_envelope(
    descriptor: Descriptor,
    mut pipe: InputPipe,
    stop: CancellationToken,
) -> std::io::Result<u64> {
    let Descriptor {
        size,
        mode,
        file_name,
        mut contents,
        ..
    } = descriptor;
    let result = tokio::select! {
        biased;
        () = stop.cancelled() => Err(std::io::Error::new(
            ErrorKind::Interrupted,
            "transfer cancelled",
        )),
        r = encode(size, mode, &file_name, &mut contents, &mut pipe) => r,
    };
    let closed = pipe.shutdown().await;
    drop(pipe);
    let written = result?;
    closed?;
    Ok(written)
}

async fn join_writer(mut writer: JoinHandle<std::io::Result<u64>>) -> std::io::Result<u64> {
    match tokio::time::timeout(WRITER_GRACE, &mut writer).await {
        Ok(Ok(r)) => r,
        Ok(Err(join)) => Err(std::io::Error::other(join)),
        Err(_) => {
            writer.abort();
            Err(std::io::Error::new(
                ErrorKind::TimedOut,
                "remote exited before accepting the whole file",
            ))
        }
    }
}

/// Did the writer fail only because the remote stopped reading?
fn remote_stopped_reading(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::BrokenPipe | ErrorKind::TimedOut)
}

/// Combines the remote command's result with the envelope writer's.
///
/// A writer failure means the remote file is incomplete, so it is reported even if the remote
/// claimed success. If the remote failed and the writer was only left stranded by that,
/// the remote's own report says why.
fn merge(
    outcome: Result<Vec<u8>, RunError>,
    written: std::io::Result<u64>,
) -> Result<u64, TransferError> {
    match (outcome, written) {
        (Ok(acks), Ok(n)) => {
            if let Some(msg) = ack::complaint(&acks) {
                warn!("remote reported: {msg}");
            }
            Ok(n)
        }
        (Ok(_), Err(e)) => Err(TransferError::Io(e)),
        (Err(remote), Err(e)) if !remote_stopped_reading(&e) => {
            debug!("remote also failed: {remote}");
            Err(TransferError::Io(e))
        }
        (
            Err(RunError::Exit {
                status,
                stdout,
                stderr,
            }),
            _,
        ) => Err(TransferError::RemoteCommand {
            status,
            message: ack::complaint(&stdout).unwrap_or_else(|| stderr.trim().to_owned()),
        }),
        (Err(RunError::Transport(e)), _) => {
            Err(TransferError::Io(std::io::Error::other(format!("{e:#}"))))
        }
    }
}

fn rate(bytes: u64, elapsed: Duration) -> String {
    #![allow(clippy::cast_precision_loss)]
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs).human_throughput_bytes().to_string()
    } else {
        "unknown".to_owned()
    }
}
