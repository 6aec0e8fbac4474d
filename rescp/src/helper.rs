//! Convenience API for pushing files
// (c) 2026 rescp developers

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::ConnectionManager;
use crate::error::{RetryError, TransferError};
use crate::protocol::Flags;
use crate::retry::{Backoff, RetryController, RetryPolicy};
use crate::transfer::{Descriptor, Executor, FileSource, Source, compress};
use crate::transport::Dialer;

/// Pushes files to one remote host, over a shared, lazily dialed connection.
///
/// Every operation opens its source afresh for each attempt, so any [`Source`] can be retried.
///
/// ```no_run
/// # async fn demo(dialer: Box<dyn rescp::transport::Dialer>) -> anyhow::Result<()> {
/// use rescp::{Helper, transfer::BytesSource};
/// use tokio_util::sync::CancellationToken;
///
/// let mut helper = Helper::new(dialer);
/// helper.set_limit_kb(100);
/// let cancel = CancellationToken::new();
/// let sent = helper
///     .try_copy(&BytesSource::new(b"hello".to_vec()), "/tmp/hello.txt", 3, &cancel)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Helper {
    executor: Executor,
    flags: Flags,
    gzip: bool,
    backoff: Backoff,
    deadline: Option<Duration>,
    stop_on_permanent: bool,
}

impl Helper {
    /// Constructor. Does not dial.
    #[must_use]
    pub fn new(dialer: Box<dyn Dialer>) -> Self {
        Self::with_manager(Arc::new(ConnectionManager::new(dialer)))
    }

    /// Constructor, sharing an existing connection manager
    #[must_use]
    pub fn with_manager(connections: Arc<ConnectionManager>) -> Self {
        Self {
            executor: Executor::new(connections),
            flags: Flags::default(),
            gzip: false,
            backoff: Backoff::default(),
            deadline: None,
            stop_on_permanent: false,
        }
    }

    /// Sets the delay schedule used by the retrying operations
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets an overall time limit for each operation
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Whether to give up at once on errors that retrying cannot fix
    #[must_use]
    pub fn with_stop_on_permanent(mut self, stop: bool) -> Self {
        self.stop_on_permanent = stop;
        self
    }

    /// Limits the transfer rate, in kilobytes per second. Zero means unlimited.
    pub fn set_limit_kb(&mut self, kb: u32) {
        self.flags = Flags::with_limit_kb(kb);
    }

    /// Enables or disables gzip compression. Compressed files gain a `.gz` suffix.
    pub fn set_gzip(&mut self, enable: bool) {
        self.gzip = enable;
    }

    /// Current rate limit in KB/s, if any
    #[must_use]
    pub fn limit_kb(&self) -> Option<u32> {
        self.flags.limit_kb
    }

    /// Is compression enabled?
    #[must_use]
    pub fn gzip(&self) -> bool {
        self.gzip
    }

    /// The underlying connection manager
    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        self.executor.connections()
    }

    /// One attempt
    pub async fn copy(
        &self,
        source: &dyn Source,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        self.transfer(source, destination, RetryPolicy::Single, cancel)
            .await
    }

    /// One attempt, from a local file
    pub async fn copy_path<P: AsRef<Path>>(
        &self,
        path: P,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        self.copy(&FileSource::new(path), destination, cancel).await
    }

    /// Retries until success. Returns an error only if cancelled, if the deadline passes, or
    /// (when so configured) on a permanent error.
    pub async fn must_copy(
        &self,
        source: &dyn Source,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        let policy = RetryPolicy::unbounded().with_backoff(self.backoff);
        self.transfer(source, destination, policy, cancel).await
    }

    /// Retries until success, from a local file
    pub async fn must_copy_path<P: AsRef<Path>>(
        &self,
        path: P,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        self.must_copy(&FileSource::new(path), destination, cancel)
            .await
    }

    /// Makes up to `attempts` attempts
    pub async fn try_copy(
        &self,
        source: &dyn Source,
        destination: &str,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        let policy = RetryPolicy::bounded(attempts).with_backoff(self.backoff);
        self.transfer(source, destination, policy, cancel).await
    }

    /// Makes up to `attempts` attempts, from a local file
    pub async fn try_copy_path<P: AsRef<Path>>(
        &self,
        path: P,
        destination: &str,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        self.try_copy(&FileSource::new(path), destination, attempts, cancel)
            .await
    }

    /// The general form: pushes `source` to `destination` under any retry policy.
    ///
    /// Returns the number of payload bytes sent by the successful attempt.
    pub async fn transfer(
        &self,
        source: &dyn Source,
        destination: &str,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<u64, RetryError> {
        debug!("pushing {source:?} to {destination} ({policy})");
        RetryController::new(policy)
            .with_deadline(self.deadline)
            .with_stop_on_permanent(self.stop_on_permanent)
            .run(cancel, |_, token| async move {
                self.attempt(source, destination, &token).await
            })
            .await
    }

    async fn attempt(
        &self,
        source: &dyn Source,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let mut descriptor = Descriptor::open(source, destination).await?;
        if self.gzip {
            descriptor = compress::gzip(descriptor).await?;
        }
        self.executor.execute(descriptor, self.flags, cancel).await
    }

    /// Drops the cached connection, if any
    pub async fn disconnect(&self) {
        self.connections().disconnect().await;
    }
}
