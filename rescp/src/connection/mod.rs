//! Connection lifecycle management
// (c) 2026 rescp developers
//!
//! A [`ConnectionManager`] owns at most one live [`Connection`]. It dials lazily on first use,
//! hands out a fresh [`Session`] per transfer attempt, and recovers from a cached connection
//! that has silently died by redialing exactly once.
//!
//! The manager's lock is held for the whole of [`ConnectionManager::acquire_session`], so
//! concurrent callers never dial twice. Data transfer happens outside the lock, once each caller
//! has its own session.

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::error::TransferError;
use crate::transport::{Connection, Dialer, Session};

/// Owns the single cached connection for a [`Dialer`]
#[derive(Debug)]
pub struct ConnectionManager {
    dialer: Box<dyn Dialer>,
    connection: Mutex<Option<Box<dyn Connection>>>,
}

impl ConnectionManager {
    /// Constructor. Does not dial.
    #[must_use]
    pub fn new(dialer: Box<dyn Dialer>) -> Self {
        Self {
            dialer,
            connection: Mutex::new(None),
        }
    }

    /// Where this manager connects to
    #[must_use]
    pub fn address(&self) -> String {
        self.dialer.address()
    }

    /// Is a connection currently cached?
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn dial(&self) -> Result<Box<dyn Connection>, TransferError> {
        debug!("dialing {}", self.dialer.address());
        self.dialer
            .dial()
            .await
            .map_err(|e| TransferError::dial(self.dialer.address(), e))
    }

    /// Obtains a new session, dialing or redialing as necessary.
    ///
    /// If a session cannot be opened on the cached connection, that connection is discarded and
    /// the manager redials once. If that fails too, the error is returned and nothing is cached,
    /// so the next call starts again from a fresh dial.
    pub async fn acquire_session(&self) -> Result<Box<dyn Session>, TransferError> {
        let mut cached = self.connection.lock().await;

        let connection = match cached.take() {
            Some(c) => c,
            None => self.dial().await?,
        };
        match connection.open_session().await {
            Ok(session) => {
                *cached = Some(connection);
                return Ok(session);
            }
            Err(e) => {
                warn!("could not open session, redialing: {e:#}");
                discard(connection).await;
            }
        }

        let connection = self.dial().await?;
        match connection.open_session().await {
            Ok(session) => {
                *cached = Some(connection);
                Ok(session)
            }
            Err(e) => {
                discard(connection).await;
                Err(TransferError::Session(e))
            }
        }
    }

    /// Closes and forgets the cached connection, if there is one
    pub async fn disconnect(&self) {
        if let Some(c) = self.connection.lock().await.take() {
            discard(c).await;
        }
    }
}

/// Best-effort close; the connection is unusable whatever happens.
async fn discard(connection: Box<dyn Connection>) {
    if let Err(e) = connection.close().await {
        trace!("ignoring error closing connection: {e:#}");
    }
}
