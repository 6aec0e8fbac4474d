//! The retry loop
// (c) 2026 rescp developers

use std::future::Future;
use std::time::Duration;

use human_repr::HumanDuration as _;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, trace_span, warn};

use super::policy::RetryPolicy;
use crate::error::{RetryError, TransferError};

/// How long an interrupted attempt is given to tidy up after its token is cancelled
const ATTEMPT_GRACE: Duration = Duration::from_secs(5);

/// Where the retry loop is up to
#[derive(Debug)]
enum State<T> {
    /// Between attempts, deciding what to do next
    Idle,
    /// Sleeping before the next attempt
    Waiting(Duration),
    /// An attempt is in flight
    Attempting,
    /// Success
    Done(T),
    /// Gave up
    Failed(RetryError),
}

/// Turns a fallible attempt into a retried operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryController {
    policy: RetryPolicy,
    deadline: Option<Duration>,
    stop_on_permanent: bool,
}

impl RetryController {
    /// Constructor. No deadline; every failure is retried.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            deadline: None,
            stop_on_permanent: false,
        }
    }

    /// Sets an overall time limit, measured from the start of [`run`](Self::run)
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// If set, errors that [cannot be fixed by retrying](TransferError::is_permanent) end the loop at once
    #[must_use]
    pub fn with_stop_on_permanent(mut self, stop: bool) -> Self {
        self.stop_on_permanent = stop;
        self
    }

    /// Accessor
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `attempt` until it succeeds or the policy gives up.
    ///
    /// `attempt` receives the attempt number (from 1) and a token that is cancelled when the
    /// caller's token fires or the deadline passes. An interrupted attempt is given a short grace
    /// period to release its resources, then dropped.
    ///
    /// Attempts never overlap.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let expires = self.deadline.map(|d| Instant::now() + d);
        let mut attempts = 0u32;
        let mut last_error: Option<TransferError> = None;
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => {
                    let delay = self.policy.delay_before(attempts + 1);
                    if delay.is_zero() {
                        State::Attempting
                    } else {
                        State::Waiting(delay)
                    }
                }
                State::Waiting(delay) => {
                    debug!(
                        "waiting {} before attempt {}",
                        delay.human_duration(),
                        attempts + 1
                    );
                    tokio::select! {
                        biased;
                        reason = self.interrupted(cancel, expires) => {
                            if let Some(e) = last_error.take() {
                                debug!("last failure was: {e}");
                            }
                            State::Failed(RetryError::Cancelled {
                                attempts,
                                last_error: Some(reason),
                            })
                        }
                        () = tokio::time::sleep(delay) => State::Attempting,
                    }
                }
                State::Attempting => {
                    attempts += 1;
                    let token = cancel.child_token();
                    let fut = attempt(attempts, token.clone())
                        .instrument(trace_span!("ATTEMPT", n = attempts));
                    tokio::pin!(fut);
                    let result = tokio::select! {
                        r = &mut fut => Ok(r),
                        reason = self.interrupted(cancel, expires) => {
                            token.cancel();
                            if tokio::time::timeout(ATTEMPT_GRACE, &mut fut).await.is_err() {
                                warn!("attempt {attempts} did not stop in time");
                            }
                            Err(reason)
                        }
                    };
                    match result {
                        Ok(Ok(v)) => State::Done(v),
                        Ok(Err(e)) => self.after_failure(attempts, e, &mut last_error),
                        Err(reason) => State::Failed(RetryError::Cancelled {
                            attempts,
                            last_error: Some(reason),
                        }),
                    }
                }
                State::Done(v) => return Ok(v),
                State::Failed(e) => return Err(e),
            }
        }
    }

    fn after_failure<T>(
        &self,
        attempts: u32,
        error: TransferError,
        last_error: &mut Option<TransferError>,
    ) -> State<T> {
        if matches!(error, TransferError::Cancelled | TransferError::TimedOut(_)) {
            return State::Failed(RetryError::Cancelled {
                attempts,
                last_error: Some(error),
            });
        }
        if self.stop_on_permanent && error.is_permanent() {
            return State::Failed(RetryError::Aborted {
                attempts,
                last_error: error,
            });
        }
        if !self.policy.allows(attempts) {
            return State::Failed(RetryError::Exhausted {
                attempts,
                last_error: error,
            });
        }
        warn!("attempt {attempts} failed: {error}");
        *last_error = Some(error);
        State::Idle
    }

    /// Resolves when the caller cancels or the deadline passes, with the reason
    async fn interrupted(
        &self,
        cancel: &CancellationToken,
        expires: Option<Instant>,
    ) -> TransferError {
        let expiry = async {
            match expires {
                Some(t) => tokio::time::sleep_until(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => TransferError::Cancelled,
            () = expiry => TransferError::TimedOut(self.deadline.unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::{Error, ErrorKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use super::RetryController;
    use crate::error::{RetryError, TransferError};
    use crate::retry::RetryPolicy;

    fn transient() -> TransferError {
        TransferError::Io(Error::from(ErrorKind::ConnectionReset))
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_always_failing() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let err = RetryController::new(RetryPolicy::bounded(3))
            .run(&CancellationToken::new(), |_, _| {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(transient()) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }), "{err:?}");
        assert!(matches!(err.last_error(), Some(TransferError::Io(_))));
        // no delay, then 2s, then 3s
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_eventual_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = RetryController::new(RetryPolicy::bounded(5))
            .run(&CancellationToken::new(), |n, _| {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n <= 2 { Err(transient()) } else { Ok(n) } }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt() {
        let start = Instant::now();
        let controller = RetryController::new(RetryPolicy::Single);
        assert_eq!(controller.policy(), RetryPolicy::Single);
        let err = controller
            .run(&CancellationToken::new(), |_, _| async {
                Err::<(), _>(transient())
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert!(matches!(err, RetryError::Exhausted { .. }));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_until_cancelled() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let _canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });
        let err = RetryController::new(RetryPolicy::unbounded())
            .run(&cancel, |_, _| async { Err::<(), _>(transient()) })
            .await
            .unwrap_err();
        // attempts start at 0, 2, 5, 9, 14, 20 and 27s; the next would be at 35s
        assert_eq!(err.attempts(), 7);
        assert!(matches!(
            err,
            RetryError::Cancelled {
                last_error: Some(TransferError::Cancelled),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_while_waiting() {
        let start = Instant::now();
        let err = RetryController::new(RetryPolicy::unbounded())
            .with_deadline(Some(Duration::from_secs(10)))
            .run(&CancellationToken::new(), |_, _| async {
                Err::<(), _>(transient())
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 4);
        assert!(matches!(
            err.last_error(),
            Some(TransferError::TimedOut(d)) if *d == Duration::from_secs(10)
        ));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_attempt() {
        let err = RetryController::new(RetryPolicy::Single)
            .with_deadline(Some(Duration::from_secs(3)))
            .run(&CancellationToken::new(), |_, token| async move {
                token.cancelled().await;
                Err::<(), _>(TransferError::Cancelled)
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert!(matches!(err.last_error(), Some(TransferError::TimedOut(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors() {
        let not_found = || TransferError::Source(Error::from(ErrorKind::NotFound));

        let err = RetryController::new(RetryPolicy::bounded(5))
            .with_stop_on_permanent(true)
            .run(&CancellationToken::new(), |_, _| async {
                Err::<(), _>(not_found())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Aborted { attempts: 1, .. }), "{err:?}");

        // Without the flag, every failure is retried alike
        let err = RetryController::new(RetryPolicy::bounded(5))
            .run(&CancellationToken::new(), |_, _| async {
                Err::<(), _>(not_found())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 5, .. }), "{err:?}");
    }
}
