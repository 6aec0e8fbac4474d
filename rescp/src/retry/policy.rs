//! Retry policies
// (c) 2026 rescp developers

use std::num::NonZeroU32;

use super::backoff::Backoff;

/// How many attempts to make, and how far apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum RetryPolicy {
    /// One attempt, no retries
    #[default]
    #[display("single attempt")]
    Single,
    /// Up to `max_attempts` attempts
    #[display("up to {max_attempts} attempts")]
    Bounded {
        /// Give up after this many consecutive failures
        max_attempts: NonZeroU32,
        /// Delay schedule
        backoff: Backoff,
    },
    /// Keep trying until success or cancellation
    #[display("retry until success")]
    Unbounded {
        /// Delay schedule
        backoff: Backoff,
    },
}

impl RetryPolicy {
    /// Convenience constructor for [`RetryPolicy::Bounded`] with the default backoff.
    /// Zero attempts are treated as one.
    #[must_use]
    pub fn bounded(max_attempts: u32) -> Self {
        Self::Bounded {
            max_attempts: NonZeroU32::new(max_attempts).unwrap_or(NonZeroU32::MIN),
            backoff: Backoff::default(),
        }
    }

    /// Convenience constructor for [`RetryPolicy::Unbounded`] with the default backoff
    #[must_use]
    pub fn unbounded() -> Self {
        Self::Unbounded {
            backoff: Backoff::default(),
        }
    }

    /// Replaces the delay schedule. Has no effect on [`RetryPolicy::Single`].
    #[must_use]
    pub fn with_backoff(self, backoff: Backoff) -> Self {
        match self {
            Self::Single => Self::Single,
            Self::Bounded { max_attempts, .. } => Self::Bounded {
                max_attempts,
                backoff,
            },
            Self::Unbounded { .. } => Self::Unbounded { backoff },
        }
    }

    /// Is another attempt allowed after `attempts` have failed?
    #[must_use]
    pub fn allows(&self, attempts: u32) -> bool {
        match self {
            Self::Single => attempts < 1,
            Self::Bounded { max_attempts, .. } => attempts < max_attempts.get(),
            Self::Unbounded { .. } => true,
        }
    }

    /// How long to wait before the given attempt (numbered from 1)
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> std::time::Duration {
        match self {
            Self::Single => std::time::Duration::ZERO,
            Self::Bounded { backoff, .. } | Self::Unbounded { backoff } => {
                backoff.delay_before(attempt)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::RetryPolicy;
    use crate::retry::Backoff;

    #[test]
    fn allowances() {
        assert!(RetryPolicy::Single.allows(0));
        assert!(!RetryPolicy::Single.allows(1));
        let b = RetryPolicy::bounded(3);
        assert!(b.allows(2));
        assert!(!b.allows(3));
        assert!(RetryPolicy::unbounded().allows(u32::MAX));
        assert!(!RetryPolicy::bounded(0).allows(1));
    }

    #[test]
    fn replace_backoff() {
        let b = Backoff {
            unit: Duration::from_millis(5),
            ..Backoff::default()
        };
        assert_eq!(
            RetryPolicy::unbounded().with_backoff(b),
            RetryPolicy::Unbounded { backoff: b }
        );
        assert_eq!(RetryPolicy::Single.with_backoff(b), RetryPolicy::Single);
    }

    #[test]
    fn display() {
        assert_eq!(RetryPolicy::bounded(4).to_string(), "up to 4 attempts");
        assert_eq!(RetryPolicy::Single.to_string(), "single attempt");
    }
}
