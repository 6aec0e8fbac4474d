//! Delay schedule between attempts
// (c) 2026 rescp developers

use std::time::Duration;

/// Linear backoff with a ceiling.
///
/// The first attempt is immediate. Attempt `n` (for `2 <= n <= linear_limit`) waits `n` units.
/// Later attempts wait `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Unit of the linear part
    pub unit: Duration,
    /// Last attempt that uses the linear schedule
    pub linear_limit: u32,
    /// Delay used once the linear schedule runs out
    pub ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            linear_limit: 10,
            ceiling: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    /// How long to wait before the given attempt (numbered from 1)
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match attempt {
            0 | 1 => Duration::ZERO,
            n if n <= self.linear_limit => self.unit.saturating_mul(n),
            _ => self.ceiling,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::Backoff;

    #[rstest]
    #[case(1, 0)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(10, 10)]
    #[case(11, 60)]
    #[case(1000, 60)]
    fn default_schedule(#[case] attempt: u32, #[case] secs: u64) {
        assert_eq!(
            Backoff::default().delay_before(attempt),
            Duration::from_secs(secs)
        );
    }

    #[test]
    fn custom_unit() {
        let b = Backoff {
            unit: Duration::from_millis(10),
            linear_limit: 3,
            ceiling: Duration::from_millis(500),
        };
        assert_eq!(b.delay_before(3), Duration::from_millis(30));
        assert_eq!(b.delay_before(4), Duration::from_millis(500));
    }
}
