//! Wall-clock abstraction
//!
//! Device timestamps are absolute, so the coordinator reasons in
//! `DateTime<Utc>`. Suspension always goes through `tokio::time`, which lets
//! [`TokioClock`] drive the whole runtime deterministically under a paused
//! tokio clock.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Time remaining until `deadline`, zero if it has passed
    fn until(&self, deadline: DateTime<Utc>) -> Duration {
        (deadline - self.now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// The system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock anchored to tokio's (pausable) monotonic clock.
///
/// `now()` is the anchor timestamp plus the tokio time elapsed since the
/// clock was created.
#[derive(Debug, Clone)]
pub struct TokioClock {
    anchor: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Anchor at `anchor`, starting now
    pub fn starting_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed =
            chrono::Duration::from_std(self.origin.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor + elapsed
    }
}

/// Millisecond-resolution equality, the only "no refresh happened" signal
pub fn same_instant(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.timestamp_millis() == b.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let clock = TokioClock::starting_at(t0);
        assert_eq!(clock.now(), t0);

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), t0 + chrono::Duration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn until_is_zero_for_past_deadlines() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let clock = TokioClock::starting_at(t0);
        assert_eq!(clock.until(t0 - chrono::Duration::seconds(5)), Duration::ZERO);
        assert_eq!(
            clock.until(t0 + chrono::Duration::seconds(5)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn same_instant_ignores_sub_millisecond_noise() {
        let a = Utc.timestamp_nanos(1_700_000_000_123_000_100);
        let b = Utc.timestamp_nanos(1_700_000_000_123_900_000);
        let c = Utc.timestamp_nanos(1_700_000_000_124_000_000);
        assert!(same_instant(a, b));
        assert!(!same_instant(a, c));
    }
}
