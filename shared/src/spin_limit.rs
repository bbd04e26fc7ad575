use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SPIN_WINDOW: Duration = Duration::from_secs(23 * 3600);
pub const MAX_SPINS_PER_WINDOW: u32 = 3;

pub const SPIN_LIMIT_ERROR: &str = "You're out of spins for now. Come back after your window resets.";
pub const SPIN_IN_PROGRESS_ERROR: &str = "A spin is already in progress.";

/// Per-user spin allowance over a rolling 23-hour window.
///
/// The window is never reset by a timer: expiry is detected lazily the next
/// time the session is consulted. Timestamps are unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSession {
    pub spin_count: u32,
    pub window_start: Option<i64>,
}

impl SpinSession {
    fn window_expired(&self, now: i64) -> bool {
        match self.window_start {
            Some(start) => now - start >= SPIN_WINDOW.as_secs() as i64,
            None => true,
        }
    }

    pub fn can_spin(&self, now: i64) -> bool {
        self.window_expired(now) || self.spin_count < MAX_SPINS_PER_WINDOW
    }

    /// Returns the session after one more spin. The caller is responsible for
    /// checking `can_spin` first and for persisting the result.
    pub fn record_spin(&self, now: i64) -> SpinSession {
        if self.window_expired(now) {
            SpinSession {
                spin_count: 1,
                window_start: Some(now),
            }
        } else {
            SpinSession {
                spin_count: (self.spin_count + 1).min(MAX_SPINS_PER_WINDOW),
                window_start: self.window_start,
            }
        }
    }

    pub fn remaining(&self, now: i64) -> u32 {
        if self.window_expired(now) {
            MAX_SPINS_PER_WINDOW
        } else {
            MAX_SPINS_PER_WINDOW.saturating_sub(self.spin_count)
        }
    }

    /// Seconds until the active window expires, or `None` when no window is
    /// running (or it has already lapsed).
    pub fn window_reset_in(&self, now: i64) -> Option<u64> {
        let start = self.window_start?;
        let end = start + SPIN_WINDOW.as_secs() as i64;
        if now >= end {
            None
        } else {
            Some((end - now) as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    #[test]
    fn test_fresh_session_counts_up_then_locks() {
        let session = SpinSession::default();
        assert!(session.can_spin(T0));

        let first = session.record_spin(T0);
        assert_eq!(first.spin_count, 1);
        assert_eq!(first.window_start, Some(T0));

        let second = first.record_spin(T0 + 60);
        let third = second.record_spin(T0 + 120);
        assert_eq!(second.spin_count, 2);
        assert_eq!(third.spin_count, 3);
        assert!(!third.can_spin(T0 + 180));
        assert_eq!(third.remaining(T0 + 180), 0);
    }

    #[test]
    fn test_window_keeps_original_start() {
        let session = SpinSession::default().record_spin(T0).record_spin(T0 + 3600);
        assert_eq!(session.window_start, Some(T0));
    }

    #[test]
    fn test_expired_window_allows_spins_again() {
        let exhausted = SpinSession {
            spin_count: MAX_SPINS_PER_WINDOW,
            window_start: Some(T0),
        };
        let later = T0 + SPIN_WINDOW.as_secs() as i64;
        assert!(exhausted.can_spin(later));
        assert_eq!(exhausted.remaining(later), MAX_SPINS_PER_WINDOW);

        let fresh = exhausted.record_spin(later);
        assert_eq!(fresh.spin_count, 1);
        assert_eq!(fresh.window_start, Some(later));
    }

    #[test]
    fn test_count_never_exceeds_max() {
        let mut session = SpinSession::default();
        for k in 0..10 {
            session = session.record_spin(T0 + k);
        }
        assert_eq!(session.spin_count, MAX_SPINS_PER_WINDOW);
    }

    #[test]
    fn test_window_reset_countdown() {
        let session = SpinSession::default().record_spin(T0);
        assert_eq!(session.window_reset_in(T0 + 3600), Some(SPIN_WINDOW.as_secs() - 3600));
        assert_eq!(session.window_reset_in(T0 + SPIN_WINDOW.as_secs() as i64), None);
        assert_eq!(SpinSession::default().window_reset_in(T0), None);
    }
}
