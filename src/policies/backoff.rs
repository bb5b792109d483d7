//! # Backoff between registration directory retries.
//!
//! [`BackoffPolicy`] decides how long the registration handler waits before it
//! retries a directory `add`/`remove` that failed with a transient error.
//!
//! The delay for attempt `n` is `first × factor^n`, clamped to `max`, then jittered.
//! The base is derived from the attempt number alone, so a short jittered delay
//! never shrinks the following ones.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use keybus::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_millis(300),
//!     factor: 3.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(1), Duration::from_millis(150));
//! assert_eq!(backoff.next(2), Duration::from_millis(300));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
///
/// In TOML the durations are written in milliseconds:
/// ```toml
/// [retry]
/// first_ms = 100
/// max_ms = 2000
/// factor = 2.0
/// jitter = "equal"
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    #[serde(rename = "first_ms", with = "crate::serde_millis")]
    pub first: Duration,
    /// Upper bound for any single delay.
    #[serde(rename = "max_ms", with = "crate::serde_millis")]
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to each computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 2s`, `jitter = Equal`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay to wait before retry number `attempt` (0-indexed).
    ///
    /// Non-finite or negative intermediate values fall back to [`BackoffPolicy::max`].
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_default_matches_directory_retry_profile() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.first, Duration::from_millis(100));
        assert_eq!(policy.max, Duration::from_secs(2));
        assert_eq!(policy.jitter, JitterPolicy::Equal);
    }

    #[test]
    fn test_growth_is_clamped() {
        let policy = fixed(100, 1_000, 2.0);
        let delays: Vec<_> = (0..6).map(|n| policy.next(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_first_above_max_is_capped() {
        assert_eq!(fixed(5_000, 1_000, 1.0).next(0), Duration::from_secs(1));
    }

    #[test]
    fn test_overflow_falls_back_to_max() {
        assert_eq!(
            fixed(100, 10_000, 10.0).next(u32::MAX),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_equal_jitter_stays_within_upper_half() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..fixed(400, 10_000, 1.0)
        };
        for attempt in 0..32 {
            let delay = policy.next(attempt);
            assert!(delay >= Duration::from_millis(200), "{delay:?} below half");
            assert!(delay <= Duration::from_millis(400), "{delay:?} above base");
        }
    }

    #[test]
    fn test_full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..fixed(100, 30_000, 2.0)
        };
        for attempt in 0..10 {
            let base = Duration::from_millis(100 * 2u64.pow(attempt));
            assert!(policy.next(attempt) <= base);
        }
    }

    #[test]
    fn test_decorrelated_respects_floor_and_cap() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Decorrelated,
            ..fixed(100, 2_000, 2.0)
        };
        for _ in 0..64 {
            let delay = policy.next(6);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_toml_uses_milliseconds() {
        let policy: BackoffPolicy =
            toml::from_str("first_ms = 20\nmax_ms = 80\nfactor = 1.5\njitter = \"full\"\n")
                .expect("valid policy");
        assert_eq!(policy.first, Duration::from_millis(20));
        assert_eq!(policy.max, Duration::from_millis(80));
        assert_eq!(policy.jitter, JitterPolicy::Full);
    }
}
