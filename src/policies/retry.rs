//! # Delays between reload step attempts.
//!
//! When a reload replacement fails to become ready, the step is retried
//! after `first × factor^(attempt-1)`, capped at `max`, with optional jitter
//! so that several masters reloading at once do not retry in lockstep.

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Jitter {
    /// Exact delay.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2` plus uniform in `[0, delay/2]`.
    Equal,
}

impl Jitter {
    /// Applies the jitter to `delay`.
    pub fn apply(self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            Jitter::None => delay,
            Jitter::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            Jitter::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rand::rng().random_range(0..=ms - half))
            }
        }
    }
}

/// Attempt budget and delay growth for reload steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per step, including the first one (at least 1).
    pub attempts: u32,
    /// Delay after the first failed attempt.
    pub first: Duration,
    /// Growth factor per further attempt.
    pub factor: f64,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Randomization.
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    /// 3 attempts, 250ms doubling up to 5s, equal jitter.
    fn default() -> Self {
        Self {
            attempts: 3,
            first: Duration::from_millis(250),
            factor: 2.0,
            max: Duration::from_secs(5),
            jitter: Jitter::Equal,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.attempts.max(1)
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact() -> RetryPolicy {
        RetryPolicy {
            jitter: Jitter::None,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn delay_doubles_until_cap() {
        let p = exact();
        assert_eq!(p.delay(1), Duration::from_millis(250));
        assert_eq!(p.delay(2), Duration::from_millis(500));
        assert_eq!(p.delay(3), Duration::from_secs(1));
        assert_eq!(p.delay(30), Duration::from_secs(5));
    }

    #[test]
    fn attempt_budget() {
        let p = exact();
        assert!(p.allows_retry(1));
        assert!(p.allows_retry(2));
        assert!(!p.allows_retry(3));

        let single = RetryPolicy { attempts: 0, ..p };
        assert!(!single.allows_retry(1));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let d = Duration::from_millis(400);
        for _ in 0..200 {
            let full = Jitter::Full.apply(d);
            assert!(full <= d);
            let equal = Jitter::Equal.apply(d);
            assert!(equal >= Duration::from_millis(200) && equal <= d);
        }
        assert_eq!(Jitter::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
