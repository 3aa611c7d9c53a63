//! Capture cycle countdown.
//!
//! The countdown is the bookkeeping half of the capture cycle controller:
//! it is driven by a fixed one-second tick while the session is active,
//! reports the remaining seconds for display, and signals expiry. On
//! expiry it self-resets to the steady interval, so the first interval
//! (the initial grace period, giving the operator time to take position)
//! can be longer than every later one.

/// Default initial grace period before the first capture, in seconds.
pub const DEFAULT_INITIAL_GRACE_SECS: u32 = 20;

/// Default steady-state capture interval, in seconds.
pub const DEFAULT_STEADY_SECS: u32 = 10;

/// Default remaining-seconds threshold at or below which the display
/// switches to its urgent presentation.
pub const DEFAULT_URGENCY_THRESHOLD_SECS: u32 = 3;

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Still counting down.
    Running {
        /// Seconds left until the next capture.
        remaining: u32,
        /// Whether the display should use its urgent presentation.
        urgent: bool,
    },
    /// The interval elapsed; take one capture sample. The countdown has
    /// already been reset to the steady interval.
    Expired,
}

/// Countdown over capture intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    steady_secs: u32,
    urgency_threshold_secs: u32,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(
            DEFAULT_INITIAL_GRACE_SECS,
            DEFAULT_STEADY_SECS,
            DEFAULT_URGENCY_THRESHOLD_SECS,
        )
    }
}

impl Countdown {
    /// Creates a countdown whose first interval is `initial_grace_secs`
    /// and every later interval `steady_secs`.
    #[must_use]
    pub const fn new(initial_grace_secs: u32, steady_secs: u32, urgency_threshold_secs: u32) -> Self {
        Self {
            remaining: initial_grace_secs,
            steady_secs,
            urgency_threshold_secs,
        }
    }

    /// Seconds left in the current interval.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advances the countdown by one second.
    ///
    /// Counts through zero before expiring, so an interval of `n`
    /// seconds displays `n-1, n-2, .., 0` and expires on the following
    /// tick.
    pub fn tick(&mut self) -> CountdownTick {
        if self.remaining == 0 {
            self.remaining = self.steady_secs;
            return CountdownTick::Expired;
        }
        self.remaining -= 1;
        CountdownTick::Running {
            remaining: self.remaining,
            urgent: self.remaining <= self.urgency_threshold_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_through_zero_then_expires() {
        let mut cd = Countdown::new(2, 10, 3);
        assert_eq!(
            cd.tick(),
            CountdownTick::Running {
                remaining: 1,
                urgent: true
            }
        );
        assert_eq!(
            cd.tick(),
            CountdownTick::Running {
                remaining: 0,
                urgent: true
            }
        );
        assert_eq!(cd.tick(), CountdownTick::Expired);
    }

    #[test]
    fn resets_to_steady_interval_after_expiry() {
        let mut cd = Countdown::new(1, 4, 3);
        cd.tick();
        assert_eq!(cd.tick(), CountdownTick::Expired);
        assert_eq!(cd.remaining(), 4);
        // The steady interval now governs every later cycle.
        for expected in (0..4).rev() {
            match cd.tick() {
                CountdownTick::Running { remaining, .. } => assert_eq!(remaining, expected),
                CountdownTick::Expired => panic!("expired early"),
            }
        }
        assert_eq!(cd.tick(), CountdownTick::Expired);
    }

    #[test]
    fn urgency_flips_at_threshold() {
        let mut cd = Countdown::new(5, 5, 3);
        let mut seen = Vec::new();
        for _ in 0..5 {
            match cd.tick() {
                CountdownTick::Running { remaining, urgent } => seen.push((remaining, urgent)),
                CountdownTick::Expired => panic!("expired early"),
            }
        }
        assert_eq!(seen, vec![(4, false), (3, true), (2, true), (1, true), (0, true)]);
    }

    #[test]
    fn grace_period_is_used_exactly_once() {
        let mut cd = Countdown::new(20, 10, 3);
        let mut ticks_to_first = 0;
        loop {
            ticks_to_first += 1;
            if cd.tick() == CountdownTick::Expired {
                break;
            }
        }
        assert_eq!(ticks_to_first, 21);

        let mut ticks_to_second = 0;
        loop {
            ticks_to_second += 1;
            if cd.tick() == CountdownTick::Expired {
                break;
            }
        }
        assert_eq!(ticks_to_second, 11);
    }
}
