// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Continuous-failure tracking
//!
//! Separates "temporarily degraded" (tolerated, retried next tick) from
//! "degraded long enough to be fatal". The trip condition is counted in
//! elapsed time since the last success, not in failure count: an isolated
//! error after a long healthy run never trips, while a burst of retried
//! failures does not reset the clock. Only an actual success does.

use std::time::{Duration, Instant};

/// Tracks how long a monitor has gone without a successful poll and trips
/// once that exceeds a threshold. Once tripped, a tracker stays tripped
/// for its lifetime; a later success advances `last_success` but never
/// clears the trip.
#[derive(Debug)]
pub struct FailureTracker {
    last_success: Instant,
    threshold: Duration,
    tripped: bool,
}

impl FailureTracker {
    /// Creates a tracker that trips after continuous failure for
    /// `threshold`. Creation time is the baseline, so a monitor that
    /// only ever fails trips `threshold` after construction.
    pub fn new(threshold: Duration) -> Self {
        Self {
            last_success: Instant::now(),
            threshold,
            tripped: false,
        }
    }

    /// Records a successful poll.
    pub fn success(&mut self) {
        self.success_at(Instant::now());
    }

    /// Records a failed poll, tripping the tracker if the continuous
    /// failure duration has been exceeded.
    pub fn failure(&mut self) {
        self.failure_at(Instant::now());
    }

    /// Whether the owning loop should terminate.
    pub fn should_exit(&self) -> bool {
        self.tripped
    }

    /// Time of the most recent success (or creation), for diagnostics.
    pub fn last_success(&self) -> Instant {
        self.last_success
    }

    /// `success` with an injected clock. Used directly by tests.
    pub fn success_at(&mut self, now: Instant) {
        self.last_success = now;
    }

    /// `failure` with an injected clock. Used directly by tests.
    pub fn failure_at(&mut self, now: Instant) {
        if now.duration_since(self.last_success) > self.threshold {
            self.tripped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn failure_within_threshold_does_not_trip() {
        let mut tracker = FailureTracker::new(5 * MINUTE);
        let t0 = tracker.last_success();

        tracker.failure_at(t0 + MINUTE);
        assert!(!tracker.should_exit());
    }

    #[test]
    fn sustained_failure_trips() {
        // threshold=5m, created at t0; failure at t0+1m -> ok;
        // failure at t0+6m with no intervening success -> tripped.
        let mut tracker = FailureTracker::new(5 * MINUTE);
        let t0 = tracker.last_success();

        tracker.failure_at(t0 + MINUTE);
        assert!(!tracker.should_exit());

        tracker.failure_at(t0 + 6 * MINUTE);
        assert!(tracker.should_exit());
    }

    #[test]
    fn success_resets_the_clock() {
        let mut tracker = FailureTracker::new(5 * MINUTE);
        let t0 = tracker.last_success();

        tracker.success_at(t0 + 4 * MINUTE);
        tracker.failure_at(t0 + 8 * MINUTE);
        assert!(!tracker.should_exit());

        tracker.failure_at(t0 + 10 * MINUTE);
        assert!(tracker.should_exit());
    }

    #[test]
    fn trip_is_terminal() {
        let mut tracker = FailureTracker::new(MINUTE);
        let t0 = tracker.last_success();

        tracker.failure_at(t0 + 2 * MINUTE);
        assert!(tracker.should_exit());

        // A late success advances last_success but never untrips.
        tracker.success_at(t0 + 3 * MINUTE);
        assert!(tracker.should_exit());
        assert_eq!(tracker.last_success(), t0 + 3 * MINUTE);
    }

    #[test]
    fn trips_from_creation_without_any_success() {
        let mut tracker = FailureTracker::new(Duration::ZERO);
        let t0 = tracker.last_success();

        tracker.failure_at(t0 + Duration::from_millis(1));
        assert!(tracker.should_exit());
    }
}
