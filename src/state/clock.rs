use std::time::Duration;

use tokio::time::Instant;

/// Deadline tracker for the current phase of a room.
///
/// A clock is either timed (holds an absolute expiry instant) or untimed
/// (`lobby`, `minigame` and `end_game` have no deadline). The untimed case is
/// an explicit `None` rather than a zero: the original behaviour of reporting
/// `0` seconds for untimed phases let callers confuse "no deadline" with
/// "expired".
#[derive(Debug, Clone, Default)]
pub struct PhaseClock {
    deadline: Option<Instant>,
}

impl PhaseClock {
    /// Create a clock with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the clock so it expires `duration` from now.
    pub fn start_timed(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
    }

    /// Clear the deadline for an untimed phase.
    pub fn start_untimed(&mut self) {
        self.deadline = None;
    }

    /// Rewrite the deadline to `duration` from now, regardless of how much
    /// time was left. Used when a skip vote cuts the performance short.
    pub fn force_expire_in(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
    }

    /// Whole seconds left before expiry, or `None` when the clock is untimed.
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.deadline
            .map(|at| at.saturating_duration_since(Instant::now()).as_secs())
    }

    /// True iff a deadline is set and it has passed.
    pub fn is_expired(&self) -> bool {
        match self.deadline {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// The absolute expiry instant, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timed_clock_counts_down_and_expires() {
        let mut clock = PhaseClock::new();
        clock.start_timed(Duration::from_secs(10));

        assert_eq!(clock.remaining_seconds(), Some(10));
        assert!(!clock.is_expired());

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(clock.remaining_seconds(), Some(6));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(clock.is_expired());
        assert_eq!(clock.remaining_seconds(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn untimed_clock_never_expires() {
        let mut clock = PhaseClock::new();
        clock.start_untimed();

        assert_eq!(clock.remaining_seconds(), None);
        assert!(!clock.is_expired());

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!clock.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn force_expire_shortens_the_deadline() {
        let mut clock = PhaseClock::new();
        clock.start_timed(Duration::from_secs(60));

        clock.force_expire_in(Duration::from_secs(5));
        assert_eq!(clock.remaining_seconds(), Some(5));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(clock.is_expired());
    }
}
