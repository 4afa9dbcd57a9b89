use crate::clock::Clock;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Remaining-time estimate for one idle slot. Read-only; the scheduler only polls it.
pub trait Budget {
    /// `Duration::ZERO` means the slot is used up.
    fn time_remaining(&self) -> Duration;

    fn is_exhausted(&self) -> bool {
        self.time_remaining().is_zero()
    }
}

/// Budget that runs out at a fixed instant on the given clock.
pub struct DeadlineBudget {
    deadline: Instant,
    clock: Rc<dyn Clock>,
}

impl DeadlineBudget {
    pub fn new(clock: Rc<dyn Clock>, allowance: Duration) -> Self {
        let deadline = clock.now() + allowance;
        Self { deadline, clock }
    }

    pub fn with_deadline(clock: Rc<dyn Clock>, deadline: Instant) -> Self {
        Self { deadline, clock }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Budget for DeadlineBudget {
    fn time_remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(self.clock.now())
    }
}

/// Budget that always reports the same amount of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBudget(pub Duration);

impl Budget for FixedBudget {
    fn time_remaining(&self) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_deadline_budget_counts_down() {
        let clock = Rc::new(ManualClock::new());
        let budget = DeadlineBudget::new(clock.clone(), Duration::from_millis(50));
        assert_eq!(budget.time_remaining(), Duration::from_millis(50));

        clock.advance(Duration::from_millis(30));
        assert_eq!(budget.time_remaining(), Duration::from_millis(20));
        assert!(!budget.is_exhausted());

        clock.advance(Duration::from_millis(30));
        assert_eq!(budget.time_remaining(), Duration::ZERO);
        assert!(budget.is_exhausted());
    }
}
