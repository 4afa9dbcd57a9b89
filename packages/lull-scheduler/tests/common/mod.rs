#![allow(dead_code)]

use lull_scheduler::{Budget, IdleSlotProvider, ProviderKind, SlotCallback};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Provider that holds slot registrations until the test fires them.
#[derive(Clone, Default)]
pub struct FakeProvider {
    pending: Rc<RefCell<Vec<SlotCallback>>>,
    requests: Rc<Cell<usize>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrations that have not fired yet.
    pub fn outstanding(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Total registrations ever made.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    /// Fires the oldest registration with `budget`. Returns false if none was pending.
    pub fn fire(&self, budget: &dyn Budget) -> bool {
        let callback = {
            let mut pending = self.pending.borrow_mut();
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        };
        match callback {
            Some(callback) => {
                callback(budget);
                true
            }
            None => false,
        }
    }
}

impl IdleSlotProvider for FakeProvider {
    fn request_idle_slot(&self, callback: SlotCallback) {
        self.requests.set(self.requests.get() + 1);
        self.pending.borrow_mut().push(callback);
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::NativeIdle
    }
}

/// Reports time left for the first `polls` checks, then nothing.
/// The scheduler checks once before each task, so this allows exactly `polls` tasks.
pub struct PollBudget {
    polls: Cell<usize>,
}

impl PollBudget {
    pub fn new(polls: usize) -> Self {
        Self {
            polls: Cell::new(polls),
        }
    }
}

impl Budget for PollBudget {
    fn time_remaining(&self) -> Duration {
        match self.polls.get() {
            0 => Duration::ZERO,
            n => {
                self.polls.set(n - 1);
                Duration::from_millis(1)
            }
        }
    }
}

pub type Log = Rc<RefCell<Vec<&'static str>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Task body that appends `name` to `log`.
pub fn record(log: &Log, name: &'static str) -> impl FnOnce() + use<> {
    let log = log.clone();
    move || log.borrow_mut().push(name)
}
