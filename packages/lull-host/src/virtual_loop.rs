use lull_scheduler::{
    Clock, DeadlineBudget, HostCapabilities, IdleHost, ManualClock, SlotCallback, TimerHost,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

// Guards against work that keeps rescheduling itself at the same instant.
const MAX_TURNS: usize = 100_000;

type TimerCallback = Box<dyn FnOnce()>;

struct LoopInner {
    clock: Rc<ManualClock>,
    // Keyed by (due, registration order) so equal deadlines fire in the order they were set.
    timers: RefCell<BTreeMap<(Instant, u64), TimerCallback>>,
    idle: RefCell<VecDeque<SlotCallback>>,
    next_seq: Cell<u64>,
    idle_period: Duration,
}

/// Deterministic single-threaded host loop running on a manual clock.
///
/// Each turn runs the timers that are due, then hands every queued idle callback a
/// budget lasting one idle period (cut short by the next pending timer, since the
/// host has to get back to that). Time only moves through `advance`,
/// `run_until_stalled`, or work calling `busy_for`.
#[derive(Clone)]
pub struct VirtualLoop {
    inner: Rc<LoopInner>,
}

impl VirtualLoop {
    /// One 60 Hz frame.
    pub const DEFAULT_IDLE_PERIOD: Duration = Duration::from_millis(16);

    pub fn new() -> Self {
        Self::with_idle_period(Self::DEFAULT_IDLE_PERIOD)
    }

    pub fn with_idle_period(idle_period: Duration) -> Self {
        Self {
            inner: Rc::new(LoopInner {
                clock: Rc::new(ManualClock::new()),
                timers: RefCell::new(BTreeMap::new()),
                idle: RefCell::new(VecDeque::new()),
                next_seq: Cell::new(0),
                idle_period,
            }),
        }
    }

    pub fn clock(&self) -> Rc<ManualClock> {
        self.inner.clock.clone()
    }

    /// Virtual time since the loop was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.clock.elapsed()
    }

    /// What this host offers to the scheduler probe. Timers are always available;
    /// native idle callbacks only when `native_idle` is set.
    pub fn capabilities(&self, native_idle: bool) -> HostCapabilities {
        let caps = HostCapabilities::new()
            .with_timer(Rc::new(self.clone()))
            .with_clock(self.inner.clock.clone());
        if native_idle {
            caps.with_idle(Rc::new(self.clone()))
        } else {
            caps
        }
    }

    /// Simulates synchronous work taking `duration`.
    pub fn busy_for(&self, duration: Duration) {
        self.inner.clock.advance(duration);
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    pub fn pending_idle_callbacks(&self) -> usize {
        self.inner.idle.borrow().len()
    }

    /// Runs one loop iteration at the current instant. Returns whether anything ran.
    pub fn turn(&self) -> bool {
        let timers = self.run_due_timers();
        let idle = self.run_idle_callbacks();
        timers + idle > 0
    }

    /// Keeps turning at the current instant until nothing is left to run right now.
    /// Returns the number of turns that did work.
    pub fn settle(&self) -> usize {
        let mut turns = 0;
        while self.turn() {
            turns += 1;
            if turns >= MAX_TURNS {
                tracing::warn!(turns, "Virtual loop did not settle, giving up");
                break;
            }
        }
        turns
    }

    /// Moves time forward by `by`, firing timers at their due instants along the way.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.clock.now() + by;
        loop {
            self.settle();
            match self.next_timer_due() {
                Some(due) if due <= target => self.inner.clock.advance_to(due),
                _ => {
                    self.inner.clock.advance_to(target);
                    self.settle();
                    break;
                }
            }
        }
    }

    /// Runs until there is neither pending idle work nor any timer left.
    pub fn run_until_stalled(&self) {
        let mut jumps = 0;
        loop {
            self.settle();
            match self.next_timer_due() {
                Some(due) => self.inner.clock.advance_to(due),
                None => break,
            }
            jumps += 1;
            if jumps >= MAX_TURNS {
                tracing::warn!(jumps, "Virtual loop keeps producing timers, giving up");
                break;
            }
        }
    }

    fn next_timer_due(&self) -> Option<Instant> {
        self.inner
            .timers
            .borrow()
            .keys()
            .next()
            .map(|&(due, _)| due)
    }

    fn run_due_timers(&self) -> usize {
        let now = self.inner.clock.now();
        let due: Vec<TimerCallback> = {
            let mut timers = self.inner.timers.borrow_mut();
            let later = timers.split_off(&(now, u64::MAX));
            std::mem::replace(&mut *timers, later)
                .into_values()
                .collect()
        };

        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }

    fn run_idle_callbacks(&self) -> usize {
        // Callbacks registered while these run wait for the next turn.
        let callbacks: Vec<SlotCallback> = self.inner.idle.borrow_mut().drain(..).collect();
        if callbacks.is_empty() {
            return 0;
        }

        let now = self.inner.clock.now();
        let mut deadline = now + self.inner.idle_period;
        if let Some(due) = self.next_timer_due() {
            deadline = deadline.min(due.max(now));
        }
        let budget = DeadlineBudget::with_deadline(self.inner.clock.clone(), deadline);

        tracing::trace!(
            callbacks = callbacks.len(),
            budget_ms = (deadline - now).as_secs_f64() * 1000.0,
            "Virtual loop idle period"
        );

        let count = callbacks.len();
        for callback in callbacks {
            callback(&budget);
        }
        count
    }
}

impl Default for VirtualLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleHost for VirtualLoop {
    fn request_idle_callback(&self, callback: SlotCallback) {
        self.inner.idle.borrow_mut().push_back(callback);
    }
}

impl TimerHost for VirtualLoop {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
        let due = self.inner.clock.now() + delay;
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);
        self.inner.timers.borrow_mut().insert((due, seq), callback);
    }
}
