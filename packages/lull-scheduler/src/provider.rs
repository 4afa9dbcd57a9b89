use crate::budget::{Budget, DeadlineBudget};
use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// One-shot callback invoked with the budget of a granted idle slot.
pub type SlotCallback = Box<dyn FnOnce(&dyn Budget)>;

/// Source of idle slots. The scheduler registers at most one callback at a time
/// and re-arms after each slot, so implementations never need to queue more than one.
pub trait IdleSlotProvider {
    /// Arrange for `callback` to run exactly once, when the host has spare time.
    fn request_idle_slot(&self, callback: SlotCallback);

    fn kind(&self) -> ProviderKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    NativeIdle,
    TimerFallback,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::NativeIdle => f.write_str("native-idle"),
            ProviderKind::TimerFallback => f.write_str("timer-fallback"),
        }
    }
}

/// A host that knows when it is idle and can say how long the idle period lasts.
pub trait IdleHost {
    fn request_idle_callback(&self, callback: SlotCallback);
}

/// A host that can run a callback after a delay.
pub trait TimerHost {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>);
}

/// What a host offers. Platform adapters fill this in; `HostSlotProvider::probe` reads it.
#[derive(Clone, Default)]
pub struct HostCapabilities {
    pub idle: Option<Rc<dyn IdleHost>>,
    pub timer: Option<Rc<dyn TimerHost>>,
    /// Clock used for fallback budgets and task timing. Defaults to `SystemClock`.
    pub clock: Option<Rc<dyn Clock>>,
}

impl HostCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle(mut self, host: Rc<dyn IdleHost>) -> Self {
        self.idle = Some(host);
        self
    }

    pub fn with_timer(mut self, host: Rc<dyn TimerHost>) -> Self {
        self.timer = Some(host);
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.clock.clone().unwrap_or_else(|| Rc::new(SystemClock))
    }
}

impl fmt::Debug for HostCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCapabilities")
            .field("idle", &self.idle.is_some())
            .field("timer", &self.timer.is_some())
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

/// The two production providers. Picked once by `probe` and fixed afterwards.
pub enum HostSlotProvider {
    Native {
        host: Rc<dyn IdleHost>,
    },
    TimerFallback {
        timer: Rc<dyn TimerHost>,
        clock: Rc<dyn Clock>,
        delay: Duration,
        budget: Duration,
    },
}

impl HostSlotProvider {
    pub fn probe(
        capabilities: &HostCapabilities,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let native = capabilities.idle.clone();
        let provider = match (native, capabilities.timer.clone()) {
            (Some(host), _) if config.prefer_native => Self::Native { host },
            (_, Some(timer)) => Self::TimerFallback {
                timer,
                clock: capabilities.clock(),
                delay: config.fallback_delay(),
                budget: config.fallback_budget(),
            },
            // Fallback was preferred but the host has no timers; native still beats nothing.
            (Some(host), None) => Self::Native { host },
            (None, None) => return Err(SchedulerError::ProviderUnavailable),
        };

        tracing::info!(provider = %provider.kind(), "Idle slot provider selected");
        Ok(provider)
    }
}

impl IdleSlotProvider for HostSlotProvider {
    fn request_idle_slot(&self, callback: SlotCallback) {
        match self {
            Self::Native { host } => host.request_idle_callback(callback),
            Self::TimerFallback {
                timer,
                clock,
                delay,
                budget,
            } => {
                let clock = clock.clone();
                let allowance = *budget;
                timer.set_timeout(
                    *delay,
                    Box::new(move || {
                        // The allowance starts counting at wake-up, not at request time.
                        let budget = DeadlineBudget::new(clock, allowance);
                        callback(&budget);
                    }),
                );
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        match self {
            Self::Native { .. } => ProviderKind::NativeIdle,
            Self::TimerFallback { .. } => ProviderKind::TimerFallback,
        }
    }
}

impl fmt::Debug for HostSlotProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native { .. } => f.debug_struct("Native").finish_non_exhaustive(),
            Self::TimerFallback { delay, budget, .. } => f
                .debug_struct("TimerFallback")
                .field("delay", delay)
                .field("budget", budget)
                .finish_non_exhaustive(),
        }
    }
}
