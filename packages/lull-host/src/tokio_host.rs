use lull_scheduler::{Clock, HostCapabilities, Scheduler, TimerHost};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Clock that follows tokio's time, so paused test runtimes control budgets too.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Timer host backed by `tokio::task::spawn_local`.
///
/// Must be used from inside a `LocalSet`; slot callbacks are `!Send` like the scheduler.
/// Tokio has no notion of the loop being idle, so only the timer capability is offered
/// and the scheduler ends up on its fallback budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimerHost;

impl TokioTimerHost {
    pub fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::new()
            .with_timer(Rc::new(*self))
            .with_clock(Rc::new(TokioClock))
    }
}

impl TimerHost for TokioTimerHost {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
        tokio::task::spawn_local(async move {
            if delay.is_zero() {
                // Still let whatever else is ready on the LocalSet go first.
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            callback();
        });
    }
}

/// Resolves once the scheduler is back to Idle, polling every `poll`.
///
/// Idleness is only checked on each tick, so this can return up to `poll` after the
/// scheduler actually went idle.
pub async fn wait_until_idle(scheduler: &Scheduler, poll: Duration) {
    while !scheduler.is_idle() {
        tokio::time::sleep(poll).await;
    }
}
