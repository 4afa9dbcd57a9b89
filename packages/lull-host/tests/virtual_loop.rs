use lull_host::VirtualLoop;
use lull_scheduler::{Priority, ProviderKind, Scheduler, SchedulerConfig, TimerHost};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

type Log = Rc<RefCell<Vec<String>>>;

fn scheduler_on(host: &VirtualLoop, native_idle: bool) -> Scheduler {
    Scheduler::from_host(&host.capabilities(native_idle), SchedulerConfig::default()).unwrap()
}

/// Host callback or task body that appends `entry` to `log`.
fn push(log: &Log, entry: &'static str) -> impl FnOnce() + use<> {
    let log = log.clone();
    move || log.borrow_mut().push(entry.to_string())
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Schedules `count` tasks that each keep the host busy for `cost`.
fn schedule_busy(
    scheduler: &Scheduler,
    host: &VirtualLoop,
    log: &Log,
    count: usize,
    cost: Duration,
) {
    for i in 1..=count {
        let host = host.clone();
        let log = log.clone();
        scheduler.schedule_task(
            move || {
                host.busy_for(cost);
                log.borrow_mut().push(format!("t{}", i));
            },
            Priority::Low,
        );
    }
}

#[test]
fn test_native_idle_slots_split_work() {
    let host = VirtualLoop::new();
    let scheduler = scheduler_on(&host, true);
    assert_eq!(scheduler.provider_kind(), ProviderKind::NativeIdle);

    let log: Log = Default::default();
    schedule_busy(&scheduler, &host, &log, 10, ms(5));
    host.run_until_stalled();

    assert_eq!(log.borrow().len(), 10);
    assert!(scheduler.is_idle());
    // 16ms frames, 5ms tasks: four tasks fit per frame, the last frame takes two.
    let metrics = scheduler.metrics();
    assert_eq!(metrics.slots_granted, 3);
    assert_eq!(metrics.slots_requested, 3);
    assert_eq!(host.elapsed(), ms(50));
}

#[test]
fn test_timer_fallback_uses_fifty_ms_budget() {
    let host = VirtualLoop::new();
    let scheduler = scheduler_on(&host, false);
    assert_eq!(scheduler.provider_kind(), ProviderKind::TimerFallback);

    let log: Log = Default::default();
    schedule_busy(&scheduler, &host, &log, 5, ms(20));

    // One timer wake-up fits tasks starting at 0, 20 and 40ms.
    assert!(host.turn());
    assert_eq!(*log.borrow(), vec!["t1", "t2", "t3"]);
    assert_eq!(host.pending_timers(), 1);

    host.run_until_stalled();
    assert_eq!(*log.borrow(), vec!["t1", "t2", "t3", "t4", "t5"]);
    assert_eq!(scheduler.metrics().slots_granted, 2);
    assert_eq!(host.pending_timers(), 0);
}

#[test]
fn test_fallback_delay_postpones_first_slot() {
    let host = VirtualLoop::new();
    let config = SchedulerConfig {
        fallback_delay_ms: 10,
        prefer_native: false,
        ..Default::default()
    };
    let scheduler = Scheduler::from_host(&host.capabilities(true), config).unwrap();
    let log: Log = Default::default();
    schedule_busy(&scheduler, &host, &log, 1, ms(1));

    host.settle();
    assert!(log.borrow().is_empty());

    host.advance(ms(9));
    assert!(log.borrow().is_empty());

    host.advance(ms(1));
    assert_eq!(*log.borrow(), vec!["t1"]);
}

#[test]
fn test_clear_before_slot_then_advance_runs_nothing() {
    let host = VirtualLoop::new();
    let scheduler = scheduler_on(&host, false);
    let log: Log = Default::default();
    schedule_busy(&scheduler, &host, &log, 3, ms(1));

    assert_eq!(scheduler.clear_tasks(), 3);
    host.advance(ms(100));

    assert!(log.borrow().is_empty());
    assert!(scheduler.is_idle());
    let metrics = scheduler.metrics();
    assert_eq!(metrics.total_tasks_executed, 0);
    assert_eq!(metrics.tasks_cleared, 3);
}

#[test]
fn test_host_work_runs_before_background_work() {
    let host = VirtualLoop::new();
    let scheduler = scheduler_on(&host, true);
    let log: Log = Default::default();

    // Background fetch queued first, primary render posted right after.
    scheduler.schedule_task(push(&log, "history"), Priority::Low);
    host.set_timeout(Duration::ZERO, Box::new(push(&log, "render")));

    host.settle();
    assert_eq!(*log.borrow(), vec!["render", "history"]);
}

#[test]
fn test_idle_budget_yields_to_next_timer() {
    let host = VirtualLoop::new();
    let scheduler = scheduler_on(&host, true);
    let log: Log = Default::default();

    host.set_timeout(ms(4), Box::new(push(&log, "frame")));
    schedule_busy(&scheduler, &host, &log, 5, ms(3));

    host.settle();
    // The first idle period ends when the 4ms frame timer is due.
    assert_eq!(*log.borrow(), vec!["t1", "t2", "frame", "t3", "t4", "t5"]);
    assert!(scheduler.is_idle());
}

#[test]
fn test_tasks_scheduled_by_tasks_share_the_chain() {
    let host = VirtualLoop::new();
    let scheduler = scheduler_on(&host, true);
    let log: Log = Default::default();

    {
        let sch = scheduler.clone();
        let log = log.clone();
        scheduler.schedule(move || {
            log.borrow_mut().push("parent".to_string());
            sch.schedule_task(push(&log, "child"), Priority::High);
        });
    }

    host.run_until_stalled();
    assert_eq!(*log.borrow(), vec!["parent", "child"]);
    assert_eq!(scheduler.metrics().slots_requested, 1);
}
