mod common;

use common::{FakeProvider, log, record};
use lull_scheduler::{FixedBudget, Priority, QueueDiscipline, Scheduler, SchedulerConfig};
use std::time::Duration;

const PLENTY: FixedBudget = FixedBudget(Duration::from_millis(50));

fn scheduler_with(config: SchedulerConfig) -> (Scheduler, FakeProvider) {
    let provider = FakeProvider::new();
    let scheduler = Scheduler::new(provider.clone(), config).unwrap();
    (scheduler, provider)
}

#[test]
fn test_same_priority_runs_in_enqueue_order() {
    let (scheduler, provider) = scheduler_with(SchedulerConfig::default());
    let log = log();

    scheduler.schedule(record(&log, "a"));
    scheduler.schedule(record(&log, "b"));
    scheduler.schedule(record(&log, "c"));

    assert!(provider.fire(&PLENTY));
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn test_high_priority_overtakes_pending_low() {
    let (scheduler, provider) = scheduler_with(SchedulerConfig::default());
    let log = log();

    scheduler.schedule_task(record(&log, "low"), Priority::Low);
    scheduler.schedule_task(record(&log, "high"), Priority::High);

    provider.fire(&PLENTY);
    assert_eq!(*log.borrow(), vec!["high", "low"]);
}

#[test]
fn test_mixed_priorities_single_slot() {
    // T1(low), T2(high), T3(low) with room for all three.
    let (scheduler, provider) = scheduler_with(SchedulerConfig::default());
    let log = log();

    scheduler.schedule_task(record(&log, "t1"), Priority::Low);
    scheduler.schedule_task(record(&log, "t2"), Priority::High);
    scheduler.schedule_task(record(&log, "t3"), Priority::Low);

    provider.fire(&PLENTY);
    assert_eq!(*log.borrow(), vec!["t2", "t1", "t3"]);
    assert!(scheduler.is_idle());
}

#[test]
fn test_all_tiers_drain_high_normal_low() {
    let (scheduler, provider) = scheduler_with(SchedulerConfig::default());
    let log = log();

    scheduler.schedule_task(record(&log, "low"), Priority::Low);
    scheduler.schedule_task(record(&log, "normal"), Priority::Normal);
    scheduler.schedule_task(record(&log, "high"), Priority::High);
    scheduler.schedule_task(record(&log, "normal-2"), Priority::Normal);

    provider.fire(&PLENTY);
    assert_eq!(*log.borrow(), vec!["high", "normal", "normal-2", "low"]);
}

#[test]
fn test_fifo_discipline_keeps_arrival_order() {
    let (scheduler, provider) = scheduler_with(SchedulerConfig {
        discipline: QueueDiscipline::Fifo,
        ..Default::default()
    });
    let log = log();

    scheduler.schedule_task(record(&log, "t1"), Priority::Low);
    scheduler.schedule_task(record(&log, "t2"), Priority::High);
    scheduler.schedule_task(record(&log, "t3"), Priority::Low);

    provider.fire(&PLENTY);
    assert_eq!(*log.borrow(), vec!["t1", "t2", "t3"]);
}

#[test]
fn test_priority_does_not_interrupt_running_task() {
    // A high task scheduled from inside a running low task waits for it to finish.
    let (scheduler, provider) = scheduler_with(SchedulerConfig::default());
    let log = log();

    {
        let log = log.clone();
        let sch = scheduler.clone();
        scheduler.schedule_task(
            move || {
                log.borrow_mut().push("low:start");
                sch.schedule_task(record(&log, "high"), Priority::High);
                log.borrow_mut().push("low:end");
            },
            Priority::Low,
        );
    }
    scheduler.schedule_task(record(&log, "low-2"), Priority::Low);

    provider.fire(&PLENTY);
    assert_eq!(
        *log.borrow(),
        vec!["low:start", "low:end", "high", "low-2"]
    );
}
