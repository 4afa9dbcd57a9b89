use anyhow::{Result, anyhow};
use lull_host::VirtualLoop;
use lull_scheduler::{Priority, Scheduler, SchedulerConfig};
use serde_json::json;
use std::time::Duration;

pub struct SimulateArgs {
    pub tasks: usize,
    pub busy_ms: u64,
    pub native_idle: bool,
    pub fail_every: usize,
}

pub fn run(config: SchedulerConfig, args: &SimulateArgs) -> Result<()> {
    let host = VirtualLoop::new();
    let scheduler = Scheduler::from_host(&host.capabilities(args.native_idle), config)?;
    let cost = Duration::from_millis(args.busy_ms);

    for i in 0..args.tasks {
        let priority = Priority::ALL[i % Priority::ALL.len()];
        let fails = args.fail_every > 0 && (i + 1) % args.fail_every == 0;
        let host = host.clone();
        scheduler.schedule_task(
            move || {
                host.busy_for(cost);
                if fails {
                    return Err(anyhow!("simulated failure in task {}", i));
                }
                Ok(())
            },
            priority,
        );
    }

    host.run_until_stalled();

    let report = json!({
        "provider": scheduler.provider_kind(),
        "state": scheduler.state(),
        "virtual_elapsed_ms": host.elapsed().as_millis() as u64,
        "metrics": scheduler.metrics(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
