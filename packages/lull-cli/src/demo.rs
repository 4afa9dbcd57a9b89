use anyhow::{Result, anyhow};
use lull_host::{TokioTimerHost, wait_until_idle};
use lull_scheduler::{Priority, Scheduler, SchedulerConfig};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

pub struct DemoArgs {
    pub history_points: usize,
    pub fail: bool,
}

#[derive(Debug, Clone, Copy)]
struct Reading {
    aqi: u32,
}

enum History {
    Loading,
    Ready(Vec<Reading>),
    Unavailable,
}

// Stand-in for the remote history service.
fn fetch_history(points: usize, fail: bool) -> Result<Vec<Reading>> {
    if fail {
        return Err(anyhow!("history service unreachable"));
    }
    Ok((0..points)
        .map(|day| Reading {
            aqi: 30 + ((day as u32 * 17) % 40),
        })
        .collect())
}

pub async fn run(config: SchedulerConfig, args: DemoArgs) -> Result<()> {
    let local = LocalSet::new();
    local
        .run_until(async move {
            let scheduler = Scheduler::from_host(&TokioTimerHost.capabilities(), config)?;
            tracing::info!(provider = %scheduler.provider_kind(), "Scheduler ready");

            // Primary path: shown right away, never waits on background work.
            let current = Reading { aqi: 42 };
            println!("Current AQI: {}", current.aqi);

            let location = Rc::new(RefCell::new(None::<String>));
            let history = Rc::new(RefCell::new(History::Loading));

            {
                let location = location.clone();
                scheduler.schedule_task(
                    move || {
                        *location.borrow_mut() = Some("Lisbon, PT".to_string());
                    },
                    Priority::High,
                );
            }
            {
                let history = history.clone();
                let DemoArgs {
                    history_points,
                    fail,
                } = args;
                scheduler.schedule_task(
                    move || match fetch_history(history_points, fail) {
                        Ok(points) => {
                            *history.borrow_mut() = History::Ready(points);
                            Ok(())
                        }
                        Err(err) => {
                            *history.borrow_mut() = History::Unavailable;
                            Err(err.context("Failed to fetch historical data"))
                        }
                    },
                    Priority::Low,
                );
            }

            if matches!(*history.borrow(), History::Loading) {
                println!("History: loading...");
            }

            wait_until_idle(&scheduler, Duration::from_millis(5)).await;

            if let Some(location) = location.borrow().as_deref() {
                println!("Location: {}", location);
            }
            match &*history.borrow() {
                History::Ready(points) => {
                    println!("History ({} days):", points.len());
                    for (day, reading) in points.iter().enumerate() {
                        let bar = "#".repeat((reading.aqi / 5) as usize);
                        println!("  day {:>2} {:>3} {}", day + 1, reading.aqi, bar);
                    }
                }
                History::Unavailable => println!("History: unavailable"),
                History::Loading => println!("History: still loading"),
            }

            println!("{}", serde_json::to_string_pretty(&scheduler.metrics())?);
            Ok::<(), anyhow::Error>(())
        })
        .await
}
