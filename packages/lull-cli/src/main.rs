use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod demo;
mod simulate;

use config::{DisciplineArg, SchedulerOverrides};

#[derive(Parser)]
#[command(name = "lull")]
#[command(about = "Run background work in the host's idle time", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// JSON file with scheduler settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Budget per fallback wake-up, in milliseconds
    #[arg(long, global = true)]
    fallback_budget_ms: Option<u64>,

    /// Delay before each fallback wake-up, in milliseconds
    #[arg(long, global = true)]
    fallback_delay_ms: Option<u64>,

    /// Queue discipline
    #[arg(long, global = true, value_enum)]
    discipline: Option<DisciplineArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a reading, then fetch its history in idle time on a tokio host
    Demo {
        /// Number of historical points to "fetch"
        #[arg(long, default_value_t = 7)]
        history_points: usize,
        /// Make the background history fetch fail
        #[arg(long)]
        fail: bool,
    },
    /// Deterministic run on the virtual host loop
    Simulate {
        /// Number of tasks to schedule
        #[arg(long, default_value_t = 24)]
        tasks: usize,
        /// Virtual time each task keeps the host busy, in milliseconds
        #[arg(long, default_value_t = 5)]
        busy_ms: u64,
        /// Pretend the host has no native idle callbacks
        #[arg(long)]
        no_native: bool,
        /// Make every Nth task fail (0 disables)
        #[arg(long, default_value_t = 0)]
        fail_every: usize,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let overrides = SchedulerOverrides {
        fallback_budget_ms: cli.fallback_budget_ms,
        fallback_delay_ms: cli.fallback_delay_ms,
        discipline: cli.discipline,
    };
    let config = config::load(cli.config.as_deref(), &overrides)?;
    tracing::debug!(?config, "Scheduler config loaded");

    match cli.command {
        Commands::Demo {
            history_points,
            fail,
        } => {
            demo::run(
                config,
                demo::DemoArgs {
                    history_points,
                    fail,
                },
            )
            .await?
        }
        Commands::Simulate {
            tasks,
            busy_ms,
            no_native,
            fail_every,
        } => simulate::run(
            config,
            &simulate::SimulateArgs {
                tasks,
                busy_ms,
                native_idle: !no_native,
                fail_every,
            },
        )?,
    }

    Ok(())
}
