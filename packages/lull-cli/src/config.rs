use anyhow::{Context, Result};
use clap::ValueEnum;
use lull_scheduler::{QueueDiscipline, SchedulerConfig};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DisciplineArg {
    Priority,
    Fifo,
}

impl From<DisciplineArg> for QueueDiscipline {
    fn from(arg: DisciplineArg) -> Self {
        match arg {
            DisciplineArg::Priority => QueueDiscipline::Priority,
            DisciplineArg::Fifo => QueueDiscipline::Fifo,
        }
    }
}

/// Command-line values that win over the config file.
#[derive(Debug, Default)]
pub struct SchedulerOverrides {
    pub fallback_budget_ms: Option<u64>,
    pub fallback_delay_ms: Option<u64>,
    pub discipline: Option<DisciplineArg>,
}

pub fn load(path: Option<&Path>, overrides: &SchedulerOverrides) -> Result<SchedulerConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid scheduler config in {}", path.display()))?
        }
        None => SchedulerConfig::default(),
    };

    if let Some(budget) = overrides.fallback_budget_ms {
        config.fallback_budget_ms = budget;
    }
    if let Some(delay) = overrides.fallback_delay_ms {
        config.fallback_delay_ms = delay;
    }
    if let Some(discipline) = overrides.discipline {
        config.discipline = discipline.into();
    }

    config.validate()?;
    Ok(config)
}
