use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the queue picks the next task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueDiscipline {
    /// Highest tier first, FIFO within a tier.
    #[default]
    Priority,
    /// Strict arrival order; priority is kept as metadata only.
    Fifo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Budget handed out per wake-up when the host has no native idle callbacks.
    pub fallback_budget_ms: u64,
    /// Delay before a fallback wake-up fires.
    pub fallback_delay_ms: u64,
    /// Use native idle callbacks whenever the host has them.
    pub prefer_native: bool,
    pub discipline: QueueDiscipline,
}

impl SchedulerConfig {
    pub const DEFAULT_FALLBACK_BUDGET_MS: u64 = 50;

    pub fn fallback_budget(&self) -> Duration {
        Duration::from_millis(self.fallback_budget_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.fallback_budget_ms == 0 {
            // A zero budget would re-arm forever without running anything.
            return Err(SchedulerError::Config(
                "fallback_budget_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fallback_budget_ms: Self::DEFAULT_FALLBACK_BUDGET_MS,
            fallback_delay_ms: 0,
            prefer_native: true,
            discipline: QueueDiscipline::Priority,
        }
    }
}
