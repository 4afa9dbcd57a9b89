pub mod budget;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod provider;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use budget::{Budget, DeadlineBudget, FixedBudget};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{QueueDiscipline, SchedulerConfig};
pub use error::{ParsePriorityError, SchedulerError, TaskExecutionError};
pub use executor::{TaskExecutor, TaskObserver, TaskOutcome, TracingObserver};
pub use metrics::SchedulerMetrics;
pub use provider::{
    HostCapabilities, HostSlotProvider, IdleHost, IdleSlotProvider, ProviderKind, SlotCallback,
    TimerHost,
};
pub use queue::TaskQueue;
pub use scheduler::{Scheduler, SchedulerState};
pub use task::{IntoTaskResult, Priority, Task, TaskId};
