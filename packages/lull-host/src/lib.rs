// Platform adapters: each host exposes its idle/timer mechanisms as HostCapabilities
// and the scheduler probes them once at construction.

pub mod tokio_host;
pub mod virtual_loop;

pub use tokio_host::{TokioClock, TokioTimerHost, wait_until_idle};
pub use virtual_loop::VirtualLoop;
