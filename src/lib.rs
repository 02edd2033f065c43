pub mod balancer;
pub mod config;
pub mod discipline;
pub mod error;
pub mod loader;
pub mod logging;
pub mod partition;
pub mod process;
pub mod queue;
pub mod report;
pub mod scheduler;
pub mod simulation;
pub mod threading;

// Re-export for easier testing
pub use config::{QueueAssignment, SchedulerConfig};
pub use discipline::Discipline;
pub use process::ProcessRecord;
pub use queue::{CpuQueue, QueueSnapshot};
pub use simulation::{SimEvent, Simulation, StopHandle};
