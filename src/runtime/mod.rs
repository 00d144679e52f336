//! Cooperative runtime: the scheduler the shell loop drives one turn at a
//! time, plus the reschedulable timeout scope device tasks run in.

pub mod scheduler;
pub mod timeout;

pub use scheduler::{Scheduler, ShutdownReport, Task, TaskError, TimerHandle};
pub use timeout::{within, Deadline, TimedOut};
