//! Interface to the process-lifecycle collaborator.

use Result;
use catalog::{Task, Workunit};

/// A handle to a live task slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Handle(pub usize);

/// The observed condition of a live task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Execution {
    /// Still computing.
    Running,
    /// Finished with the given CPU time consumed.
    Completed(f64),
    /// Failed irrecoverably.
    Error,
}

/// A manager of the processes that occupy processing units.
///
/// The scheduler drives tasks exclusively through this interface; it never
/// inspects process state itself, and checkpointing on preemption is the
/// implementation's responsibility.
pub trait Lifecycle {
    /// Launch a task.
    fn start(&mut self, &Task, &Workunit) -> Result<Handle>;

    /// Ask a task to leave its unit, checkpointing first.
    fn suspend(&mut self, Handle) -> Result<()>;

    /// Let a suspended task run again.
    fn resume(&mut self, Handle) -> Result<()>;

    /// Observe the condition of a task.
    fn poll(&mut self, Handle) -> Result<Execution>;
}
