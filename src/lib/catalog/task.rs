use std::fmt;

use catalog::{ProjectId, WorkunitId};

/// The identifier of a task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TaskId(pub usize);

/// The state of a task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskState {
    /// Waiting for a processing unit.
    Unscheduled,
    /// Occupying a processing unit.
    Scheduled,
    /// Finished successfully.
    Completed,
    /// Given up on after repeated failures.
    Error,
    /// Canceled on request.
    Aborted,
}

/// A schedulable execution instance of a workunit.
#[derive(Clone, Debug)]
pub struct Task {
    /// The identifier.
    pub id: TaskId,
    /// The owning project.
    pub project: ProjectId,
    /// The source workunit.
    pub workunit: WorkunitId,
    /// The completion deadline.
    pub deadline: f64,
    /// The estimated remaining CPU time in seconds.
    pub remaining: f64,
    /// The initial estimate of the total CPU time in seconds.
    pub estimate: f64,
    /// The fraction of the work done so far.
    pub done: f64,
    /// The time of creation.
    pub created: f64,
    /// The time of completion, if any.
    pub finished: Option<f64>,
    /// The state.
    pub state: TaskState,
    /// The number of failed attempts to start.
    pub failures: usize,
}

impl Task {
    /// Create a task.
    pub fn new(id: TaskId, project: ProjectId, workunit: WorkunitId, deadline: f64,
               estimate: f64, created: f64) -> Task {

        Task {
            id: id,
            project: project,
            workunit: workunit,
            deadline: deadline,
            remaining: estimate,
            estimate: estimate,
            done: 0.0,
            created: created,
            finished: None,
            state: TaskState::Unscheduled,
            failures: 0,
        }
    }

    /// Check whether the task has reached a final state.
    #[inline]
    pub fn over(&self) -> bool {
        match self.state {
            TaskState::Completed | TaskState::Error | TaskState::Aborted => true,
            _ => false,
        }
    }

    /// Check whether the task is occupying a processing unit.
    #[inline]
    pub fn running(&self) -> bool {
        self.state == TaskState::Scheduled
    }
}

impl fmt::Display for TaskId {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "task #{}", self.0)
    }
}
