//! Interface to the scheduler-RPC transport collaborator.

use Outcome;
use catalog::{Project, TaskId};

/// A unit of work delivered by a project server.
#[derive(Clone, Copy, Debug)]
pub struct Delivery {
    /// The estimated number of floating-point operations.
    pub fpops: f64,
    /// The memory working set in bytes.
    pub working_set: f64,
    /// The seconds between delivery and deadline.
    pub latency: f64,
}

/// An exchange channel to project servers.
///
/// Both operations return `None` when the server is transiently unreachable;
/// the caller defers to a later pass instead of blocking or retrying, and no
/// scheduling state changes on a deferred exchange.
pub trait Transport {
    /// Ask a project for the given amount of work in CPU seconds.
    fn request_work(&mut self, &Project, f64) -> Outcome<Vec<Delivery>>;

    /// Report finished tasks to their project.
    fn report(&mut self, &Project, &[TaskId]) -> Outcome<()>;
}
