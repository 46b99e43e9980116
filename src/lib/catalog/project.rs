use std::fmt;

/// The identifier of a project.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProjectId(pub usize);

/// An organization supplying work in exchange for a share of the host.
#[derive(Clone, Debug)]
pub struct Project {
    /// The identifier.
    pub id: ProjectId,
    /// The name.
    pub name: String,
    /// The resource share.
    pub share: f64,
    /// The accumulated CPU-time entitlement imbalance.
    ///
    /// A positive debt means the project is owed CPU time relative to its
    /// share, and a negative one means it has run ahead of its share.
    pub debt: f64,
    /// Whether the project is suspended.
    pub suspended: bool,
    /// Whether the project should not be asked for work.
    pub dont_request_work: bool,
    /// Whether a scheduler RPC is in flight.
    pub rpc_pending: bool,
    /// Whether a trickle-up message is waiting to be sent.
    pub trickle_pending: bool,
    /// The number of unfinished tasks.
    pub in_progress: usize,
    /// The number of finished tasks awaiting acknowledgment.
    pub uploading: usize,
    /// The correction factor applied to duration estimates.
    pub duration_correction: f64,
    /// The CPU time received during the current debt interval.
    pub cpu_this_interval: f64,
    /// The CPU seconds of work wanted on the next RPC opportunity.
    pub work_request: f64,
    /// The time of the last acknowledged report.
    pub last_report: f64,
}

impl Project {
    /// Create a project.
    pub fn new<T: ToString>(id: ProjectId, name: T, share: f64) -> Project {
        Project {
            id: id,
            name: name.to_string(),
            share: share,
            debt: 0.0,
            suspended: false,
            dont_request_work: false,
            rpc_pending: false,
            trickle_pending: false,
            in_progress: 0,
            uploading: 0,
            duration_correction: 1.0,
            cpu_this_interval: 0.0,
            work_request: 0.0,
            last_report: 0.0,
        }
    }

    /// Check whether the project may be asked for work.
    #[inline]
    pub fn contactable(&self) -> bool {
        !self.suspended && !self.dont_request_work && !self.rpc_pending
    }
}

impl fmt::Display for ProjectId {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "project #{}", self.0)
    }
}
