use catalog::ProjectId;

/// The identifier of a workunit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WorkunitId(pub usize);

/// An immutable unit of computation owned by a project.
#[derive(Clone, Debug)]
pub struct Workunit {
    /// The identifier.
    pub id: WorkunitId,
    /// The owning project.
    pub project: ProjectId,
    /// The estimated number of floating-point operations.
    pub fpops: f64,
    /// The memory working set in bytes.
    pub working_set: f64,
}

impl Workunit {
    /// Create a workunit.
    #[inline]
    pub fn new(id: WorkunitId, project: ProjectId, fpops: f64, working_set: f64) -> Workunit {
        Workunit { id: id, project: project, fpops: fpops, working_set: working_set }
    }
}
