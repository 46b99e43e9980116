//! Catalog of projects, workunits, and tasks.

use Result;

mod project;
mod task;
mod workunit;

pub use self::project::{Project, ProjectId};
pub use self::task::{Task, TaskId, TaskState};
pub use self::workunit::{Workunit, WorkunitId};

/// The work known to the client.
///
/// The catalog is the owning registry: every cross-entity link is an
/// identifier resolved through it, and only the control loop mutates it.
#[derive(Default)]
pub struct Catalog {
    projects: Vec<Project>,
    workunits: Vec<Workunit>,
    tasks: Vec<Task>,
    created_projects: usize,
    created_workunits: usize,
    created_tasks: usize,
}

impl Catalog {
    /// Create a catalog.
    #[inline]
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Attach a project.
    pub fn attach<T: ToString>(&mut self, name: T, share: f64) -> Result<ProjectId> {
        if share <= 0.0 {
            raise!("a resource share should be positive");
        }
        let id = ProjectId(self.created_projects);
        self.created_projects += 1;
        self.projects.push(Project::new(id, name, share));
        Ok(id)
    }

    /// Detach a project together with its workunits and tasks.
    pub fn detach(&mut self, id: ProjectId) {
        self.projects.retain(|project| project.id != id);
        self.workunits.retain(|workunit| workunit.project != id);
        self.tasks.retain(|task| task.project != id);
    }

    /// Register a workunit.
    pub fn add_workunit(&mut self, project: ProjectId, fpops: f64, working_set: f64)
                        -> WorkunitId {

        let id = WorkunitId(self.created_workunits);
        self.created_workunits += 1;
        self.workunits.push(Workunit::new(id, project, fpops, working_set));
        id
    }

    /// Register a task.
    pub fn add_task(&mut self, project: ProjectId, workunit: WorkunitId, deadline: f64,
                    estimate: f64, created: f64) -> TaskId {

        let id = TaskId(self.created_tasks);
        self.created_tasks += 1;
        self.tasks.push(Task::new(id, project, workunit, deadline, estimate, created));
        if let Some(project) = self.project_mut(project) {
            project.in_progress += 1;
        }
        id
    }

    /// Destroy a task once its report has been acknowledged.
    pub fn remove_task(&mut self, id: TaskId) {
        let workunit = match self.task(id) {
            Some(task) => task.workunit,
            _ => return,
        };
        self.tasks.retain(|task| task.id != id);
        if !self.tasks.iter().any(|task| task.workunit == workunit) {
            self.workunits.retain(|candidate| candidate.id != workunit);
        }
    }

    /// Look up a project.
    #[inline]
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Look up a project for modification.
    #[inline]
    pub fn project_mut(&mut self, id: ProjectId) -> Option<&mut Project> {
        self.projects.iter_mut().find(|project| project.id == id)
    }

    /// Look up a workunit.
    #[inline]
    pub fn workunit(&self, id: WorkunitId) -> Option<&Workunit> {
        self.workunits.iter().find(|workunit| workunit.id == id)
    }

    /// Look up a task.
    #[inline]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Look up a task for modification.
    #[inline]
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Return the projects.
    #[inline(always)]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Return the projects for modification.
    #[inline(always)]
    pub fn projects_mut(&mut self) -> &mut [Project] {
        &mut self.projects
    }

    /// Return the tasks.
    #[inline(always)]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Return the tasks for modification.
    #[inline(always)]
    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Check whether a task could run.
    #[inline]
    pub fn runnable(&self, task: &Task) -> bool {
        !task.over() && self.project(task.project).map_or(false, |project| !project.suspended)
    }

    /// Count the tasks that could run.
    pub fn runnable_count(&self) -> usize {
        self.tasks.iter().filter(|task| self.runnable(task)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::Catalog;

    #[test]
    fn attach_detach() {
        let mut catalog = Catalog::new();

        let one = catalog.attach("one", 1.0).unwrap();
        let two = catalog.attach("two", 2.0).unwrap();

        let workunit = catalog.add_workunit(one, 1e9, 1e6);
        let task = catalog.add_task(one, workunit, 1e3, 1.0, 0.0);

        assert_eq!(catalog.projects().len(), 2);
        assert_eq!(catalog.runnable_count(), 1);

        catalog.detach(one);

        assert!(catalog.project(one).is_none());
        assert!(catalog.workunit(workunit).is_none());
        assert!(catalog.task(task).is_none());
        assert!(catalog.project(two).is_some());
    }

    #[test]
    fn attach_nonpositive_share() {
        let mut catalog = Catalog::new();
        assert!(catalog.attach("null", 0.0).is_err());
    }

    #[test]
    fn remove_task_keeps_shared_workunits() {
        let mut catalog = Catalog::new();

        let project = catalog.attach("one", 1.0).unwrap();
        let workunit = catalog.add_workunit(project, 1e9, 1e6);
        let first = catalog.add_task(project, workunit, 1e3, 1.0, 0.0);
        let second = catalog.add_task(project, workunit, 1e3, 1.0, 0.0);

        catalog.remove_task(first);
        assert!(catalog.workunit(workunit).is_some());

        catalog.remove_task(second);
        assert!(catalog.workunit(workunit).is_none());
    }
}
