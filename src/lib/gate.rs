//! Pacing of scheduler RPCs.

use catalog::ProjectId;
use state::ClientState;

/// A coordinator deciding when each project may contact its server.
///
/// The gate orders and throttles; the exchanges themselves belong to the
/// transport collaborator. No state of the scheduler changes when an
/// exchange is deferred.
pub struct Gate {
    spacing: f64,
    until: Vec<(ProjectId, f64)>,
}

impl Gate {
    /// Create a gate with a minimum spacing between contacts.
    #[inline]
    pub fn new(spacing: f64) -> Gate {
        Gate { spacing: spacing, until: vec![] }
    }

    /// Check whether a project may fire an RPC.
    pub fn ready(&self, project: ProjectId, now: f64) -> bool {
        self.until
            .iter()
            .find(|&&(id, _)| id == project)
            .map_or(true, |&(_, until)| now >= until)
    }

    /// Note that a project has just fired an RPC.
    #[inline]
    pub fn fired(&mut self, project: ProjectId, now: f64) {
        self.set(project, now + self.spacing);
    }

    /// Push a project's next chance out after a transient failure.
    #[inline]
    pub fn defer(&mut self, project: ProjectId, now: f64) {
        self.set(project, now + self.spacing);
    }

    /// Return the project most entitled to the next RPC, if any may fire.
    ///
    /// Overdue reports go first, then pending trickle-up messages, then
    /// work requests ranked by debt, and finally ordinary reports of
    /// finished work.
    pub fn next(&self, state: &ClientState) -> Option<ProjectId> {
        let now = state.now;

        if let Some(project) = state.find_project_with_overdue_results() {
            if self.ready(project, now) {
                return Some(project);
            }
        }

        for project in state.catalog.projects() {
            if project.trickle_pending && self.ready(project.id, now) {
                return Some(project.id);
            }
        }

        let mut best: Option<(f64, ProjectId)> = None;
        for project in state.catalog.projects() {
            if project.work_request <= 0.0 || !self.ready(project.id, now) {
                continue;
            }
            match best {
                Some((debt, _)) if debt >= project.debt => {},
                _ => best = Some((project.debt, project.id)),
            }
        }
        if let Some((_, project)) = best {
            return Some(project);
        }

        for task in state.catalog.tasks() {
            if task.over() && task.finished.is_some() && self.ready(task.project, now) {
                return Some(task.project);
            }
        }

        None
    }

    fn set(&mut self, project: ProjectId, until: f64) {
        match self.until.iter_mut().find(|&&mut (id, _)| id == project) {
            Some(&mut (_, ref mut slot)) => *slot = until,
            _ => self.until.push((project, until)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Gate;
    use catalog::TaskState;
    use host::Host;
    use prefs::Prefs;
    use state::ClientState;

    fn state() -> ClientState {
        let host = Host { units: 1, flops: 1e9, ram: 8e9 };
        ClientState::new(host, Prefs::default())
    }

    #[test]
    fn spacing() {
        let mut state = state();
        let project = state.catalog.attach("one", 1.0).unwrap();
        state.catalog.project_mut(project).unwrap().work_request = 1.0;

        let mut gate = Gate::new(60.0);
        assert_eq!(gate.next(&state), Some(project));

        gate.fired(project, state.now);
        assert_eq!(gate.next(&state), None);

        state.now = 60.0;
        assert_eq!(gate.next(&state), Some(project));
    }

    #[test]
    fn overdue_reports_go_first() {
        let mut state = state();
        let hungry = state.catalog.attach("hungry", 1.0).unwrap();
        let tardy = state.catalog.attach("tardy", 1.0).unwrap();
        state.catalog.project_mut(hungry).unwrap().work_request = 1e4;
        state.catalog.project_mut(hungry).unwrap().debt = 1e4;

        let workunit = state.catalog.add_workunit(tardy, 1e9, 1e6);
        let task = state.catalog.add_task(tardy, workunit, 1e9, 1.0, 0.0);
        if let Some(task) = state.catalog.task_mut(task) {
            task.state = TaskState::Completed;
            task.finished = Some(0.0);
        }
        state.now = state.prefs.report_grace * 2.0;

        let gate = Gate::new(60.0);
        assert_eq!(gate.next(&state), Some(tardy));
    }

    #[test]
    fn deferral_holds_a_project_back() {
        let mut state = state();
        let project = state.catalog.attach("one", 1.0).unwrap();
        state.catalog.project_mut(project).unwrap().work_request = 1.0;

        let mut gate = Gate::new(60.0);
        gate.defer(project, 0.0);
        assert_eq!(gate.next(&state), None);
        assert!(!gate.ready(project, 59.0));
        assert!(gate.ready(project, 60.0));
    }
}
