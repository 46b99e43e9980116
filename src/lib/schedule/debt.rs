//! Debt accounting across projects.

use catalog::{Task, TaskId};
use state::ClientState;

impl ClientState {
    /// Fold the interval's CPU accounting into the per-project debts.
    ///
    /// Each eligible project is credited its share of the wall CPU time seen
    /// over the interval and debited what it actually received, so the debts
    /// redistribute CPU time without creating any. An interval shorter than
    /// the configured minimum is left to keep accumulating, and a zero total
    /// share skips the update altogether.
    pub fn adjust_debts(&mut self) {
        let elapsed = self.now - self.debt_interval_start;
        if elapsed < self.prefs.debt_interval_min {
            return;
        }
        let total_share = self.total_resource_share();
        if total_share > 0.0 && self.total_wall_cpu > 0.0 {
            let wall = self.total_wall_cpu;
            for project in self.catalog.projects_mut() {
                if project.suspended || project.share <= 0.0 {
                    continue;
                }
                let delta = project.share / total_share * wall - project.cpu_this_interval;
                project.debt += delta;
                debug!(target: "Debt", "{} is now owed {:.0} seconds.", project.id, project.debt);
            }
        }
        for project in self.catalog.projects_mut() {
            project.cpu_this_interval = 0.0;
        }
        self.total_wall_cpu = 0.0;
        self.total_cpu = 0.0;
        self.debt_interval_start = self.now;
    }

    /// Return the best runnable task of the most owed project.
    ///
    /// The best task of a project is the one with the nearest deadline,
    /// preferring an already running task and then the earliest created on
    /// ties; projects rank by debt. Tasks listed in `taken` are skipped.
    pub fn largest_debt_project_best_result(&self, taken: &[TaskId]) -> Option<TaskId> {
        let mut best: Option<(f64, &Task)> = None;
        for project in self.catalog.projects() {
            if project.suspended {
                continue;
            }
            let candidate = self.catalog
                                .tasks()
                                .iter()
                                .filter(|task| {
                                    task.project == project.id && !task.over() &&
                                    !taken.contains(&task.id)
                                })
                                .fold(None, |best: Option<&Task>, task| match best {
                                    Some(best) if !prefer(task, best) => Some(best),
                                    _ => Some(task),
                                });
            let candidate = match candidate {
                Some(candidate) => candidate,
                _ => continue,
            };
            best = match best {
                Some((debt, incumbent)) => {
                    if project.debt > debt ||
                       (project.debt == debt && prefer(candidate, incumbent)) {
                        Some((project.debt, candidate))
                    } else {
                        Some((debt, incumbent))
                    }
                },
                _ => Some((project.debt, candidate)),
            };
        }
        best.map(|(_, task)| task.id)
    }
}

/// Check whether one task outranks another within the same rank of debt.
fn prefer(one: &Task, other: &Task) -> bool {
    if one.deadline != other.deadline {
        return one.deadline < other.deadline;
    }
    if one.running() != other.running() {
        return one.running();
    }
    one.created < other.created
}

#[cfg(test)]
mod tests {
    use assert;

    use host::Host;
    use prefs::Prefs;
    use state::ClientState;

    fn state(units: usize) -> ClientState {
        let host = Host { units: units, flops: 1e9, ram: 8e9 };
        let mut prefs = Prefs::default();
        prefs.debt_interval_min = 10.0;
        ClientState::new(host, prefs)
    }

    #[test]
    fn adjust_redistributes() {
        let mut state = state(1);
        let one = state.catalog.attach("one", 1.0).unwrap();
        let two = state.catalog.attach("two", 1.0).unwrap();

        let workunit = state.catalog.add_workunit(one, 1e12, 1e6);
        let task = state.catalog.add_task(one, workunit, 1e6, 1e3, 0.0);

        state.now = 10.0;
        state.accrue(task, 10.0);
        state.adjust_debts();

        let one = state.catalog.project(one).unwrap().debt;
        let two = state.catalog.project(two).unwrap().debt;

        assert::close(&[one], &[-5.0], 1e-10);
        assert::close(&[two], &[5.0], 1e-10);
        assert::close(&[one + two], &[0.0], 1e-10);
    }

    #[test]
    fn adjust_short_interval() {
        let mut state = state(1);
        let project = state.catalog.attach("one", 1.0).unwrap();
        let workunit = state.catalog.add_workunit(project, 1e12, 1e6);
        let task = state.catalog.add_task(project, workunit, 1e6, 1e3, 0.0);

        state.now = 1.0;
        state.accrue(task, 1.0);
        state.adjust_debts();

        assert_eq!(state.total_cpu, 1.0);
        assert_eq!(state.debt_interval_start, 0.0);
    }

    #[test]
    fn adjust_zero_total_share() {
        let mut state = state(1);
        let project = state.catalog.attach("one", 1.0).unwrap();
        state.catalog.project_mut(project).unwrap().suspended = true;

        let workunit = state.catalog.add_workunit(project, 1e12, 1e6);
        let task = state.catalog.add_task(project, workunit, 1e6, 1e3, 0.0);

        state.now = 100.0;
        state.accrue(task, 100.0);
        state.adjust_debts();

        assert_eq!(state.catalog.project(project).unwrap().debt, 0.0);
        assert_eq!(state.total_cpu, 0.0);
    }

    #[test]
    fn largest_debt_ranking() {
        let mut state = state(1);
        let one = state.catalog.attach("one", 1.0).unwrap();
        let two = state.catalog.attach("two", 1.0).unwrap();

        let first = state.catalog.add_workunit(one, 1e9, 1e6);
        let first = state.catalog.add_task(one, first, 1e6, 1.0, 0.0);
        let second = state.catalog.add_workunit(two, 1e9, 1e6);
        let second = state.catalog.add_task(two, second, 1e6, 1.0, 1.0);

        state.catalog.project_mut(two).unwrap().debt = 1.0;
        assert_eq!(state.largest_debt_project_best_result(&[]), Some(second));

        state.catalog.project_mut(two).unwrap().debt = -1.0;
        assert_eq!(state.largest_debt_project_best_result(&[]), Some(first));

        assert_eq!(state.largest_debt_project_best_result(&[first, second]), None);
    }
}
