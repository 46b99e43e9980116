//! Work-fetch policy.

use catalog::{Project, ProjectId};
use schedule::Projection;
use state::ClientState;

impl ClientState {
    /// Return the CPU seconds of unfinished work buffered for a project.
    pub fn buffered(&self, project: ProjectId) -> f64 {
        self.catalog
            .tasks()
            .iter()
            .filter(|task| task.project == project && !task.over())
            .map(|task| task.remaining.max(0.0))
            .sum()
    }

    /// Return the CPU seconds a project lacks to sustain its share of the
    /// work buffer, bounded so the buffer never grows past its maximum.
    pub fn work_needed_secs(&self, project: &Project, projection: &Projection) -> f64 {
        let total = self.total_resource_share();
        if total <= 0.0 {
            return 0.0;
        }
        let units = self.host.units as f64;
        let fraction = project.share / total;
        let buffered = self.buffered(project.id);
        let floor = self.prefs.work_buf_min() * units * fraction;
        let ceiling = self.prefs.work_buf_max() * units * fraction;
        let need = (floor - buffered).max(projection.shortfall_of(project.id));
        need.min((ceiling - buffered).max(0.0)).max(0.0)
    }

    /// Recompute every project's pending work request.
    ///
    /// A project is asked for work when its shortfall is positive or when
    /// the projection leaves a processing unit idle; suspended projects,
    /// projects told not to fetch, projects mid-RPC, projects drowning in
    /// unacknowledged uploads, and projects already at their buffer ceiling
    /// are left alone.
    pub fn compute_work_requests(&mut self) {
        self.compute_nuploading_results();
        let projection = self.rr_simulation();
        let starved = self.no_work_for_a_cpu() || projection.idle > 0.0;
        let total = self.total_resource_share();
        let units = self.host.units as f64;
        let limit = self.prefs.upload_limit;
        let ids: Vec<ProjectId> = self.catalog.projects().iter().map(|project| project.id)
                                                                 .collect();
        for id in ids {
            let request = {
                let project = match self.catalog.project(id) {
                    Some(project) => project,
                    _ => continue,
                };
                if !project.contactable() || project.uploading > limit {
                    0.0
                } else {
                    let need = self.work_needed_secs(project, &projection);
                    let ceiling = if total > 0.0 {
                        self.prefs.work_buf_max() * units * project.share / total
                    } else {
                        0.0
                    };
                    if need > 0.0 {
                        need
                    } else if starved && self.buffered(id) < ceiling {
                        // keep a starving host fed while the ceiling allows
                        1.0
                    } else {
                        0.0
                    }
                }
            };
            if let Some(project) = self.catalog.project_mut(id) {
                project.work_request = request;
            }
        }
    }

    /// Return the project that should ask for work next.
    ///
    /// Projects owed more CPU time get new work first, so a share imbalance
    /// does not compound into work starvation.
    pub fn next_project_need_work(&self) -> Option<ProjectId> {
        let mut best: Option<(f64, ProjectId)> = None;
        for project in self.catalog.projects() {
            if project.work_request <= 0.0 {
                continue;
            }
            match best {
                Some((debt, _)) if debt >= project.debt => {},
                _ => best = Some((project.debt, project.id)),
            }
        }
        best.map(|(_, id)| id)
    }

    /// Return a project holding finished work past the report grace period.
    pub fn find_project_with_overdue_results(&self) -> Option<ProjectId> {
        for task in self.catalog.tasks() {
            if let Some(finished) = task.finished {
                if task.over() && self.now - finished > self.prefs.report_grace {
                    return Some(task.project);
                }
            }
        }
        None
    }

    /// Note the projects whose acknowledgments are badly late.
    pub fn check_project_timeout(&self) {
        for project in self.catalog.projects() {
            let overdue = self.catalog.tasks().iter().any(|task| {
                task.project == project.id && task.over() &&
                task.finished.map_or(false, |finished| {
                    self.now - finished > self.prefs.report_grace
                })
            });
            if overdue {
                debug!(target: "Fetch", "{} has not acknowledged finished work.", project.id);
            }
        }
    }

    /// Smooth every project's duration correction toward an observed
    /// actual-to-estimated CPU-time ratio.
    pub fn scale_duration_correction_factors(&mut self, ratio: f64) {
        if ratio <= 0.0 {
            return;
        }
        let rate = self.prefs.correction_rate;
        let (lo, hi) = (self.prefs.correction_min, self.prefs.correction_max);
        for project in self.catalog.projects_mut() {
            let factor = project.duration_correction +
                         rate * (ratio - project.duration_correction);
            project.duration_correction = factor.max(lo).min(hi);
        }
    }

    /// Recount the unfinished tasks and pending uploads per project.
    pub fn compute_nuploading_results(&mut self) {
        let counts: Vec<(ProjectId, bool)> = self.catalog
                                                 .tasks()
                                                 .iter()
                                                 .map(|task| (task.project, task.over()))
                                                 .collect();
        for project in self.catalog.projects_mut() {
            project.in_progress = 0;
            project.uploading = 0;
        }
        for (id, over) in counts {
            if let Some(project) = self.catalog.project_mut(id) {
                if over {
                    project.uploading += 1;
                } else {
                    project.in_progress += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert;

    use catalog::{ProjectId, TaskState};
    use host::Host;
    use prefs::Prefs;
    use state::ClientState;

    fn state(units: usize) -> ClientState {
        let host = Host { units: units, flops: 1e9, ram: 8e9 };
        ClientState::new(host, Prefs::default())
    }

    fn feed(state: &mut ClientState, project: ProjectId, estimate: f64) {
        let fpops = estimate * state.host.flops;
        let workunit = state.catalog.add_workunit(project, fpops, 1e6);
        state.catalog.add_task(project, workunit, 1e9, estimate, 0.0);
    }

    #[test]
    fn zero_when_buffered() {
        let mut state = state(1);
        let project = state.catalog.attach("one", 1.0).unwrap();
        feed(&mut state, project, 1e6);

        state.compute_work_requests();
        assert_eq!(state.catalog.project(project).unwrap().work_request, 0.0);
    }

    #[test]
    fn positive_when_starved() {
        let mut state = state(2);
        let project = state.catalog.attach("one", 1.0).unwrap();

        state.compute_work_requests();
        let request = state.catalog.project(project).unwrap().work_request;
        assert!(request > 0.0);
        assert!(request <= state.prefs.work_buf_max() * 2.0);
    }

    #[test]
    fn saturated_buffer_requests_nothing() {
        let mut state = state(2);
        let one = state.catalog.attach("one", 1.0).unwrap();
        let two = state.catalog.attach("two", 2.0).unwrap();
        for _ in 0..30 {
            feed(&mut state, one, 1800.0);
            feed(&mut state, two, 1800.0);
        }

        state.compute_work_requests();
        for project in state.catalog.projects() {
            assert_eq!(project.work_request, 0.0, "{} requests work", project.id);
        }
    }

    #[test]
    fn never_negative() {
        let mut state = state(4);
        let one = state.catalog.attach("one", 1.0).unwrap();
        let two = state.catalog.attach("two", 1e3).unwrap();
        feed(&mut state, one, 1e8);

        state.compute_work_requests();
        for project in state.catalog.projects() {
            assert!(project.work_request >= 0.0);
        }
        let _ = two;
    }

    #[test]
    fn ranking_by_debt() {
        let mut state = state(1);
        let one = state.catalog.attach("one", 1.0).unwrap();
        let two = state.catalog.attach("two", 1.0).unwrap();
        state.catalog.project_mut(two).unwrap().debt = 1.0;

        state.compute_work_requests();
        assert_eq!(state.next_project_need_work(), Some(two));
        let _ = one;
    }

    #[test]
    fn upload_backpressure() {
        let mut state = state(1);
        state.prefs.upload_limit = 0;
        let project = state.catalog.attach("one", 1.0).unwrap();
        feed(&mut state, project, 1.0);
        state.catalog.tasks_mut()[0].state = TaskState::Completed;
        state.catalog.tasks_mut()[0].finished = Some(0.0);

        state.compute_work_requests();
        assert_eq!(state.catalog.project(project).unwrap().work_request, 0.0);
    }

    #[test]
    fn overdue_reports() {
        let mut state = state(1);
        let project = state.catalog.attach("one", 1.0).unwrap();
        feed(&mut state, project, 1.0);
        state.catalog.tasks_mut()[0].state = TaskState::Completed;
        state.catalog.tasks_mut()[0].finished = Some(0.0);

        state.now = state.prefs.report_grace / 2.0;
        assert_eq!(state.find_project_with_overdue_results(), None);

        state.now = state.prefs.report_grace * 2.0;
        assert_eq!(state.find_project_with_overdue_results(), Some(project));
    }

    #[test]
    fn duration_correction_is_bounded() {
        let mut state = state(1);
        let project = state.catalog.attach("one", 1.0).unwrap();

        for _ in 0..1000 {
            state.scale_duration_correction_factors(1e9);
        }
        let factor = state.catalog.project(project).unwrap().duration_correction;
        assert::close(&[factor], &[state.prefs.correction_max], 1e-10);

        for _ in 0..1000 {
            state.scale_duration_correction_factors(1e-9);
        }
        let factor = state.catalog.project(project).unwrap().duration_correction;
        assert::close(&[factor], &[state.prefs.correction_min], 1e-10);
    }
}
