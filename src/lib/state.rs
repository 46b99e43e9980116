//! State shared by the control loop.

use catalog::{Catalog, ProjectId, TaskId, Workunit};
use host::{Host, Probe};
use intent::{Intent, Intents};
use lifecycle::{Handle, Lifecycle};
use prefs::Prefs;
use Result;

/// The binding of a task to a live process slot.
#[derive(Clone, Copy, Debug)]
pub struct Active {
    /// The bound task.
    pub task: TaskId,
    /// The handle issued by the process-lifecycle collaborator.
    pub handle: Handle,
    /// Whether the task has been asked to leave its unit.
    pub suspended: bool,
}

/// The aggregate state owned by the control loop.
///
/// A single thread drives all mutation; external events funnel into the
/// intent queue and take effect at the top of the next pass.
pub struct ClientState {
    /// The current time.
    pub now: f64,
    /// The host snapshot.
    pub host: Host,
    /// The preferences.
    pub prefs: Prefs,
    /// The catalog of projects, workunits, and tasks.
    pub catalog: Catalog,
    /// The pending recomputation triggers.
    pub intents: Intents,
    /// The tasks bound to process slots.
    pub active: Vec<Active>,
    /// The decision set of the current scheduling interval.
    pub ordered: Vec<TaskId>,
    /// The beginning of the current debt interval.
    pub debt_interval_start: f64,
    /// The wall CPU time accumulated over the interval.
    pub total_wall_cpu: f64,
    /// The CPU time handed out over the interval.
    pub total_cpu: f64,
    /// The time of the last scheduling pass.
    pub last_schedule: f64,
}

impl ClientState {
    /// Create a state.
    pub fn new(host: Host, prefs: Prefs) -> ClientState {
        let units = match prefs.max_units {
            Some(cap) => host.units.min(cap),
            _ => host.units,
        };
        ClientState {
            now: 0.0,
            host: Host { units: units, ..host },
            prefs: prefs,
            catalog: Catalog::new(),
            intents: Intents::new(),
            active: vec![],
            ordered: vec![],
            debt_interval_start: 0.0,
            total_wall_cpu: 0.0,
            total_cpu: 0.0,
            last_schedule: 0.0,
        }
    }

    /// Refresh the host snapshot.
    ///
    /// Debts are comparable only within one host configuration, so a change
    /// of the usable unit count resets them all.
    pub fn poll<T: Probe>(&mut self, probe: &T) {
        let host = Host::read(probe);
        let units = match self.prefs.max_units {
            Some(cap) => host.units.min(cap),
            _ => host.units,
        };
        if units != self.host.units {
            info!(target: "Schedule", "The usable unit count changed from {} to {}.",
                  self.host.units, units);
            for project in self.catalog.projects_mut() {
                project.debt = 0.0;
            }
            self.intents.push(Intent::Schedule, "the unit count changed");
        }
        self.host = Host { units: units, ..host };
    }

    /// Return the total share of the projects eligible for CPU time.
    pub fn total_resource_share(&self) -> f64 {
        self.catalog
            .projects()
            .iter()
            .filter(|project| !project.suspended && project.share > 0.0)
            .map(|project| project.share)
            .sum()
    }

    /// Estimate the CPU time a workunit needs on this host.
    pub fn estimate_cpu_time(&self, workunit: &Workunit) -> f64 {
        let correction = self.catalog
                             .project(workunit.project)
                             .map_or(1.0, |project| project.duration_correction);
        workunit.fpops / self.host.flops * correction
    }

    /// Return the memory claimed by the running working sets.
    pub fn occupied_ram(&self) -> f64 {
        let mut ram = 0.0;
        for active in &self.active {
            if active.suspended {
                continue;
            }
            if let Some(workunit) = self.catalog
                                        .task(active.task)
                                        .and_then(|task| self.catalog.workunit(task.workunit)) {
                ram += workunit.working_set;
            }
        }
        ram
    }

    /// Return the memory left after the running working sets.
    pub fn available_ram(&self) -> f64 {
        (self.host.ram - self.occupied_ram()).max(0.0)
    }

    /// Account for CPU time consumed by a task.
    pub fn accrue(&mut self, id: TaskId, cpu: f64) {
        self.total_cpu += cpu;
        self.total_wall_cpu += cpu;
        let project = match self.catalog.task_mut(id) {
            Some(task) => {
                task.remaining = (task.remaining - cpu).max(0.0);
                task.done = if task.estimate > 0.0 {
                    1.0 - task.remaining / task.estimate
                } else {
                    1.0
                };
                task.project
            },
            _ => return,
        };
        if let Some(project) = self.catalog.project_mut(project) {
            project.cpu_this_interval += cpu;
        }
    }

    /// Count the tasks occupying processing units.
    #[inline]
    pub fn running_count(&self) -> usize {
        self.active.iter().filter(|active| !active.suspended).count()
    }

    /// Detach a project, releasing any of its tasks still bound to slots.
    pub fn detach<L: Lifecycle>(&mut self, id: ProjectId, lifecycle: &mut L) -> Result<()> {
        let mut i = 0;
        while i < self.active.len() {
            let owner = self.catalog.task(self.active[i].task).map(|task| task.project);
            if owner != Some(id) {
                i += 1;
                continue;
            }
            let active = self.active.remove(i);
            if !active.suspended {
                try!(lifecycle.suspend(active.handle));
            }
        }
        let catalog = &self.catalog;
        self.ordered.retain(|&task| {
            catalog.task(task).map_or(false, |task| task.project != id)
        });
        self.catalog.detach(id);
        self.intents.push(Intent::Schedule, "a project detached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use host::Host;
    use prefs::Prefs;
    use sim::SyntheticLifecycle;
    use super::ClientState;

    fn state(units: usize) -> ClientState {
        let host = Host { units: units, flops: 1e9, ram: 8e9 };
        ClientState::new(host, Prefs::default())
    }

    #[test]
    fn detach_releases_slots() {
        let mut state = state(2);
        let mut lifecycle = SyntheticLifecycle::new(1e9);

        let doomed = state.catalog.attach("doomed", 1.0).unwrap();
        let kept = state.catalog.attach("kept", 1.0).unwrap();
        for &project in &[doomed, kept] {
            let workunit = state.catalog.add_workunit(project, 1e11, 1e6);
            state.catalog.add_task(project, workunit, 1e9, 100.0, 0.0);
        }

        state.schedule_cpus();
        state.enforce_schedule(&mut lifecycle).unwrap();
        assert_eq!(state.running_count(), 2);

        state.detach(doomed, &mut lifecycle).unwrap();

        assert_eq!(state.active.len(), 1);
        assert!(state.catalog.project(doomed).is_none());
        assert!(state.ordered.iter().all(|&task| {
            state.catalog.task(task).map_or(false, |task| task.project == kept)
        }));
    }

    #[test]
    fn unit_count_change_resets_debts() {
        let mut state = state(2);
        let project = state.catalog.attach("one", 1.0).unwrap();
        state.catalog.project_mut(project).unwrap().debt = 1e3;

        let host = Host { units: 1, flops: 1e9, ram: 8e9 };
        state.poll(&FixedProbe(host));

        assert_eq!(state.host.units, 1);
        assert_eq!(state.catalog.project(project).unwrap().debt, 0.0);
    }

    struct FixedProbe(Host);

    impl ::host::Probe for FixedProbe {
        fn units(&self) -> usize {
            self.0.units
        }

        fn flops(&self) -> f64 {
            self.0.flops
        }

        fn ram(&self) -> f64 {
            self.0.ram
        }
    }
}
