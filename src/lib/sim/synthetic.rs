//! Synthetic stand-ins for the excluded collaborators.

use catalog::{Project, Task, TaskId, Workunit};
use lifecycle::{Execution, Handle, Lifecycle};
use sim::App;
use transport::{Delivery, Transport};
use {Outcome, Result, Source};

/// A process manager that computes in simulated time.
pub struct SyntheticLifecycle {
    speed: f64,
    issued: usize,
    slots: Vec<Slot>,
    periods: Vec<(::catalog::ProjectId, f64)>,
}

struct Slot {
    handle: Handle,
    task: TaskId,
    needed: f64,
    consumed: f64,
    checkpoint: f64,
    suspended: bool,
}

/// A server exchange that fabricates work from application models.
pub struct SyntheticTransport {
    speed: f64,
    apps: Vec<(::catalog::ProjectId, App)>,
    down: Vec<::catalog::ProjectId>,
    source: Source,
}

impl SyntheticLifecycle {
    /// Create a manager computing at the given unit speed.
    #[inline]
    pub fn new(speed: f64) -> SyntheticLifecycle {
        SyntheticLifecycle { speed: speed, issued: 0, slots: vec![], periods: vec![] }
    }

    /// Set the checkpoint period of a project's tasks.
    ///
    /// A suspended task loses the progress made since its last checkpoint.
    /// A zero period means continuous checkpointing.
    pub fn install(&mut self, project: ::catalog::ProjectId, period: f64) {
        self.periods.push((project, period.max(0.0)));
    }

    /// Advance runtime, returning the CPU time consumed per task.
    pub fn advance(&mut self, step: f64, up: bool) -> Vec<(TaskId, f64)> {
        let mut consumed = vec![];
        if !up || step <= 0.0 {
            return consumed;
        }
        for slot in self.slots.iter_mut() {
            if slot.suspended || slot.consumed >= slot.needed {
                continue;
            }
            let secs = step.min(slot.needed - slot.consumed);
            slot.consumed += secs;
            consumed.push((slot.task, secs));
        }
        consumed
    }

    /// Drop the slot of a finished task.
    #[inline]
    pub fn release(&mut self, handle: Handle) {
        self.slots.retain(|slot| slot.handle != handle);
    }

    /// Count the tasks computing right now.
    pub fn running(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.suspended && slot.consumed < slot.needed)
            .count()
    }
}

impl Lifecycle for SyntheticLifecycle {
    fn start(&mut self, task: &Task, workunit: &Workunit) -> Result<Handle> {
        let handle = Handle(self.issued);
        self.issued += 1;
        let needed = workunit.fpops / self.speed;
        let checkpoint = self.periods
                             .iter()
                             .find(|&&(project, _)| project == task.project)
                             .map_or(0.0, |&(_, period)| period);
        self.slots.push(Slot {
            handle: handle,
            task: task.id,
            needed: needed,
            // restarts resume from the checkpointed fraction
            consumed: task.done.max(0.0).min(1.0) * needed,
            checkpoint: checkpoint,
            suspended: false,
        });
        Ok(handle)
    }

    fn suspend(&mut self, handle: Handle) -> Result<()> {
        let slot = some!(self.slots.iter_mut().find(|slot| slot.handle == handle),
                         "found an unknown task handle");
        slot.suspended = true;
        // progress since the last checkpoint is lost
        if slot.checkpoint > 0.0 && slot.consumed < slot.needed {
            slot.consumed = (slot.consumed / slot.checkpoint).floor() * slot.checkpoint;
        }
        Ok(())
    }

    fn resume(&mut self, handle: Handle) -> Result<()> {
        let slot = some!(self.slots.iter_mut().find(|slot| slot.handle == handle),
                         "found an unknown task handle");
        slot.suspended = false;
        Ok(())
    }

    fn poll(&mut self, handle: Handle) -> Result<Execution> {
        let slot = some!(self.slots.iter().find(|slot| slot.handle == handle),
                         "found an unknown task handle");
        if slot.consumed >= slot.needed {
            Ok(Execution::Completed(slot.consumed))
        } else {
            Ok(Execution::Running)
        }
    }
}

impl SyntheticTransport {
    /// Create an exchange delivering work computable at the given speed.
    #[inline]
    pub fn new(speed: f64, source: Source) -> SyntheticTransport {
        SyntheticTransport { speed: speed, apps: vec![], down: vec![], source: source }
    }

    /// Register the application model of a project.
    pub fn serve(&mut self, project: ::catalog::ProjectId, app: App) {
        self.apps.push((project, app));
    }

    /// Mark a project's server as reachable or not.
    pub fn set_available(&mut self, project: ::catalog::ProjectId, up: bool) {
        if up {
            self.down.retain(|&down| down != project);
        } else if !self.down.contains(&project) {
            self.down.push(project);
        }
    }
}

impl Transport for SyntheticTransport {
    fn request_work(&mut self, project: &Project, secs: f64) -> Outcome<Vec<Delivery>> {
        if self.down.contains(&project.id) {
            return Ok(None);
        }
        let app = match self.apps.iter().find(|&&(id, _)| id == project.id) {
            Some(&(_, app)) => app,
            _ => raise!("{} has no application model", project.id),
        };
        let mut deliveries = vec![];
        let mut granted = 0.0;
        while granted < secs {
            // no less than one second of work per task
            let fpops = app.fpops.sample(&mut self.source).max(self.speed);
            granted += fpops / self.speed;
            deliveries.push(Delivery {
                fpops: fpops,
                working_set: app.working_set,
                latency: app.latency,
            });
        }
        Ok(Some(deliveries))
    }

    fn report(&mut self, project: &Project, _: &[TaskId]) -> Outcome<()> {
        if self.down.contains(&project.id) {
            Ok(None)
        } else {
            Ok(Some(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use probability::source;

    use catalog::Catalog;
    use lifecycle::{Execution, Lifecycle};
    use sim::{App, Normal};
    use super::{SyntheticLifecycle, SyntheticTransport};
    use transport::Transport;

    #[test]
    fn compute_to_completion() {
        let mut catalog = Catalog::new();
        let project = catalog.attach("one", 1.0).unwrap();
        let workunit = catalog.add_workunit(project, 10e9, 1e6);
        let task = catalog.add_task(project, workunit, 1e9, 10.0, 0.0);

        let mut lifecycle = SyntheticLifecycle::new(1e9);
        let handle = {
            let task = catalog.task(task).unwrap();
            let workunit = catalog.workunit(workunit).unwrap();
            lifecycle.start(task, workunit).unwrap()
        };

        for _ in 0..9 {
            lifecycle.advance(1.0, true);
        }
        assert_eq!(lifecycle.poll(handle).unwrap(), Execution::Running);

        lifecycle.advance(1.0, true);
        assert_eq!(lifecycle.poll(handle).unwrap(), Execution::Completed(10.0));

        assert!(lifecycle.advance(1.0, true).is_empty());
    }

    #[test]
    fn suspension_pauses_progress() {
        let mut catalog = Catalog::new();
        let project = catalog.attach("one", 1.0).unwrap();
        let workunit = catalog.add_workunit(project, 10e9, 1e6);
        let task = catalog.add_task(project, workunit, 1e9, 10.0, 0.0);

        let mut lifecycle = SyntheticLifecycle::new(1e9);
        let handle = {
            let task = catalog.task(task).unwrap();
            let workunit = catalog.workunit(workunit).unwrap();
            lifecycle.start(task, workunit).unwrap()
        };

        lifecycle.suspend(handle).unwrap();
        assert!(lifecycle.advance(5.0, true).is_empty());
        assert_eq!(lifecycle.running(), 0);

        lifecycle.resume(handle).unwrap();
        assert_eq!(lifecycle.advance(5.0, true).len(), 1);
    }

    #[test]
    fn suspension_rolls_back_to_the_checkpoint() {
        let mut catalog = Catalog::new();
        let project = catalog.attach("one", 1.0).unwrap();
        let workunit = catalog.add_workunit(project, 10e9, 1e6);
        let task = catalog.add_task(project, workunit, 1e9, 10.0, 0.0);

        let mut lifecycle = SyntheticLifecycle::new(1e9);
        lifecycle.install(project, 4.0);
        let handle = {
            let task = catalog.task(task).unwrap();
            let workunit = catalog.workunit(workunit).unwrap();
            lifecycle.start(task, workunit).unwrap()
        };

        lifecycle.advance(7.0, true);
        lifecycle.suspend(handle).unwrap();
        lifecycle.resume(handle).unwrap();

        // 7 seconds computed, rolled back to the checkpoint at 4
        lifecycle.advance(5.0, true);
        assert_eq!(lifecycle.poll(handle).unwrap(), Execution::Running);

        lifecycle.advance(1.0, true);
        assert_eq!(lifecycle.poll(handle).unwrap(), Execution::Completed(10.0));
    }

    #[test]
    fn deliveries_cover_the_request() {
        let mut catalog = Catalog::new();
        let project = catalog.attach("one", 1.0).unwrap();

        let mut transport = SyntheticTransport::new(1e9, source::default(42));
        transport.serve(project, App {
            fpops: Normal::new(3600e9, 0.0),
            checkpoint: Normal::new(300.0, 0.0),
            working_set: 1e6,
            latency: 86400.0,
        });

        let deliveries = {
            let project = catalog.project(project).unwrap();
            transport.request_work(project, 7000.0).unwrap().unwrap()
        };
        assert_eq!(deliveries.len(), 2);

        let granted: f64 = deliveries.iter().map(|delivery| delivery.fpops / 1e9).sum();
        assert!(granted >= 7000.0);
    }

    #[test]
    fn unreachable_server() {
        let mut catalog = Catalog::new();
        let project = catalog.attach("one", 1.0).unwrap();

        let mut transport = SyntheticTransport::new(1e9, source::default(42));
        transport.set_available(project, false);

        let outcome = {
            let project = catalog.project(project).unwrap();
            transport.report(project, &[]).unwrap()
        };
        assert_eq!(outcome, None);
    }
}
