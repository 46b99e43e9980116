//! CPU scheduling.

use Result;
use catalog::TaskState;
use intent::Intent;
use lifecycle::Lifecycle;
use state::{Active, ClientState};

mod deadline;
mod debt;
mod rr;

pub use self::rr::Projection;

impl ClientState {
    /// Rebuild the decision set for the current interval.
    ///
    /// Debts are folded in first, then deadline-pressed tasks claim unit
    /// slots, and the remainder fills up by repeatedly taking the most owed
    /// project's best task. A task joins only if its working set fits the
    /// memory left by the tasks picked before it.
    pub fn schedule_cpus(&mut self) {
        self.adjust_debts();
        let projection = self.rr_simulation();

        let units = self.host.units;
        let mut ram = self.host.ram;
        let mut picked = Vec::with_capacity(units);
        let mut excluded = vec![];

        while picked.len() < units {
            let id = match self.earliest_deadline_result(&projection, &excluded) {
                Some(id) => id,
                _ => break,
            };
            excluded.push(id);
            if self.admit(id, &mut ram) {
                picked.push(id);
            }
        }
        while picked.len() < units {
            let id = match self.largest_debt_project_best_result(&excluded) {
                Some(id) => id,
                _ => break,
            };
            excluded.push(id);
            if self.admit(id, &mut ram) {
                picked.push(id);
            }
        }

        debug!(target: "Schedule", "Scheduled {} of {} units at {:.0}.",
               picked.len(), units, self.now);
        self.ordered = picked;
        self.last_schedule = self.now;
        self.intents.push(Intent::Enforce, "the decision set was rebuilt");
    }

    /// Reconcile the decision set with the live active set.
    ///
    /// Tasks losing their slots are suspended before any new task starts, so
    /// neither the unit count nor the available memory is exceeded at any
    /// instant of the transition. A task failing to start repeatedly is
    /// marked as an error and queued for reporting.
    pub fn enforce_schedule<L: Lifecycle>(&mut self, lifecycle: &mut L) -> Result<()> {
        for i in 0..self.active.len() {
            if self.ordered.contains(&self.active[i].task) || self.active[i].suspended {
                continue;
            }
            let (task, handle) = (self.active[i].task, self.active[i].handle);
            try!(lifecycle.suspend(handle));
            self.active[i].suspended = true;
            if let Some(task) = self.catalog.task_mut(task) {
                if task.state == TaskState::Scheduled {
                    task.state = TaskState::Unscheduled;
                }
            }
            info!(target: "Schedule", "Preempted {}.", task);
        }

        let ordered = self.ordered.clone();
        for id in ordered {
            if let Some(position) = self.active.iter().position(|active| active.task == id) {
                if self.active[position].suspended {
                    try!(lifecycle.resume(self.active[position].handle));
                    self.active[position].suspended = false;
                    if let Some(task) = self.catalog.task_mut(id) {
                        task.state = TaskState::Scheduled;
                    }
                }
                continue;
            }

            let started = {
                let task = some!(self.catalog.task(id));
                let workunit = some!(self.catalog.workunit(task.workunit));
                lifecycle.start(task, workunit)
            };
            match started {
                Ok(handle) => {
                    self.active.push(Active { task: id, handle: handle, suspended: false });
                    if let Some(task) = self.catalog.task_mut(id) {
                        task.state = TaskState::Scheduled;
                    }
                    info!(target: "Schedule", "Started {}.", id);
                },
                Err(error) => {
                    let limit = self.prefs.start_retry_limit;
                    if let Some(task) = self.catalog.task_mut(id) {
                        task.failures += 1;
                        if task.failures >= limit {
                            task.state = TaskState::Error;
                            task.finished = Some(self.now);
                            warn!(target: "Schedule", "Gave up on {}: {}.", id, error);
                        } else {
                            warn!(target: "Schedule", "Failed to start {}: {}.", id, error);
                        }
                    }
                },
            }
        }

        debug_assert!(self.running_count() <= self.host.units);
        debug_assert!(self.occupied_ram() <= self.host.ram);
        Ok(())
    }

    /// Run a scheduling pass if anything calls for one.
    ///
    /// Without a pending intent or an elapsed scheduling period, this is a
    /// cheap no-op, which lets event sources request scheduling freely.
    pub fn possibly_schedule_cpus<L: Lifecycle>(&mut self, lifecycle: &mut L) -> Result<bool> {
        let due = self.now - self.last_schedule >= self.prefs.cpu_scheduling_period;
        if !self.intents.take(Intent::Schedule) && !due {
            if self.intents.take(Intent::Enforce) {
                try!(self.enforce_schedule(lifecycle));
                return Ok(true);
            }
            return Ok(false);
        }
        self.schedule_cpus();
        self.intents.take(Intent::Enforce);
        try!(self.enforce_schedule(lifecycle));
        Ok(true)
    }

    /// Check whether there are fewer runnable tasks than usable units.
    #[inline]
    pub fn no_work_for_a_cpu(&self) -> bool {
        self.catalog.runnable_count() < self.host.units
    }

    fn admit(&self, id: ::catalog::TaskId, ram: &mut f64) -> bool {
        let working_set = self.catalog
                              .task(id)
                              .and_then(|task| self.catalog.workunit(task.workunit))
                              .map_or(0.0, |workunit| workunit.working_set);
        if working_set > *ram {
            debug!(target: "Schedule", "{} does not fit in memory.", id);
            return false;
        }
        *ram -= working_set;
        true
    }
}
