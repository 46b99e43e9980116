//! Deadline pressure on the schedule.

use catalog::TaskId;
use schedule::Projection;
use state::ClientState;

impl ClientState {
    /// Return the unscheduled runnable task in most danger of missing its
    /// deadline, provided it can still make it.
    ///
    /// Only tasks the round-robin projection flags as missing qualify; fair
    /// sharing suffices for the rest. A task that cannot finish in time even
    /// running uninterrupted is reported and left to the debt ranking
    /// instead of being retried against this check.
    pub fn earliest_deadline_result(&self, projection: &Projection, taken: &[TaskId])
                                    -> Option<TaskId> {

        let slack = self.prefs.deadline_slack;
        let mut best: Option<(f64, TaskId)> = None;
        for task in self.catalog.tasks() {
            if !self.catalog.runnable(task) || taken.contains(&task.id) {
                continue;
            }
            if !projection.missed(task.id) {
                continue;
            }
            if self.now + task.remaining > task.deadline - slack {
                debug!(target: "Deadline", "{} cannot finish by its deadline.", task.id);
                continue;
            }
            match best {
                Some((deadline, _)) if deadline <= task.deadline => {},
                _ => best = Some((task.deadline, task.id)),
            }
        }
        best.map(|(_, id)| id)
    }

    /// Log the tasks whose deadlines have already passed.
    pub fn print_deadline_misses(&self) {
        for task in self.catalog.tasks() {
            if task.over() || task.deadline >= self.now {
                continue;
            }
            warn!(target: "Deadline", "{} missed its deadline by {:.0} seconds.",
                  task.id, self.now - task.deadline);
        }
    }
}
