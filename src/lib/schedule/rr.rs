//! Round-robin projection of the runnable workload.

use catalog::{ProjectId, TaskId};
use state::ClientState;

/// The outcome of projecting round-robin sharing forward in time.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    /// The tasks projected to miss their deadlines.
    pub missed: Vec<TaskId>,
    /// The per-project CPU seconds missing to fill the buffer horizon.
    pub shortfall: Vec<(ProjectId, f64)>,
    /// The unit seconds left idle over the buffer horizon.
    pub idle: f64,
}

impl Projection {
    /// Check whether a task is projected to miss its deadline.
    #[inline]
    pub fn missed(&self, id: TaskId) -> bool {
        self.missed.contains(&id)
    }

    /// Return the projected shortfall of a project.
    pub fn shortfall_of(&self, id: ProjectId) -> f64 {
        self.shortfall
            .iter()
            .find(|&&(project, _)| project == id)
            .map_or(0.0, |&(_, shortfall)| shortfall)
    }
}

struct Item {
    task: TaskId,
    project: ProjectId,
    deadline: f64,
    left: f64,
}

impl ClientState {
    /// Project completion times assuming weighted round-robin sharing.
    ///
    /// Every project runs at `units × share / total` of the host, split
    /// evenly over its runnable tasks and capped at one unit per task; no
    /// actual context switching takes place. The projection flags tasks
    /// that would finish past their deadlines under such sharing and
    /// measures how much work each project lacks to keep the host busy
    /// until the work-buffer horizon.
    pub fn rr_simulation(&self) -> Projection {
        let units = self.host.units as f64;
        let window = self.prefs.work_buf_min().max(self.prefs.cpu_scheduling_period);
        let horizon = self.now + window;

        let mut items: Vec<Item> = vec![];
        for task in self.catalog.tasks() {
            if !self.catalog.runnable(task) {
                continue;
            }
            items.push(Item {
                task: task.id,
                project: task.project,
                deadline: task.deadline,
                left: task.remaining.max(0.0),
            });
        }

        let mut projection = Projection::default();
        for project in self.catalog.projects() {
            if !project.suspended && project.share > 0.0 {
                projection.shortfall.push((project.id, 0.0));
            }
        }

        let mut time = self.now;
        let mut busy = 0.0;
        while !items.is_empty() {
            let rates = self.rates(&items, units);
            let mut step = ::std::f64::INFINITY;
            for (item, &rate) in items.iter().zip(&rates) {
                if rate > 0.0 {
                    step = step.min(item.left / rate);
                }
            }
            if !step.is_finite() {
                break;
            }
            let throughput: f64 = rates.iter().sum();
            if time < horizon {
                busy += throughput * step.min(horizon - time);
            }
            time += step;
            let mut i = 0;
            for rate in rates {
                items[i].left -= rate * step;
                if items[i].left <= 1e-9 {
                    if time > items[i].deadline {
                        projection.missed.push(items[i].task);
                    }
                    items.remove(i);
                } else {
                    i += 1;
                }
            }
        }

        // the rate sums accumulate rounding residue on a saturated host
        let idle = units * window - busy;
        projection.idle = if idle > 1e-6 { idle } else { 0.0 };

        let total = self.total_resource_share();
        for &mut (project, ref mut shortfall) in &mut projection.shortfall {
            let share = self.catalog.project(project).map_or(0.0, |project| project.share);
            let entitled = if total > 0.0 { units * share / total * window } else { 0.0 };
            let buffered: f64 = self.catalog
                                    .tasks()
                                    .iter()
                                    .filter(|task| task.project == project && !task.over())
                                    .map(|task| task.remaining.max(0.0))
                                    .sum();
            *shortfall = (entitled - buffered).max(0.0);
        }

        projection
    }

    fn rates(&self, items: &[Item], units: f64) -> Vec<f64> {
        let total = self.total_resource_share();
        let mut rates = vec![0.0; items.len()];
        let mut spare = units;
        let mut flexible = 0.0;
        for project in self.catalog.projects() {
            if project.suspended {
                continue;
            }
            let count = items.iter().filter(|item| item.project == project.id).count();
            if count == 0 {
                continue;
            }
            let entitled = if total > 0.0 {
                units * project.share / total
            } else {
                units / self.catalog.projects().len() as f64
            };
            // a project cannot use more units than it has tasks
            let granted = entitled.min(count as f64);
            spare -= granted;
            if granted >= entitled {
                flexible += count as f64 - granted;
            }
            let rate = granted / count as f64;
            for (item, slot) in items.iter().zip(rates.iter_mut()) {
                if item.project == project.id {
                    *slot = rate;
                }
            }
        }
        // hand the capacity freed by capped projects to the ones with headroom
        if spare > 1e-9 && flexible > 1e-9 {
            for slot in rates.iter_mut() {
                if *slot < 1.0 {
                    *slot = (*slot + spare / flexible).min(1.0);
                }
            }
        }
        rates
    }
}
