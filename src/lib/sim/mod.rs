//! Replay of the scheduler against synthetic models.
//!
//! Nothing here runs real processes or touches a network: time is a virtual
//! clock, projects and the host flip between up and down according to random
//! processes, and tasks complete when their accumulated simulated CPU time
//! covers the sampled operation count of their workunits.

use probability::source;
use std::fmt;

use catalog::{ProjectId, TaskState};
use gate::Gate;
use host::{Host, Probe};
use intent::Intent;
use lifecycle::{Execution, Lifecycle};
use prefs::Prefs;
use state::ClientState;
use transport::Transport;
use {Config, Result, Source};

mod random;
mod synthetic;

pub use self::random::{Normal, RandomProcess, Uniform};
pub use self::synthetic::{SyntheticLifecycle, SyntheticTransport};

/// A model of an application.
#[derive(Clone, Copy, Debug)]
pub struct App {
    /// The distribution of operation counts.
    pub fpops: Normal,
    /// The distribution of checkpoint periods.
    pub checkpoint: Normal,
    /// The memory working set in bytes.
    pub working_set: f64,
    /// The seconds between delivery and deadline.
    pub latency: f64,
}

/// A model of a project.
pub struct SimProject {
    /// The catalog identifier.
    pub id: ProjectId,
    /// The availability of the project's server.
    pub available: RandomProcess,
    /// The application supplying the project's work.
    pub app: App,
}

/// A model of a host.
pub struct SimHost {
    /// The number of processing units.
    pub units: usize,
    /// The speed of one unit.
    pub flops: f64,
    /// The available memory in bytes.
    pub ram: f64,
    /// The availability of the machine.
    pub available: RandomProcess,
    /// The idleness of the machine's user.
    pub idle: RandomProcess,
}

/// Statistics accumulated over a run.
#[derive(Clone, Copy, Debug, Default)]
pub struct Statistics {
    /// The number of completed tasks.
    pub completed: usize,
    /// The number of tasks finished past their deadlines.
    pub missed: usize,
    /// The number of tasks given up on.
    pub errors: usize,
    /// The unit seconds spent computing.
    pub busy: f64,
    /// The unit seconds the host was up.
    pub capacity: f64,
    /// The number of work requests fired.
    pub requests: usize,
    /// The CPU seconds requested in total.
    pub requested: f64,
    /// The number of tasks delivered.
    pub delivered: usize,
    /// The spread between the largest and smallest debts.
    pub debt_spread: f64,
}

/// A simulator of the whole client.
pub struct Simulator {
    /// The state driven by the control loop.
    pub state: ClientState,
    /// The statistics of the run so far.
    pub statistics: Statistics,
    host: SimHost,
    projects: Vec<SimProject>,
    lifecycle: SyntheticLifecycle,
    transport: SyntheticTransport,
    gate: Gate,
    source: Source,
    step: f64,
}

impl App {
    /// Read a model from a configuration.
    pub fn load(config: &Config) -> Result<App> {
        let fpops = try!(Normal::load(&some!(config.branch("fpops"),
                                             "an operation-count distribution is required")));
        let checkpoint = match config.branch("checkpoint") {
            Some(ref config) => try!(Normal::load(config)),
            _ => Normal::new(300.0, 0.0),
        };
        let working_set = config.get::<f64>("working_set").map_or(0.0, |&value| value);
        let latency = config.get::<f64>("latency_bound").map_or(86400.0, |&value| value);
        if fpops.mean <= 0.0 {
            raise!("an operation count should be positive");
        }
        Ok(App {
            fpops: fpops,
            checkpoint: checkpoint,
            working_set: working_set,
            latency: latency,
        })
    }
}

impl SimHost {
    /// Read a model from a configuration.
    pub fn load(config: &Config) -> Result<SimHost> {
        let units = config.get::<i64>("units").map_or(1, |&units| units);
        if units < 1 {
            raise!("a host needs at least one processing unit");
        }
        let available = match config.branch("available") {
            Some(ref config) => try!(RandomProcess::load(config)),
            _ => RandomProcess::new(1.0, 0.0),
        };
        let idle = match config.branch("idle") {
            Some(ref config) => try!(RandomProcess::load(config)),
            _ => RandomProcess::new(1.0, 0.0),
        };
        Ok(SimHost {
            units: units as usize,
            flops: config.get::<f64>("flops").map_or(1e9, |&value| value),
            ram: config.get::<f64>("ram").map_or(8e9, |&value| value),
            available: available,
            idle: idle,
        })
    }
}

impl Probe for SimHost {
    #[inline]
    fn units(&self) -> usize {
        self.units
    }

    #[inline]
    fn flops(&self) -> f64 {
        self.flops
    }

    #[inline]
    fn ram(&self) -> f64 {
        self.ram
    }
}

impl Statistics {
    /// Return the fraction of the available capacity spent computing.
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0.0 {
            self.busy / self.capacity
        } else {
            0.0
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter,
               "completed {} tasks ({} past deadline, {} failed), utilization {:.2}, \
                fetched {} tasks over {} requests for {:.0} CPU seconds, debt spread {:.0}",
               self.completed, self.missed, self.errors, self.utilization(),
               self.delivered, self.requests, self.requested, self.debt_spread)
    }
}

impl Simulator {
    /// Create a simulator from a configuration.
    pub fn new(config: &Config) -> Result<Simulator> {
        let seed = config.get::<i64>("seed").map_or(42, |&seed| seed as u64);
        let host = try!(SimHost::load(&config.branch("host")
                                             .unwrap_or_else(|| Config::new())));
        let prefs = try!(Prefs::new(&config.branch("preferences")
                                           .unwrap_or_else(|| Config::new())));
        let step = config.get::<f64>("step").map_or(60.0, |&step| step);
        let spacing = config.get::<f64>("rpc_spacing").map_or(600.0, |&value| value);

        let mut descriptions = vec![];
        if let Some(ref configs) = config.forest("projects") {
            for (i, config) in configs.iter().enumerate() {
                let name = config.get::<String>("name")
                                 .map_or_else(|| format!("project-{}", i), |name| name.clone());
                let share = *some!(config.get::<f64>("share"), "a resource share is required");
                let available = match config.branch("available") {
                    Some(ref config) => try!(RandomProcess::load(config)),
                    _ => RandomProcess::new(1.0, 0.0),
                };
                let app = try!(App::load(&some!(config.branch("app"),
                                                "an application model is required")));
                descriptions.push((name, share, available, app));
            }
        }
        if descriptions.is_empty() {
            raise!("at least one project is required");
        }

        Simulator::assemble(host, prefs, descriptions, seed, step, spacing)
    }

    /// Create a simulator from already constructed models.
    pub fn assemble(host: SimHost, prefs: Prefs,
                    descriptions: Vec<(String, f64, RandomProcess, App)>, seed: u64,
                    step: f64, spacing: f64) -> Result<Simulator> {

        if step <= 0.0 {
            raise!("a time step should be positive");
        }
        let mut state = ClientState::new(Host::read(&host), prefs);
        let mut transport = SyntheticTransport::new(host.flops,
                                                    source::default(seed ^ 0x9e3779b97f4a7c15));
        let mut lifecycle = SyntheticLifecycle::new(host.flops);
        let mut projects = vec![];
        for (name, share, available, app) in descriptions {
            let id = try!(state.catalog.attach(name, share));
            transport.serve(id, app);
            lifecycle.install(id, app.checkpoint.mean);
            projects.push(SimProject { id: id, available: available, app: app });
        }
        Ok(Simulator {
            state: state,
            statistics: Statistics::default(),
            lifecycle: lifecycle,
            host: host,
            projects: projects,
            transport: transport,
            gate: Gate::new(spacing),
            source: source::default(seed),
            step: step,
        })
    }

    /// Advance the simulation to cover the given time span.
    pub fn simulate(&mut self, duration: f64) -> Result<()> {
        let until = self.state.now + duration;
        while self.state.now < until {
            try!(self.step());
        }
        self.state.print_deadline_misses();
        info!(target: "Simulator", "{}", self.statistics);
        Ok(())
    }

    /// Advance the simulation by one control-loop pass.
    pub fn step(&mut self) -> Result<()> {
        let now = self.state.now + self.step;
        self.state.now = now;
        self.state.poll(&self.host);

        let available = self.host.available.advance(now, &mut self.source);
        let idle = self.host.idle.advance(now, &mut self.source);
        let host_up = available && idle;
        for project in self.projects.iter_mut() {
            let up = project.available.advance(now, &mut self.source);
            self.transport.set_available(project.id, up);
        }

        if host_up {
            self.statistics.capacity += self.host.units as f64 * self.step;
        }
        for (task, secs) in self.lifecycle.advance(self.step, host_up) {
            self.statistics.busy += secs;
            self.state.accrue(task, secs);
        }

        try!(self.finish());
        self.state.check_project_timeout();
        try!(self.exchange());
        try!(self.state.possibly_schedule_cpus(&mut self.lifecycle));

        self.measure();
        Ok(())
    }

    /// Count the tasks computing right now.
    #[inline]
    pub fn running(&self) -> usize {
        self.lifecycle.running()
    }

    fn finish(&mut self) -> Result<()> {
        let mut done = vec![];
        for active in self.state.active.clone() {
            match try!(self.lifecycle.poll(active.handle)) {
                Execution::Completed(cpu) => done.push((active, cpu, false)),
                Execution::Error => done.push((active, 0.0, true)),
                Execution::Running => {},
            }
        }
        for (active, cpu, failed) in done {
            let now = self.state.now;
            let (estimate, deadline) = {
                let task = some!(self.state.catalog.task_mut(active.task));
                task.state = if failed { TaskState::Error } else { TaskState::Completed };
                task.finished = Some(now);
                task.remaining = 0.0;
                task.done = 1.0;
                (task.estimate, task.deadline)
            };
            self.lifecycle.release(active.handle);
            self.state.active.retain(|candidate| candidate.handle != active.handle);
            if failed {
                self.statistics.errors += 1;
                warn!(target: "Simulator", "{} failed.", active.task);
            } else {
                self.statistics.completed += 1;
                if now > deadline {
                    self.statistics.missed += 1;
                    warn!(target: "Simulator", "{} finished {:.0} seconds late.",
                          active.task, now - deadline);
                } else {
                    info!(target: "Simulator", "{} finished on time.", active.task);
                }
                if estimate > 0.0 {
                    self.state.scale_duration_correction_factors(cpu / estimate);
                }
            }
            self.state.intents.push(Intent::Schedule, "a task finished");
            self.state.intents.push(Intent::Fetch, "a task finished");
        }
        Ok(())
    }

    fn exchange(&mut self) -> Result<()> {
        self.state.intents.take(Intent::Fetch);
        self.state.compute_work_requests();
        let project = match self.gate.next(&self.state) {
            Some(project) => project,
            _ => return Ok(()),
        };
        let now = self.state.now;

        let finished: Vec<_> = self.state
                                   .catalog
                                   .tasks()
                                   .iter()
                                   .filter(|task| task.project == project && task.over() &&
                                                  task.finished.is_some())
                                   .map(|task| task.id)
                                   .collect();
        if !finished.is_empty() {
            let acked = {
                let subject = some!(self.state.catalog.project(project));
                try!(self.transport.report(subject, &finished))
            };
            match acked {
                Some(()) => {
                    for id in finished {
                        self.state.catalog.remove_task(id);
                    }
                    if let Some(subject) = self.state.catalog.project_mut(project) {
                        subject.last_report = now;
                    }
                },
                _ => {
                    debug!(target: "Simulator", "{} is unreachable.", project);
                    self.gate.defer(project, now);
                    return Ok(());
                },
            }
        }

        let secs = self.state
                       .catalog
                       .project(project)
                       .map_or(0.0, |project| project.work_request);
        if secs > 0.0 {
            let delivered = {
                let subject = some!(self.state.catalog.project(project));
                try!(self.transport.request_work(subject, secs))
            };
            match delivered {
                Some(deliveries) => {
                    self.statistics.requests += 1;
                    self.statistics.requested += secs;
                    self.statistics.delivered += deliveries.len();
                    for delivery in deliveries {
                        let workunit = self.state.catalog.add_workunit(project, delivery.fpops,
                                                                       delivery.working_set);
                        let estimate = {
                            let workunit = some!(self.state.catalog.workunit(workunit)).clone();
                            self.state.estimate_cpu_time(&workunit)
                        };
                        self.state.catalog.add_task(project, workunit, now + delivery.latency,
                                                    estimate, now);
                    }
                    self.state.intents.push(Intent::Schedule, "work arrived");
                },
                _ => {
                    debug!(target: "Simulator", "{} is unreachable.", project);
                    self.gate.defer(project, now);
                    return Ok(());
                },
            }
        }

        self.gate.fired(project, now);
        Ok(())
    }

    fn measure(&mut self) {
        let mut debts: Vec<f64> = self.state
                                      .catalog
                                      .projects()
                                      .iter()
                                      .map(|project| project.debt)
                                      .collect();
        debts.sort_by(|one, other| one.partial_cmp(other).unwrap_or(::std::cmp::Ordering::Equal));
        if let (Some(&min), Some(&max)) = (debts.first(), debts.last()) {
            self.statistics.debt_spread = self.statistics.debt_spread.max(max - min);
        }
    }
}

#[cfg(test)]
mod tests {
    use prefs::Prefs;
    use super::{App, Normal, RandomProcess, SimHost, Simulator};

    fn host(units: usize) -> SimHost {
        SimHost {
            units: units,
            flops: 1e9,
            ram: 8e9,
            available: RandomProcess::new(1.0, 0.0),
            idle: RandomProcess::new(1.0, 0.0),
        }
    }

    fn app(secs: f64, latency: f64) -> App {
        App {
            fpops: Normal::new(secs * 1e9, (0.1 * secs * 1e9) * (0.1 * secs * 1e9)),
            checkpoint: Normal::new(300.0, 0.0),
            working_set: 1e6,
            latency: latency,
        }
    }

    fn simulator(units: usize, shares: &[f64]) -> Simulator {
        let mut prefs = Prefs::default();
        prefs.cpu_scheduling_period = 600.0;
        prefs.debt_interval_min = 600.0;
        prefs.deadline_slack = 0.0;
        let descriptions = shares.iter()
                                 .enumerate()
                                 .map(|(i, &share)| {
                                     (format!("project-{}", i), share,
                                      RandomProcess::new(1.0, 0.0), app(1800.0, 86400.0))
                                 })
                                 .collect();
        Simulator::assemble(host(units), prefs, descriptions, 42, 60.0, 600.0).unwrap()
    }

    #[test]
    fn busy_host_stays_within_bounds() {
        let mut simulator = simulator(2, &[1.0, 2.0]);
        simulator.simulate(86400.0).unwrap();

        assert!(simulator.statistics.completed > 0);
        assert!(simulator.statistics.utilization() <= 1.0 + 1e-10);
        assert!(simulator.statistics.requested > 0.0);
        assert!(simulator.running() <= 2);
    }

    #[test]
    fn shares_steer_cpu_time() {
        let mut simulator = simulator(1, &[1.0, 2.0]);
        simulator.simulate(7.0 * 86400.0).unwrap();

        let one = simulator.state.catalog.projects()[0].debt.abs();
        let two = simulator.state.catalog.projects()[1].debt.abs();
        let scale = simulator.statistics.busy.max(1.0);
        // debts stay small relative to the CPU time distributed
        assert!(one / scale < 0.1, "debt {} vs busy {}", one, scale);
        assert!(two / scale < 0.1, "debt {} vs busy {}", two, scale);
    }

    #[test]
    fn flaky_host_still_completes_work() {
        let mut prefs = Prefs::default();
        prefs.cpu_scheduling_period = 600.0;
        prefs.debt_interval_min = 600.0;
        let mut host = host(1);
        host.available = RandomProcess::new(0.5, 7200.0);
        let descriptions = vec![
            ("solo".to_string(), 1.0, RandomProcess::new(0.8, 3600.0), app(1800.0, 7.0 * 86400.0)),
        ];
        let mut simulator = Simulator::assemble(host, prefs, descriptions, 42, 60.0, 600.0)
                                      .unwrap();
        simulator.simulate(7.0 * 86400.0).unwrap();

        assert!(simulator.statistics.completed > 0);
        assert!(simulator.statistics.capacity < 7.0 * 86400.0);
    }

    #[test]
    fn reproducible_runs() {
        let mut one = simulator(2, &[1.0, 2.0]);
        let mut two = simulator(2, &[1.0, 2.0]);
        one.simulate(86400.0).unwrap();
        two.simulate(86400.0).unwrap();

        assert_eq!(one.statistics.completed, two.statistics.completed);
        assert_eq!(one.statistics.requests, two.statistics.requests);
        assert_eq!(one.statistics.busy, two.statistics.busy);
    }
}
