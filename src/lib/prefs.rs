//! Preferences for the control loop.

use {Config, Result};

/// A read-only snapshot of the scheduling preferences.
///
/// The numeric defaults are policy parameters, not constants dictated by the
/// algorithms; each can be overridden through the configuration.
#[derive(Clone, Copy, Debug)]
pub struct Prefs {
    /// The minimum of buffered work in days.
    pub work_buf_min_days: f64,
    /// The maximum of buffered work in days.
    pub work_buf_max_days: f64,
    /// The seconds between unsolicited scheduling passes.
    pub cpu_scheduling_period: f64,
    /// The minimum length of a debt interval in seconds.
    pub debt_interval_min: f64,
    /// The safety margin subtracted from deadlines in seconds.
    pub deadline_slack: f64,
    /// The seconds after which an unacknowledged report is overdue.
    pub report_grace: f64,
    /// The number of start failures tolerated per task.
    pub start_retry_limit: usize,
    /// The smoothing rate of duration-correction updates.
    pub correction_rate: f64,
    /// The lower bound of duration-correction factors.
    pub correction_min: f64,
    /// The upper bound of duration-correction factors.
    pub correction_max: f64,
    /// The number of pending uploads that pauses work fetch.
    pub upload_limit: usize,
    /// An override of the usable unit count.
    pub max_units: Option<usize>,
}

impl Prefs {
    /// Read the preferences from a configuration.
    pub fn new(config: &Config) -> Result<Prefs> {
        let mut prefs = Prefs::default();
        macro_rules! read(
            ($name:ident, f64) => (
                if let Some(&value) = config.get::<f64>(stringify!($name)) {
                    prefs.$name = value;
                }
            );
            ($name:ident, usize) => (
                if let Some(&value) = config.get::<i64>(stringify!($name)) {
                    prefs.$name = value as usize;
                }
            );
        );
        read!(work_buf_min_days, f64);
        read!(work_buf_max_days, f64);
        read!(cpu_scheduling_period, f64);
        read!(debt_interval_min, f64);
        read!(deadline_slack, f64);
        read!(report_grace, f64);
        read!(start_retry_limit, usize);
        read!(correction_rate, f64);
        read!(correction_min, f64);
        read!(correction_max, f64);
        read!(upload_limit, usize);
        if let Some(&units) = config.get::<i64>("max_units") {
            prefs.max_units = Some(units as usize);
        }
        if prefs.work_buf_max_days < prefs.work_buf_min_days {
            raise!("the maximal work buffer should not be below the minimal one");
        }
        Ok(prefs)
    }

    /// Return the minimum of buffered work in seconds.
    #[inline]
    pub fn work_buf_min(&self) -> f64 {
        self.work_buf_min_days * 86400.0
    }

    /// Return the maximum of buffered work in seconds.
    #[inline]
    pub fn work_buf_max(&self) -> f64 {
        self.work_buf_max_days * 86400.0
    }
}

impl Default for Prefs {
    fn default() -> Prefs {
        Prefs {
            work_buf_min_days: 0.1,
            work_buf_max_days: 0.2,
            cpu_scheduling_period: 3600.0,
            debt_interval_min: 60.0,
            deadline_slack: 60.0,
            report_grace: 86400.0,
            start_retry_limit: 3,
            correction_rate: 0.1,
            correction_min: 0.01,
            correction_max: 100.0,
            upload_limit: 16,
            max_units: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Prefs;

    #[test]
    fn defaults() {
        let prefs = Prefs::default();
        assert_eq!(prefs.work_buf_min(), 8640.0);
        assert!(prefs.work_buf_max() >= prefs.work_buf_min());
    }
}
