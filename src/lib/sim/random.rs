//! Parametric models of randomness.

use probability::distribution::{self, Sample};

use {Config, Result, Source};

/// A normal distribution.
#[derive(Clone, Copy, Debug)]
pub struct Normal {
    /// The mean.
    pub mean: f64,
    /// The variance.
    pub var: f64,
}

/// A uniform distribution.
#[derive(Clone, Copy, Debug)]
pub struct Uniform {
    /// The lower bound.
    pub lo: f64,
    /// The upper bound.
    pub hi: f64,
}

/// A two-state availability process with Poisson-like transitions.
///
/// `frac` is the long-run fraction of time the process is up, and `lambda`
/// scales the mean dwell times, which are exponentially distributed with
/// means `lambda × frac` up and `lambda × (1 − frac)` down.
#[derive(Clone, Copy, Debug)]
pub struct RandomProcess {
    /// The long-run fraction of time up.
    pub frac: f64,
    /// The dwell-time scale in seconds.
    pub lambda: f64,
    up: Option<bool>,
    until: f64,
}

impl Normal {
    /// Create a distribution.
    #[inline]
    pub fn new(mean: f64, var: f64) -> Normal {
        Normal { mean: mean, var: var }
    }

    /// Read a distribution from a configuration.
    pub fn load(config: &Config) -> Result<Normal> {
        let mean = *some!(config.get::<f64>("mean"), "a mean value is required");
        let var = config.get::<f64>("var").map_or(0.0, |&var| var);
        if var < 0.0 {
            raise!("a variance should not be negative");
        }
        Ok(Normal::new(mean, var))
    }

    /// Draw a sample.
    pub fn sample(&self, source: &mut Source) -> f64 {
        if self.var <= 0.0 {
            return self.mean;
        }
        distribution::Gaussian::new(self.mean, self.var.sqrt()).sample(source)
    }
}

impl Uniform {
    /// Create a distribution.
    #[inline]
    pub fn new(lo: f64, hi: f64) -> Uniform {
        Uniform { lo: lo, hi: hi }
    }

    /// Draw a sample.
    pub fn sample(&self, source: &mut Source) -> f64 {
        if self.hi <= self.lo {
            return self.lo;
        }
        distribution::Uniform::new(self.lo, self.hi).sample(source)
    }
}

impl RandomProcess {
    /// Create a process.
    #[inline]
    pub fn new(frac: f64, lambda: f64) -> RandomProcess {
        RandomProcess { frac: frac, lambda: lambda, up: None, until: 0.0 }
    }

    /// Read a process from a configuration.
    pub fn load(config: &Config) -> Result<RandomProcess> {
        let frac = config.get::<f64>("frac").map_or(1.0, |&frac| frac);
        let lambda = config.get::<f64>("lambda").map_or(0.0, |&lambda| lambda);
        if frac < 0.0 || frac > 1.0 {
            raise!("an availability fraction should lie in [0, 1]");
        }
        Ok(RandomProcess::new(frac, lambda))
    }

    /// Advance to a time moment and report whether the process is up.
    pub fn advance(&mut self, time: f64, source: &mut Source) -> bool {
        if self.frac >= 1.0 || self.lambda <= 0.0 {
            return true;
        }
        if self.frac <= 0.0 {
            return false;
        }
        if self.up.is_none() {
            let up = Uniform::new(0.0, 1.0).sample(source) < self.frac;
            self.up = Some(up);
            self.until = time + self.dwell(up, source);
        }
        while self.until <= time {
            let up = !self.up.unwrap_or(true);
            self.up = Some(up);
            self.until += self.dwell(up, source);
        }
        self.up.unwrap_or(true)
    }

    fn dwell(&self, up: bool, source: &mut Source) -> f64 {
        let mean = if up {
            self.lambda * self.frac
        } else {
            self.lambda * (1.0 - self.frac)
        };
        distribution::Exponential::new(1.0 / mean).sample(source)
    }
}

#[cfg(test)]
mod tests {
    use assert;
    use probability::source;

    use super::{Normal, RandomProcess, Uniform};

    #[test]
    fn reproducible() {
        let mut one = source::default(42);
        let mut two = source::default(42);
        let normal = Normal::new(1e9, 1e16);
        for _ in 0..100 {
            assert_eq!(normal.sample(&mut one), normal.sample(&mut two));
        }
    }

    #[test]
    fn uniform_bounds() {
        let mut source = source::default(42);
        let uniform = Uniform::new(2.0, 3.0);
        for _ in 0..100 {
            let sample = uniform.sample(&mut source);
            assert!(sample >= 2.0 && sample <= 3.0);
        }
    }

    #[test]
    fn process_fraction() {
        let mut source = source::default(42);
        let mut process = RandomProcess::new(0.25, 400.0);
        let (mut up, mut total) = (0, 0);
        let mut time = 0.0;
        while time < 2e5 {
            time += 1.0;
            if process.advance(time, &mut source) {
                up += 1;
            }
            total += 1;
        }
        assert::close(&[up as f64 / total as f64], &[0.25], 5e-2);
    }

    #[test]
    fn degenerate_processes() {
        let mut source = source::default(42);
        let mut always = RandomProcess::new(1.0, 100.0);
        let mut never = RandomProcess::new(0.0, 100.0);
        for i in 0..100 {
            assert!(always.advance(i as f64, &mut source));
            assert!(!never.advance(i as f64, &mut source));
        }
    }
}
