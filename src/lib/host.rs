//! Facts about the host.

/// A snapshot of the host's capabilities.
#[derive(Clone, Copy, Debug)]
pub struct Host {
    /// The number of usable processing units.
    pub units: usize,
    /// The speed of one unit in floating-point operations per second.
    pub flops: f64,
    /// The available memory in bytes.
    pub ram: f64,
}

/// A probe of the host's capabilities.
pub trait Probe {
    /// Return the number of usable processing units.
    fn units(&self) -> usize;

    /// Return the speed of one unit.
    fn flops(&self) -> f64;

    /// Return the available memory.
    fn ram(&self) -> f64;
}

impl Host {
    /// Take a snapshot.
    #[inline]
    pub fn read<T: Probe>(probe: &T) -> Host {
        Host { units: probe.units(), flops: probe.flops(), ram: probe.ram() }
    }
}
