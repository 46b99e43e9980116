//! Tool for simulating fair-share scheduling of volunteer-computing work.

#[cfg(test)]
extern crate assert;

#[macro_use]
extern crate log;

extern crate configuration;
extern crate probability;

#[macro_use]
mod macros;

mod result;

pub mod catalog;
pub mod fetch;
pub mod gate;
pub mod host;
pub mod intent;
pub mod lifecycle;
pub mod prefs;
pub mod schedule;
pub mod sim;
pub mod state;
pub mod transport;

pub use result::{Error, Result};
pub use state::ClientState;

/// An outcome that can be transiently unavailable.
pub type Outcome<T> = Result<Option<T>>;

/// A configuration.
pub type Config = configuration::Tree;

/// A source of randomness.
pub type Source = probability::source::Default;
