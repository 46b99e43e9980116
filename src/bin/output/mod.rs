use std::path::Path;

use crunch::sim::Simulator;
use Result;

mod database;
mod null;

use self::database::Database;
use self::null::Null;

pub trait Output {
    fn next(&mut self, &Simulator) -> Result<()>;
}

pub fn new<T: AsRef<Path>>(simulator: &Simulator, output: Option<T>) -> Result<Box<Output>> {
    Ok(match output {
        Some(output) => Box::new(try!(Database::new(simulator, output))),
        _ => Box::new(Null),
    })
}
