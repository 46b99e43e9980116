#[macro_use]
extern crate log;

extern crate arguments;
extern crate configuration;
extern crate crunch;
extern crate sql;
extern crate sqlite;
extern crate term;

use configuration::format::TOML;
use log::Level;

use crunch::sim::Simulator;

pub use crunch::{Config, Error, Result};

const USAGE: &'static str = "
Usage: crunch [options]

Options:
    --config <path>          Configuration file (required).
    --length <time>          Time span to simulate in seconds [default: 86400].
    --output <path>          Output file for the scheduling trace.

    --verbose                Display progress information.
    --help                   Display this message.
";

macro_rules! raise(
    ($message:expr) => (return Err(::crunch::Error::new($message)));
);

macro_rules! ok(
    ($result:expr) => (match $result {
        Ok(result) => result,
        Err(error) => raise!(error),
    });
);

macro_rules! some(
    ($option:expr, $($arg:tt)*) => (match $option {
        Some(value) => value,
        _ => raise!($($arg)*),
    });
);

mod logger;
mod output;

fn main() {
    start().unwrap_or_else(|error| fail(error));
}

fn start() -> Result<()> {
    let arguments = ok!(arguments::parse(std::env::args()));

    if arguments.get::<bool>("help").unwrap_or(false) {
        help();
    }

    if arguments.get::<bool>("verbose").unwrap_or(false) {
        logger::setup(Level::Info);
    } else {
        logger::setup(Level::Warn);
    }

    let config = ok!(TOML::open(some!(arguments.get::<String>("config"),
                                      "a configuration file is required")));

    let mut simulator = try!(Simulator::new(&config));
    let mut output = try!(output::new(&simulator, arguments.get::<String>("output")));

    let length = arguments.get::<f64>("length").unwrap_or(86400.0);
    info!(target: "Crunch", "Simulating {} seconds...", length);

    let start = std::time::Instant::now();
    while simulator.state.now < length {
        try!(simulator.step());
        info!(target: "Crunch", "{:10.0} s | {} running | {:2} queued",
              simulator.state.now, simulator.running(),
              simulator.state.catalog.runnable_count());
        try!(output.next(&simulator));
    }
    let elapsed = start.elapsed();

    simulator.state.print_deadline_misses();
    info!(target: "Crunch", "{}", simulator.statistics);
    info!(target: "Crunch", "Well done in {:.2} seconds.",
          elapsed.as_secs() as f64 + elapsed.subsec_nanos() as f64 * 1e-9);

    Ok(())
}

fn help() -> ! {
    println!("{}", USAGE.trim());
    std::process::exit(0);
}

#[allow(unused_must_use)]
fn fail(error: Error) -> ! {
    use std::io::Write;
    if let Some(mut output) = term::stderr() {
        output.fg(term::color::RED);
        output.write_all(format!("Error: {}.\n", error).as_bytes());
    }
    std::process::exit(1);
}
