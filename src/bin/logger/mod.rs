use log::{self, Level};

mod terminal;

use self::terminal::Terminal;

#[allow(unused_must_use)]
pub fn setup(level: Level) {
    log::set_max_level(level.to_level_filter());
    log::set_boxed_logger(Box::new(Terminal(level)));
}
