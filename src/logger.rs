use std::io::{self, Write};
use std::str::FromStr;

use log::{Level, LevelFilter, Metadata, Record};

/// Environment variable consulted when no `-v` flag is given
pub const LOG_ENV: &str = "EXT2_DUMP_LOG";

struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        // stdout carries the records, diagnostics only ever go to stderr
        let _ = writeln!(
            io::stderr().lock(),
            "[{}] {}: {}",
            level,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Picks the level from the `-v` count, then [`LOG_ENV`], then `warn`.
pub fn level(verbose: u8, env: Option<&str>) -> LevelFilter {
    match verbose {
        0 => env
            .and_then(|s| LevelFilter::from_str(s).ok())
            .unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
