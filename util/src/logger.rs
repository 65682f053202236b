//! Logger initialisation
//!
//! Logs go to two places. The terminal gets coloured level tags and is capped at `Info`, so a long
//! replay stays readable. The session log file gets every record down to the requested level,
//! without colour codes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern::{Dispatch, FormatCallback};
use log::{info, Level, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level shown on the terminal.
const CONSOLE_MAX_LEVEL: LevelFilter = LevelFilter::Info;

/// Crate prefixes removed from record targets.
const TARGET_PREFIXES: [&str; 2] = ["rover_lib::", "util::"];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of `INFO` or more verbose, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` applies to the session log file and must be `Info` or more verbose. The terminal
/// shows at most `Info`.
///
/// Must only be called once per execution.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let console = Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, true))
        .level(console_level(min_level))
        .chain(std::io::stdout());

    let file = Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, false))
        .chain(log_file);

    Dispatch::new()
        .level(min_level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?} (terminal {:?})", min_level, console_level(min_level));
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Write one record as `[elapsed LVL] message`, with the shortened target included for records
/// below `Info`.
fn format_record(out: FormatCallback, message: &Arguments, record: &Record, colour: bool) {
    let elapsed = session::get_elapsed_seconds();

    let tag = if colour {
        coloured_tag(record.level()).to_string()
    } else {
        plain_tag(record.level()).to_string()
    };

    if record.level() > Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            elapsed,
            tag,
            short_target(record.target()),
            message
        ))
    } else {
        out.finish(format_args!("[{:10.6} {}] {}", elapsed, tag, message))
    }
}

fn console_level(min_level: LevelFilter) -> LevelFilter {
    min_level.min(CONSOLE_MAX_LEVEL)
}

/// Strip the workspace crate name from a target, `rover_lib::per::warp` becomes `per::warp`.
fn short_target(target: &str) -> &str {
    TARGET_PREFIXES
        .iter()
        .find_map(|p| target.strip_prefix(p))
        .unwrap_or(target)
}

fn plain_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn coloured_tag(level: Level) -> ColoredString {
    let tag = plain_tag(level);

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_console_level() {
        assert_eq!(console_level(LevelFilter::Trace), LevelFilter::Info);
        assert_eq!(console_level(LevelFilter::Debug), LevelFilter::Info);
        assert_eq!(console_level(LevelFilter::Info), LevelFilter::Info);
    }

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("rover_lib::per::warp"), "per::warp");
        assert_eq!(short_target("util::session"), "session");
        assert_eq!(short_target("rover_exec"), "rover_exec");
        assert_eq!(short_target("csv::writer"), "csv::writer");
    }

    #[test]
    fn test_plain_tag() {
        assert_eq!(plain_tag(Level::Warn), "WRN");
        assert_eq!(plain_tag(Level::Trace), "TRC");
    }
}
