//! Setup for the application logging.
//!
//! Log lines go to the standard output with the level defined in the
//! configuration; this includes the once-per-minute stats line the
//! supervisor emits at `info`.
use std::sync::Once;

use log::LevelFilter;

use crate::config::Configuration;

static INIT: Once = Once::new();

/// Redirects the log output to stdout with the configured level. Repeated
/// calls are no-ops.
pub fn setup(cfg: &Configuration) {
    let level = cfg.log_level.map_or(LevelFilter::Info, crate::config::LogLevel::to_level_filter);

    if level == LevelFilter::Off {
        return;
    }

    INIT.call_once(|| init_stdout_logger(level));
}

fn init_stdout_logger(level: LevelFilter) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{timestamp} {level:<5} [{target}] {message}",
                timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
                level = record.level(),
                target = record.target(),
            ));
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .expect("it should only initialize the logger once");

    log::info!("logging initialized");
}
