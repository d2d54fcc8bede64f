#![cfg(feature = "std")]

use std::env;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable holding the log level, e.g. `TETRIS_DUEL_LOG=debug`.
pub const LOG_ENV: &str = "TETRIS_DUEL_LOG";

/// Stderr logger prefixing each line with seconds since start-up.
///
/// Stdout is left to the renderer and the JSON reports.
struct StderrLogger {
    started: OnceLock<Instant>,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.get_or_init(Instant::now).elapsed();
        let target = record.target().trim_start_matches("tetris_duel::");
        eprintln!(
            "[{:>8.3}] {:<5} {}: {}",
            elapsed.as_secs_f64(),
            record.level(),
            target,
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger {
    started: OnceLock::new(),
};

fn level_from_env() -> LevelFilter {
    env::var(LOG_ENV)
        .ok()
        .and_then(|lvl| lvl.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install the stderr logger at the level named by [`LOG_ENV`], `info` when
/// unset or unparsable. Calling it again is harmless.
pub fn init_logging() {
    let level = level_from_env();
    if log::set_logger(&LOGGER).is_ok() {
        LOGGER.started.get_or_init(Instant::now);
        log::set_max_level(level);
    }
}
