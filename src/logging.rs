//! Upload-trace logging backend.
//!
//! Transfer diagnostics only make sense against the chunk cadence, so every
//! line carries the elapsed time since `init_logging`. Targets outside this
//! crate (the radio stack is chatty at info level during scans) are capped
//! at warnings regardless of the configured level.

use std::env;
use std::sync::OnceLock;
use std::time::Instant;

use log::{self, LevelFilter, Metadata, Record};

struct TraceLogger {
    start: OnceLock<Instant>,
}

impl TraceLogger {
    fn elapsed_secs(&self) -> f64 {
        self.start
            .get()
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl log::Log for TraceLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.target().starts_with("badgelink") {
            metadata.level() <= log::max_level()
        } else {
            metadata.level() <= LevelFilter::Warn.min(log::max_level())
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "[{:9.3}] {:<5} {} - {}",
                self.elapsed_secs(),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: TraceLogger = TraceLogger {
    start: OnceLock::new(),
};

/// Initialize logging with a level taken from the `BADGELINK_LOG` environment
/// variable. Defaults to `info` if the variable is not set or invalid.
/// Timestamps count from this call, so call it before `connect`.
pub fn init_logging() {
    let _ = LOGGER.start.set(Instant::now());
    let level = env::var("BADGELINK_LOG")
        .ok()
        .and_then(|lvl| lvl.parse().ok())
        .unwrap_or(LevelFilter::Info);
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
