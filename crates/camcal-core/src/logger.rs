//! Minimal stderr logger.
//!
//! Lines look like `[  1.234s  INFO session] message`. Records from crates
//! outside the `camcal` family are shown only at `Warn` and above unless
//! the level is `Trace`. Install it once at startup with `init_with_level`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "camcal";

#[cfg(feature = "tracing")]
const OWN_CRATES: [&str; 4] = ["camcal", "camcal_core", "camcal_chessboard", "camcal_solver"];

fn is_own_target(target: &str) -> bool {
    target.starts_with(OWN_PREFIX)
}

/// `camcal_core::session` → `session`, `camcal` → `camcal`.
fn short_target(target: &str) -> &str {
    target.split_once("::").map_or(target, |(_, rest)| rest)
}

struct CamcalLogger {
    level: LevelFilter,
    started: Instant,
}

impl CamcalLogger {
    fn admits(&self, target: &str, level: Level) -> bool {
        if level > self.level {
            return false;
        }
        is_own_target(target) || level <= Level::Warn || self.level == LevelFilter::Trace
    }
}

impl Log for CamcalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.admits(metadata.target(), metadata.level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<CamcalLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs; later calls just return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| CamcalLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// `EnvFilter` directives matching the stderr logger's rules for `level`.
#[cfg(feature = "tracing")]
fn default_directives(level: LevelFilter) -> String {
    let own = level.as_str().to_ascii_lowercase();
    if level == LevelFilter::Trace {
        return own;
    }
    let others = level.min(LevelFilter::Warn).as_str().to_ascii_lowercase();
    let mut directives = others;
    for krate in OWN_CRATES {
        directives.push_str(&format!(",{krate}={own}"));
    }
    directives
}

/// Install a `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the camcal crates log at `level` and
/// everything else is capped at `Warn`, as with [`init_with_level`]. `json`
/// switches to flattened JSON events for machine consumption.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
