//! TEAM_452: stderr logger for the host driver.

use log::{LevelFilter, Metadata, Record};

static LOGGER: SimpleLogger = SimpleLogger;

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let thread = std::thread::current();
            eprintln!(
                "{:<5} {:>8} {}",
                record.level(),
                thread.name().unwrap_or("?"),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Install the logger with `max_level` as the runtime filter.
pub fn init(max_level: LevelFilter) -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("failed to set logger: {e}"))?;
    log::set_max_level(max_level);
    Ok(())
}
