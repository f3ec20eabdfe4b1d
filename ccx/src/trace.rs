//! CCX Trace Points
//!
//! A `log` backend for the hardware debug console. Records from this crate
//! (targets starting with `ccx`) are printed on COM1; records from other
//! targets are dropped unless the module filter is opened with
//! [`set_module_filter`].

use core::sync::atomic::{AtomicBool, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Target prefix of every record emitted by this crate
pub const CCX_TARGET: &str = "ccx";

/// When set, records from any target are printed
static ALL_MODULES: AtomicBool = AtomicBool::new(false);

/// Serial console logger
pub struct CcxLogger;

pub static CCX_LOGGER: CcxLogger = CcxLogger;

impl CcxLogger {
    fn accepts_target(target: &str) -> bool {
        ALL_MODULES.load(Ordering::Relaxed) || target.starts_with(CCX_TARGET)
    }
}

impl Log for CcxLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && Self::accepts_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            crate::serial_println!(
                "[CCX] {} {}: {}",
                level_tag(record.level()),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Fixed-width level tag, matching the firmware's trace format
pub fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Print records from every module, not only `ccx`
pub fn set_module_filter(all_modules: bool) {
    ALL_MODULES.store(all_modules, Ordering::Relaxed);
}

/// Install the serial logger. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    // Another logger may already own the facade; the level still applies
    let _ = log::set_logger(&CCX_LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_filter() {
        set_module_filter(false);
        assert!(CcxLogger::accepts_target("ccx::ap::startup"));
        assert!(!CcxLogger::accepts_target("smu"));
        set_module_filter(true);
        assert!(CcxLogger::accepts_target("smu"));
        set_module_filter(false);
    }

    #[test]
    fn test_level_tags_align() {
        for level in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace] {
            assert_eq!(level_tag(level).len(), 5);
        }
    }
}
