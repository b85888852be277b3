use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record};

pub struct MinimalLogger;

impl log::Log for MinimalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_string = match record.level() {
            Level::Error => record.level().to_string().red(),
            Level::Warn => record.level().to_string().yellow(),
            Level::Info => record.level().to_string().cyan(),
            Level::Debug => record.level().to_string().purple(),
            Level::Trace => record.level().to_string().normal(),
        };

        // Only errors go to stderr, so that draws can be piped
        if record.level() > LevelFilter::Error {
            println!("{:<5} {}", level_string, record.args());
        } else {
            eprintln!("{:<5} {}", level_string, record.args());
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod test {
    use log::{Level, LevelFilter, Log, Metadata};

    use super::MinimalLogger;

    #[test]
    fn test_enabled_follows_max_level() {
        let metadata = |level| Metadata::builder().level(level).target("dlcoal").build();

        log::set_max_level(LevelFilter::Warn);

        assert!(MinimalLogger.enabled(&metadata(Level::Error)));
        assert!(MinimalLogger.enabled(&metadata(Level::Warn)));
        assert!(!MinimalLogger.enabled(&metadata(Level::Info)));

        log::set_max_level(LevelFilter::Trace);

        assert!(MinimalLogger.enabled(&metadata(Level::Trace)));
    }
}
