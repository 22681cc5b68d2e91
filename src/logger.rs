// A minimal stderr logger for the `log` crate. Filtering is done entirely by
// `log::set_max_level`, so there is nothing to configure here.

use std::{path::Path, sync::LazyLock};

use log::Log;

use crate::style::Theme;

#[derive(Debug)]
pub struct Logger(());

impl Logger {
    /// Installs the logger globally.
    pub fn init() -> Result<(), log::SetLoggerError> {
        static LOGGER: Logger = Logger(());
        log::set_logger(&LOGGER)
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        // Always UTC. Looking up the system time zone can itself log.
        let now = jiff::Timestamp::now();
        let level = Theme::stderr().level(record.level());
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => eprintln!(
                "{now}|{level}|{}:{line}: {}",
                relative(file),
                record.args(),
            ),
            (Some(file), None) => eprintln!(
                "{now}|{level}|{}: {}",
                relative(file),
                record.args(),
            ),
            _ => eprintln!("{now}|{level}: {}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Strips the current directory from `path` when it's a prefix.
fn relative(path: &str) -> &str {
    static CWD: LazyLock<Option<std::path::PathBuf>> =
        LazyLock::new(|| std::env::current_dir().ok());

    CWD.as_deref()
        .and_then(|cwd| Path::new(path).strip_prefix(cwd).ok())
        .and_then(|rel| rel.to_str())
        .unwrap_or(path)
}
