// Logging module - tracing subscriber setup
//
// Console logs go to stderr so stdout stays clean for rendered results and
// `--json` output. File logging is opt-in and writes JSON lines through a
// non-blocking rolling appender.
//
// Precedence: RUST_LOG env var > config file > default "info"

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the default filter directive for a configured level
pub fn default_filter(level: &str) -> String {
    format!("mailsim={},reqwest=warn,hyper=warn", level)
}

/// Rolling appender for `[logging.file]`
fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(config.file.rotation.clone())
        .filename_prefix(config.file.prefix.as_str())
        .filename_suffix("log")
        .build(&config.file.dir)
}

/// Install the global subscriber
///
/// The returned guard must be kept alive for the duration of the program so
/// buffered file logs are flushed on exit.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let appender = if config.file.enabled {
        match file_appender(config) {
            Ok(appender) => Some(appender),
            Err(e) => {
                eprintln!(
                    "Warning: Could not open log file in {:?}: {}",
                    config.file.dir, e
                );
                None
            }
        }
    } else {
        None
    };

    let Some(appender) = appender else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        return None;
    };

    // Wrap in non-blocking writer (writes happen in background thread)
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_scopes_crate_level() {
        assert_eq!(
            default_filter("debug"),
            "mailsim=debug,reqwest=warn,hyper=warn"
        );
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter("info")).is_ok());
    }

    #[test]
    fn test_file_appender_uses_configured_dir() {
        let dir = std::env::temp_dir().join(format!("mailsim-logs-{}", std::process::id()));
        let mut config = LoggingConfig::default();
        config.file.enabled = true;
        config.file.dir = dir.clone();

        assert!(file_appender(&config).is_ok());
        assert!(dir.is_dir());

        std::fs::remove_dir_all(&dir).ok();
    }
}
