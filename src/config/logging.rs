//! `[logging]` section: console level and the optional rolling log file

use serde::Deserialize;
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

/// Console and file logging settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for mailsim's own targets; RUST_LOG replaces the whole filter
    pub level: String,
    pub file: LogFile,
}

/// JSON log file written alongside the stderr output
#[derive(Debug, Clone, PartialEq)]
pub struct LogFile {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Files are named `<prefix>.<period>.log`
    pub prefix: String,
    pub rotation: Rotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: LogFile {
                enabled: false,
                dir: PathBuf::from("./logs"),
                prefix: "mailsim".to_string(),
                rotation: Rotation::DAILY,
            },
        }
    }
}

/// Rotation by config name; `None` for names tracing-appender has no period for
pub fn parse_rotation(name: &str) -> Option<Rotation> {
    match name.to_lowercase().as_str() {
        "minutely" => Some(Rotation::MINUTELY),
        "hourly" => Some(Rotation::HOURLY),
        "daily" => Some(Rotation::DAILY),
        "weekly" => Some(Rotation::WEEKLY),
        "never" => Some(Rotation::NEVER),
        _ => None,
    }
}

/// Config name of a rotation, the inverse of `parse_rotation`
pub fn rotation_name(rotation: &Rotation) -> &'static str {
    if *rotation == Rotation::MINUTELY {
        "minutely"
    } else if *rotation == Rotation::HOURLY {
        "hourly"
    } else if *rotation == Rotation::WEEKLY {
        "weekly"
    } else if *rotation == Rotation::NEVER {
        "never"
    } else {
        "daily"
    }
}

/// `[logging]` as loaded from the config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    /// `[logging.file]`
    pub file: Option<FileLogFile>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogFile {
    pub enabled: Option<bool>,
    pub dir: Option<String>,
    pub prefix: Option<String>,
    pub rotation: Option<String>,
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        let log_file = file.file.unwrap_or_default();

        let rotation = match log_file.rotation {
            Some(name) => parse_rotation(&name).unwrap_or_else(|| {
                // Logging is not up yet when config loads
                eprintln!("Warning: unknown log rotation {:?}, using daily", name);
                Rotation::DAILY
            }),
            None => defaults.file.rotation,
        };

        Self {
            level: file.level.unwrap_or(defaults.level),
            file: LogFile {
                enabled: log_file.enabled.unwrap_or(defaults.file.enabled),
                dir: log_file.dir.map(PathBuf::from).unwrap_or(defaults.file.dir),
                prefix: log_file.prefix.unwrap_or(defaults.file.prefix),
                rotation,
            },
        }
    }
}
