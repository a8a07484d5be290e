//! Configuration for the simulation client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/mailsim/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod draft;
mod logging;
mod serialization;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use draft::{DraftDefaults, FileDraft};
pub use logging::{FileLogging, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 600;

// ─────────────────────────────────────────────────────────────────────────────
// Result Provider Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Where simulation results come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Stream from the backend's `/api/simulate`
    #[default]
    Backend,
    /// Generate locally with the mock generator (no network)
    Mock,
}

impl ProviderKind {
    /// Parse provider string from config
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mock" => Self::Mock,
            _ => Self::Backend,
        }
    }

    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Mock => "mock",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the simulation backend
    pub api_url: String,

    /// Timeout for plain request/response calls (audiences, history)
    pub request_timeout: Duration,

    /// Timeout wrapping the whole read loop of one simulation stream
    pub stream_timeout: Duration,

    /// Default result provider for `simulate`
    pub provider: ProviderKind,

    /// Defaults for draft fields not given on the command line
    pub draft: DraftDefaults,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream_timeout: Duration::from_secs(DEFAULT_STREAM_TIMEOUT_SECS),
            provider: ProviderKind::default(),
            draft: DraftDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub stream_timeout_secs: Option<u64>,
    pub provider: Option<String>,

    /// Optional [draft] section
    pub draft: Option<FileDraft>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: $MAILSIM_CONFIG or ~/.config/mailsim/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MAILSIM_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|p| p.join(".config").join("mailsim").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed is fatal: falling back
    /// to defaults would point the client at the wrong backend silently.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: Check for:\n");
                    eprintln!("    - Missing quotes around string values");
                    eprintln!("    - Negative or quoted numbers in *_secs and sample_size");
                    eprintln!("    - Typos in section names\n");
                    eprintln!("  To reset, run `mailsim config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        Self::resolve(Self::load_file_config(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        // API URL: env > file > default
        let api_url = env("MAILSIM_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        // Timeouts: env > file > default (unparseable env values are ignored)
        let request_timeout = env("MAILSIM_TIMEOUT")
            .and_then(|v| v.parse().ok())
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let stream_timeout = env("MAILSIM_STREAM_TIMEOUT")
            .and_then(|v| v.parse().ok())
            .or(file.stream_timeout_secs)
            .unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS);

        // Provider: env > file > default ("backend")
        let provider = env("MAILSIM_PROVIDER")
            .or(file.provider)
            .map(|s| ProviderKind::from_str(&s))
            .unwrap_or_default();

        let draft = DraftDefaults::from_file(file.draft);
        let logging = LoggingConfig::from_file(file.logging);

        Self {
            api_url,
            request_timeout: Duration::from_secs(request_timeout),
            stream_timeout: Duration::from_secs(stream_timeout),
            provider,
            draft,
            logging,
        }
    }
}
