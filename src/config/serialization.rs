//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::logging::rotation_name;
use super::Config;

impl Config {
    /// Render the effective configuration as a commented TOML file
    pub fn to_toml(&self) -> String {
        format!(
            r#"# mailsim configuration

# Simulation backend base URL
api_url = "{api_url}"

# Timeout in seconds for audience/history requests
request_timeout_secs = {request_timeout}

# Timeout in seconds for one whole simulation stream
stream_timeout_secs = {stream_timeout}

# Result provider: backend, mock
provider = "{provider}"

# Defaults for `mailsim simulate`
[draft]
audience = "{audience}"
sample_size = {sample_size}
cta = {cta:?}

# Level for mailsim's own logs (RUST_LOG env var overrides)
[logging]
level = "{log_level}"

# JSON log file written alongside stderr output
[logging.file]
enabled = {log_file_enabled}
dir = {log_file_dir:?}
prefix = "{log_file_prefix}"
rotation = "{log_file_rotation}"  # minutely, hourly, daily, weekly, never
"#,
            api_url = self.api_url,
            request_timeout = self.request_timeout.as_secs(),
            stream_timeout = self.stream_timeout.as_secs(),
            provider = self.provider.as_str(),
            audience = self.draft.audience,
            sample_size = self.draft.sample_size,
            cta = self.draft.cta,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file.enabled,
            log_file_dir = self.logging.file.dir.display().to_string(),
            log_file_prefix = self.logging.file.prefix,
            log_file_rotation = rotation_name(&self.logging.file.rotation),
        )
    }
}
