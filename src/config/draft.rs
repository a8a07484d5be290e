//! Draft defaults applied when `simulate` flags are omitted

use serde::Deserialize;

/// Default audience and sample size for new drafts
#[derive(Debug, Clone, PartialEq)]
pub struct DraftDefaults {
    /// Audience identifier sent when `--audience` is not given
    pub audience: String,
    /// Personas to simulate when `--sample-size` is not given
    pub sample_size: u32,
    pub cta: String,
}

impl Default for DraftDefaults {
    fn default() -> Self {
        Self {
            audience: "marketing-managers".to_string(),
            sample_size: 10,
            cta: String::new(),
        }
    }
}

/// Draft settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileDraft {
    pub audience: Option<String>,
    pub sample_size: Option<u32>,
    pub cta: Option<String>,
}

impl DraftDefaults {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileDraft>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            audience: file.audience.unwrap_or(defaults.audience),
            sample_size: file.sample_size.unwrap_or(defaults.sample_size),
            cta: file.cta.unwrap_or(defaults.cta),
        }
    }
}
