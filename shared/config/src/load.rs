use std::path::Path;

use thiserror::Error;

use crate::config::SimConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parsing(#[from] ron::de::SpannedError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Loads a [`SimConfig`] from a RON file on disk. Never falls back to a process-global singleton
/// or panics on a missing load: callers that don't need a file at all should just use
/// [`SimConfig::default`].
pub fn load_file<P: AsRef<Path>>(path: P) -> ConfigResult<SimConfig> {
    let bytes = std::fs::read_to_string(path)?;
    load_str(&bytes)
}

pub fn load_str(ron_text: &str) -> ConfigResult<SimConfig> {
    let parsed = ron::de::from_str(ron_text)?;
    Ok(parsed)
}
