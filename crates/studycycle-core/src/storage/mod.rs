mod config;

pub use config::{Config, EngineConfig, RearmMode};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/studycycle[-dev]/` based on STUDYCYCLE_ENV.
///
/// Set STUDYCYCLE_ENV=dev to use the development directory, or
/// STUDYCYCLE_CONFIG_DIR to use an explicit one.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYCYCLE_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("STUDYCYCLE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("studycycle-dev")
            } else {
                base_dir.join("studycycle")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
