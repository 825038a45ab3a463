use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

const DATA_DIR: &str = ".proxy_gateway";
const CONFIG_FILE: &str = "gateway_config.json";
const CONFIG_ENV: &str = "PROXY_GATEWAY_CONFIG";

/// Get data directory path, creating it if needed
pub fn get_data_dir() -> AppResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Config("Failed to get user home directory".into()))?;
    let data_dir = home.join(DATA_DIR);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

/// Config file location: `$PROXY_GATEWAY_CONFIG`, else the data directory
pub fn config_path() -> AppResult<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(get_data_dir()?.join(CONFIG_FILE)),
    }
}

/// Load application config
pub fn load_app_config() -> AppResult<AppConfig> {
    load_app_config_from(&config_path()?)
}

/// Load and validate config from an explicit path. A missing file yields defaults.
pub fn load_app_config_from(config_path: &Path) -> AppResult<AppConfig> {
    let config = if config_path.exists() {
        let content = fs::read_to_string(config_path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?
    } else {
        AppConfig::default()
    };

    config.proxy.validate()?;
    Ok(config)
}
