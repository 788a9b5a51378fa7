//! Reading the settings file.

use std::path::Path;

use super::{
    ConfigError,
    Settings,
};

/// Settings file name in the project root
pub const CONFIG_FILE_NAME: &str = "translations-import.json";

/// Loads `translations-import.json` from the project root.
///
/// # Returns
/// - `Ok(Some(settings))`: the file exists and parsed
/// - `Ok(None)`: there is no settings file
///
/// # Errors
/// - the file cannot be read
/// - the file is not valid JSON
pub(super) fn load_from_project(project_root: &Path) -> Result<Option<Settings>, ConfigError> {
    let config_path = project_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}
