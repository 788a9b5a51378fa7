//! Settings ownership for one run.

use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    Settings,
    loader,
};

/// Holds the validated settings.
///
/// Built once at startup; components receive the settings by reference.
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// Current settings
    current_settings: Settings,

    /// Project root
    project_root: PathBuf,
}

impl ConfigManager {
    /// Manager holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: Settings::default(), project_root: PathBuf::from(".") }
    }

    /// Loads and validates the settings of `project_root`. Defaults apply
    /// when there is no settings file. On failure the previous settings stay.
    ///
    /// # Errors
    /// - the settings file cannot be read
    /// - the settings file is not valid JSON
    /// - validation fails (empty table or column names, bad globs, ...)
    pub fn load_settings(&mut self, project_root: PathBuf) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings for project: {:?}", project_root);

        let settings = loader::load_from_project(&project_root)?.map_or_else(Settings::default, |s| {
            tracing::debug!("Loaded project settings: {:?}", s);
            s
        });

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.project_root = project_root;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// Replaces the settings after validating them. Used for command line
    /// overrides.
    pub fn update_settings(&mut self, new_settings: Settings) -> Result<(), ConfigError> {
        tracing::debug!("Updating settings...");

        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");

        Ok(())
    }

    /// Current settings.
    #[must_use]
    pub const fn get_settings(&self) -> &Settings {
        &self.current_settings
    }

    /// Project root the settings were loaded from.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// `langPath` joined onto the project root.
    #[must_use]
    pub fn lang_dir(&self) -> PathBuf {
        self.project_root.join(&self.current_settings.lang_path)
    }

    /// `database` joined onto the project root.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.project_root.join(&self.current_settings.database)
    }
}
