use super::{default_settings_path, ConfigError, Settings};
use std::path::Path;

/// Loads settings from the default location; a missing file yields defaults.
pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_settings_path()?;
    load_settings_or_default(&path)
}

pub fn load_settings_or_default(path: &Path) -> Result<Settings, ConfigError> {
    let settings = if path.exists() {
        Settings::from_path(path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}
