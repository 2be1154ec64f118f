pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings_or_default};
pub use paths::{
    default_settings_path, default_state_root, CONFIG_PATH_ENV, GLOBAL_SETTINGS_FILE_NAME,
    GLOBAL_STATE_DIR,
};
pub use settings::{AdminConfig, Environment, EvaluatorConfig, MediaConfig, Settings};
