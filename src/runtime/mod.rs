pub mod bootstrap;
pub mod dispatch;
pub mod state_paths;

pub use bootstrap::{build_engine, EngineParts};
pub use dispatch::{dispatch_batch, PerKeyScheduler, Scheduled};
pub use state_paths::{bootstrap_state_root, StatePaths};

use crate::config::ConfigError;
use crate::rubric::RubricError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rubric(#[from] RubricError),
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
