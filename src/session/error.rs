#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("installation capacity reached ({limit} tracked installations)")]
    CapacityExceeded { limit: usize },
    #[error("failed to mint job reference: {0}")]
    JobReference(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("session record {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

pub(crate) fn io_error(path: &std::path::Path, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub(crate) fn json_error(path: &std::path::Path, source: serde_json::Error) -> SessionError {
    SessionError::Json {
        path: path.display().to_string(),
        source,
    }
}
