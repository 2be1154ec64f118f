pub mod bounded;
pub mod http_acquirer;
pub mod http_evaluator;
pub mod verdict_parse;

pub use bounded::BoundedEvaluator;
pub use http_acquirer::HttpAcquirer;
pub use http_evaluator::HttpEvaluator;
pub use verdict_parse::parse_verdict;

use crate::shared::ids::JobReference;
use std::path::PathBuf;

/// A captured media file on local disk, ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub path: PathBuf,
    pub media_ref: String,
    pub bytes: u64,
    pub content_type: String,
}

/// Outcome of evaluating one asset against one rubric step. Transient: only
/// the accepted asset reference outlives the transition it drives.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub step_index: u32,
    pub passed: bool,
    pub score: f32,
    pub issues: Vec<String>,
    pub confidence: f32,
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("evaluator returned malformed output: {0}")]
    Malformed(String),
    #[error("evaluator transport failed: {0}")]
    Transport(String),
}

impl EvaluatorError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Malformed(_) => "malformed",
            Self::Transport(_) => "transport",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("media exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("media download failed: {0}")]
    Transport(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported media reference `{0}`")]
    UnsupportedReference(String),
    #[error("local media `{0}` is outside the permitted media roots")]
    LocalAccessDenied(String),
}

impl AcquireError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "too_large",
            Self::Transport(_) => "transport",
            Self::Io { .. } => "io",
            Self::UnsupportedReference(_) => "unsupported_reference",
            Self::LocalAccessDenied(_) => "local_access_denied",
        }
    }
}

pub trait EvidenceEvaluator: Send + Sync {
    fn evaluate(&self, asset: &LocalAsset, step_index: u32) -> Result<Verdict, EvaluatorError>;
}

pub trait MediaAcquirer: Send + Sync {
    fn acquire(&self, media_ref: &str, job: &JobReference) -> Result<LocalAsset, AcquireError>;
}
