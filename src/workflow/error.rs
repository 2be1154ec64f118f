use crate::evidence::{AcquireError, EvaluatorError};
use crate::session::SessionError;

/// Inputs refused without touching state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("`{input}` is not a valid installation identifier")]
    BadIdentifier { input: String },
    #[error("location check-in is not expected at this point")]
    LocationNotExpected,
    #[error("media arrived before an installation identifier")]
    MediaBeforeIdentifier,
    #[error("media arrived before the location check-in")]
    MediaBeforeLocation,
    #[error("installation is already complete")]
    InstallationComplete,
    #[error("identifier capture cannot be skipped")]
    CannotSkipIdentifier,
    #[error("nothing to skip at this point")]
    NothingToSkip,
    #[error("unrecognized message `{text}`")]
    UnknownCommand { text: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    InvalidInput(Rejection),
    #[error("installation capacity reached ({limit})")]
    CapacityExceeded { limit: usize },
    #[error("evaluation of step {step} failed: {source}")]
    EvaluatorFailure {
        step: u32,
        #[source]
        source: EvaluatorError,
        consecutive: u32,
        escalated: bool,
    },
    #[error("media acquisition for step {step} failed: {source}")]
    AcquireFailure {
        step: u32,
        #[source]
        source: AcquireError,
        consecutive: u32,
        escalated: bool,
    },
    #[error("session store failure: {0}")]
    StoreFailure(#[source] SessionError),
}

impl WorkflowError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::EvaluatorFailure { .. } => "evaluator_failure",
            Self::AcquireFailure { .. } => "acquire_failure",
            Self::StoreFailure(_) => "store_failure",
        }
    }
}

impl From<Rejection> for WorkflowError {
    fn from(rejection: Rejection) -> Self {
        Self::InvalidInput(rejection)
    }
}

impl From<SessionError> for WorkflowError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::CapacityExceeded { limit } => Self::CapacityExceeded { limit },
            other => Self::StoreFailure(other),
        }
    }
}
