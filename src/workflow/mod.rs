pub mod engine;
pub mod error;
pub mod policy;
pub mod replies;
pub mod transitions;

pub use engine::{EngineLimits, WorkflowEngine};
pub use error::{Rejection, WorkflowError};
pub use policy::{PolicyError, ScoringPolicy};
