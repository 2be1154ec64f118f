pub mod error;
pub mod model;
pub mod record;
pub mod store;
pub mod switch;

pub use error::SessionError;
pub use model::{
    AgentSession, DeliveryRecord, EvidenceRef, Installation, InstallationSnapshot,
    InstallationStatus, LocationMeta, LocationSource, StepCursor,
};
pub use record::{AgentSessionRecord, InstallationRecord};
pub use store::{Persist, SessionStore, Transacted};
pub use switch::{reset_active, switch_to, SwitchOutcome};
