use super::SessionError;
use crate::shared::ids::{AgentAddress, InstallationId, JobReference};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Where an installation stands. The integer encoding (`0`, `-1`, `1..=N`,
/// `N + 1`) exists only in persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCursor {
    AwaitingId,
    AwaitingLocation,
    Step(u32),
    Done,
}

impl StepCursor {
    pub fn to_raw(self, total_steps: u32) -> i64 {
        match self {
            Self::AwaitingId => 0,
            Self::AwaitingLocation => -1,
            Self::Step(index) => i64::from(index),
            Self::Done => i64::from(total_steps) + 1,
        }
    }

    pub fn from_raw(raw: i64, total_steps: u32) -> Result<Self, String> {
        let done = i64::from(total_steps) + 1;
        match raw {
            0 => Ok(Self::AwaitingId),
            -1 => Ok(Self::AwaitingLocation),
            value if value == done => Ok(Self::Done),
            value if value >= 1 && value < done => Ok(Self::Step(value as u32)),
            value => Err(format!(
                "step cursor {value} is outside -1..={done} for a {total_steps}-step rubric"
            )),
        }
    }

    /// The step currently collecting evidence, if any.
    pub fn evidence_step(self) -> Option<u32> {
        match self {
            Self::Step(index) => Some(index),
            _ => None,
        }
    }

    pub fn after_pass(self, total_steps: u32) -> Self {
        match self {
            Self::Step(index) if index < total_steps => Self::Step(index + 1),
            Self::Step(_) => Self::Done,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    Active,
    Completed,
    Abandoned,
}

impl std::fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Checkin,
    AdminSkip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMeta {
    pub confirmed_at: i64,
    pub source: LocationSource,
    #[serde(default)]
    pub media_ref: Option<String>,
}

impl LocationMeta {
    pub fn skipped(&self) -> bool {
        self.source == LocationSource::AdminSkip
    }
}

/// Accepted evidence for one step. `Synthetic` marks steps advanced without
/// evaluation so downstream consumers can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceRef {
    Captured { path: String, media_ref: String },
    Synthetic { reason: String },
}

impl EvidenceRef {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Installation {
    pub job_ref: JobReference,
    pub cursor: StepCursor,
    pub completed_steps: BTreeMap<u32, EvidenceRef>,
    pub location_verified: bool,
    pub location_meta: Option<LocationMeta>,
    pub status: InstallationStatus,
    pub consecutive_failures: u32,
    pub updated_at: i64,
}

/// Non-active installations are held as full copies of their last active state.
pub type InstallationSnapshot = Installation;

impl Installation {
    pub fn fresh(job_ref: JobReference, cursor: StepCursor, now: i64) -> Self {
        Self {
            job_ref,
            cursor,
            completed_steps: BTreeMap::new(),
            location_verified: false,
            location_meta: None,
            status: InstallationStatus::Active,
            consecutive_failures: 0,
            updated_at: now,
        }
    }

    pub fn completed_count(&self) -> u32 {
        self.completed_steps.len() as u32
    }

    pub fn percent_complete(&self, total_steps: u32) -> u32 {
        if total_steps == 0 {
            return 0;
        }
        self.completed_count().min(total_steps) * 100 / total_steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub fingerprint: String,
    pub reply: String,
    pub recorded_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSession {
    pub address: AgentAddress,
    pub active_installation_id: Option<InstallationId>,
    pub active: Installation,
    pub installations: BTreeMap<InstallationId, InstallationSnapshot>,
    pub created_at: i64,
    pub last_activity_at: i64,
    pub recent_deliveries: VecDeque<DeliveryRecord>,
}

impl AgentSession {
    pub fn new(address: AgentAddress, now: i64) -> Result<Self, SessionError> {
        let job_ref =
            JobReference::mint(&address, None, now).map_err(SessionError::JobReference)?;
        Ok(Self {
            address,
            active_installation_id: None,
            active: Installation::fresh(job_ref, StepCursor::AwaitingId, now),
            installations: BTreeMap::new(),
            created_at: now,
            last_activity_at: now,
            recent_deliveries: VecDeque::new(),
        })
    }

    pub fn agent_id(&self) -> &str {
        self.address.agent_id()
    }

    /// Snapshots plus the active installation when one is in focus.
    pub fn tracked_count(&self) -> usize {
        self.installations.len() + usize::from(self.active_installation_id.is_some())
    }

    pub fn find_delivery(&self, fingerprint: &str) -> Option<&DeliveryRecord> {
        self.recent_deliveries
            .iter()
            .find(|record| record.fingerprint == fingerprint)
    }

    pub fn record_delivery(&mut self, fingerprint: String, reply: &str, now: i64, window: usize) {
        self.recent_deliveries
            .retain(|record| record.fingerprint != fingerprint);
        self.recent_deliveries.push_back(DeliveryRecord {
            fingerprint,
            reply: reply.to_string(),
            recorded_at: now,
        });
        while self.recent_deliveries.len() > window.max(1) {
            self.recent_deliveries.pop_front();
        }
    }
}
