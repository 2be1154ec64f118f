use super::model::{
    AgentSession, DeliveryRecord, EvidenceRef, Installation, InstallationStatus, LocationMeta,
    StepCursor,
};
use crate::shared::ids::{AgentAddress, InstallationId, JobReference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// On-disk and export shape of one agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSessionRecord {
    pub agent_id: String,
    pub address: AgentAddress,
    pub total_steps: u32,
    #[serde(default)]
    pub active_installation_id: Option<InstallationId>,
    pub active: InstallationRecord,
    #[serde(default)]
    pub installations: BTreeMap<InstallationId, InstallationRecord>,
    pub created_at: i64,
    pub last_activity_at: i64,
    #[serde(default)]
    pub recent_deliveries: Vec<DeliveryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationRecord {
    pub job_ref: JobReference,
    pub step_cursor: i64,
    #[serde(default)]
    pub completed_steps: BTreeMap<u32, EvidenceRef>,
    #[serde(default)]
    pub location_verified: bool,
    #[serde(default)]
    pub location_meta: Option<LocationMeta>,
    pub status: InstallationStatus,
    #[serde(default)]
    pub consecutive_failures: u32,
    pub updated_at: i64,
}

impl InstallationRecord {
    pub fn from_installation(installation: &Installation, total_steps: u32) -> Self {
        Self {
            job_ref: installation.job_ref.clone(),
            step_cursor: installation.cursor.to_raw(total_steps),
            completed_steps: installation.completed_steps.clone(),
            location_verified: installation.location_verified,
            location_meta: installation.location_meta.clone(),
            status: installation.status,
            consecutive_failures: installation.consecutive_failures,
            updated_at: installation.updated_at,
        }
    }

    /// Decodes against the rubric length the record was written with. When
    /// the rubric length has since changed, steps beyond the new length are
    /// dropped and the cursor moves to the first step without evidence.
    pub fn into_installation(
        self,
        recorded_steps: u32,
        total_steps: u32,
    ) -> Result<Installation, String> {
        let decoded = StepCursor::from_raw(self.step_cursor, recorded_steps)?;
        if let Some(index) = self
            .completed_steps
            .keys()
            .find(|index| **index == 0 || **index > recorded_steps)
        {
            return Err(format!("completed step {index} is outside 1..={recorded_steps}"));
        }

        let mut completed_steps = self.completed_steps;
        let mut status = self.status;
        let cursor = if recorded_steps == total_steps {
            decoded
        } else {
            completed_steps.retain(|index, _| *index <= total_steps);
            let cursor = rebase_cursor(decoded, &completed_steps, total_steps);
            if cursor == StepCursor::Done {
                status = InstallationStatus::Completed;
            } else if status == InstallationStatus::Completed {
                status = InstallationStatus::Active;
            }
            cursor
        };
        Ok(Installation {
            job_ref: self.job_ref,
            cursor,
            completed_steps,
            location_verified: self.location_verified,
            location_meta: self.location_meta,
            status,
            consecutive_failures: self.consecutive_failures,
            updated_at: self.updated_at,
        })
    }
}

fn rebase_cursor(
    decoded: StepCursor,
    completed_steps: &BTreeMap<u32, EvidenceRef>,
    total_steps: u32,
) -> StepCursor {
    match decoded {
        StepCursor::Step(_) | StepCursor::Done => (1..=total_steps)
            .find(|index| !completed_steps.contains_key(index))
            .map_or(StepCursor::Done, StepCursor::Step),
        other => other,
    }
}

impl AgentSessionRecord {
    pub fn from_session(session: &AgentSession, total_steps: u32) -> Self {
        Self {
            agent_id: session.agent_id().to_string(),
            address: session.address.clone(),
            total_steps,
            active_installation_id: session.active_installation_id.clone(),
            active: InstallationRecord::from_installation(&session.active, total_steps),
            installations: session
                .installations
                .iter()
                .map(|(id, snapshot)| {
                    (
                        id.clone(),
                        InstallationRecord::from_installation(snapshot, total_steps),
                    )
                })
                .collect(),
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            recent_deliveries: session.recent_deliveries.iter().cloned().collect(),
        }
    }

    pub fn into_session(self, total_steps: u32) -> Result<AgentSession, String> {
        let recorded_steps = self.total_steps;
        if recorded_steps == 0 {
            return Err("totalSteps must be at least 1".to_string());
        }
        if let Some(id) = self.active_installation_id.as_ref() {
            if self.installations.contains_key(id) {
                return Err(format!(
                    "installation {id} is both active and snapshotted"
                ));
            }
        }
        let active = self.active.into_installation(recorded_steps, total_steps)?;
        let mut installations = BTreeMap::new();
        for (id, record) in self.installations {
            let snapshot = record
                .into_installation(recorded_steps, total_steps)
                .map_err(|reason| format!("installation {id}: {reason}"))?;
            installations.insert(id, snapshot);
        }
        Ok(AgentSession {
            address: self.address,
            active_installation_id: self.active_installation_id,
            active,
            installations,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
            recent_deliveries: self.recent_deliveries.into_iter().collect(),
        })
    }
}
