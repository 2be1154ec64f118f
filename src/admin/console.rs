use super::threshold::{ThresholdDirective, ThresholdPreset};
use super::AdminCapability;
use crate::session::{InstallationStatus, SessionError, StepCursor};
use crate::shared::ids::{AgentAddress, InstallationId, JobReference};
use crate::shared::logging::EventLog;
use crate::workflow::{PolicyError, ScoringPolicy, WorkflowEngine};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionSummary {
    pub agent: AgentAddress,
    pub installation: Option<InstallationId>,
    pub job_ref: JobReference,
    pub step_cursor: i64,
    pub completed_steps: u32,
    pub status: InstallationStatus,
    pub last_activity_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_sessions: usize,
    pub sessions_with_active_installation: usize,
    pub completed_installations: usize,
    pub average_completed_steps: f64,
}

/// Privileged read/update surface over a running engine. Every operation
/// takes an `AdminCapability`, which only `AdminGate` can mint.
pub struct AdminConsole<'a> {
    engine: &'a WorkflowEngine,
}

impl<'a> AdminConsole<'a> {
    pub fn new(engine: &'a WorkflowEngine) -> Self {
        Self { engine }
    }

    pub fn threshold(&self, _cap: &AdminCapability) -> f32 {
        self.engine.policy().threshold()
    }

    pub fn set_threshold(&self, cap: &AdminCapability, value: f32) -> Result<f32, PolicyError> {
        let previous = self.engine.policy().set_threshold(cap, value)?;
        log_threshold_change(self.engine.log(), cap, previous, value);
        Ok(previous)
    }

    /// Sessions whose active installation is bound to an identifier and not
    /// yet finished.
    pub fn active_sessions(
        &self,
        _cap: &AdminCapability,
    ) -> Result<Vec<ActiveSessionSummary>, SessionError> {
        let total = self.engine.rubric().len();
        Ok(self
            .engine
            .store()
            .list_sessions()?
            .into_iter()
            .filter(|session| {
                session.active_installation_id.is_some()
                    && session.active.cursor != StepCursor::Done
            })
            .map(|session| ActiveSessionSummary {
                step_cursor: session.active.cursor.to_raw(total),
                completed_steps: session.active.completed_count(),
                status: session.active.status,
                job_ref: session.active.job_ref.clone(),
                installation: session.active_installation_id.clone(),
                last_activity_at: session.last_activity_at,
                agent: session.address,
            })
            .collect())
    }

    pub fn statistics(&self, _cap: &AdminCapability) -> Result<Statistics, SessionError> {
        let sessions = self.engine.store().list_sessions()?;
        let with_active: Vec<_> = sessions
            .iter()
            .filter(|session| session.active_installation_id.is_some())
            .collect();
        let completed_installations = sessions
            .iter()
            .flat_map(|session| {
                let active = session
                    .active_installation_id
                    .as_ref()
                    .map(|_| &session.active);
                active.into_iter().chain(session.installations.values())
            })
            .filter(|installation| installation.status == InstallationStatus::Completed)
            .count();
        let average_completed_steps = if with_active.is_empty() {
            0.0
        } else {
            let steps: u32 = with_active
                .iter()
                .map(|session| session.active.completed_count())
                .sum();
            f64::from(steps) / with_active.len() as f64
        };
        Ok(Statistics {
            total_sessions: sessions.len(),
            sessions_with_active_installation: with_active.len(),
            completed_installations,
            average_completed_steps,
        })
    }
}

/// Reply for `THRESHOLD` / `STRICTNESS` chat commands.
pub fn threshold_reply(
    policy: &ScoringPolicy,
    cap: &AdminCapability,
    directive: ThresholdDirective,
    log: &EventLog,
) -> String {
    let value = match directive {
        ThresholdDirective::Show => return threshold_overview(policy.threshold()),
        ThresholdDirective::Preset(preset) => preset.value(),
        ThresholdDirective::Set(value) => value,
        ThresholdDirective::Invalid(raw) => {
            return format!(
                "Unknown threshold option '{raw}'.\n\n{}",
                threshold_overview(policy.threshold())
            )
        }
    };
    match policy.set_threshold(cap, value) {
        Ok(previous) => {
            log_threshold_change(log, cap, previous, value);
            match directive_preset(value) {
                Some(preset) => format!(
                    "Strictness set to *{}* (threshold: {:.0}/10)\n{}",
                    preset.label(),
                    preset.value(),
                    preset.summary()
                ),
                None => format!("Custom strictness set to *{value:.1}/10*"),
            }
        }
        Err(PolicyError::ThresholdOutOfRange(_)) => {
            "Threshold must be between 0 and 10".to_string()
        }
    }
}

fn directive_preset(value: f32) -> Option<ThresholdPreset> {
    ThresholdPreset::ALL
        .into_iter()
        .find(|preset| preset.value() == value)
}

fn threshold_overview(current: f32) -> String {
    let mut text = format!(
        "*Evaluation strictness*\n\nScore threshold: {current:.1}/10\n\nOptions:\n"
    );
    for preset in ThresholdPreset::ALL {
        text.push_str(&format!(
            "- THRESHOLD {} - {:.0}/10\n",
            preset.label(),
            preset.value()
        ));
    }
    text.push_str(
        "- THRESHOLD SET <0-10> - custom value\n\nHigher threshold = stricter evaluation",
    );
    text
}

fn log_threshold_change(log: &EventLog, cap: &AdminCapability, previous: f32, value: f32) {
    log.warn(
        "admin.threshold_changed",
        json!({
            "admin": cap.agent().as_str(),
            "previous": previous,
            "threshold": value,
        }),
    );
}
