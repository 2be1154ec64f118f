use super::error::{Rejection, WorkflowError};
use super::policy::ScoringPolicy;
use super::{replies, transitions};
use crate::admin::{self, AdminCapability, AdminGate};
use crate::config::Settings;
use crate::dialogue::{Command, DialogueRouter, InboundEvent, RoutedEvent, SkipScope};
use crate::evidence::{EvidenceEvaluator, MediaAcquirer};
use crate::rubric::StepTable;
use crate::session::{
    reset_active, switch_to, AgentSession, EvidenceRef, Persist, SessionError, SessionStore,
    StepCursor, SwitchOutcome,
};
use crate::shared::delivery::{media_fingerprint, message_fingerprint};
use crate::shared::ids::{AgentAddress, InstallationId};
use crate::shared::logging::EventLog;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLimits {
    pub identifier_prefix: String,
    pub max_installations: usize,
    pub escalation_failure_threshold: u32,
    pub idempotency_window: usize,
    pub session_timeout_secs: i64,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl EngineLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            identifier_prefix: settings.identifier_prefix.to_ascii_uppercase(),
            max_installations: settings.max_installations,
            escalation_failure_threshold: settings.escalation_failure_threshold,
            idempotency_window: settings.idempotency_window,
            session_timeout_secs: settings.session_timeout_secs(),
        }
    }
}

struct Applied {
    reply: String,
    record_delivery: bool,
}

impl Applied {
    fn recorded(reply: String) -> Self {
        Self {
            reply,
            record_delivery: true,
        }
    }

    fn view(reply: String) -> Self {
        Self {
            reply,
            record_delivery: false,
        }
    }
}

/// Turns inbound events into state transitions and reply text. All state
/// lives in the session store; each event runs as one per-agent transaction,
/// including the evaluator call for media submissions.
pub struct WorkflowEngine {
    store: SessionStore,
    rubric: Arc<StepTable>,
    evaluator: Arc<dyn EvidenceEvaluator>,
    acquirer: Arc<dyn MediaAcquirer>,
    policy: ScoringPolicy,
    router: DialogueRouter,
    limits: EngineLimits,
    log: EventLog,
}

impl WorkflowEngine {
    pub fn new(
        store: SessionStore,
        rubric: Arc<StepTable>,
        evaluator: Arc<dyn EvidenceEvaluator>,
        acquirer: Arc<dyn MediaAcquirer>,
        limits: EngineLimits,
        passing_score_threshold: f32,
    ) -> Self {
        let router = DialogueRouter::new(AdminGate::disabled(), limits.identifier_prefix.clone());
        Self {
            store,
            rubric,
            evaluator,
            acquirer,
            policy: ScoringPolicy::new(passing_score_threshold),
            router,
            limits,
            log: EventLog::disabled(),
        }
    }

    pub fn with_admin_gate(mut self, gate: AdminGate) -> Self {
        self.router = DialogueRouter::new(gate, self.limits.identifier_prefix.clone());
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn rubric(&self) -> &StepTable {
        &self.rubric
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    pub fn admin_gate(&self) -> &AdminGate {
        self.router.gate()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Single entry point: one inbound event in, one reply out. Never fails;
    /// every error becomes an actionable reply.
    pub fn handle(&self, event: &InboundEvent, now: i64) -> String {
        let address = match AgentAddress::parse(&event.agent_address) {
            Ok(address) => address,
            Err(err) => {
                self.log.warn(
                    "event.invalid_address",
                    json!({ "address": event.agent_address, "error": err }),
                );
                return replies::invalid_address();
            }
        };
        let routed = self.router.classify(event, &address);

        match self
            .store
            .transact(&address, now, |session| self.process(session, event, routed, now))
        {
            Ok(transacted) => {
                if transacted.created {
                    if let Err(err) = self.sweep_abandoned(now, Some(&address)) {
                        self.log.warn(
                            "session.sweep_failed",
                            json!({ "error": err.to_string() }),
                        );
                    }
                }
                transacted.value
            }
            Err(err) => {
                self.log.error(
                    "store.failure",
                    json!({ "agent": address.as_str(), "error": err.to_string() }),
                );
                replies::store_unavailable()
            }
        }
    }

    pub fn status_view(&self, address: &AgentAddress) -> Result<Option<String>, SessionError> {
        Ok(self.store.load(address)?.map(|session| {
            replies::status(&session, &self.rubric, &self.limits.identifier_prefix)
        }))
    }

    pub fn list_view(&self, address: &AgentAddress) -> Result<Option<String>, SessionError> {
        Ok(self
            .store
            .load(address)?
            .map(|session| replies::list(&session, &self.rubric, self.limits.max_installations)))
    }

    pub fn sweep_abandoned(
        &self,
        now: i64,
        skip: Option<&AgentAddress>,
    ) -> Result<Vec<AgentAddress>, SessionError> {
        self.store
            .abandon_inactive(now, self.limits.session_timeout_secs, skip)
    }

    fn process(
        &self,
        session: &mut AgentSession,
        event: &InboundEvent,
        routed: RoutedEvent,
        now: i64,
    ) -> Persist<String> {
        let fingerprints = self.delivery_fingerprints(session, event, &routed);
        if let Some(record) = fingerprints
            .iter()
            .find_map(|fingerprint| session.find_delivery(fingerprint))
        {
            self.log.info(
                "delivery.duplicate",
                json!({ "agent": session.address.as_str(), "recordedAt": record.recorded_at }),
            );
            return Persist::Touch(record.reply.clone());
        }

        let before = session.clone();
        let reply = match self.apply(session, routed, now) {
            Ok(applied) => {
                if applied.record_delivery {
                    for fingerprint in fingerprints {
                        session.record_delivery(
                            fingerprint,
                            &applied.reply,
                            now,
                            self.limits.idempotency_window,
                        );
                    }
                }
                applied.reply
            }
            Err(err) => {
                self.log_failure(session, &err);
                replies::for_error(
                    &err,
                    &session.active,
                    &self.rubric,
                    &self.limits.identifier_prefix,
                )
            }
        };
        if transitions::revive(&mut session.active, now) {
            self.log.info(
                "installation.revived",
                json!({ "agent": session.address.as_str(), "jobRef": session.active.job_ref }),
            );
        }

        if *session == before {
            Persist::Touch(reply)
        } else {
            Persist::Commit(reply)
        }
    }

    fn delivery_fingerprints(
        &self,
        session: &AgentSession,
        event: &InboundEvent,
        routed: &RoutedEvent,
    ) -> Vec<String> {
        let mut fingerprints = Vec::new();
        if let Some(message_id) = event
            .message_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            fingerprints.push(message_fingerprint(session.agent_id(), message_id));
        }
        if let RoutedEvent::MediaSubmission { media_ref } = routed {
            let installation = session
                .active_installation_id
                .as_ref()
                .map(InstallationId::as_str)
                .unwrap_or_default();
            fingerprints.push(media_fingerprint(
                session.agent_id(),
                installation,
                media_ref,
            ));
        }
        fingerprints
    }

    fn apply(
        &self,
        session: &mut AgentSession,
        routed: RoutedEvent,
        now: i64,
    ) -> Result<Applied, WorkflowError> {
        match routed {
            RoutedEvent::Identifier(id) => self.apply_identifier(session, &id, now),
            RoutedEvent::LocationCheckin { media_ref } => {
                transitions::apply_location(&mut session.active, &media_ref, now)?;
                self.log.info(
                    "location.verified",
                    json!({
                        "agent": session.address.as_str(),
                        "installation": session.active_installation_id,
                    }),
                );
                Ok(Applied::recorded(replies::location_confirmed(
                    session.active_installation_id.as_ref(),
                    &session.active,
                    &self.rubric,
                )))
            }
            RoutedEvent::MediaSubmission { media_ref } => {
                self.apply_media(session, &media_ref, now)
            }
            RoutedEvent::Command(command) => self.apply_command(session, command, now),
            RoutedEvent::Unrecognized(text) => {
                if session.active.cursor == StepCursor::AwaitingId && !text.is_empty() {
                    Err(Rejection::BadIdentifier {
                        input: text.to_ascii_uppercase(),
                    }
                    .into())
                } else {
                    Err(Rejection::UnknownCommand { text }.into())
                }
            }
        }
    }

    fn apply_identifier(
        &self,
        session: &mut AgentSession,
        id: &InstallationId,
        now: i64,
    ) -> Result<Applied, WorkflowError> {
        let outcome = switch_to(session, id, self.limits.max_installations, now)?;
        let reply = replies::switched(
            outcome,
            id,
            &session.active,
            &self.rubric,
            &self.limits.identifier_prefix,
        );
        match outcome {
            SwitchOutcome::AlreadyActive => return Ok(Applied::view(reply)),
            SwitchOutcome::Created => self.log.info(
                "installation.created",
                json!({
                    "agent": session.address.as_str(),
                    "installation": id,
                    "jobRef": session.active.job_ref,
                    "tracked": session.tracked_count(),
                }),
            ),
            SwitchOutcome::Resumed => self.log.info(
                "installation.switched",
                json!({
                    "agent": session.address.as_str(),
                    "installation": id,
                    "stepCursor": session.active.cursor.to_raw(self.rubric.len()),
                }),
            ),
        }
        Ok(Applied::recorded(reply))
    }

    fn apply_media(
        &self,
        session: &mut AgentSession,
        media_ref: &str,
        now: i64,
    ) -> Result<Applied, WorkflowError> {
        let step = transitions::gate_media(&session.active)?;

        let asset = match self.acquirer.acquire(media_ref, &session.active.job_ref) {
            Ok(asset) => asset,
            Err(source) => {
                let consecutive = transitions::record_evaluation_failure(&mut session.active, now);
                return Err(WorkflowError::AcquireFailure {
                    step,
                    source,
                    consecutive,
                    escalated: consecutive >= self.limits.escalation_failure_threshold,
                });
            }
        };
        let mut verdict = match self.evaluator.evaluate(&asset, step) {
            Ok(verdict) => verdict,
            Err(source) => {
                let consecutive = transitions::record_evaluation_failure(&mut session.active, now);
                return Err(WorkflowError::EvaluatorFailure {
                    step,
                    source,
                    consecutive,
                    escalated: consecutive >= self.limits.escalation_failure_threshold,
                });
            }
        };
        verdict.step_index = step;

        let threshold = self.policy.threshold();
        if self.policy.is_passing(&verdict) {
            let evidence = EvidenceRef::Captured {
                path: asset.path.display().to_string(),
                media_ref: asset.media_ref.clone(),
            };
            let cursor = transitions::accept_step(
                &mut session.active,
                step,
                evidence,
                self.rubric.len(),
                now,
            );
            self.log.info(
                "step.passed",
                json!({
                    "agent": session.address.as_str(),
                    "jobRef": session.active.job_ref,
                    "step": step,
                    "score": verdict.score,
                    "confidence": verdict.confidence,
                }),
            );
            if cursor == StepCursor::Done {
                self.log.info(
                    "installation.completed",
                    json!({
                        "agent": session.address.as_str(),
                        "installation": session.active_installation_id,
                        "jobRef": session.active.job_ref,
                    }),
                );
            }
            Ok(Applied::recorded(replies::step_passed(
                &verdict,
                threshold,
                &session.active,
                &self.rubric,
            )))
        } else {
            transitions::record_rejected_evidence(&mut session.active);
            self.log.info(
                "step.failed",
                json!({
                    "agent": session.address.as_str(),
                    "jobRef": session.active.job_ref,
                    "step": step,
                    "score": verdict.score,
                    "evaluatorPassed": verdict.passed,
                    "issues": verdict.issues,
                }),
            );
            Ok(Applied::recorded(replies::step_failed(
                &verdict,
                threshold,
                &session.active,
                &self.rubric,
            )))
        }
    }

    fn apply_command(
        &self,
        session: &mut AgentSession,
        command: Command,
        now: i64,
    ) -> Result<Applied, WorkflowError> {
        let prefix = self.limits.identifier_prefix.as_str();
        match command {
            Command::Start => Ok(Applied::view(replies::start(session, &self.rubric, prefix))),
            Command::Greeting => Ok(Applied::view(replies::greeting())),
            Command::Help => {
                let admin = self.router.gate().authorize(&session.address).is_some();
                Ok(Applied::view(replies::help(&self.rubric, admin)))
            }
            Command::Status => Ok(Applied::view(replies::status(session, &self.rubric, prefix))),
            Command::List => Ok(Applied::view(replies::list(
                session,
                &self.rubric,
                self.limits.max_installations,
            ))),
            Command::Reset => {
                let discarded = reset_active(session, now)?;
                self.log.info(
                    "installation.reset",
                    json!({
                        "agent": session.address.as_str(),
                        "discarded": discarded,
                        "jobRef": session.active.job_ref,
                    }),
                );
                Ok(Applied::recorded(replies::reset(
                    session,
                    discarded.as_ref(),
                    prefix,
                )))
            }
            Command::AdminSkip(cap, scope) => self.apply_skip(session, &cap, scope, now),
            Command::AdminThreshold(cap, directive) => Ok(Applied::view(admin::threshold_reply(
                &self.policy,
                &cap,
                directive,
                &self.log,
            ))),
        }
    }

    fn apply_skip(
        &self,
        session: &mut AgentSession,
        cap: &AdminCapability,
        scope: SkipScope,
        now: i64,
    ) -> Result<Applied, WorkflowError> {
        let cursor = session.active.cursor;
        let reply = match (scope, cursor) {
            (SkipScope::Current | SkipScope::Location, StepCursor::AwaitingLocation) => {
                transitions::skip_location(&mut session.active, now)?;
                replies::location_confirmed(
                    session.active_installation_id.as_ref(),
                    &session.active,
                    &self.rubric,
                )
            }
            (SkipScope::Current | SkipScope::Step, StepCursor::Step(step)) => {
                let evidence = EvidenceRef::Synthetic {
                    reason: format!("admin skip by {}", cap.agent()),
                };
                transitions::accept_step(
                    &mut session.active,
                    step,
                    evidence,
                    self.rubric.len(),
                    now,
                );
                replies::step_skipped(step, &session.active, &self.rubric)
            }
            (_, StepCursor::AwaitingId) => return Err(Rejection::CannotSkipIdentifier.into()),
            _ => return Err(Rejection::NothingToSkip.into()),
        };
        self.log.warn(
            "admin.skip",
            json!({
                "admin": cap.agent().as_str(),
                "jobRef": session.active.job_ref,
                "fromCursor": cursor.to_raw(self.rubric.len()),
                "toCursor": session.active.cursor.to_raw(self.rubric.len()),
            }),
        );
        Ok(Applied::recorded(reply))
    }

    fn log_failure(&self, session: &AgentSession, err: &WorkflowError) {
        let agent = session.address.as_str();
        match err {
            WorkflowError::InvalidInput(rejection) => self.log.info(
                "input.rejected",
                json!({ "agent": agent, "reason": rejection.to_string() }),
            ),
            WorkflowError::CapacityExceeded { limit } => self.log.warn(
                "capacity.refused",
                json!({ "agent": agent, "limit": limit }),
            ),
            WorkflowError::EvaluatorFailure {
                step,
                source,
                consecutive,
                escalated,
            } => {
                self.log.warn(
                    "evaluator.failure",
                    json!({
                        "agent": agent,
                        "step": step,
                        "kind": source.kind(),
                        "error": source.to_string(),
                        "consecutive": consecutive,
                    }),
                );
                if *escalated {
                    self.log.error(
                        "evaluation.escalated",
                        json!({ "agent": agent, "step": step, "consecutive": consecutive }),
                    );
                }
            }
            WorkflowError::AcquireFailure {
                step,
                source,
                consecutive,
                escalated,
            } => {
                self.log.warn(
                    "acquire.failure",
                    json!({
                        "agent": agent,
                        "step": step,
                        "kind": source.kind(),
                        "error": source.to_string(),
                        "consecutive": consecutive,
                    }),
                );
                if *escalated {
                    self.log.error(
                        "evaluation.escalated",
                        json!({ "agent": agent, "step": step, "consecutive": consecutive }),
                    );
                }
            }
            WorkflowError::StoreFailure(source) => self.log.error(
                "store.failure",
                json!({ "agent": agent, "error": source.to_string() }),
            ),
        }
    }
}
