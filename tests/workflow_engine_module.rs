use fieldproof::admin::AdminGate;
use fieldproof::config::Settings;
use fieldproof::dialogue::InboundEvent;
use fieldproof::evidence::{
    AcquireError, EvaluatorError, EvidenceEvaluator, LocalAsset, MediaAcquirer, Verdict,
};
use fieldproof::rubric::StepTable;
use fieldproof::session::{AgentSession, EvidenceRef, InstallationStatus, SessionStore, StepCursor};
use fieldproof::shared::ids::{AgentAddress, InstallationId, JobReference};
use fieldproof::shared::logging::EventLog;
use fieldproof::workflow::{EngineLimits, WorkflowEngine};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

const AGENT: &str = "whatsapp:+15550001";
const NOW: i64 = 1_700_000_000;

#[derive(Default)]
struct ScriptedEvaluator {
    script: Mutex<VecDeque<Result<Verdict, EvaluatorError>>>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    fn push(&self, result: Result<Verdict, EvaluatorError>) {
        self.script.lock().expect("script lock").push_back(result);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EvidenceEvaluator for ScriptedEvaluator {
    fn evaluate(&self, _asset: &LocalAsset, step_index: u32) -> Result<Verdict, EvaluatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(verdict(step_index, true, 9.0)))
    }
}

struct FakeAcquirer;

impl MediaAcquirer for FakeAcquirer {
    fn acquire(&self, media_ref: &str, job: &JobReference) -> Result<LocalAsset, AcquireError> {
        if media_ref.starts_with("broken") {
            return Err(AcquireError::Transport(format!("{media_ref}: 404")));
        }
        Ok(LocalAsset {
            path: PathBuf::from(format!("/media/{job}/{media_ref}")),
            media_ref: media_ref.to_string(),
            bytes: 1024,
            content_type: "image/jpeg".to_string(),
        })
    }
}

fn verdict(step_index: u32, passed: bool, score: f32) -> Verdict {
    Verdict {
        step_index,
        passed,
        score,
        issues: if passed {
            Vec::new()
        } else {
            vec!["ONT not visible".to_string(), "Image is blurry".to_string()]
        },
        confidence: 0.9,
        advice: if passed {
            String::new()
        } else {
            "Move closer to the equipment".to_string()
        },
    }
}

struct Harness {
    dir: TempDir,
    engine: WorkflowEngine,
    evaluator: Arc<ScriptedEvaluator>,
}

impl Harness {
    fn new() -> Self {
        Self::with(EngineLimits::default(), AdminGate::disabled())
    }

    fn with(limits: EngineLimits, gate: AdminGate) -> Self {
        let dir = tempdir().expect("temp dir");
        let rubric = Arc::new(StepTable::fiber_default());
        let log = EventLog::new(dir.path().join("logs/workflow.log"));
        let store = SessionStore::new(dir.path().join("sessions"), rubric.len(), log.clone());
        let evaluator = Arc::new(ScriptedEvaluator::default());
        let engine = WorkflowEngine::new(
            store,
            rubric,
            evaluator.clone(),
            Arc::new(FakeAcquirer),
            limits,
            8.0,
        )
        .with_admin_gate(gate)
        .with_log(log);
        Self {
            dir,
            engine,
            evaluator,
        }
    }

    fn text(&self, text: &str) -> String {
        self.engine.handle(&InboundEvent::text(AGENT, text), NOW)
    }

    fn photo(&self, media_ref: &str) -> String {
        self.engine.handle(&InboundEvent::photo(AGENT, media_ref), NOW)
    }

    fn location(&self) -> String {
        self.engine
            .handle(&InboundEvent::location(AGENT, "geo:-33.9,18.4"), NOW)
    }

    fn session(&self) -> AgentSession {
        self.engine
            .store()
            .load(&AgentAddress::parse(AGENT).expect("address"))
            .expect("load")
            .expect("session exists")
    }

    fn log_text(&self) -> String {
        fs::read_to_string(self.dir.path().join("logs/workflow.log")).unwrap_or_default()
    }
}

fn admin_gate() -> AdminGate {
    let settings: Settings = serde_yaml::from_str(
        r#"
environment: development
admin:
  enabled: true
  allowed_agents: ["+15550001"]
"#,
    )
    .expect("settings");
    AdminGate::from_settings(&settings)
}

fn id(raw: &str) -> InstallationId {
    InstallationId::parse(raw).expect("installation id")
}

#[test]
fn identifier_location_pass_then_fail_walks_the_cursor() {
    let h = Harness::new();

    let reply = h.text("DR0000001");
    assert!(reply.contains("New installation created: DR0000001"));
    assert_eq!(h.session().active.cursor, StepCursor::AwaitingLocation);

    let reply = h.location();
    assert!(reply.contains("Location verified"));
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(1));
    assert!(session.active.location_verified);

    let reply = h.photo("house.jpg");
    assert!(reply.contains("Step 1: House Photo - PASSED"));
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(2));
    assert!(matches!(
        session.active.completed_steps.get(&1),
        Some(EvidenceRef::Captured { media_ref, .. }) if media_ref == "house.jpg"
    ));

    h.evaluator.push(Ok(verdict(2, false, 4.0)));
    let reply = h.photo("span.jpg");
    assert!(reply.contains("NEEDS RETAKE"));
    assert!(reply.contains("White box not visible"));
    assert!(reply.contains("Image is blurry"));
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(2));
    assert_eq!(session.active.completed_steps.len(), 1);
}

#[test]
fn evaluator_pass_below_threshold_is_not_a_pass() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();

    h.evaluator.push(Ok(verdict(1, true, 7.5)));
    let reply = h.photo("house.jpg");
    assert!(reply.contains("NEEDS RETAKE"));
    assert!(reply.contains("need 8.0/10"));
    assert_eq!(h.session().active.cursor, StepCursor::Step(1));
}

#[test]
fn switching_installations_snapshots_and_restores_exactly() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();
    for step in 1..=4 {
        h.photo(&format!("one-{step}.jpg"));
    }
    let before = h.session().active.clone();
    assert_eq!(before.cursor, StepCursor::Step(5));

    let reply = h.text("DR0000002");
    assert!(reply.contains("New installation created: DR0000002"));
    let session = h.session();
    assert_eq!(session.active_installation_id, Some(id("DR0000002")));
    assert_eq!(session.active.cursor, StepCursor::AwaitingLocation);
    assert_eq!(session.installations.get(&id("DR0000001")), Some(&before));

    let reply = h.text("dr0000001");
    assert!(reply.contains("Switched to DR0000001"));
    let session = h.session();
    assert_eq!(session.active, before);
    assert_eq!(session.active.cursor, StepCursor::Step(5));
    assert!(session.installations.contains_key(&id("DR0000002")));
}

#[test]
fn repeating_the_active_identifier_changes_nothing() {
    let h = Harness::new();
    h.text("DR0000001");
    let before = h.session();

    let first = h.text("DR0000001");
    let second = h.text("DR0000001");
    assert_eq!(first, second);
    assert!(first.contains("already on DR0000001"));
    assert_eq!(h.session(), before);
}

#[test]
fn capacity_refusal_leaves_state_untouched() {
    let limits = EngineLimits {
        max_installations: 3,
        ..EngineLimits::default()
    };
    let h = Harness::with(limits, AdminGate::disabled());
    for n in 1..=3 {
        h.text(&format!("DR000000{n}"));
    }
    let before = h.session();
    assert_eq!(before.tracked_count(), 3);

    let reply = h.text("DR0000004");
    assert!(reply.contains("Installation limit reached"));
    assert!(reply.contains("only manage 3 installations"));
    assert_eq!(h.session(), before);
    assert!(h.log_text().contains("capacity.refused"));

    let reply = h.text("DR0000001");
    assert!(reply.contains("Switched to DR0000001"));
}

#[test]
fn out_of_order_input_is_refused_without_mutation() {
    let h = Harness::new();

    let reply = h.photo("early.jpg");
    assert!(reply.contains("provide the installation number before sending photos"));
    assert_eq!(h.evaluator.calls(), 0);

    let reply = h.text("hello there");
    assert!(reply.contains("Invalid installation number"));
    assert!(reply.contains("HELLO THERE"));

    h.text("DR0000001");
    let reply = h.photo("early.jpg");
    assert!(reply.contains("share your location before sending photos"));
    assert_eq!(h.evaluator.calls(), 0);

    h.location();
    let before = h.session();
    let reply = h.location();
    assert!(reply.contains("Location sharing is not expected"));
    assert_eq!(h.session(), before);

    let reply = h.text("what now");
    assert!(reply.contains("Unknown command: 'what now'"));
}

#[test]
fn completed_installation_ignores_further_media() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();
    let mut last = String::new();
    for step in 1..=12 {
        last = h.photo(&format!("step-{step}.jpg"));
    }
    assert!(last.contains("All steps completed"));
    let done = h.session();
    assert_eq!(done.active.cursor, StepCursor::Done);
    assert_eq!(done.active.status, InstallationStatus::Completed);
    assert_eq!(done.active.completed_steps.len(), 12);

    let calls = h.evaluator.calls();
    let reply = h.photo("extra.jpg");
    assert!(reply.contains("Installation already completed"));
    assert_eq!(h.evaluator.calls(), calls);
    assert_eq!(h.session().active, done.active);
}

#[test]
fn duplicate_media_delivery_replays_without_advancing() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();

    let first = h.photo("house.jpg");
    let calls = h.evaluator.calls();
    let second = h.photo("house.jpg");

    assert_eq!(first, second);
    assert_eq!(h.evaluator.calls(), calls);
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(2));
    assert_eq!(session.active.completed_steps.len(), 1);
    assert!(h.log_text().contains("delivery.duplicate"));
}

#[test]
fn duplicate_message_id_replays_the_recorded_reply() {
    let h = Harness::new();
    let event = InboundEvent::text(AGENT, "DR0000001").with_message_id("wamid-1");
    let first = h.engine.handle(&event, NOW);
    h.engine.handle(&InboundEvent::text(AGENT, "DR0000002"), NOW);

    let replay = h.engine.handle(&event, NOW + 5);
    assert_eq!(replay, first);
    assert_eq!(h.session().active_installation_id, Some(id("DR0000002")));
}

#[test]
fn evaluator_failures_escalate_after_the_threshold() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();

    for attempt in 1..=3_u32 {
        h.evaluator.push(Err(EvaluatorError::Timeout { timeout_ms: 60_000 }));
        let reply = h.photo(&format!("try-{attempt}.jpg"));
        assert!(reply.contains("could not check your photo for Step 1"));
        assert_eq!(reply.contains("contact your supervisor"), attempt == 3);
        let session = h.session();
        assert_eq!(session.active.cursor, StepCursor::Step(1));
        assert_eq!(session.active.consecutive_failures, attempt);
    }
    let log = h.log_text();
    assert!(log.contains("evaluator.failure"));
    assert!(log.contains("\"kind\":\"timeout\""));
    assert!(log.contains("evaluation.escalated"));

    h.photo("good.jpg");
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(2));
    assert_eq!(session.active.consecutive_failures, 0);
}

#[test]
fn acquire_failures_are_logged_apart_from_evaluator_failures() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();

    let reply = h.photo("broken-link.jpg");
    assert!(reply.contains("could not download your photo"));
    assert_eq!(h.evaluator.calls(), 0);
    assert_eq!(h.session().active.consecutive_failures, 1);
    let log = h.log_text();
    assert!(log.contains("acquire.failure"));
    assert!(!log.contains("evaluator.failure"));
}

#[test]
fn store_failure_is_reported_instead_of_success() {
    let h = Harness::new();
    fs::write(h.dir.path().join("sessions"), "not a directory").expect("block sessions dir");

    let reply = h.text("DR0000001");
    assert!(reply.contains("could not be saved"));
    assert!(!reply.contains("New installation created"));
    assert!(h.log_text().contains("store.failure"));
}

#[test]
fn reset_discards_only_the_active_installation() {
    let h = Harness::new();
    h.text("DR0000001");
    h.text("DR0000002");
    let old_job = h.session().active.job_ref.clone();

    let reply = h.text("RESET");
    assert!(reply.contains("Installation DR0000002 was discarded"));
    let session = h.session();
    assert_eq!(session.active_installation_id, None);
    assert_eq!(session.active.cursor, StepCursor::AwaitingId);
    assert_ne!(session.active.job_ref, old_job);
    assert!(session.installations.contains_key(&id("DR0000001")));
    assert!(!session.installations.contains_key(&id("DR0000002")));

    let reply = h.text("DR0000002");
    assert!(reply.contains("New installation created: DR0000002"));
}

#[test]
fn status_and_list_are_read_only_views() {
    let h = Harness::new();
    h.text("DR0000001");
    h.location();
    h.photo("house.jpg");
    h.text("DR0000002");
    let before = h.session();

    let status = h.text("STATUS");
    assert!(status.contains("DR0000002"));
    let list = h.text("LIST");
    assert!(list.contains("DR0000001"));
    assert!(list.contains("DR0000002"));
    assert!(list.contains("2/10"));
    assert_eq!(h.session(), before);

    let address = AgentAddress::parse(AGENT).expect("address");
    assert_eq!(
        h.engine.status_view(&address).expect("status view"),
        Some(status)
    );
    assert_eq!(h.engine.list_view(&address).expect("list view"), Some(list));
}

#[test]
fn admin_keywords_are_unrecognized_without_a_capability() {
    let h = Harness::new();
    h.text("DR0000001");

    let reply = h.text("SKIP");
    assert!(reply.contains("Unknown command: 'SKIP'"));
    assert_eq!(h.session().active.cursor, StepCursor::AwaitingLocation);
    let reply = h.text("THRESHOLD TESTING");
    assert!(reply.contains("Unknown command"));
    assert_eq!(h.engine.policy().threshold(), 8.0);
}

#[test]
fn admin_skip_records_synthetic_evidence() {
    let h = Harness::with(EngineLimits::default(), admin_gate());

    let reply = h.text("SKIP");
    assert!(reply.contains("Cannot skip the installation number"));

    h.text("DR0000001");
    let reply = h.text("SKIP");
    assert!(reply.contains("Location check-in SKIPPED"));
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(1));
    assert!(session
        .active
        .location_meta
        .as_ref()
        .is_some_and(|meta| meta.skipped()));

    let reply = h.text("SKIP STEP");
    assert!(reply.contains("Step 1: House Photo - SKIPPED"));
    let session = h.session();
    assert_eq!(session.active.cursor, StepCursor::Step(2));
    assert!(session.active.completed_steps[&1].is_synthetic());
    assert_eq!(h.evaluator.calls(), 0);

    let reply = h.text("SKIP LOCATION");
    assert!(reply.contains("Nothing to skip"));
    assert!(h.log_text().contains("admin.skip"));
}

#[test]
fn admin_threshold_changes_the_passing_bar() {
    let h = Harness::with(EngineLimits::default(), admin_gate());
    h.text("DR0000001");
    h.location();

    let reply = h.text("STRICTNESS TESTING");
    assert!(reply.contains("TESTING"));
    assert_eq!(h.engine.policy().threshold(), 5.0);

    h.evaluator.push(Ok(verdict(1, true, 6.0)));
    let reply = h.photo("house.jpg");
    assert!(reply.contains("PASSED"));

    let reply = h.text("THRESHOLD SET 12");
    assert_eq!(reply, "Threshold must be between 0 and 10");
    assert_eq!(h.engine.policy().threshold(), 5.0);
    assert!(h.log_text().contains("admin.threshold_changed"));
}

#[test]
fn abandoned_installation_is_revived_by_the_next_event() {
    let limits = EngineLimits {
        session_timeout_secs: 3600,
        ..EngineLimits::default()
    };
    let h = Harness::with(limits, AdminGate::disabled());
    h.text("DR0000001");

    let swept = h
        .engine
        .sweep_abandoned(NOW + 7200, None)
        .expect("sweep");
    assert_eq!(swept.len(), 1);
    assert_eq!(h.session().active.status, InstallationStatus::Abandoned);

    h.engine
        .handle(&InboundEvent::text(AGENT, "STATUS"), NOW + 7300);
    let session = h.session();
    assert_eq!(session.active.status, InstallationStatus::Active);
    assert_eq!(session.active.cursor, StepCursor::AwaitingLocation);
}

#[test]
fn new_session_triggers_a_sweep_of_idle_agents() {
    let limits = EngineLimits {
        session_timeout_secs: 3600,
        ..EngineLimits::default()
    };
    let h = Harness::with(limits, AdminGate::disabled());
    h.text("DR0000001");

    h.engine
        .handle(&InboundEvent::text("+15550002", "HI"), NOW + 7200);
    assert_eq!(h.session().active.status, InstallationStatus::Abandoned);
    assert!(h.log_text().contains("session.abandoned"));
}

#[test]
fn invalid_addresses_never_reach_the_store() {
    let h = Harness::new();
    let reply = h
        .engine
        .handle(&InboundEvent::text("../../etc", "HI"), NOW);
    assert!(reply.contains("could not identify your number"));
    assert!(h
        .engine
        .store()
        .list_sessions()
        .expect("list")
        .is_empty());
}

#[test]
fn read_only_and_refused_messages_keep_the_agent_active() {
    let limits = EngineLimits {
        session_timeout_secs: 3600,
        ..EngineLimits::default()
    };
    let h = Harness::with(limits, AdminGate::disabled());
    h.text("DR0000001");
    let before = h.session();

    h.engine
        .handle(&InboundEvent::text(AGENT, "STATUS"), NOW + 3000);
    h.engine
        .handle(&InboundEvent::text(AGENT, "LIST"), NOW + 6000);
    h.engine
        .handle(&InboundEvent::photo(AGENT, "early.jpg"), NOW + 6050);

    let session = h.session();
    assert_eq!(session.last_activity_at, NOW + 6050);
    assert_eq!(session.active, before.active);
    assert_eq!(session.recent_deliveries, before.recent_deliveries);

    let swept = h
        .engine
        .sweep_abandoned(NOW + 6100, None)
        .expect("sweep");
    assert!(swept.is_empty());
    assert_eq!(h.session().active.status, InstallationStatus::Active);
}

