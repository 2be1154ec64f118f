use super::state_paths::{bootstrap_state_root, StatePaths};
use super::RuntimeError;
use crate::admin::AdminGate;
use crate::config::Settings;
use crate::evidence::{BoundedEvaluator, HttpAcquirer, HttpEvaluator};
use crate::rubric::StepTable;
use crate::session::SessionStore;
use crate::shared::logging::EventLog;
use crate::workflow::{EngineLimits, WorkflowEngine};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Slack on top of the HTTP timeout before the bounded wrapper gives up.
const EVALUATOR_GRACE_SECS: u64 = 5;

pub struct EngineParts {
    pub engine: WorkflowEngine,
    pub paths: StatePaths,
    pub evaluator_has_api_key: bool,
}

/// Assembles the production engine: state directories, rubric, store, HTTP
/// evaluator behind a timeout bound, HTTP acquirer, admin gate and log.
pub fn build_engine(settings: &Settings) -> Result<EngineParts, RuntimeError> {
    settings.validate()?;
    let paths = StatePaths::new(settings.resolve_state_root()?);
    bootstrap_state_root(&paths)?;
    let log = EventLog::new(paths.workflow_log_path());

    let rubric = Arc::new(match settings.rubric_path.as_deref() {
        Some(path) => StepTable::from_path(path)?,
        None => StepTable::fiber_default(),
    });

    let http = HttpEvaluator::from_config(&settings.evaluator, Arc::clone(&rubric));
    let evaluator_has_api_key = http.has_api_key();
    if !evaluator_has_api_key {
        log.warn(
            "evaluator.missing_api_key",
            json!({ "env": settings.evaluator.api_key_env }),
        );
    }
    let evaluator = BoundedEvaluator::new(
        Arc::new(http),
        Duration::from_secs(
            settings
                .evaluator
                .timeout_seconds
                .saturating_add(EVALUATOR_GRACE_SECS),
        ),
    );
    let acquirer = HttpAcquirer::new(paths.media_dir(), &settings.media);
    let store = SessionStore::new(paths.sessions_dir(), rubric.len(), log.clone());

    let engine = WorkflowEngine::new(
        store,
        rubric,
        Arc::new(evaluator),
        Arc::new(acquirer),
        EngineLimits::from_settings(settings),
        settings.passing_score_threshold,
    )
    .with_admin_gate(AdminGate::from_settings(settings))
    .with_log(log);

    Ok(EngineParts {
        engine,
        paths,
        evaluator_has_api_key,
    })
}
