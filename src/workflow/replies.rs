//! Agent-facing reply text. Anything that describes "where you are" is
//! rendered from the installation cursor so replies cannot drift from state.

use super::error::{Rejection, WorkflowError};
use crate::evidence::Verdict;
use crate::rubric::StepTable;
use crate::session::{AgentSession, Installation, InstallationStatus, StepCursor, SwitchOutcome};
use crate::shared::ids::InstallationId;

const MAX_ISSUES_SHOWN: usize = 3;

const SIMPLE_TERMS: [(&str, &str); 13] = [
    ("ont", "white box"),
    ("fiber cable", "cable"),
    ("pigtail screw", "cable entry point"),
    ("duct entry", "cable hole"),
    ("weather-proofing", "weather protection"),
    ("penetration", "hole"),
    ("installation area", "work area"),
    ("equipment", "devices"),
    ("visible and stable", "clear and steady"),
    ("identifiable", "clear"),
    ("insufficient", "not enough"),
    ("not adequately documented", "not clear enough"),
    ("strain relief", "cable support"),
];

pub fn greeting() -> String {
    "Hello! Welcome to the fiber installation assistant.\n\n\
     I help you verify installation photos step by step.\n\n\
     - Send START to begin a new installation\n\
     - Send STATUS to check your progress\n\
     - Send HELP for more information"
        .to_string()
}

pub fn help(table: &StepTable, admin: bool) -> String {
    let mut text = String::from(
        "*Available commands*\n\
         - START or NEW: begin an installation\n\
         - STATUS: check current progress\n\
         - LIST: show all tracked installations\n\
         - RESET: discard the current installation and start over\n\
         - HELP: show this message\n\
         - Send an installation number (e.g. DR0123456) to create or switch installations\n",
    );
    if admin {
        text.push_str(
            "\n*Admin commands*\n\
             - SKIP: skip the location check-in or the current step\n\
             - THRESHOLD: view or adjust the passing score\n",
        );
    }
    text.push_str(&format!(
        "\n*How it works*\n\
         1. Send the installation number\n\
         2. Share your location\n\
         3. Send one photo per step and wait for feedback\n\
         4. Complete all {} steps\n\n\
         Need help? Contact your supervisor.",
        table.len()
    ));
    text
}

pub fn start(session: &AgentSession, table: &StepTable, prefix: &str) -> String {
    match session.active_installation_id.as_ref() {
        Some(id) => format!(
            "You are working on installation {id}.\nJob ID: {}\n\n{}",
            session.active.job_ref,
            cursor_guidance(&session.active, table, prefix)
        ),
        None => format!(
            "*New fiber installation started*\n\nJob ID: {}\nAgent: {}\n\n{}",
            session.active.job_ref,
            session.agent_id(),
            identifier_prompt(prefix)
        ),
    }
}

pub fn reset(session: &AgentSession, discarded: Option<&InstallationId>, prefix: &str) -> String {
    let header = match discarded {
        Some(id) => format!("Installation {id} was discarded."),
        None => "Started over.".to_string(),
    };
    format!(
        "{header}\n\nJob ID: {}\n\n{}",
        session.active.job_ref,
        identifier_prompt(prefix)
    )
}

fn identifier_prompt(prefix: &str) -> String {
    format!(
        "*Please provide the installation number*\nFormat: {prefix} followed by 4-10 digits (e.g. {prefix}0123456)"
    )
}

/// Where the agent stands and what to send next, derived only from the cursor.
pub fn cursor_guidance(installation: &Installation, table: &StepTable, prefix: &str) -> String {
    match installation.cursor {
        StepCursor::AwaitingId => identifier_prompt(prefix),
        StepCursor::AwaitingLocation => "*Location check-in required*\n\
             Please share your current location so we can confirm you are on site."
            .to_string(),
        StepCursor::Step(index) => format!(
            "Progress: {}/{} steps ({}%)\n\n{}",
            installation.completed_count(),
            table.len(),
            installation.percent_complete(table.len()),
            step_request("Current step", index, table)
        ),
        StepCursor::Done => format!(
            "This installation is complete: all {} steps verified.\nSend a new installation number to start another.",
            table.len()
        ),
    }
}

fn step_request(label: &str, index: u32, table: &StepTable) -> String {
    let instruction = table
        .step(index)
        .map(|step| step.instruction.as_str())
        .unwrap_or("Please send the photo for this step.");
    format!(
        "*{label}: Step {index} - {}*\n{instruction}",
        table.name(index)
    )
}

pub fn switched(
    outcome: SwitchOutcome,
    id: &InstallationId,
    installation: &Installation,
    table: &StepTable,
    prefix: &str,
) -> String {
    let header = match outcome {
        SwitchOutcome::Created => format!("*New installation created: {id}*"),
        SwitchOutcome::Resumed => format!("*Switched to {id}*"),
        SwitchOutcome::AlreadyActive => format!("*You are already on {id}*"),
    };
    format!(
        "{header}\nJob ID: {}\n\n{}",
        installation.job_ref,
        cursor_guidance(installation, table, prefix)
    )
}

pub fn location_confirmed(
    id: Option<&InstallationId>,
    installation: &Installation,
    table: &StepTable,
) -> String {
    let skipped = installation
        .location_meta
        .as_ref()
        .is_some_and(|meta| meta.skipped());
    let header = if skipped {
        "*Location check-in SKIPPED* (admin)"
    } else {
        "*Location verified*"
    };
    let id = id.map(|id| id.as_str()).unwrap_or("-");
    format!(
        "{header}\nInstallation: {id}\nJob ID: {}\n\n{}",
        installation.job_ref,
        step_request("Step 1", 1, table)
    )
}

pub fn step_passed(
    verdict: &Verdict,
    threshold: f32,
    installation: &Installation,
    table: &StepTable,
) -> String {
    let step = verdict.step_index;
    let mut text = format!(
        "*Step {step}: {} - PASSED*\n\nScore: {:.1}/10 (threshold {:.1}/10)\n",
        table.name(step),
        verdict.score,
        threshold
    );
    if verdict.score >= 9.0 {
        text.push_str("Excellent work! Photo quality is outstanding.\n");
    }
    text.push('\n');
    text.push_str(&progress_after(installation, table));
    text
}

pub fn step_skipped(step: u32, installation: &Installation, table: &StepTable) -> String {
    format!(
        "*Step {step}: {} - SKIPPED* (admin)\nRecorded as skipped, not as evidence.\n\n{}",
        table.name(step),
        progress_after(installation, table)
    )
}

fn progress_after(installation: &Installation, table: &StepTable) -> String {
    let mut text = format!(
        "Progress: {}/{} steps completed ({}%)",
        installation.completed_count(),
        table.len(),
        installation.percent_complete(table.len())
    );
    match installation.cursor {
        StepCursor::Step(next) => {
            text.push_str("\n\n");
            text.push_str(&step_request("Next step", next, table));
        }
        StepCursor::Done => {
            text.push_str(&format!(
                "\n\n*All steps completed!* Installation {} is verified and ready for activation.",
                installation.job_ref
            ));
        }
        _ => {}
    }
    text
}

pub fn step_failed(
    verdict: &Verdict,
    threshold: f32,
    installation: &Installation,
    table: &StepTable,
) -> String {
    let step = verdict.step_index;
    let mut text = format!(
        "*Step {step}: {} - NEEDS RETAKE*\n\nScore: {:.1}/10 (need {:.1}/10)\n",
        table.name(step),
        verdict.score,
        threshold
    );
    let issues: Vec<String> = verdict
        .issues
        .iter()
        .take(MAX_ISSUES_SHOWN)
        .map(|issue| simplify_issue(issue))
        .collect();
    if !issues.is_empty() {
        text.push_str("\n*What to fix:*\n");
        for issue in issues {
            text.push_str(&format!("- {issue}\n"));
        }
    }
    text.push_str(&format!(
        "\n*Try this:* {}\n\nTake the photo again and send it.\nProgress: {}/{} steps completed",
        simplify_advice(&verdict.advice),
        installation.completed_count(),
        table.len()
    ));
    text
}

/// Replaces technical vocabulary with the words agents use on site.
pub fn simplify_issue(issue: &str) -> String {
    let mut simple = issue.trim().to_lowercase();
    for (term, plain) in SIMPLE_TERMS {
        simple = replace_word(&simple, term, plain);
    }
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => simple,
    }
}

// Whole-word replacement so "ont" does not rewrite "front" or "montage".
fn replace_word(text: &str, term: &str, plain: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(term) {
        let previous = rest[..pos]
            .chars()
            .next_back()
            .or_else(|| out.chars().next_back());
        let before_ok = previous.map_or(true, |c| !c.is_alphanumeric());
        let after = &rest[pos + term.len()..];
        let after_ok = after.chars().next().map_or(true, |c| !c.is_alphanumeric());
        out.push_str(&rest[..pos]);
        if before_ok && after_ok {
            out.push_str(plain);
        } else {
            out.push_str(term);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Reduces free-form evaluator advice to one actionable hint.
pub fn simplify_advice(advice: &str) -> &'static str {
    let advice = advice.to_lowercase();
    if advice.contains("wider") || advice.contains("step back") {
        "Step further back to fit more in the photo."
    } else if advice.contains("closer") || advice.contains("close-up") {
        "Get closer to show more detail."
    } else if advice.contains("angle") {
        "Try a different angle - move to the side or front."
    } else if advice.contains("light") {
        "Take the photo in better light or use your phone's flash."
    } else if advice.contains("clear") || advice.contains("focus") || advice.contains("blur") {
        "Make sure the camera is focused and the image is sharp."
    } else if advice.contains("visible") {
        "Make sure you can clearly see what's needed in the photo."
    } else {
        "Take a clearer photo showing what's needed for this step."
    }
}

pub fn status(session: &AgentSession, table: &StepTable, prefix: &str) -> String {
    let active = &session.active;
    let Some(id) = session.active_installation_id.as_ref() else {
        return format!(
            "*Installation status*\nJob ID: {}\nStatus: awaiting installation number\n\n{}",
            active.job_ref,
            identifier_prompt(prefix)
        );
    };
    let location = match active.location_meta.as_ref() {
        Some(meta) if meta.skipped() => "skipped (admin)",
        Some(_) => "verified",
        None => "not verified",
    };
    let mut text = format!(
        "*Installation status*\nInstallation: {id}\nJob ID: {}\nState: {}\nLocation: {location}\nProgress: {}/{} steps ({}%)\n",
        active.job_ref,
        active.status,
        active.completed_count(),
        table.len(),
        active.percent_complete(table.len())
    );
    if !active.completed_steps.is_empty() {
        text.push_str("\n*Completed steps:*\n");
        for (step, evidence) in &active.completed_steps {
            let marker = if evidence.is_synthetic() { " (skipped)" } else { "" };
            text.push_str(&format!("- {}{marker}\n", table.name(*step)));
        }
    }
    text.push('\n');
    match active.cursor {
        StepCursor::Step(index) => text.push_str(&step_request("Next", index, table)),
        _ => text.push_str(&cursor_guidance(active, table, prefix)),
    }
    text
}

pub fn list(session: &AgentSession, table: &StepTable, max_installations: usize) -> String {
    if session.tracked_count() == 0 {
        return "No installations tracked yet.\n\nSend START or an installation number to begin."
            .to_string();
    }
    let mut rows: Vec<(&InstallationId, &Installation, bool)> = session
        .installations
        .iter()
        .map(|(id, snapshot)| (id, snapshot, false))
        .collect();
    if let Some(id) = session.active_installation_id.as_ref() {
        rows.push((id, &session.active, true));
    }
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut lines = vec!["*Tracked installations:*".to_string()];
    for (id, installation, is_active) in rows {
        let state = match (installation.status, installation.cursor) {
            (InstallationStatus::Completed, _) | (_, StepCursor::Done) => "Complete".to_string(),
            (_, StepCursor::AwaitingId) => "Waiting for installation number".to_string(),
            (_, StepCursor::AwaitingLocation) => "Waiting for location".to_string(),
            (_, StepCursor::Step(index)) => format!(
                "Step {index}/{} - {} ({}%)",
                table.len(),
                table.name(index),
                installation.percent_complete(table.len())
            ),
        };
        let abandoned = if installation.status == InstallationStatus::Abandoned {
            " [abandoned]"
        } else {
            ""
        };
        let marker = if is_active { " <- current" } else { "" };
        lines.push(format!("- {id}: {state}{abandoned}{marker}"));
    }
    lines.push(format!(
        "\nTotal: {}/{max_installations} installations",
        session.tracked_count()
    ));
    lines.push("Send an installation number to switch.".to_string());
    lines.join("\n")
}

pub fn rejection(
    rejection: &Rejection,
    installation: &Installation,
    table: &StepTable,
    prefix: &str,
) -> String {
    match rejection {
        Rejection::BadIdentifier { input } => format!(
            "*Invalid installation number*\n\nYou entered: {input}\n\nUse {prefix} followed by 4-10 digits, e.g. {prefix}0123456.\nPlease try again."
        ),
        Rejection::LocationNotExpected => format!(
            "Location sharing is not expected right now.\n\n{}",
            cursor_guidance(installation, table, prefix)
        ),
        Rejection::MediaBeforeIdentifier => format!(
            "Please provide the installation number before sending photos.\n\n{}",
            identifier_prompt(prefix)
        ),
        Rejection::MediaBeforeLocation => {
            "Please share your location before sending photos.".to_string()
        }
        Rejection::InstallationComplete => format!(
            "*Installation already completed*\nJob ID: {}\nAll {} steps verified.\n\nSend a new installation number to start another.",
            installation.job_ref,
            table.len()
        ),
        Rejection::CannotSkipIdentifier => {
            "Cannot skip the installation number.\n\nPlease provide a valid installation number first."
                .to_string()
        }
        Rejection::NothingToSkip => "Nothing to skip at this point.".to_string(),
        Rejection::UnknownCommand { text } => format!(
            "Unknown command: '{text}'\n\nSend HELP for available commands or send a photo for your current step."
        ),
    }
}

pub fn capacity_exceeded(limit: usize) -> String {
    format!(
        "*Installation limit reached*\n\nYou can only manage {limit} installations at once.\nPlease complete or reset existing installations first.\n\nSend LIST to see your installations."
    )
}

pub fn evaluation_unavailable(step: u32, table: &StepTable, escalated: bool) -> String {
    let mut text = format!(
        "We could not check your photo for Step {step} ({}) right now.\nPlease send the photo again.",
        table.name(step)
    );
    if escalated {
        text.push_str(&escalation_notice());
    }
    text
}

pub fn media_unavailable(step: u32, table: &StepTable, escalated: bool) -> String {
    let mut text = format!(
        "We could not download your photo for Step {step} ({}).\nPlease try sending it again.",
        table.name(step)
    );
    if escalated {
        text.push_str(&escalation_notice());
    }
    text
}

fn escalation_notice() -> String {
    "\n\n*This keeps failing.* Please contact your supervisor so they can check the system."
        .to_string()
}

pub fn store_unavailable() -> String {
    "*System error*\n\nYour last message could not be saved. Please send it again in a moment.\n\nIf problems persist, contact your supervisor."
        .to_string()
}

pub fn invalid_address() -> String {
    "We could not identify your number. Please contact your supervisor.".to_string()
}

/// The reply for errors that have no richer context at hand.
pub fn for_error(
    err: &WorkflowError,
    installation: &Installation,
    table: &StepTable,
    prefix: &str,
) -> String {
    match err {
        WorkflowError::InvalidInput(rej) => rejection(rej, installation, table, prefix),
        WorkflowError::CapacityExceeded { limit } => capacity_exceeded(*limit),
        WorkflowError::EvaluatorFailure { step, escalated, .. } => {
            evaluation_unavailable(*step, table, *escalated)
        }
        WorkflowError::AcquireFailure { step, escalated, .. } => {
            media_unavailable(*step, table, *escalated)
        }
        WorkflowError::StoreFailure(_) => store_unavailable(),
    }
}
