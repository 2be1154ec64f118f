use super::error::Rejection;
use crate::session::{
    EvidenceRef, Installation, InstallationStatus, LocationMeta, LocationSource, StepCursor,
};

/// Which step a media submission would be evaluated for. Out-of-order media
/// is refused here, before any evaluation is spent on it.
pub fn gate_media(installation: &Installation) -> Result<u32, Rejection> {
    match installation.cursor {
        StepCursor::Step(index) => Ok(index),
        StepCursor::AwaitingId => Err(Rejection::MediaBeforeIdentifier),
        StepCursor::AwaitingLocation => Err(Rejection::MediaBeforeLocation),
        StepCursor::Done => Err(Rejection::InstallationComplete),
    }
}

pub fn apply_location(
    installation: &mut Installation,
    media_ref: &str,
    now: i64,
) -> Result<(), Rejection> {
    if installation.cursor != StepCursor::AwaitingLocation {
        return Err(Rejection::LocationNotExpected);
    }
    confirm_location(
        installation,
        LocationMeta {
            confirmed_at: now,
            source: LocationSource::Checkin,
            media_ref: Some(media_ref.to_string()),
        },
        now,
    );
    Ok(())
}

pub fn skip_location(installation: &mut Installation, now: i64) -> Result<(), Rejection> {
    match installation.cursor {
        StepCursor::AwaitingLocation => {
            confirm_location(
                installation,
                LocationMeta {
                    confirmed_at: now,
                    source: LocationSource::AdminSkip,
                    media_ref: None,
                },
                now,
            );
            Ok(())
        }
        StepCursor::AwaitingId => Err(Rejection::CannotSkipIdentifier),
        _ => Err(Rejection::NothingToSkip),
    }
}

fn confirm_location(installation: &mut Installation, meta: LocationMeta, now: i64) {
    installation.location_verified = true;
    installation.location_meta = Some(meta);
    installation.cursor = StepCursor::Step(1);
    installation.consecutive_failures = 0;
    installation.updated_at = now;
}

/// Records accepted evidence for `step` and advances exactly one step.
/// Returns the new cursor; reaching `Done` completes the installation.
pub fn accept_step(
    installation: &mut Installation,
    step: u32,
    evidence: EvidenceRef,
    total_steps: u32,
    now: i64,
) -> StepCursor {
    if installation.cursor != StepCursor::Step(step) {
        return installation.cursor;
    }
    installation.completed_steps.insert(step, evidence);
    installation.cursor = installation.cursor.after_pass(total_steps);
    installation.consecutive_failures = 0;
    installation.updated_at = now;
    if installation.cursor == StepCursor::Done {
        installation.status = InstallationStatus::Completed;
    }
    installation.cursor
}

/// A genuine non-passing verdict: the agent retries the same step.
pub fn record_rejected_evidence(installation: &mut Installation) {
    installation.consecutive_failures = 0;
}

/// An evaluation that produced no verdict. Returns the consecutive count.
pub fn record_evaluation_failure(installation: &mut Installation, now: i64) -> u32 {
    installation.consecutive_failures = installation.consecutive_failures.saturating_add(1);
    installation.updated_at = now;
    installation.consecutive_failures
}

pub fn revive(installation: &mut Installation, now: i64) -> bool {
    if installation.status != InstallationStatus::Abandoned {
        return false;
    }
    installation.status = if installation.cursor == StepCursor::Done {
        InstallationStatus::Completed
    } else {
        InstallationStatus::Active
    };
    installation.updated_at = now;
    true
}
