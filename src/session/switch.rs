use super::model::{AgentSession, Installation, StepCursor};
use super::SessionError;
use crate::shared::ids::{InstallationId, JobReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    AlreadyActive,
    Resumed,
    Created,
}

/// Brings `target` into the active slot, parking the current installation as a
/// snapshot. Capacity is checked before anything is touched, so a refused
/// switch leaves the session exactly as it was.
pub fn switch_to(
    session: &mut AgentSession,
    target: &InstallationId,
    max_installations: usize,
    now: i64,
) -> Result<SwitchOutcome, SessionError> {
    if session.active_installation_id.as_ref() == Some(target) {
        return Ok(SwitchOutcome::AlreadyActive);
    }

    let (incoming, outcome) = match session.installations.remove(target) {
        Some(snapshot) => (snapshot, SwitchOutcome::Resumed),
        None => {
            if session.tracked_count() >= max_installations {
                return Err(SessionError::CapacityExceeded {
                    limit: max_installations,
                });
            }
            let job_ref = JobReference::mint(&session.address, Some(target), now)
                .map_err(SessionError::JobReference)?;
            (
                Installation::fresh(job_ref, StepCursor::AwaitingLocation, now),
                SwitchOutcome::Created,
            )
        }
    };

    let previous = std::mem::replace(&mut session.active, incoming);
    if let Some(previous_id) = session.active_installation_id.replace(target.clone()) {
        session.installations.insert(previous_id, previous);
    }
    Ok(outcome)
}

/// Discards the active installation and starts over at identifier capture
/// with a newly minted job reference. Snapshots are untouched.
pub fn reset_active(
    session: &mut AgentSession,
    now: i64,
) -> Result<Option<InstallationId>, SessionError> {
    let job_ref =
        JobReference::mint(&session.address, None, now).map_err(SessionError::JobReference)?;
    session.active = Installation::fresh(job_ref, StepCursor::AwaitingId, now);
    Ok(session.active_installation_id.take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::EvidenceRef;
    use crate::shared::ids::AgentAddress;

    fn session() -> AgentSession {
        AgentSession::new(AgentAddress::parse("+15550001").expect("address"), 100)
            .expect("session")
    }

    fn id(raw: &str) -> InstallationId {
        InstallationId::parse(raw).expect("id")
    }

    #[test]
    fn switching_away_and_back_restores_exact_state() {
        let mut session = session();
        assert_eq!(
            switch_to(&mut session, &id("DR0000001"), 10, 100).expect("switch"),
            SwitchOutcome::Created
        );
        session.active.cursor = StepCursor::Step(5);
        session.active.location_verified = true;
        for step in 1..5 {
            session.active.completed_steps.insert(
                step,
                EvidenceRef::Synthetic {
                    reason: "test".to_string(),
                },
            );
        }
        let before = session.active.clone();

        switch_to(&mut session, &id("DR0000002"), 10, 101).expect("switch");
        assert_eq!(session.active.cursor, StepCursor::AwaitingLocation);
        assert_eq!(session.installations.len(), 1);

        assert_eq!(
            switch_to(&mut session, &id("DR0000001"), 10, 102).expect("switch"),
            SwitchOutcome::Resumed
        );
        assert_eq!(session.active, before);
        assert!(session.installations.contains_key(&id("DR0000002")));
        assert!(!session.installations.contains_key(&id("DR0000001")));
    }

    #[test]
    fn switching_to_active_target_is_a_no_op() {
        let mut session = session();
        switch_to(&mut session, &id("DR0000001"), 10, 100).expect("switch");
        let before = session.clone();
        assert_eq!(
            switch_to(&mut session, &id("DR0000001"), 10, 200).expect("switch"),
            SwitchOutcome::AlreadyActive
        );
        assert_eq!(session, before);
    }

    #[test]
    fn capacity_refusal_leaves_session_untouched() {
        let mut session = session();
        for n in 1..=3 {
            switch_to(&mut session, &id(&format!("DR000000{n}")), 3, 100).expect("switch");
        }
        let before = session.clone();
        let err = switch_to(&mut session, &id("DR0000004"), 3, 100).expect_err("capacity");
        assert!(matches!(err, SessionError::CapacityExceeded { limit: 3 }));
        assert_eq!(session, before);

        assert_eq!(
            switch_to(&mut session, &id("DR0000001"), 3, 100).expect("resume"),
            SwitchOutcome::Resumed
        );
    }

    #[test]
    fn reset_discards_only_the_active_installation() {
        let mut session = session();
        switch_to(&mut session, &id("DR0000001"), 10, 100).expect("switch");
        switch_to(&mut session, &id("DR0000002"), 10, 100).expect("switch");
        let old_job = session.active.job_ref.clone();

        let discarded = reset_active(&mut session, 200).expect("reset");
        assert_eq!(discarded, Some(id("DR0000002")));
        assert_eq!(session.active.cursor, StepCursor::AwaitingId);
        assert!(session.active.completed_steps.is_empty());
        assert_ne!(session.active.job_ref, old_job);
        assert_eq!(session.installations.len(), 1);
        assert_eq!(session.tracked_count(), 1);
    }
}
