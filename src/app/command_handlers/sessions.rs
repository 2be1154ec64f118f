use crate::runtime::{now_secs, EngineParts};
use std::path::PathBuf;

pub fn cmd_sessions(parts: &EngineParts, args: &[String]) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: sessions".to_string());
    }
    let engine = &parts.engine;
    let total = engine.rubric().len();
    let sessions = engine.store().list_sessions().map_err(|e| e.to_string())?;
    if sessions.is_empty() {
        return Ok("no sessions".to_string());
    }

    let mut lines = Vec::with_capacity(sessions.len() + 1);
    lines.push(format!("sessions={}", sessions.len()));
    for session in sessions {
        let installation = session
            .active_installation_id
            .as_ref()
            .map(|id| id.as_str())
            .unwrap_or("-");
        lines.push(format!(
            "{} installation={} step_cursor={} completed={}/{} status={:?} tracked={} last_activity_at={}",
            session.address,
            installation,
            session.active.cursor.to_raw(total),
            session.active.completed_count(),
            total,
            session.active.status,
            session.tracked_count(),
            session.last_activity_at
        ));
    }
    Ok(lines.join("\n"))
}

pub fn cmd_export(parts: &EngineParts, args: &[String]) -> Result<String, String> {
    let path = match args {
        [] => parts.paths.default_export_path(),
        [path] => PathBuf::from(path),
        _ => return Err("usage: export [path]".to_string()),
    };
    let count = parts
        .engine
        .store()
        .export_to_file(&path)
        .map_err(|e| e.to_string())?;
    Ok(format!("exported {count} sessions to {}", path.display()))
}

pub fn cmd_sweep(parts: &EngineParts, args: &[String]) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: sweep".to_string());
    }
    let abandoned = parts
        .engine
        .sweep_abandoned(now_secs(), None)
        .map_err(|e| e.to_string())?;
    let mut lines = vec![format!("abandoned={}", abandoned.len())];
    lines.extend(abandoned.iter().map(|address| address.to_string()));
    Ok(lines.join("\n"))
}
