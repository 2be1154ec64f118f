use crate::admin::AdminConsole;
use crate::app::command_support::{flag_value, split_flags};
use crate::runtime::EngineParts;
use crate::shared::ids::AgentAddress;

pub fn cmd_admin(parts: &EngineParts, args: &[String]) -> Result<String, String> {
    let usage = "usage: admin stats|sessions --as <address>";
    let (positional, flags) = split_flags(args, &["as"])?;
    let raw_agent = flag_value(&flags, "as").ok_or_else(|| usage.to_string())?;
    let agent = AgentAddress::parse(raw_agent)?;
    let cap = parts
        .engine
        .admin_gate()
        .authorize(&agent)
        .ok_or_else(|| format!("agent {agent} is not authorized for admin commands"))?;
    let console = AdminConsole::new(&parts.engine);

    match positional.as_slice() {
        [query] if query == "stats" => {
            let stats = console.statistics(&cap).map_err(|e| e.to_string())?;
            Ok(format!(
                "threshold={:.1}\ntotal_sessions={}\nsessions_with_active_installation={}\ncompleted_installations={}\naverage_completed_steps={:.1}",
                console.threshold(&cap),
                stats.total_sessions,
                stats.sessions_with_active_installation,
                stats.completed_installations,
                stats.average_completed_steps
            ))
        }
        [query] if query == "sessions" => {
            let active = console.active_sessions(&cap).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&active)
                .map_err(|e| format!("failed to encode active sessions: {e}"))
        }
        _ => Err(usage.to_string()),
    }
}
