use crate::config::Settings;
use crate::rubric::StepTable;

pub fn cmd_rubric(settings: &Settings, args: &[String]) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: rubric".to_string());
    }
    let table = match settings.rubric_path.as_deref() {
        Some(path) => StepTable::from_path(path).map_err(|e| e.to_string())?,
        None => StepTable::fiber_default(),
    };

    let mut lines = vec![format!("steps={}", table.len())];
    for (index, step) in table.iter() {
        lines.push(format!("{index:>2}. {} - {}", step.name, step.instruction));
    }
    Ok(lines.join("\n"))
}
