use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Append-only JSON-lines event log. Writes are best-effort: a failed
/// append never fails the request that produced it.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, fields: Value) {
        self.record(LogLevel::Info, event, fields);
    }

    pub fn warn(&self, event: &str, fields: Value) {
        self.record(LogLevel::Warn, event, fields);
    }

    pub fn error(&self, event: &str, fields: Value) {
        self.record(LogLevel::Error, event, fields);
    }

    pub fn record(&self, level: LogLevel, event: &str, fields: Value) {
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let mut payload = Map::new();
        payload.insert("timestamp".to_string(), Value::from(now_secs()));
        payload.insert("level".to_string(), Value::from(level.as_str()));
        payload.insert("event".to_string(), Value::from(event));
        match fields {
            Value::Object(extra) => payload.extend(extra),
            Value::Null => {}
            other => {
                payload.insert("message".to_string(), other);
            }
        }

        let Ok(line) = serde_json::to_string(&Value::Object(payload)) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::EventLog;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn event_log_appends_one_json_object_per_line() {
        let dir = tempdir().expect("tempdir");
        let log = EventLog::new(dir.path().join("logs/workflow.log"));
        log.info("step.passed", json!({ "agent": "+1555", "step": 3 }));
        log.warn("evaluator.failure", json!("timeout"));

        let raw = fs::read_to_string(dir.path().join("logs/workflow.log")).expect("read log");
        let lines: Vec<Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "step.passed");
        assert_eq!(lines[0]["step"], 3);
        assert_eq!(lines[1]["level"], "warn");
        assert_eq!(lines[1]["message"], "timeout");
    }

    #[test]
    fn disabled_log_is_a_no_op() {
        EventLog::disabled().error("anything", json!({}));
    }
}
