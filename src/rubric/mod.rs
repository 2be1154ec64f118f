mod fiber;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RubricError {
    #[error("failed to read rubric {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rubric yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("rubric validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub instruction: String,
    #[serde(default)]
    pub criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct IndexedStep {
    index: u32,
    #[serde(flatten)]
    step: StepDefinition,
}

#[derive(Debug, Clone, Deserialize)]
struct RubricFile {
    steps: Vec<IndexedStep>,
}

/// Ordered evidence steps, addressed `1..=len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTable {
    steps: Vec<StepDefinition>,
}

impl StepTable {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, RubricError> {
        if steps.is_empty() {
            return Err(RubricError::Invalid(
                "rubric must define at least one step".to_string(),
            ));
        }
        if u32::try_from(steps.len()).is_err() {
            return Err(RubricError::Invalid("rubric has too many steps".to_string()));
        }
        for (offset, step) in steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(RubricError::Invalid(format!(
                    "step {} name must be non-empty",
                    offset + 1
                )));
            }
            if step.instruction.trim().is_empty() {
                return Err(RubricError::Invalid(format!(
                    "step {} instruction must be non-empty",
                    offset + 1
                )));
            }
        }
        Ok(Self { steps })
    }

    /// The built-in twelve-step fiber installation rubric.
    pub fn fiber_default() -> Self {
        Self {
            steps: fiber::fiber_steps(),
        }
    }

    /// Loads a rubric whose steps carry explicit `index` fields; every index in
    /// `1..=N` must appear exactly once.
    pub fn from_path(path: &Path) -> Result<Self, RubricError> {
        let raw = fs::read_to_string(path).map_err(|source| RubricError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|err| match err {
            RubricError::Parse { source, .. } => RubricError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, RubricError> {
        let file: RubricFile = serde_yaml::from_str(raw).map_err(|source| RubricError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        let total = file.steps.len();
        let mut seen = BTreeSet::new();
        for entry in &file.steps {
            let in_range = usize::try_from(entry.index)
                .map(|index| (1..=total).contains(&index))
                .unwrap_or(false);
            if !in_range {
                return Err(RubricError::Invalid(format!(
                    "step index {} is outside 1..={total}",
                    entry.index
                )));
            }
            if !seen.insert(entry.index) {
                return Err(RubricError::Invalid(format!(
                    "step index {} is defined more than once",
                    entry.index
                )));
            }
        }
        let mut entries = file.steps;
        entries.sort_by_key(|entry| entry.index);
        Self::new(entries.into_iter().map(|entry| entry.step).collect())
    }

    pub fn len(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: u32) -> Option<&StepDefinition> {
        let offset = usize::try_from(index).ok()?.checked_sub(1)?;
        self.steps.get(offset)
    }

    pub fn name(&self, index: u32) -> &str {
        self.step(index)
            .map(|step| step.name.as_str())
            .unwrap_or("Unknown step")
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &StepDefinition)> {
        (1..).zip(self.steps.iter())
    }

    /// Prompt handed to the evidence evaluator for one step.
    pub fn evaluation_prompt(&self, index: u32) -> Option<String> {
        let step = self.step(index)?;
        let mut prompt = format!(
            "You are a fiber installation quality expert. Analyze this photo for Step {index} ({}).\n\nVerification criteria:\n",
            step.name
        );
        for criterion in &step.criteria {
            prompt.push_str("- ");
            prompt.push_str(criterion);
            prompt.push('\n');
        }
        prompt.push_str(
            "\nRespond in JSON format only:\n{\n  \"passed\": true/false,\n  \"score\": 0-10,\n  \"issues\": [\"list of specific problems found\"],\n  \"confidence\": 0.00-1.00,\n  \"recommendation\": \"specific advice for improvement if needed\"\n}\n",
        );
        Some(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiber_default_has_twelve_named_steps() {
        let table = StepTable::fiber_default();
        assert_eq!(table.len(), 12);
        assert_eq!(table.name(1), "House Photo");
        assert_eq!(table.name(12), "Customer Signature");
        assert!(table.step(0).is_none());
        assert!(table.step(13).is_none());
        let prompt = table.evaluation_prompt(2).expect("prompt");
        assert!(prompt.contains("Step 2 (Cable from Pole to House)"));
        assert!(prompt.contains("- Full span clearly visible in single frame"));
    }

    #[test]
    fn yaml_rubric_sorts_by_index_and_rejects_gaps() {
        let table = StepTable::from_yaml(
            r#"
steps:
  - index: 2
    name: Meter
    instruction: Photograph the meter.
  - index: 1
    name: Front
    instruction: Photograph the front.
    criteria: [front visible]
"#,
        )
        .expect("rubric");
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(1), "Front");

        let err = StepTable::from_yaml(
            r#"
steps:
  - index: 1
    name: Front
    instruction: a
  - index: 3
    name: Meter
    instruction: b
"#,
        )
        .expect_err("gap must fail");
        assert!(err.to_string().contains("outside 1..=2"));

        let err = StepTable::from_yaml(
            r#"
steps:
  - index: 1
    name: Front
    instruction: a
  - index: 1
    name: Again
    instruction: b
"#,
        )
        .expect_err("duplicate must fail");
        assert!(err.to_string().contains("more than once"));
    }
}
