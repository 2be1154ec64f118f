use super::{EvaluatorError, Verdict};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawVerdict {
    passed: bool,
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default, alias = "advice")]
    recommendation: String,
}

/// Parses the evaluator's JSON answer, optionally wrapped in a ```json fence or
/// surrounded by prose. Anything that does not decode is `Malformed`.
pub fn parse_verdict(raw: &str, step_index: u32) -> Result<Verdict, EvaluatorError> {
    let body = extract_json_object(raw)
        .ok_or_else(|| EvaluatorError::Malformed("no json object in output".to_string()))?;
    let parsed: RawVerdict = serde_json::from_str(body)
        .map_err(|err| EvaluatorError::Malformed(format!("invalid verdict json: {err}")))?;
    if !parsed.score.is_finite() || !parsed.confidence.is_finite() {
        return Err(EvaluatorError::Malformed(
            "score and confidence must be finite numbers".to_string(),
        ));
    }

    Ok(Verdict {
        step_index,
        passed: parsed.passed,
        score: parsed.score.clamp(0.0, 10.0) as f32,
        issues: parsed
            .issues
            .into_iter()
            .map(|issue| issue.trim().to_string())
            .filter(|issue| !issue.is_empty())
            .collect(),
        confidence: parsed.confidence.clamp(0.0, 1.0) as f32,
        advice: parsed.recommendation.trim().to_string(),
    })
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = match trimmed.find("```json") {
        Some(start) => {
            let rest = &trimmed[start + "```json".len()..];
            rest.find("```").map(|end| &rest[..end]).unwrap_or(rest)
        }
        None => trimmed,
    };
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}
