use super::{parse_verdict, EvaluatorError, EvidenceEvaluator, LocalAsset, Verdict};
use crate::config::EvaluatorConfig;
use crate::rubric::StepTable;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

/// Vision evaluator speaking the OpenAI-compatible chat-completions protocol.
pub struct HttpEvaluator {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout: Duration,
    rubric: Arc<StepTable>,
}

impl HttpEvaluator {
    pub fn from_config(config: &EvaluatorConfig, rubric: Arc<StepTable>) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
            rubric,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(&self, prompt: &str, asset: &LocalAsset, encoded: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": 0.1,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{};base64,{encoded}", asset.content_type),
                            "detail": "high"
                        }
                    }
                ]
            }]
        })
    }
}

impl EvidenceEvaluator for HttpEvaluator {
    fn evaluate(&self, asset: &LocalAsset, step_index: u32) -> Result<Verdict, EvaluatorError> {
        let prompt = self.rubric.evaluation_prompt(step_index).ok_or_else(|| {
            EvaluatorError::Transport(format!("rubric has no step {step_index}"))
        })?;
        let bytes = fs::read(&asset.path).map_err(|err| {
            EvaluatorError::Transport(format!(
                "failed to read asset {}: {err}",
                asset.path.display()
            ))
        })?;
        let body = self.request_body(&prompt, asset, &STANDARD.encode(bytes));

        let mut request = ureq::post(&self.endpoint).timeout(self.timeout);
        if let Some(key) = self.api_key.as_deref() {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }
        let response = request.send_json(body).map_err(|err| match err {
            ureq::Error::Transport(transport)
                if transport.kind() == ureq::ErrorKind::Io
                    && transport.to_string().contains("timed out") =>
            {
                EvaluatorError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            }
            other => EvaluatorError::Transport(other.to_string()),
        })?;
        let payload: Value = response
            .into_json()
            .map_err(|err| EvaluatorError::Malformed(format!("response is not json: {err}")))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EvaluatorError::Malformed("response has no choices[0].message.content".to_string())
            })?;
        parse_verdict(content, step_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn request_body_embeds_prompt_and_data_url() {
        let evaluator = HttpEvaluator::from_config(
            &EvaluatorConfig::default(),
            Arc::new(StepTable::fiber_default()),
        );
        let asset = LocalAsset {
            path: PathBuf::from("/tmp/x.png"),
            media_ref: "m".to_string(),
            bytes: 3,
            content_type: "image/png".to_string(),
        };
        let body = evaluator.request_body("check it", &asset, "QUJD");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"][0]["text"], "check it");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,QUJD"
        );
    }

    #[test]
    fn missing_asset_is_a_transport_failure() {
        let evaluator = HttpEvaluator::from_config(
            &EvaluatorConfig::default(),
            Arc::new(StepTable::fiber_default()),
        );
        let asset = LocalAsset {
            path: PathBuf::from("/nonexistent/fieldproof/photo.jpg"),
            media_ref: "m".to_string(),
            bytes: 0,
            content_type: "image/jpeg".to_string(),
        };
        assert!(matches!(
            evaluator.evaluate(&asset, 1),
            Err(EvaluatorError::Transport(_))
        ));
    }
}
