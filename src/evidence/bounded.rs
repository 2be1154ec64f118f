use super::{EvaluatorError, EvidenceEvaluator, LocalAsset, Verdict};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Runs the wrapped evaluator on a worker thread and gives up after `timeout`.
/// A late result is dropped with its channel.
pub struct BoundedEvaluator {
    inner: Arc<dyn EvidenceEvaluator>,
    timeout: Duration,
}

impl BoundedEvaluator {
    pub fn new(inner: Arc<dyn EvidenceEvaluator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl EvidenceEvaluator for BoundedEvaluator {
    fn evaluate(&self, asset: &LocalAsset, step_index: u32) -> Result<Verdict, EvaluatorError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let asset = asset.clone();
        thread::spawn(move || {
            let _ = tx.send(inner.evaluate(&asset, step_index));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(EvaluatorError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(EvaluatorError::Transport(
                "evaluator worker exited without a result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Sleepy(Duration);

    impl EvidenceEvaluator for Sleepy {
        fn evaluate(
            &self,
            _asset: &LocalAsset,
            step_index: u32,
        ) -> Result<Verdict, EvaluatorError> {
            thread::sleep(self.0);
            Ok(Verdict {
                step_index,
                passed: true,
                score: 9.0,
                issues: Vec::new(),
                confidence: 0.9,
                advice: String::new(),
            })
        }
    }

    struct Panicky;

    impl EvidenceEvaluator for Panicky {
        fn evaluate(
            &self,
            _asset: &LocalAsset,
            _step_index: u32,
        ) -> Result<Verdict, EvaluatorError> {
            panic!("evaluator crashed");
        }
    }

    fn asset() -> LocalAsset {
        LocalAsset {
            path: PathBuf::from("/tmp/photo.jpg"),
            media_ref: "m1".to_string(),
            bytes: 3,
            content_type: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn slow_evaluator_resolves_to_timeout() {
        let bounded = BoundedEvaluator::new(
            Arc::new(Sleepy(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        assert_eq!(
            bounded.evaluate(&asset(), 1),
            Err(EvaluatorError::Timeout { timeout_ms: 20 })
        );
    }

    #[test]
    fn fast_evaluator_passes_through() {
        let bounded = BoundedEvaluator::new(
            Arc::new(Sleepy(Duration::from_millis(1))),
            Duration::from_secs(5),
        );
        let verdict = bounded.evaluate(&asset(), 4).expect("verdict");
        assert_eq!(verdict.step_index, 4);
    }

    #[test]
    fn crashed_evaluator_is_a_transport_failure() {
        let bounded = BoundedEvaluator::new(Arc::new(Panicky), Duration::from_secs(5));
        assert!(matches!(
            bounded.evaluate(&asset(), 1),
            Err(EvaluatorError::Transport(_))
        ));
    }
}
