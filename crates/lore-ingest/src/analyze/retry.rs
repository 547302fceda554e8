//! Bounded retry around the analysis stage.

use super::{AnalyzeError, Analyzer};
use crate::error::{IngestError, IngestResult};
use lore_config::RetryConfig;
use lore_core::{AnalysisResult, ExtractedContent};
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt count and linear backoff for transient analysis failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.base_delay_ms))
    }

    /// No waiting between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Run `analyzer` with retries.
///
/// Transient failures are retried up to `policy.attempts` calls in total.
/// When every attempt fails transiently the low-confidence fallback
/// classification is returned instead of an error. A permanent failure is
/// returned as `AnalysisRejected` immediately.
pub async fn analyze_with_retry(
    analyzer: &dyn Analyzer,
    content: &ExtractedContent,
    policy: &RetryPolicy,
    fallback_category: &str,
) -> IngestResult<AnalysisResult> {
    let mut last_error = String::new();

    for attempt in 1..=policy.attempts {
        match analyzer.analyze(content).await {
            Ok(result) => return Ok(result),
            Err(AnalyzeError::Permanent(reason)) => {
                return Err(IngestError::AnalysisRejected(reason));
            }
            Err(AnalyzeError::Transient(reason)) => {
                debug!(
                    "Analysis attempt {}/{} for {} failed: {}",
                    attempt,
                    policy.attempts,
                    content.source_name(),
                    reason
                );
                last_error = reason;
                if attempt < policy.attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    let exhausted = IngestError::TransientAnalysis {
        attempts: policy.attempts,
        reason: last_error,
    };
    warn!(
        "{} for {}, using fallback classification",
        exhausted,
        content.source_name()
    );

    Ok(AnalysisResult::fallback(content, fallback_category, exhausted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lore_core::FileKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails transiently `failures` times, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Analyzer for Flaky {
        async fn analyze(&self, content: &ExtractedContent) -> Result<AnalysisResult, AnalyzeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(AnalyzeError::Transient("timeout".to_string()));
            }
            let mut result = AnalysisResult::fallback(content, "sales", "unused");
            result.confidence = 0.9;
            result.needs_manual_review = false;
            result.review_reasons.clear();
            Ok(result)
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Analyzer for Rejecting {
        async fn analyze(&self, _: &ExtractedContent) -> Result<AnalysisResult, AnalyzeError> {
            Err(AnalyzeError::Permanent("content too short".to_string()))
        }
    }

    fn content() -> ExtractedContent {
        ExtractedContent::new("/raw/notes.txt", FileKind::Text, "Enough text to classify.")
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let analyzer = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let result = analyze_with_retry(&analyzer, &content(), &RetryPolicy::immediate(3), "unclassified")
            .await
            .unwrap();

        assert_eq!(result.category, "sales");
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back() {
        let analyzer = Flaky {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let result = analyze_with_retry(&analyzer, &content(), &RetryPolicy::immediate(3), "unclassified")
            .await
            .unwrap();

        assert_eq!(result.category, "unclassified");
        assert_eq!(result.confidence, 0.0);
        assert!(result.needs_manual_review);
        assert_eq!(
            result.review_reasons,
            vec!["analysis unavailable after 3 attempts: timeout".to_string()]
        );
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let err = analyze_with_retry(&Rejecting, &content(), &RetryPolicy::immediate(3), "unclassified")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::AnalysisRejected(_)));
    }
}
