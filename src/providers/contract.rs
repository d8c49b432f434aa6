//! Execution contract for provider calls: timeout and retries.

use std::sync::Arc;
use std::time::Duration;

use super::provider::{Provider, ProviderError, Result};
use crate::config::Generation;

#[derive(Debug, Clone)]
pub struct ExecutionContract {
    pub timeout_seconds: u64,
    pub retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ExecutionContract {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            retries: 1,
            retry_backoff_ms: 600,
        }
    }
}

impl ExecutionContract {
    pub fn from_settings(generation: &Generation) -> Self {
        Self {
            timeout_seconds: generation.timeout_seconds,
            retries: generation.retries,
            ..Self::default()
        }
    }
}

/// Run a completion, retrying failures and timeouts up to `contract.retries` times.
pub async fn complete_with_contract(
    provider: &Arc<dyn Provider>,
    prompt: &str,
    model: Option<&str>,
    contract: &ExecutionContract,
) -> Result<String> {
    let attempts = contract.retries + 1;
    let timeout = Duration::from_secs(contract.timeout_seconds);
    let mut last_error: Option<ProviderError> = None;

    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, provider.complete(prompt, model)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => {
                tracing::warn!(
                    "{} attempt {}/{} failed: {}",
                    provider.name(),
                    attempt,
                    attempts,
                    e
                );
                last_error = Some(e);
            }
            Err(_) => {
                tracing::warn!(
                    "{} attempt {}/{} timed out",
                    provider.name(),
                    attempt,
                    attempts
                );
                last_error = Some(ProviderError::Timeout(contract.timeout_seconds));
            }
        }

        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(contract.retry_backoff_ms)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| ProviderError::other("completion failed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, _prompt: &str, _model: Option<&str>) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(ProviderError::ApiError("HTTP 503".to_string()))
            } else {
                Ok("ok".to_string())
            }
        }

        fn default_model(&self) -> &str {
            "flaky"
        }
    }

    fn contract(retries: u32) -> ExecutionContract {
        ExecutionContract {
            timeout_seconds: 5,
            retries,
            retry_backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let provider: Arc<dyn Provider> = Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: 1,
        });
        let text = complete_with_contract(&provider, "p", None, &contract(1))
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let provider: Arc<dyn Provider> = Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            fail_first: 5,
        });
        let err = complete_with_contract(&provider, "p", None, &contract(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError(_)));
    }
}
