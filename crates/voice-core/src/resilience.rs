//! Per-call deadlines and transient-error retry/backoff shared by every
//! capability provider call site.

use std::future::Future;
use std::time::Duration;

use crate::error::{VoiceError, VoiceResult};

/// Deadlines applied to each capability provider call.
#[derive(Debug, Clone, Copy)]
pub struct ProviderTimeouts {
    pub asr: Duration,
    pub llm_first_token: Duration,
    pub llm_per_token: Duration,
    pub tts: Duration,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            asr: Duration::from_secs(15),
            llm_first_token: Duration::from_secs(10),
            llm_per_token: Duration::from_secs(30),
            tts: Duration::from_secs(20),
        }
    }
}

/// Retry policy for `ProviderTransient` failures: exponential backoff up
/// to `max_retries` attempts, then escalate to `ProviderUnavailable`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_initial: Duration::from_millis(200),
            backoff_max: Duration::from_secs(2),
        }
    }
}

/// Races `fut` against `dur`, turning an elapsed deadline into
/// `ProviderTimeout`.
pub async fn with_timeout<T>(dur: Duration, fut: impl Future<Output = VoiceResult<T>>) -> VoiceResult<T> {
    match tokio::time::timeout(dur, fut).await {
        Ok(result) => result,
        Err(_) => Err(VoiceError::ProviderTimeout(format!(
            "provider call exceeded {dur:?}"
        ))),
    }
}

/// Retries `call` while it keeps failing with a retryable error, with
/// exponential backoff. A retryable error that exhausts `max_retries`
/// escalates to `ProviderUnavailable`; a non-retryable error returns
/// immediately.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> VoiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VoiceResult<T>>,
{
    let mut backoff = policy.backoff_initial;
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(policy.backoff_max);
            }
            Err(err) if err.is_retryable() => {
                return Err(VoiceError::ProviderUnavailable(err.to_string()));
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn with_timeout_passes_through_fast_success() {
        let result = with_timeout(Duration::from_millis(50), async { Ok::<_, VoiceError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn with_timeout_converts_elapsed_deadline() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, VoiceError>(())
        })
        .await;
        assert!(matches!(result, Err(VoiceError::ProviderTimeout(_))));
    }

    #[tokio::test]
    async fn with_retry_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 2,
            backoff_initial: Duration::from_millis(1),
            backoff_max: Duration::from_millis(2),
        };
        let result = with_retry(&policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(VoiceError::ProviderTransient("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_escalates_after_exhausting_attempts() {
        let policy = RetryPolicy {
            max_retries: 1,
            backoff_initial: Duration::from_millis(1),
            backoff_max: Duration::from_millis(2),
        };
        let result: VoiceResult<()> =
            with_retry(&policy, || async { Err(VoiceError::ProviderTransient("down".into())) }).await;
        assert!(matches!(result, Err(VoiceError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_non_transient_errors() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: VoiceResult<()> = with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(VoiceError::InvalidFrame("bad".into())) }
        })
        .await;
        assert!(matches!(result, Err(VoiceError::InvalidFrame(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
