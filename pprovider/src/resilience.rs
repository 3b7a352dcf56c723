//! Retrying of non-streaming gateway calls.
//!
//! A stream that already produced output is never replayed, so only
//! `complete` goes through [`RetryPolicy::run`].

use std::future::Future;
use std::time::Duration;

use crate::{ProviderError, ProviderId};

/// Attempt budget with a delay that doubles after each failure up to
/// `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }

    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Delay before the attempt that follows `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << doublings)
            .min(self.max_delay)
    }

    /// Calls `execute` with 1-based attempt numbers until it succeeds, fails
    /// permanently, or the budget runs out. `sleep` performs the waits so
    /// callers pick the timer.
    pub async fn run<T, Op, OpFuture, Sleep, SleepFuture>(
        &self,
        provider: ProviderId,
        operation: &str,
        hooks: &dyn ProviderOperationHooks,
        mut execute: Op,
        mut sleep: Sleep,
    ) -> Result<T, ProviderError>
    where
        Op: FnMut(u32) -> OpFuture,
        OpFuture: Future<Output = Result<T, ProviderError>>,
        Sleep: FnMut(Duration) -> SleepFuture,
        SleepFuture: Future<Output = ()>,
    {
        let mut attempt = 1;
        loop {
            hooks.on_attempt_start(provider, operation, attempt);
            let error = match execute(attempt).await {
                Ok(value) => {
                    hooks.on_success(provider, operation, attempt);
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.should_retry(attempt, &error) {
                hooks.on_failure(provider, operation, attempt, &error);
                return Err(error);
            }
            let delay = self.delay_after(attempt);
            hooks.on_retry_scheduled(provider, operation, attempt, delay, &error);
            sleep(delay).await;
            attempt += 1;
        }
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _provider: ProviderId, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempts: u32,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn retry_policy_respects_error_kind_and_attempt_limit() {
        let policy = RetryPolicy::new(2);
        let transient = ProviderError::rate_limited("slow down");
        let permanent = ProviderError::unsupported_model("llama");

        assert!(policy.should_retry(1, &transient));
        assert!(!policy.should_retry(2, &transient));
        assert!(!policy.should_retry(1, &permanent));
        assert!(!RetryPolicy::none().should_retry(1, &transient));
    }

    #[test]
    fn delay_doubles_then_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(50));
        assert_eq!(policy.delay_after(2), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(150));
        assert_eq!(policy.delay_after(40), Duration::from_millis(150));
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl RecordingHooks {
        fn push(&self, event: String) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    impl ProviderOperationHooks for RecordingHooks {
        fn on_retry_scheduled(
            &self,
            provider: ProviderId,
            operation: &str,
            attempt: u32,
            _delay: Duration,
            _error: &ProviderError,
        ) {
            self.push(format!("retry:{provider}:{operation}:{attempt}"));
        }

        fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
            self.push(format!("success:{provider}:{operation}:{attempts}"));
        }

        fn on_failure(
            &self,
            provider: ProviderId,
            operation: &str,
            attempts: u32,
            error: &ProviderError,
        ) {
            self.push(format!(
                "failure:{provider}:{operation}:{attempts}:{:?}",
                error.kind
            ));
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let hooks = RecordingHooks::default();
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result = RetryPolicy::new(3).run(
            ProviderId::Anthropic,
            "title",
            &hooks,
            |attempt| async move {
                if attempt < 3 {
                    Err(ProviderError::unavailable("overloaded"))
                } else {
                    Ok(attempt)
                }
            },
            {
                let sleeps = Arc::clone(&sleeps);
                move |delay| {
                    let sleeps = Arc::clone(&sleeps);
                    async move { sleeps.lock().expect("sleeps lock").push(delay) }
                }
            },
        )
        .await;

        assert_eq!(result.expect("third attempt succeeds"), 3);
        assert_eq!(sleeps.lock().expect("sleeps lock").len(), 2);
        let events = hooks.events.lock().expect("events lock").clone();
        assert_eq!(
            events,
            vec![
                "retry:anthropic:title:1".to_string(),
                "retry:anthropic:title:2".to_string(),
                "success:anthropic:title:3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn permanent_errors_fail_on_first_attempt() {
        let hooks = RecordingHooks::default();

        let result = RetryPolicy::new(5).run::<(), _, _, _, _>(
            ProviderId::OpenAi,
            "complete",
            &hooks,
            |_| async { Err(ProviderError::authentication("bad key")) },
            |_| async {},
        )
        .await;

        assert_eq!(
            result.expect_err("must fail").kind,
            ProviderErrorKind::Authentication
        );
        let events = hooks.events.lock().expect("events lock").clone();
        assert_eq!(events, vec!["failure:openai:complete:1:Authentication".to_string()]);
    }
}
