use std::future::Future;
use std::time::Duration;

use fluvio_future::timer::sleep;
use tracing::debug;
use tracing::warn;

use dw_config::RetrySettings;

use crate::ClientError;

/// fixed delay retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// total number of attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.delay())
    }
}

/// Run `operation` until it succeeds or attempts run out.
///
/// Not found and already exists errors are returned without retrying.
/// There is no delay after the last attempt.
pub async fn retryable_exec<T, Op, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: Op,
) -> Result<T, ClientError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                warn!(label, attempt, max_attempts, %err, "attempt failed");

                if err.cluster_error().is_permanent() || attempt >= max_attempts {
                    return Err(err);
                }

                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod test {

    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use std::time::Instant;

    use fluvio_future::test_async;

    use super::retryable_exec;
    use super::RetryPolicy;
    use crate::ClientError;

    fn transient() -> ClientError {
        ClientError::Status(dw_types::MetaStatus::failure(503, "ServiceUnavailable", "busy"))
    }

    #[test_async]
    async fn test_retry_exhausts_attempts() -> Result<(), ClientError> {
        let policy = RetryPolicy::new(5, Duration::from_millis(20));
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        let result: Result<(), ClientError> = retryable_exec(&policy, "patch", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // four delays between five attempts
        assert!(start.elapsed() >= Duration::from_millis(80));
        Ok(())
    }

    #[test_async]
    async fn test_not_found_aborts() -> Result<(), ClientError> {
        let policy = RetryPolicy::new(5, Duration::from_millis(20));
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), ClientError> = retryable_exec(&policy, "delete", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::not_found("devworkspace gone"))
        })
        .await;

        assert!(result.expect_err("error").is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test_async]
    async fn test_already_exists_aborts() -> Result<(), ClientError> {
        let policy = RetryPolicy::new(5, Duration::from_millis(20));
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), ClientError> = retryable_exec(&policy, "create", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Status(dw_types::MetaStatus::failure(
                409,
                "AlreadyExists",
                "devworkspaces \"nodejs\" already exists",
            )))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test_async]
    async fn test_recovers() -> Result<(), ClientError> {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let value = retryable_exec(&policy, "start", || async move {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                Err(transient())
            } else {
                Ok(call)
            }
        })
        .await
        .expect("value");

        assert_eq!(value, 2);
        Ok(())
    }
}
