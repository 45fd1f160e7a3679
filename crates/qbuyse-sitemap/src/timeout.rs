//! Deadline wrapper for generation steps.
//!
//! The wrapped future is dropped when the deadline passes, so a slow data
//! source is cancelled at its next await point instead of running on in the
//! background.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{Error, Result};

/// Run `operation`, failing with [`Error::Timeout`] if it does not finish within `limit`.
pub async fn with_timeout<T, F>(limit: Duration, label: &str, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if let Ok(result) = tokio::time::timeout(limit, operation).await {
        result
    } else {
        warn!(operation = label, limit_ms = limit.as_millis(), "Operation timed out");
        Err(Error::Timeout(format!(
            "{label} did not complete within {}ms",
            limit.as_millis()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_passes_through_success() {
        let value = with_timeout(Duration::from_secs(1), "fast", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_passes_through_inner_error() {
        let err = with_timeout(Duration::from_secs(1), "failing", async {
            Err::<(), _>(Error::Database("boom".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let err = with_timeout(Duration::from_millis(50), "slow fetch", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(err.status_code(), 504);
        assert!(err.to_string().contains("slow fetch"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_operation_is_cancelled() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result = with_timeout(Duration::from_millis(10), "cancellable", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert!(result.is_err());

        // Give a leaked operation every chance to finish; it must not.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
