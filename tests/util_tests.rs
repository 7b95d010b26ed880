//! Tests for utility modules (retry, timeout).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_bridge::error::{BridgeError, TimeoutPhase};
use agent_bridge::util::retry::RetryPolicy;
use agent_bridge::util::timeout::with_timeout;

#[tokio::test(start_paused = true)]
async fn retry_policy_retries_retryable_errors_until_success() {
    let policy = RetryPolicy {
        max_attempts: 4,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(100),
        multiplier: 2.0,
    };
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(BridgeError::unavailable_with_status(503, "HTTP 503"))
                    } else {
                        Ok::<_, BridgeError>("ok")
                    }
                }
            })
            .await
    });

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let result = task.await.unwrap();

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_stops_immediately_for_non_retryable_errors() {
    let policy = RetryPolicy {
        max_attempts: 5,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        multiplier: 2.0,
    };
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BridgeError::unavailable_with_status(403, "HTTP 403"))
            }
        })
        .await;

    match result {
        Err(BridgeError::UpstreamUnavailable { status, .. }) => assert_eq!(status, Some(403)),
        other => panic!("expected unavailable error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_returns_last_error_when_attempts_are_exhausted() {
    let policy = RetryPolicy::with_attempts(3);
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(BridgeError::unavailable(format!("refused #{attempt}")))
                }
            })
            .await
    });

    let result = task.await.unwrap();

    match result {
        Err(BridgeError::UpstreamUnavailable { message, .. }) => assert_eq!(message, "refused #2"),
        other => panic!("expected unavailable error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_with_zero_attempts_fails_without_running_operation() {
    let policy = RetryPolicy::with_attempts(0);
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BridgeError>(())
            }
        })
        .await;

    assert!(matches!(result, Err(BridgeError::UpstreamUnavailable { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn with_timeout_reports_the_phase_on_expiry() {
    let result = with_timeout(Duration::from_secs(5), TimeoutPhase::Connect, async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<_, BridgeError>(())
    })
    .await;

    match result {
        Err(BridgeError::UpstreamTimeout { phase, timeout_ms }) => {
            assert_eq!(phase, TimeoutPhase::Connect);
            assert_eq!(timeout_ms, 5_000);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn with_timeout_passes_inner_errors_through() {
    let result = with_timeout(Duration::from_secs(5), TimeoutPhase::Connect, async {
        Err::<(), _>(BridgeError::Configuration("nope".into()))
    })
    .await;

    assert!(matches!(result, Err(BridgeError::Configuration(_))));
}
