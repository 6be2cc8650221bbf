use crate::core::{MonitorError, MonitorResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{sleep, timeout, Duration};

/// 接続リトライの方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 最大試行回数
    pub attempts: u32,
    /// 1回の試行に許す時間
    pub attempt_timeout: Duration,
    /// 試行と試行の間隔
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            attempt_timeout: Duration::from_secs(5),
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// 全試行が失敗した場合にかかる時間の上限
    pub fn worst_case(&self) -> Duration {
        (self.attempt_timeout + self.delay) * self.attempts
    }
}

/// `policy` に従って `op` を繰り返す。`op` には1始まりの試行番号が渡される。
///
/// 各試行は `attempt_timeout` で打ち切られ `TransportTimeout` になる。
/// 最後の試行の後は待たない。全て失敗すると最後の原因を持つ `ConnectionFailed` を返す。
pub async fn retry_with_policy<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> MonitorResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = MonitorResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        info!("接続を試行しています ({}/{})", attempt, attempts);

        let result = match timeout(policy.attempt_timeout, op(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::TransportTimeout(policy.attempt_timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("試行{}は失敗しました: {}", attempt, e);
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            sleep(policy.delay).await;
        }
    }

    Err(MonitorError::ConnectionFailed {
        attempts,
        source: Box::new(
            last_error.unwrap_or_else(|| MonitorError::Transport("試行が行われませんでした".to_string())),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_every_attempt_times_out() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let counter = calls.clone();
        let result: MonitorResult<()> = retry_with_policy(&policy, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::pending()
        })
        .await;

        let elapsed = started.elapsed();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // 5回のタイムアウトと4回の待機
        assert!(elapsed >= Duration::from_secs(29) && elapsed < Duration::from_millis(29_100));
        assert!(elapsed <= policy.worst_case());
        match result {
            Err(MonitorError::ConnectionFailed { attempts, source }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, MonitorError::TransportTimeout(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_spaced_by_the_delay() {
        let policy = RetryPolicy::default();
        let started = Instant::now();
        let mut seen = Vec::new();

        let result: MonitorResult<()> = retry_with_policy(&policy, |attempt| {
            seen.push((attempt, started.elapsed()));
            async { Err(MonitorError::Transport("connection refused".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(MonitorError::ConnectionFailed { attempts: 5, .. })));
        for (i, (_, at)) in seen.iter().enumerate() {
            let expected = Duration::from_secs(i as u64);
            assert!(*at >= expected && *at < expected + Duration::from_millis(100), "attempt {} at {:?}", i + 1, at);
        }
        assert_eq!(seen.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let policy = RetryPolicy::default();
        let result = retry_with_policy(&policy, |attempt| async move {
            if attempt < 3 {
                Err(MonitorError::Transport("not yet".to_string()))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn worst_case_bound() {
        assert_eq!(RetryPolicy::default().worst_case(), Duration::from_secs(30));
    }
}
