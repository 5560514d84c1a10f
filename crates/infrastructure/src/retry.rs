use crate::ports::StoreError;
use shared::Config;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// リトライ設定
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 最大試行回数（初回を含む）
    pub max_attempts: u32,
    /// 初期待機時間（ミリ秒）
    pub initial_delay_ms: u64,
    /// 指数バックオフの倍率
    pub backoff_multiplier: f64,
    /// 最大待機時間（ミリ秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            initial_delay_ms: config.retry_initial_delay_ms,
            ..Self::default()
        }
    }
}

/// 指数バックオフによるリトライ実行
/// `is_retryable` が真を返すエラーに対してのみ再試行する
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "再試行で成功しました");
                }
                return Ok(result);
            }
            Err(error) if !is_retryable(&error) => {
                debug!(%error, "リトライ不可能なエラー");
                return Err(error);
            }
            Err(error) if attempt >= config.max_attempts => {
                warn!(attempts = attempt, %error, "最大試行回数に達しました");
                return Err(error);
            }
            Err(error) => {
                warn!(attempt, delay_ms = delay, %error, "一時的なエラー。再試行します");
                sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64) * config.backoff_multiplier) as u64;
                delay = delay.min(config.max_delay_ms);
            }
        }
    }
}

/// ストアの読み取り用。`Unavailable` のみ再試行する
/// 書き込みには使わない（重複作成を避けるため）
pub async fn retry_store_read<F, Fut, T>(operation: F, config: &RetryConfig) -> Result<T, StoreError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, StoreError>>,
{
    retry_with_backoff(operation, config, StoreError::is_retryable).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            backoff_multiplier: 2.0,
            max_delay_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_read_succeeds_after_unavailable() {
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_store_read(
            || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StoreError::Unavailable("throttled".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            },
            &fast_config(3),
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<(), StoreError> = retry_store_read(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::Unavailable("down".to_string()))
                }
            },
            &fast_config(2),
        )
        .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<(), StoreError> = retry_store_read(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::Corrupt("bad record".to_string()))
                }
            },
            &fast_config(5),
        )
        .await;

        assert!(matches!(result, Err(StoreError::Corrupt(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            retry_max_attempts: 0,
            retry_initial_delay_ms: 50,
            ..Config::default()
        };
        let retry = RetryConfig::from_config(&config);
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.initial_delay_ms, 50);
    }
}
