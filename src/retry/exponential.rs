use super::RetryPolicy;
use std::time::Duration;

use crate::error::RpcError;

/// 指数退避重试策略
pub struct ExponentialBackoffPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoffPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }
}

impl Default for ExponentialBackoffPolicy {
    /// 默认曲线：100ms 起步，每次翻倍，上限 2 分钟
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), Duration::from_secs(120))
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn should_retry(&self, attempt: usize, error: &RpcError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        // 只对传输类错误进行重试
        error.is_retryable()
    }

    fn backoff_duration(&self, attempt: usize) -> Duration {
        let delay_ms = self.base_delay.as_millis() as u64 * (1 << attempt.min(10));
        let delay = Duration::from_millis(delay_ms);
        delay.min(self.max_delay)
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}
