//! 指标收集模块

use std::sync::Arc;
use tokio::sync::RwLock;

/// 调用指标数据
#[derive(Debug, Clone, Default)]
pub struct CallMetrics {
    pub calls_total: u64,
    pub calls_success: u64,
    pub calls_failed: u64,
    pub retries_total: u64,
    pub call_duration_ms: Vec<u64>,
}

/// 指标收集器
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<CallMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(CallMetrics::default())),
        }
    }

    /// 记录一次调用结果
    ///
    /// `attempts` 为实际尝试次数（含首次），超出 1 的部分计入重试数。
    pub async fn record_call(&self, success: bool, attempts: usize, duration: std::time::Duration) {
        let mut metrics = self.metrics.write().await;
        metrics.calls_total += 1;

        if success {
            metrics.calls_success += 1;
        } else {
            metrics.calls_failed += 1;
        }

        metrics.retries_total += attempts.saturating_sub(1) as u64;
        metrics.call_duration_ms.push(duration.as_millis() as u64);
    }

    /// 当前指标快照
    pub async fn snapshot(&self) -> CallMetrics {
        self.metrics.read().await.clone()
    }

    /// 平均调用耗时（毫秒）
    pub async fn average_duration_ms(&self) -> f64 {
        let metrics = self.metrics.read().await;
        if metrics.call_duration_ms.is_empty() {
            return 0.0;
        }
        let total: u64 = metrics.call_duration_ms.iter().sum();
        total as f64 / metrics.call_duration_ms.len() as f64
    }

    /// 成功率
    pub async fn success_rate(&self) -> f64 {
        let metrics = self.metrics.read().await;
        if metrics.calls_total == 0 {
            return 0.0;
        }
        metrics.calls_success as f64 / metrics.calls_total as f64
    }
}
