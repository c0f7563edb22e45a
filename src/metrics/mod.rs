//! 指标收集模块
//!
//! 通知回调运行在子 watcher 的后台任务里，是同步调用，所以这里只使用原子计数器。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 指标快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    /// 收到的变更通知总数（子 watcher + resolver）
    pub notifications_total: u64,
    /// 最近一次观察到的 revision
    pub last_revision: u64,
    pub start_failures: u64,
    pub stop_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    notifications_total: AtomicU64,
    last_revision: AtomicU64,
    start_failures: AtomicU64,
    stop_failures: AtomicU64,
}

/// 指标收集器
///
/// 通过 `ServiceContext` 显式注入，克隆后共享同一组计数器
#[derive(Debug, Clone, Default)]
pub struct WatcherMetrics {
    counters: Arc<Counters>,
}

impl WatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_notification(&self, revision: u64) {
        self.counters
            .notifications_total
            .fetch_add(1, Ordering::Relaxed);
        self.counters
            .last_revision
            .fetch_max(revision, Ordering::Relaxed);
    }

    pub fn record_start_failures(&self, count: usize) {
        self.counters
            .start_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_stop_failures(&self, count: usize) {
        self.counters
            .stop_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> Metrics {
        Metrics {
            notifications_total: self.counters.notifications_total.load(Ordering::Relaxed),
            last_revision: self.counters.last_revision.load(Ordering::Relaxed),
            start_failures: self.counters.start_failures.load(Ordering::Relaxed),
            stop_failures: self.counters.stop_failures.load(Ordering::Relaxed),
        }
    }
}
