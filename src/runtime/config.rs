//! 生命周期配置模块

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

/// 生命周期配置
///
/// 每个子 watcher 的启动/停止都在各自的截止时间内完成，
/// 超时的组件会被记录为失败，不会无限期地拖住整个 MultiWatcher。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 单个组件启动超时时间（毫秒，默认 30 秒）
    pub start_timeout_ms: u64,
    /// 单个组件停止超时时间（毫秒，默认 5 秒）
    pub stop_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: 30_000,
            stop_timeout_ms: 5_000,
        }
    }
}

impl LifecycleConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置启动超时时间
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// 设置停止超时时间
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// 校验配置：截止时间必须为正
    pub fn validate(&self) -> Result<()> {
        if self.start_timeout_ms == 0 {
            return Err(DiscoveryError::invalid_parameter(
                "lifecycle start_timeout_ms must be positive",
            ));
        }
        if self.stop_timeout_ms == 0 {
            return Err(DiscoveryError::invalid_parameter(
                "lifecycle stop_timeout_ms must be positive",
            ));
        }
        Ok(())
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// 超出 u64 的时长按 u64::MAX 毫秒处理
fn duration_to_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
