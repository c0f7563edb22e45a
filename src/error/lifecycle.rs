//! 生命周期失败报告
//!
//! `start()` / `stop()` 采用尽力而为策略：某个组件失败不会阻止其余组件，
//! 全部尝试完成后再把所有失败汇总成一份报告返回给调用方。

use super::code::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Start,
    Stop,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Start => write!(f, "start"),
            LifecyclePhase::Stop => write!(f, "stop"),
        }
    }
}

/// 单个组件（子 watcher 或 resolver）的失败记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFailure {
    /// 组件名称（子 watcher 的逻辑名，或 `resolver`）
    pub component: String,
    pub phase: LifecyclePhase,
    pub code: ErrorCode,
    pub reason: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// 汇总报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub phase: LifecyclePhase,
    /// 参与本次阶段的组件总数
    pub attempted: usize,
    pub failures: Vec<ComponentFailure>,
}

impl LifecycleReport {
    pub fn new(phase: LifecyclePhase) -> Self {
        Self {
            phase,
            attempted: 0,
            failures: Vec::new(),
        }
    }

    /// 记录一个组件已被尝试
    pub fn attempted(&mut self) {
        self.attempted += 1;
    }

    /// 记录一次失败
    pub fn record_failure(
        &mut self,
        component: impl Into<String>,
        code: ErrorCode,
        reason: impl Into<String>,
    ) {
        self.failures.push(ComponentFailure {
            component: component.into(),
            phase: self.phase,
            code,
            reason: reason.into(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 失败组件名称列表
    pub fn failed_components(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.component.as_str()).collect()
    }

    /// 转换为结果：没有失败时返回 `Ok(())`
    pub fn into_result(self) -> super::Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(super::DiscoveryError::Lifecycle(self))
        }
    }
}

impl fmt::Display for LifecycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {}/{} components",
            self.phase,
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            write!(
                f,
                "; {} [{}] {}",
                failure.component,
                failure.code.as_str(),
                failure.reason
            )?;
        }
        Ok(())
    }
}
