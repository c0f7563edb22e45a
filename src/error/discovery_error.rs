//! 服务发现统一错误类型

use super::code::ErrorCode;
use super::lifecycle::LifecycleReport;
use std::collections::HashMap;
use thiserror::Error;

/// 服务发现统一错误类型
#[derive(Error, Debug, Clone)]
pub enum DiscoveryError {
    /// 配置错误（只在构造阶段同步抛出）
    #[error("配置错误 [{code}] {reason}", code = .code.as_str())]
    Config {
        code: ErrorCode,
        reason: String,
        details: Option<String>,
        params: Option<HashMap<String, String>>,
    },

    /// 生命周期错误（尽力完成后汇总）
    #[error("生命周期错误: {0}")]
    Lifecycle(LifecycleReport),

    /// 非法的状态迁移（例如 stop 之后再 start）
    #[error("状态错误: {0}")]
    InvalidState(String),

    /// 发现源自身的错误（例如 etcd 不可达）
    #[error("发现源错误: {0}")]
    Source(String),
}

impl DiscoveryError {
    /// 创建配置错误
    pub fn config(code: ErrorCode, reason: impl Into<String>) -> Self {
        DiscoveryError::Config {
            code,
            reason: reason.into(),
            details: None,
            params: None,
        }
    }

    /// 创建发现源错误
    pub fn unavailable(msg: impl Into<String>) -> Self {
        DiscoveryError::Source(msg.into())
    }

    /// 创建状态错误
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        DiscoveryError::InvalidState(msg.into())
    }

    // ============================================================
    // 便捷方法：配置相关错误
    // ============================================================

    pub fn invalid_method(expected: &str, actual: Option<&str>) -> Self {
        super::ErrorBuilder::new(
            ErrorCode::InvalidMethod,
            format!("discovery method must be '{}'", expected),
        )
        .param("expected", expected)
        .param("actual", actual.unwrap_or("<missing>"))
        .build_error()
    }

    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::config(ErrorCode::InvalidParameter, reason)
    }

    // ============================================================
    // 信息获取方法
    // ============================================================

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            DiscoveryError::Config { code, .. } => *code,
            DiscoveryError::Lifecycle(report) => report
                .failures
                .first()
                .map(|f| f.code)
                .unwrap_or(ErrorCode::UnknownError),
            DiscoveryError::InvalidState(_) => ErrorCode::InvalidState,
            DiscoveryError::Source(_) => ErrorCode::SourceUnavailable,
        }
    }

    /// 获取错误原因
    pub fn reason(&self) -> String {
        match self {
            DiscoveryError::Config { reason, .. } => reason.clone(),
            DiscoveryError::Lifecycle(report) => report.to_string(),
            DiscoveryError::InvalidState(msg) => msg.clone(),
            DiscoveryError::Source(msg) => msg.clone(),
        }
    }

    /// 是否为配置错误
    pub fn is_config(&self) -> bool {
        matches!(self, DiscoveryError::Config { .. })
    }

    /// 是否为生命周期错误
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, DiscoveryError::Lifecycle(_))
    }

    /// 获取生命周期报告（如果有）
    pub fn lifecycle_report(&self) -> Option<&LifecycleReport> {
        match self {
            DiscoveryError::Lifecycle(report) => Some(report),
            _ => None,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DiscoveryError>;
