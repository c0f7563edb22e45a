//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 配置相关错误（仅在构造阶段出现）
/// - 2000-2999: 生命周期相关错误（启动/停止）
/// - 3000-3999: 发现源相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 配置相关错误 (1000-1999)
    // ============================================================
    InvalidMethod = 1000,
    MissingWatchers = 1001,
    InvalidWatcherEntry = 1002,
    UnknownWatcherMethod = 1003,
    MissingResolver = 1004,
    UnknownResolverMethod = 1005,
    InvalidParameter = 1006,

    // ============================================================
    // 生命周期相关错误 (2000-2999)
    // ============================================================
    StartFailed = 2000,
    StopFailed = 2001,
    LifecycleTimeout = 2002,
    InvalidState = 2003,

    // ============================================================
    // 发现源相关错误 (3000-3999)
    // ============================================================
    SourceUnavailable = 3000,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    UnknownError = 9999,
}

impl ErrorCode {
    /// 获取错误代码的数值
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数值获取错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::InvalidMethod),
            1001 => Some(ErrorCode::MissingWatchers),
            1002 => Some(ErrorCode::InvalidWatcherEntry),
            1003 => Some(ErrorCode::UnknownWatcherMethod),
            1004 => Some(ErrorCode::MissingResolver),
            1005 => Some(ErrorCode::UnknownResolverMethod),
            1006 => Some(ErrorCode::InvalidParameter),
            2000 => Some(ErrorCode::StartFailed),
            2001 => Some(ErrorCode::StopFailed),
            2002 => Some(ErrorCode::LifecycleTimeout),
            2003 => Some(ErrorCode::InvalidState),
            3000 => Some(ErrorCode::SourceUnavailable),
            9999 => Some(ErrorCode::UnknownError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidMethod => "INVALID_METHOD",
            ErrorCode::MissingWatchers => "MISSING_WATCHERS",
            ErrorCode::InvalidWatcherEntry => "INVALID_WATCHER_ENTRY",
            ErrorCode::UnknownWatcherMethod => "UNKNOWN_WATCHER_METHOD",
            ErrorCode::MissingResolver => "MISSING_RESOLVER",
            ErrorCode::UnknownResolverMethod => "UNKNOWN_RESOLVER_METHOD",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
            ErrorCode::StartFailed => "START_FAILED",
            ErrorCode::StopFailed => "STOP_FAILED",
            ErrorCode::LifecycleTimeout => "LIFECYCLE_TIMEOUT",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::SourceUnavailable => "SOURCE_UNAVAILABLE",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Config,
            2000..=2999 => ErrorCategory::Lifecycle,
            3000..=3999 => ErrorCategory::Source,
            _ => ErrorCategory::General,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 配置错误永远不可重试；发现源暂时不可达或启动超时可以在下一轮重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::SourceUnavailable | ErrorCode::LifecycleTimeout
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.as_u32())
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Config,
    Lifecycle,
    Source,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "CONFIG"),
            ErrorCategory::Lifecycle => write!(f, "LIFECYCLE"),
            ErrorCategory::Source => write!(f, "SOURCE"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}
