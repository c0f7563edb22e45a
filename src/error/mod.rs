//! 服务发现错误处理模块
//!
//! 区分三类错误：
//! - 配置错误：构造阶段同步抛出，不会留下半构造的对象
//! - 生命周期错误：启动/停止时尽力完成所有组件后汇总上报
//! - 发现源错误：子 watcher 自身的故障，由子 watcher 内部处理

pub mod builder;
pub mod code;
pub mod discovery_error;
pub mod lifecycle;

pub use builder::ErrorBuilder;
pub use code::{ErrorCategory, ErrorCode};
pub use discovery_error::{DiscoveryError, Result};
pub use lifecycle::{ComponentFailure, LifecyclePhase, LifecycleReport};

/// 将任意错误转换为配置参数错误，并把原始错误放入 details
pub fn map_param_error<E, S>(error: E, reason: S) -> DiscoveryError
where
    E: std::fmt::Display,
    S: Into<String>,
{
    ErrorBuilder::new(ErrorCode::InvalidParameter, reason.into())
        .details(error.to_string())
        .build_error()
}
