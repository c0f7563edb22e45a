//! 运行时支撑
//!
//! - `LifecycleConfig`：启动/停止的截止时间
//! - `ServiceContext`：传给每个子 watcher 的运行时上下文

pub mod config;
pub mod context;

pub use config::LifecycleConfig;
pub use context::ServiceContext;
