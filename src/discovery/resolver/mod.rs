//! Resolver 抽象
//!
//! resolver 决定如何把多个子 watcher 的结果合并成一个后端列表、一个生成器配置段
//! 和一个健康信号。MultiWatcher 只负责子 watcher 的所有权、生命周期和通知，
//! 新的合并策略（加权合并、主备切换、按法定数判断健康……）只需实现这个 trait。

pub mod base;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;

use crate::discovery::{Backend, GeneratorConfig, ResolverMethod};
use crate::error::Result;

pub use base::BaseResolver;

/// Resolver trait
///
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait Resolver: Send + Sync {
    /// 实现类型
    fn method(&self) -> ResolverMethod;

    /// 启动（可以在这里启动后台任务或定时器）
    async fn start(&self) -> Result<()>;

    /// 停止
    async fn stop(&self) -> Result<()>;

    /// 合并后的后端列表，顺序和去重规则由具体实现决定
    fn merged_backends(&self) -> Vec<Backend>;

    /// 合并后的生成器配置段
    fn merged_config_for_generator(&self) -> GeneratorConfig;

    /// 所有子 watcher 的聚合健康状态
    fn healthy(&self) -> bool;

    /// 合并结果发生变化时调用
    ///
    /// 实现必须先重新计算并发布合并结果，再触发构造时注入的通知器，
    /// 这样上游收到通知后立即拉取就能看到新结果。
    fn send_notification(&self);
}

/// 一次完整的合并结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedView {
    pub backends: Vec<Backend>,
    pub config: GeneratorConfig,
}

/// 合并结果的不可变替换单元
///
/// 写者先完整构建新的 `MergedView`，再用一次原子引用替换发布；
/// 读者拿到的永远是某一次完整发布的值。
#[derive(Default)]
pub struct MergeCell {
    view: ArcSwap<MergedView>,
}

impl MergeCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新的合并结果
    pub fn publish(&self, view: MergedView) {
        self.view.store(Arc::new(view));
    }

    /// 当前合并结果
    pub fn load(&self) -> Arc<MergedView> {
        self.view.load_full()
    }

    pub fn backends(&self) -> Vec<Backend> {
        self.view.load().backends.clone()
    }

    pub fn config(&self) -> GeneratorConfig {
        self.view.load().config.clone()
    }
}
