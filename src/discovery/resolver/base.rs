//! 基础 resolver
//!
//! 只定义契约面：合并结果恒为空，健康状态恒为 true。
//! 真正的合并策略由其它 `Resolver` 实现提供。

use async_trait::async_trait;
use tracing::info;

use crate::discovery::resolver::{MergeCell, MergedView, Resolver};
use crate::discovery::{Backend, ChangeNotifier, GeneratorConfig, ResolverConfig, ResolverMethod, WatcherSet};
use crate::error::{DiscoveryError, ErrorBuilder, ErrorCode, Result};

/// 基础 resolver
pub struct BaseResolver {
    watchers: WatcherSet,
    merged: MergeCell,
    notifier: ChangeNotifier,
}

impl BaseResolver {
    /// 校验配置：method 必须为 base，且至少绑定一个 watcher
    pub fn validate(config: &ResolverConfig, watcher_count: usize) -> Result<()> {
        if config.method != ResolverMethod::Base {
            return Err(ErrorBuilder::new(
                ErrorCode::UnknownResolverMethod,
                "base resolver expects method to be base",
            )
            .param("method", config.method.as_str())
            .build_error());
        }
        if watcher_count == 0 {
            return Err(DiscoveryError::config(
                ErrorCode::MissingWatchers,
                "no watchers provided",
            ));
        }
        Ok(())
    }

    /// 创建基础 resolver
    pub fn new(config: &ResolverConfig, watchers: WatcherSet, notifier: ChangeNotifier) -> Result<Self> {
        Self::validate(config, watchers.len())?;
        info!(watchers = ?watchers.names(), "creating base resolver");

        Ok(Self {
            watchers,
            merged: MergeCell::new(),
            notifier,
        })
    }

    /// 绑定的 watcher 集合
    pub fn watchers(&self) -> &WatcherSet {
        &self.watchers
    }

    fn merge(&self) -> MergedView {
        MergedView::default()
    }
}

#[async_trait]
impl Resolver for BaseResolver {
    fn method(&self) -> ResolverMethod {
        ResolverMethod::Base
    }

    async fn start(&self) -> Result<()> {
        info!("starting base resolver");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!("stopping base resolver");
        Ok(())
    }

    fn merged_backends(&self) -> Vec<Backend> {
        self.merged.backends()
    }

    fn merged_config_for_generator(&self) -> GeneratorConfig {
        self.merged.config()
    }

    fn healthy(&self) -> bool {
        true
    }

    fn send_notification(&self) {
        self.merged.publish(self.merge());
        self.notifier.notify();
    }
}
