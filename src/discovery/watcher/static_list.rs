//! 静态后端列表 watcher

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::discovery::watcher::{BackendCache, ChildWatcher};
use crate::discovery::{Backend, ChangeNotifier, ChildDiscoveryConfig, GeneratorConfig, WatcherMethod};
use crate::error::Result;
use crate::runtime::ServiceContext;

/// 静态 watcher 配置
#[derive(Debug, Clone, Deserialize)]
pub struct StaticWatcherConfig {
    /// 固定的后端列表（可以为空）
    #[serde(default)]
    pub servers: Vec<Backend>,
}

/// 静态后端列表 watcher
///
/// 构造时发布一次配置中的后端，之后不再变化
pub struct StaticWatcher {
    name: String,
    cache: BackendCache,
    generator_config: GeneratorConfig,
    notifier: ChangeNotifier,
    started: AtomicBool,
}

impl StaticWatcher {
    /// 校验配置
    pub fn validate(config: &ChildDiscoveryConfig) -> Result<StaticWatcherConfig> {
        config.decode::<StaticWatcherConfig>()
    }

    /// 创建新的静态 watcher
    pub fn new(
        name: impl Into<String>,
        config: &ChildDiscoveryConfig,
        ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Self> {
        let parsed = Self::validate(config)?;
        let cache = BackendCache::new();
        cache.publish(parsed.servers);

        Ok(Self {
            name: name.into(),
            cache,
            generator_config: ctx.generator_config().clone(),
            notifier,
            started: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ChildWatcher for StaticWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> WatcherMethod {
        WatcherMethod::Static
    }

    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(
            watcher = %self.name,
            backends = self.cache.snapshot().len(),
            "Static watcher started"
        );
        // 启动时通知一次，让上游拉取初始集合
        self.notifier.notify();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.started.swap(false, Ordering::SeqCst) {
            info!(watcher = %self.name, "Static watcher stopped");
        }
        Ok(())
    }

    fn backends(&self) -> Vec<Backend> {
        self.cache.snapshot()
    }

    fn config_for_generator(&self) -> GeneratorConfig {
        self.generator_config.clone()
    }
}
