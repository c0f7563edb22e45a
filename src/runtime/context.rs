//! 运行时上下文
//!
//! 每个子 watcher 构造时都会收到同一个上下文：服务名、生成器配置段、
//! 生命周期截止时间和指标收集器。

use crate::discovery::GeneratorConfig;
use crate::metrics::WatcherMetrics;
use crate::runtime::config::LifecycleConfig;

/// 服务运行时上下文
#[derive(Debug, Clone)]
pub struct ServiceContext {
    service_name: String,
    generator_config: GeneratorConfig,
    lifecycle: LifecycleConfig,
    metrics: WatcherMetrics,
}

impl ServiceContext {
    /// 创建新的运行时上下文
    ///
    /// # 参数
    /// * `service_name` - 服务名称（用于日志和 etcd 默认路径）
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            generator_config: GeneratorConfig::new(),
            lifecycle: LifecycleConfig::default(),
            metrics: WatcherMetrics::new(),
        }
    }

    /// 设置生成器配置段（例如 `haproxy`），原样传给子 watcher
    pub fn with_generator_config(mut self, config: GeneratorConfig) -> Self {
        self.generator_config = config;
        self
    }

    /// 设置生命周期配置
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// 注入指标收集器
    pub fn with_metrics(mut self, metrics: WatcherMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn generator_config(&self) -> &GeneratorConfig {
        &self.generator_config
    }

    /// 已配置的生成器名称（排序后）
    pub fn generator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generator_config.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn lifecycle(&self) -> &LifecycleConfig {
        &self.lifecycle
    }

    pub fn metrics(&self) -> &WatcherMetrics {
        &self.metrics
    }
}
