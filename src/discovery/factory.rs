//! 子 watcher / resolver 工厂
//!
//! 两个工厂都是按 method 标签的静态分发表，不会回退到默认实现。
//! 通过 `WatcherBuilder` / `ResolverBuilder` 两个 trait 暴露，MultiWatcher 可以换用其它构造方式。

use std::sync::Arc;

use crate::discovery::resolver::{BaseResolver, Resolver};
use crate::discovery::watcher::{ChildWatcher, DnsWatcher, EtcdWatcher, StaticWatcher};
use crate::discovery::{ChangeNotifier, ChildDiscoveryConfig, ResolverConfig, ResolverMethod, WatcherMethod, WatcherSet};
use crate::error::Result;
use crate::runtime::ServiceContext;

/// 子 watcher 构造器
pub trait WatcherBuilder: Send + Sync {
    /// 只校验参数，不构造
    ///
    /// MultiWatcher 在构造任何子 watcher 之前对全部配置调用一次，
    /// 默认实现总是通过
    fn validate(&self, _name: &str, _config: &ChildDiscoveryConfig) -> Result<()> {
        Ok(())
    }

    /// 构造子 watcher
    fn build(
        &self,
        name: &str,
        config: &ChildDiscoveryConfig,
        ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn ChildWatcher>>;
}

/// resolver 构造器
pub trait ResolverBuilder: Send + Sync {
    /// 只校验参数，不构造
    fn validate(&self, _config: &ResolverConfig, _watcher_count: usize) -> Result<()> {
        Ok(())
    }

    /// 构造绑定到 `watchers` 的 resolver
    fn build(
        &self,
        config: &ResolverConfig,
        watchers: WatcherSet,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn Resolver>>;
}

/// 子 watcher 工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct WatcherFactory;

impl WatcherFactory {
    /// 从配置创建子 watcher
    pub fn create(
        name: &str,
        config: &ChildDiscoveryConfig,
        ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn ChildWatcher>> {
        match config.method {
            WatcherMethod::Etcd => {
                let watcher = EtcdWatcher::new(name, config, ctx, notifier)?;
                Ok(Arc::new(watcher))
            }
            WatcherMethod::Dns => {
                let watcher = DnsWatcher::new(name, config, ctx, notifier)?;
                Ok(Arc::new(watcher))
            }
            WatcherMethod::Static => {
                let watcher = StaticWatcher::new(name, config, ctx, notifier)?;
                Ok(Arc::new(watcher))
            }
        }
    }

    /// 校验配置
    pub fn check(config: &ChildDiscoveryConfig) -> Result<()> {
        match config.method {
            WatcherMethod::Etcd => EtcdWatcher::validate(config).map(|_| ()),
            WatcherMethod::Dns => DnsWatcher::validate(config).map(|_| ()),
            WatcherMethod::Static => StaticWatcher::validate(config).map(|_| ()),
        }
    }
}

impl WatcherBuilder for WatcherFactory {
    fn validate(&self, _name: &str, config: &ChildDiscoveryConfig) -> Result<()> {
        Self::check(config)
    }

    fn build(
        &self,
        name: &str,
        config: &ChildDiscoveryConfig,
        ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn ChildWatcher>> {
        Self::create(name, config, ctx, notifier)
    }
}

/// resolver 工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverFactory;

impl ResolverFactory {
    /// 从配置创建 resolver
    pub fn create(
        config: &ResolverConfig,
        watchers: WatcherSet,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn Resolver>> {
        match config.method {
            ResolverMethod::Base => {
                let resolver = BaseResolver::new(config, watchers, notifier)?;
                Ok(Arc::new(resolver))
            }
        }
    }

    /// 校验配置
    pub fn check(config: &ResolverConfig, watcher_count: usize) -> Result<()> {
        match config.method {
            ResolverMethod::Base => BaseResolver::validate(config, watcher_count),
        }
    }
}

impl ResolverBuilder for ResolverFactory {
    fn validate(&self, config: &ResolverConfig, watcher_count: usize) -> Result<()> {
        Self::check(config, watcher_count)
    }

    fn build(
        &self,
        config: &ResolverConfig,
        watchers: WatcherSet,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn Resolver>> {
        Self::create(config, watchers, notifier)
    }
}
