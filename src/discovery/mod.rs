//! 多源服务发现模块
//!
//! 一个 `MultiWatcher` 组合多个命名的子 watcher（etcd、DNS、静态列表），
//! 把它们的变化统一成一个 revision 计数和一次重配置回调，
//! 合并逻辑交给可替换的 `Resolver`。

pub mod backend;
pub mod config;
pub mod factory;
pub mod multi;
pub mod notify;
pub mod resolver;
pub mod watcher;

use std::collections::HashMap;

/// 生成器配置段：生成器名称（如 `haproxy`）到该生成器的配置
pub type GeneratorConfig = HashMap<String, serde_json::Value>;

pub use backend::Backend;
pub use config::{
    ChildDiscoveryConfig, DiscoveryConfig, MULTI_METHOD, ResolverConfig, ResolverMethod,
    WatcherMethod,
};
pub use factory::{ResolverBuilder, ResolverFactory, WatcherBuilder, WatcherFactory};
pub use multi::{MultiWatcher, RESOLVER_SOURCE, ReconfigureCallback, WatcherState};
pub use notify::ChangeNotifier;
pub use resolver::{BaseResolver, MergeCell, MergedView, Resolver};
pub use watcher::{
    BackendCache, ChildWatcher, DnsWatcher, DnsWatcherConfig, EtcdWatcher, EtcdWatcherConfig,
    RetryBackoff, StaticWatcher, StaticWatcherConfig, WatcherSet,
};
