//! 子 watcher 抽象和实现

pub mod dns;
pub mod etcd;
pub mod static_list;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::{Backend, GeneratorConfig, WatcherMethod};
use crate::error::{DiscoveryError, ErrorCode, Result};

pub use dns::{DnsWatcher, DnsWatcherConfig};
pub use etcd::{EtcdWatcher, EtcdWatcherConfig};
pub use static_list::{StaticWatcher, StaticWatcherConfig};

/// 子 watcher trait
///
/// 每个发现源（etcd、DNS、静态列表）都需要实现这个 trait。
/// 实现者在自己的后端集合发生变化时调用构造时注入的 `ChangeNotifier`。
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait ChildWatcher: Send + Sync {
    /// 逻辑名（MultiWatcher 配置中的键）
    fn name(&self) -> &str;

    /// 实现类型
    fn method(&self) -> WatcherMethod;

    /// 启动后台发现任务
    async fn start(&self) -> Result<()>;

    /// 停止后台发现任务（必须可以重复调用，也可以在 start 之前调用）
    async fn stop(&self) -> Result<()>;

    /// 当前后端集合
    fn backends(&self) -> Vec<Backend>;

    /// 该来源提供给生成器的配置段
    ///
    /// 默认实现返回空配置
    fn config_for_generator(&self) -> GeneratorConfig {
        GeneratorConfig::new()
    }

    /// 健康探测
    ///
    /// 默认实现总是返回 true
    fn ping(&self) -> bool {
        true
    }
}

/// 后端集合缓存
///
/// 采用不可变替换：先完整构建新的集合，再用一次原子引用替换发布，
/// 读者只会看到替换前或替换后的值。每个缓存只有一个写者（所属 watcher 的后台任务）。
#[derive(Default)]
pub struct BackendCache {
    current: ArcSwap<Vec<Backend>>,
    updated_at: ArcSwapOption<chrono::DateTime<chrono::Utc>>,
}

impl BackendCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新的后端集合
    ///
    /// 集合会先排序去重；返回值表示集合是否真的发生了变化
    pub fn publish(&self, backends: Vec<Backend>) -> bool {
        let mut backends: Vec<Backend> = backends.into_iter().map(Backend::normalized).collect();
        backends.sort();
        backends.dedup();

        if **self.current.load() == backends {
            return false;
        }

        self.current.store(Arc::new(backends));
        self.updated_at.store(Some(Arc::new(chrono::Utc::now())));
        true
    }

    pub fn snapshot(&self) -> Vec<Backend> {
        self.current.load().as_ref().clone()
    }

    /// 最近一次发布的时间
    pub fn updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.updated_at.load_full().map(|ts| *ts)
    }
}

/// 指数退避
///
/// 每次 `next_delay()` 返回当前等待时间并翻倍，直到上限；`reset()` 回到初始值
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl RetryBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// 命名的子 watcher 集合
///
/// 构造后不可变，且至少包含一个 watcher
#[derive(Clone)]
pub struct WatcherSet {
    watchers: BTreeMap<String, Arc<dyn ChildWatcher>>,
}

impl WatcherSet {
    /// 创建 watcher 集合，空集合视为配置错误
    pub fn new(watchers: BTreeMap<String, Arc<dyn ChildWatcher>>) -> Result<Self> {
        if watchers.is_empty() {
            return Err(DiscoveryError::config(
                ErrorCode::MissingWatchers,
                "no watchers provided",
            ));
        }
        Ok(Self { watchers })
    }

    pub fn names(&self) -> Vec<String> {
        self.watchers.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ChildWatcher>> {
        self.watchers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn ChildWatcher>)> {
        self.watchers.iter()
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

impl fmt::Debug for WatcherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.watchers.iter().map(|(name, w)| (name, w.method())))
            .finish()
    }
}
