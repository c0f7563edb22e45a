//! 测试用的子 watcher / resolver 替身
//!
//! 通过 `MultiWatcher::with_factories` 注入，记录每个组件的 start/stop 调用次数，
//! 并允许测试主动触发变更通知。

#![allow(dead_code)]

use async_trait::async_trait;
use flare_discovery_multi::discovery::{
    Backend, ChangeNotifier, ChildDiscoveryConfig, ChildWatcher, GeneratorConfig, MergeCell,
    MergedView, Resolver, ResolverBuilder, ResolverConfig, ResolverMethod, WatcherBuilder,
    WatcherMethod, WatcherSet,
};
use flare_discovery_multi::error::{DiscoveryError, Result};
use flare_discovery_multi::runtime::ServiceContext;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 可计数的子 watcher
pub struct CountingWatcher {
    name: String,
    method: WatcherMethod,
    notifier: ChangeNotifier,
    backends: Vec<Backend>,
    fail_start: bool,
    start_delay: Option<Duration>,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

impl CountingWatcher {
    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// 模拟一次后端变化
    pub fn fire(&self) {
        self.notifier.notify();
    }
}

#[async_trait]
impl ChildWatcher for CountingWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> WatcherMethod {
        self.method
    }

    async fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start {
            return Err(DiscoveryError::unavailable(format!(
                "{} cannot reach its source",
                self.name
            )));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backends(&self) -> Vec<Backend> {
        self.backends.clone()
    }
}

/// 构造 `CountingWatcher` 并保留引用
#[derive(Default)]
pub struct CountingWatcherBuilder {
    failing: BTreeSet<String>,
    slow: BTreeMap<String, Duration>,
    rejected: BTreeSet<String>,
    built: Mutex<BTreeMap<String, Arc<CountingWatcher>>>,
}

impl CountingWatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 该 watcher 的 start 返回错误
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// 该 watcher 的 start 需要 `delay` 才完成
    pub fn slow(mut self, name: &str, delay: Duration) -> Self {
        self.slow.insert(name.to_string(), delay);
        self
    }

    /// 该 watcher 的参数校验失败
    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejected.insert(name.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Arc<CountingWatcher> {
        self.built
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("watcher {} was not built", name))
    }

    pub fn built_count(&self) -> usize {
        self.built.lock().unwrap().len()
    }
}

impl WatcherBuilder for CountingWatcherBuilder {
    fn validate(&self, name: &str, _config: &ChildDiscoveryConfig) -> Result<()> {
        if self.rejected.contains(name) {
            return Err(DiscoveryError::invalid_parameter(format!(
                "{} has bad parameters",
                name
            )));
        }
        Ok(())
    }

    fn build(
        &self,
        name: &str,
        config: &ChildDiscoveryConfig,
        _ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn ChildWatcher>> {
        let watcher = Arc::new(CountingWatcher {
            name: name.to_string(),
            method: config.method,
            notifier,
            backends: vec![Backend::new(format!("{}.internal", name), 8080)],
            fail_start: self.failing.contains(name),
            start_delay: self.slow.get(name).copied(),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        });
        self.built
            .lock()
            .unwrap()
            .insert(name.to_string(), watcher.clone());
        let watcher: Arc<dyn ChildWatcher> = watcher;
        Ok(watcher)
    }
}

/// 可控的 resolver：合并结果由测试直接指定
pub struct StubResolver {
    watchers: WatcherSet,
    merged: MergeCell,
    healthy: AtomicBool,
    notifier: ChangeNotifier,
    fail_stop: bool,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

impl StubResolver {
    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn watchers(&self) -> &WatcherSet {
        &self.watchers
    }

    /// 发布新的合并结果并通知
    pub fn update(&self, backends: Vec<Backend>, config: GeneratorConfig) {
        self.merged.publish(MergedView { backends, config });
        self.notifier.notify();
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl Resolver for StubResolver {
    fn method(&self) -> ResolverMethod {
        ResolverMethod::Base
    }

    async fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(DiscoveryError::unavailable("resolver refused to stop"));
        }
        Ok(())
    }

    fn merged_backends(&self) -> Vec<Backend> {
        self.merged.backends()
    }

    fn merged_config_for_generator(&self) -> GeneratorConfig {
        self.merged.config()
    }

    fn healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn send_notification(&self) {
        let current = self.merged.load();
        self.merged.publish(MergedView::clone(&current));
        self.notifier.notify();
    }
}

/// 构造 `StubResolver` 并保留引用
#[derive(Default)]
pub struct StubResolverBuilder {
    initial: MergedView,
    fail_stop: bool,
    built: Mutex<Option<Arc<StubResolver>>>,
}

impl StubResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, view: MergedView) -> Self {
        self.initial = view;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn resolver(&self) -> Arc<StubResolver> {
        self.built
            .lock()
            .unwrap()
            .clone()
            .expect("resolver was not built")
    }
}

impl ResolverBuilder for StubResolverBuilder {
    fn build(
        &self,
        _config: &ResolverConfig,
        watchers: WatcherSet,
        notifier: ChangeNotifier,
    ) -> Result<Arc<dyn Resolver>> {
        let merged = MergeCell::new();
        merged.publish(self.initial.clone());
        let resolver = Arc::new(StubResolver {
            watchers,
            merged,
            healthy: AtomicBool::new(true),
            notifier,
            fail_stop: self.fail_stop,
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        });
        *self.built.lock().unwrap() = Some(resolver.clone());
        let resolver: Arc<dyn Resolver> = resolver;
        Ok(resolver)
    }
}

/// 回调计数器
pub fn counting_callback() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook = calls.clone();
    (calls, move || {
        hook.fetch_add(1, Ordering::SeqCst);
    })
}

/// 测试日志（设置 RUST_LOG 时输出）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
