//! MultiWatcher：多发现源编排器
//!
//! 持有一组命名的子 watcher 和一个 resolver，统一管理启动/停止，
//! 把任何一方的变更通知转换为 revision 递增和一次外部重配置回调。
//! 下游通过 `backends()` / `config_for_generator()` / `ping()` 拉取合并后的状态。

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, warn};

use crate::discovery::factory::{ResolverBuilder, ResolverFactory, WatcherBuilder, WatcherFactory};
use crate::discovery::resolver::Resolver;
use crate::discovery::watcher::{ChildWatcher, WatcherSet};
use crate::discovery::{Backend, ChangeNotifier, DiscoveryConfig, GeneratorConfig, ResolverMethod};
use crate::error::{DiscoveryError, ErrorCode, LifecyclePhase, LifecycleReport, Result};
use crate::metrics::WatcherMetrics;
use crate::runtime::{LifecycleConfig, ServiceContext};

/// resolver 在通知和生命周期报告中使用的来源名称
pub const RESOLVER_SOURCE: &str = "resolver";

/// 外部重配置回调：收到后应重新调用 `backends()` / `config_for_generator()`
pub type ReconfigureCallback = Arc<dyn Fn() + Send + Sync>;

/// MultiWatcher 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Unstarted,
    Running,
    Stopped,
}

/// revision 计数和回调转发
///
/// 所有子 watcher 和 resolver 的通知器都指向同一个 hub
struct NotificationHub {
    service: String,
    revision: AtomicU64,
    on_reconfigure: ReconfigureCallback,
    metrics: WatcherMetrics,
}

impl NotificationHub {
    fn notifier(self: &Arc<Self>, source: &str) -> ChangeNotifier {
        let hub = self.clone();
        ChangeNotifier::new(source, move |src| hub.on_notification(src))
    }

    /// 每次通知：先原子递增 revision，再同步调用外部回调
    fn on_notification(&self, source: &str) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.record_notification(revision);
        debug!(
            service = %self.service,
            source = %source,
            revision,
            "Discovery change received"
        );
        (self.on_reconfigure)();
    }
}

/// 多发现源编排器
///
/// 应在丢弃前调用 `stop()`。直接丢弃时子 watcher 的后台任务会收到关闭信号退出，
/// 但不会等待它们结束，也不会产生生命周期报告。
pub struct MultiWatcher {
    name: String,
    watchers: WatcherSet,
    resolver: Arc<dyn Resolver>,
    hub: Arc<NotificationHub>,
    deadlines: LifecycleConfig,
    metrics: WatcherMetrics,
    state: Mutex<WatcherState>,
}

impl MultiWatcher {
    /// 使用默认工厂创建 MultiWatcher
    ///
    /// # 参数
    /// * `discovery` - 原始发现配置记录（`method` 必须为 `multi`）
    /// * `ctx` - 运行时上下文，原样传给每个子 watcher
    /// * `on_reconfigure` - 任何变更发生后调用的回调
    ///
    /// # 返回
    /// 任何校验失败都返回配置错误，此时不会构造任何子 watcher 或 resolver
    pub fn new<F>(discovery: &Value, ctx: ServiceContext, on_reconfigure: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_factories(discovery, ctx, on_reconfigure, &WatcherFactory, &ResolverFactory)
    }

    /// 使用指定的构造器创建 MultiWatcher
    pub fn with_factories<F>(
        discovery: &Value,
        ctx: ServiceContext,
        on_reconfigure: F,
        watcher_builder: &dyn WatcherBuilder,
        resolver_builder: &dyn ResolverBuilder,
    ) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let config = DiscoveryConfig::from_value(discovery)?;
        ctx.lifecycle().validate()?;

        // 先校验全部参数，再构造任何组件
        for (name, child) in &config.watchers {
            watcher_builder.validate(name, child)?;
        }
        resolver_builder.validate(&config.resolver, config.watchers.len())?;

        let hub = Arc::new(NotificationHub {
            service: ctx.service_name().to_string(),
            revision: AtomicU64::new(0),
            on_reconfigure: Arc::new(on_reconfigure),
            metrics: ctx.metrics().clone(),
        });

        let mut built: BTreeMap<String, Arc<dyn ChildWatcher>> = BTreeMap::new();
        for (name, child) in &config.watchers {
            let watcher = watcher_builder.build(name, child, &ctx, hub.notifier(name))?;
            built.insert(name.clone(), watcher);
        }
        let watchers = WatcherSet::new(built)?;

        let resolver = resolver_builder.build(
            &config.resolver,
            watchers.clone(),
            hub.notifier(RESOLVER_SOURCE),
        )?;

        info!(
            service = %ctx.service_name(),
            watchers = ?watchers,
            resolver = %resolver.method(),
            "Multi watcher created"
        );

        Ok(Self {
            name: ctx.service_name().to_string(),
            watchers,
            resolver,
            hub,
            deadlines: ctx.lifecycle().clone(),
            metrics: ctx.metrics().clone(),
            state: Mutex::new(WatcherState::Unstarted),
        })
    }

    /// 启动所有子 watcher，然后启动 resolver
    ///
    /// 子 watcher 并发启动，每个都有独立的截止时间；某个失败不会阻止其它组件，
    /// 全部尝试后以 `DiscoveryError::Lifecycle` 汇总上报
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            WatcherState::Running => {
                warn!(service = %self.name, "Multi watcher already running");
                return Ok(());
            }
            WatcherState::Stopped => {
                return Err(DiscoveryError::invalid_state(format!(
                    "multi watcher '{}' was stopped and cannot be restarted",
                    self.name
                )));
            }
            WatcherState::Unstarted => {}
        }

        info!(
            service = %self.name,
            watchers = self.watchers.len(),
            "🚀 Starting multi watcher"
        );

        let mut report = LifecycleReport::new(LifecyclePhase::Start);
        self.run_children(LifecyclePhase::Start, &mut report).await;

        report.attempted();
        let deadline = self.deadlines.start_timeout();
        match timeout(deadline, self.resolver.start()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => report.record_failure(RESOLVER_SOURCE, ErrorCode::StartFailed, e.to_string()),
            Err(_) => report.record_failure(
                RESOLVER_SOURCE,
                ErrorCode::LifecycleTimeout,
                format!("start timed out after {:?}", deadline),
            ),
        }

        *state = WatcherState::Running;
        self.finish(report)
    }

    /// 停止所有子 watcher，然后停止 resolver
    ///
    /// 幂等：只有第一次调用（无论是否启动过）会真正停止组件
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == WatcherState::Stopped {
            debug!(service = %self.name, "Multi watcher already stopped");
            return Ok(());
        }

        info!(service = %self.name, "🛑 Stopping multi watcher");

        let mut report = LifecycleReport::new(LifecyclePhase::Stop);
        self.run_children(LifecyclePhase::Stop, &mut report).await;

        report.attempted();
        let deadline = self.deadlines.stop_timeout();
        match timeout(deadline, self.resolver.stop()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => report.record_failure(RESOLVER_SOURCE, ErrorCode::StopFailed, e.to_string()),
            Err(_) => report.record_failure(
                RESOLVER_SOURCE,
                ErrorCode::LifecycleTimeout,
                format!("stop timed out after {:?}", deadline),
            ),
        }

        *state = WatcherState::Stopped;
        self.finish(report)
    }

    /// 并发地对所有子 watcher 执行 start/stop
    async fn run_children(&self, phase: LifecyclePhase, report: &mut LifecycleReport) {
        let (deadline, failure_code) = match phase {
            LifecyclePhase::Start => (self.deadlines.start_timeout(), ErrorCode::StartFailed),
            LifecyclePhase::Stop => (self.deadlines.stop_timeout(), ErrorCode::StopFailed),
        };

        let mut pending: BTreeSet<String> = BTreeSet::new();
        let mut join_set = JoinSet::new();
        for (name, watcher) in self.watchers.iter() {
            report.attempted();
            pending.insert(name.clone());
            let name = name.clone();
            let watcher = watcher.clone();
            join_set.spawn(async move {
                let result = run_phase(watcher.as_ref(), phase, deadline).await;
                (name, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, result)) => {
                    pending.remove(&name);
                    match result {
                        Ok(Ok(())) => {
                            debug!(service = %self.name, watcher = %name, %phase, "Child watcher done");
                        }
                        Ok(Err(e)) => {
                            warn!(service = %self.name, watcher = %name, %phase, error = %e, "⚠️ Child watcher failed");
                            report.record_failure(name, failure_code, e.to_string());
                        }
                        Err(_) => {
                            warn!(service = %self.name, watcher = %name, %phase, ?deadline, "⚠️ Child watcher timed out");
                            report.record_failure(
                                name,
                                ErrorCode::LifecycleTimeout,
                                format!("{} timed out after {:?}", phase, deadline),
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(service = %self.name, %phase, error = %e, "Child watcher task join error");
                }
            }
        }

        // 剩下的是 panic 掉的任务
        for name in pending {
            report.record_failure(name, failure_code, format!("{} task panicked", phase));
        }
    }

    fn finish(&self, report: LifecycleReport) -> Result<()> {
        if report.is_success() {
            info!(
                service = %self.name,
                phase = %report.phase,
                components = report.attempted,
                "✅ Multi watcher {} completed",
                report.phase
            );
        } else {
            match report.phase {
                LifecyclePhase::Start => self.metrics.record_start_failures(report.failures.len()),
                LifecyclePhase::Stop => self.metrics.record_stop_failures(report.failures.len()),
            }
            error!(
                service = %self.name,
                failed = ?report.failed_components(),
                "❌ Multi watcher {} finished with failures",
                report.phase
            );
        }
        report.into_result()
    }

    /// 合并后的后端列表（直接委托给 resolver）
    pub fn backends(&self) -> Vec<Backend> {
        self.resolver.merged_backends()
    }

    /// 合并后的生成器配置（直接委托给 resolver）
    pub fn config_for_generator(&self) -> GeneratorConfig {
        self.resolver.merged_config_for_generator()
    }

    /// 聚合健康状态（直接委托给 resolver）
    pub fn ping(&self) -> bool {
        self.resolver.healthy()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前 revision
    pub fn revision(&self) -> u64 {
        self.hub.revision.load(Ordering::SeqCst)
    }

    /// 子 watcher 名称（排序后）
    pub fn watcher_names(&self) -> Vec<String> {
        self.watchers.names()
    }

    pub fn watchers(&self) -> &WatcherSet {
        &self.watchers
    }

    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    pub fn resolver_method(&self) -> ResolverMethod {
        self.resolver.method()
    }

    pub async fn state(&self) -> WatcherState {
        *self.state.lock().await
    }
}

async fn run_phase(
    watcher: &dyn ChildWatcher,
    phase: LifecyclePhase,
    deadline: Duration,
) -> std::result::Result<Result<()>, tokio::time::error::Elapsed> {
    match phase {
        LifecyclePhase::Start => timeout(deadline, watcher.start()).await,
        LifecyclePhase::Stop => timeout(deadline, watcher.stop()).await,
    }
}

impl fmt::Debug for MultiWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiWatcher")
            .field("name", &self.name)
            .field("watchers", &self.watchers)
            .field("resolver", &self.resolver.method())
            .field("revision", &self.revision())
            .finish()
    }
}

impl Drop for MultiWatcher {
    fn drop(&mut self) {
        if *self.state.get_mut() == WatcherState::Running {
            warn!(
                service = %self.name,
                "⚠️ Multi watcher dropped while running, call stop() first"
            );
        }
    }
}
