//! DNS 子 watcher
//!
//! 定期通过系统解析器解析配置的主机名，每个解析出的地址作为一个后端发布。

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{debug, info, warn};

use crate::discovery::watcher::{BackendCache, ChildWatcher};
use crate::discovery::{Backend, ChangeNotifier, ChildDiscoveryConfig, GeneratorConfig, WatcherMethod};
use crate::error::{DiscoveryError, Result};
use crate::runtime::ServiceContext;

fn default_check_interval() -> u64 {
    30
}

/// DNS watcher 配置
#[derive(Debug, Clone, Deserialize)]
pub struct DnsWatcherConfig {
    /// 待解析的服务器，`host` 为主机名或 IP
    pub servers: Vec<Backend>,

    /// 轮询间隔（秒）
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

struct DnsState {
    name: String,
    cache: BackendCache,
    healthy: AtomicBool,
    notifier: ChangeNotifier,
}

impl DnsState {
    async fn refresh(&self, servers: &[Backend]) {
        match resolve_servers(servers).await {
            Ok(backends) => {
                self.healthy.store(true, Ordering::SeqCst);
                if self.cache.publish(backends) {
                    debug!(
                        watcher = %self.name,
                        backends = self.cache.snapshot().len(),
                        "DNS backends changed"
                    );
                    self.notifier.notify();
                }
            }
            Err(e) => {
                // 解析失败时保留上一次的后端集合，等待下一轮
                self.healthy.store(false, Ordering::SeqCst);
                warn!(watcher = %self.name, error = %e, "⚠️ DNS resolution failed");
            }
        }
    }
}

struct PollTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// DNS 子 watcher
pub struct DnsWatcher {
    config: DnsWatcherConfig,
    state: Arc<DnsState>,
    generator_config: GeneratorConfig,
    task: Mutex<Option<PollTask>>,
}

impl DnsWatcher {
    /// 校验配置
    pub fn validate(config: &ChildDiscoveryConfig) -> Result<DnsWatcherConfig> {
        let parsed = config.decode::<DnsWatcherConfig>()?;
        if parsed.servers.is_empty() {
            return Err(DiscoveryError::invalid_parameter(
                "dns watcher requires at least one server",
            ));
        }
        if parsed.servers.iter().any(|s| s.host.is_empty()) {
            return Err(DiscoveryError::invalid_parameter(
                "dns watcher server host must not be empty",
            ));
        }
        if parsed.check_interval == 0 {
            return Err(DiscoveryError::invalid_parameter(
                "dns watcher check_interval must be positive",
            ));
        }
        Ok(parsed)
    }

    /// 创建新的 DNS watcher（不进行任何解析）
    pub fn new(
        name: impl Into<String>,
        config: &ChildDiscoveryConfig,
        ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Self> {
        let config = Self::validate(config)?;
        Ok(Self {
            config,
            state: Arc::new(DnsState {
                name: name.into(),
                cache: BackendCache::new(),
                healthy: AtomicBool::new(true),
                notifier,
            }),
            generator_config: ctx.generator_config().clone(),
            task: Mutex::new(None),
        })
    }

    /// 立即解析一次（不等待下一轮）
    pub async fn refresh(&self) {
        self.state.refresh(&self.config.servers).await;
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.config.check_interval)
    }
}

/// 解析所有服务器，任一失败即返回错误
async fn resolve_servers(servers: &[Backend]) -> std::result::Result<Vec<Backend>, String> {
    let mut backends = Vec::new();
    for server in servers {
        let template = server.clone().normalized();
        let addrs = tokio::net::lookup_host((template.host.as_str(), template.port))
            .await
            .map_err(|e| format!("failed to resolve {}: {}", template.host, e))?;
        for addr in addrs {
            backends.push(Backend {
                host: addr.ip().to_string(),
                port: addr.port(),
                ..template.clone()
            });
        }
    }
    Ok(backends)
}

impl Drop for DnsWatcher {
    fn drop(&mut self) {
        // 未调用 stop() 时只发出关闭信号，不等待任务结束
        if let Some(task) = self.task.get_mut().take() {
            let _ = task.shutdown_tx.send(());
        }
    }
}

#[async_trait]
impl ChildWatcher for DnsWatcher {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn method(&self) -> WatcherMethod {
        WatcherMethod::Dns
    }

    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let state = self.state.clone();
        let servers = self.config.servers.clone();
        let period = self.check_interval();

        let handle = tokio::spawn(async move {
            // 第一次 tick 立即触发
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => state.refresh(&servers).await,
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        *task = Some(PollTask {
            shutdown_tx,
            handle,
        });
        info!(
            watcher = %self.state.name,
            servers = self.config.servers.len(),
            interval_secs = self.config.check_interval,
            "🚀 DNS watcher started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let running = self.task.lock().await.take();
        if let Some(PollTask {
            shutdown_tx,
            handle,
        }) = running
        {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                warn!(watcher = %self.state.name, error = %e, "DNS poll task join error");
            }
            info!(watcher = %self.state.name, "🛑 DNS watcher stopped");
        }
        Ok(())
    }

    fn backends(&self) -> Vec<Backend> {
        self.state.cache.snapshot()
    }

    fn config_for_generator(&self) -> GeneratorConfig {
        self.generator_config.clone()
    }

    fn ping(&self) -> bool {
        self.state.healthy.load(Ordering::SeqCst)
    }
}
