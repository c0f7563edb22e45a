//! etcd 子 watcher
//!
//! 读取前缀下的全部键，每个值是一个 JSON 编码的 `Backend`；
//! 之后保持一个前缀 watch，每收到一次事件就重新读取整个前缀。
//! watch 流被取消、关闭或出错时按指数退避重新建立，并在建立后重新读取一次。

use async_trait::async_trait;
use etcd_client::{Client, GetOptions, WatchOptions, WatchStream, Watcher};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::discovery::watcher::{BackendCache, ChildWatcher, RetryBackoff};
use crate::discovery::{Backend, ChangeNotifier, ChildDiscoveryConfig, GeneratorConfig, WatcherMethod};
use crate::error::{DiscoveryError, Result};
use crate::runtime::ServiceContext;

/// etcd watcher 配置
#[derive(Debug, Clone, Deserialize)]
pub struct EtcdWatcherConfig {
    /// etcd 地址列表
    pub endpoints: Vec<String>,

    /// 键前缀，缺省为 `/services/<service_name>/`
    #[serde(default)]
    pub path: Option<String>,

    /// 重新建立 watch 的初始退避（毫秒）
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,

    /// 重新建立 watch 的最大退避（毫秒）
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

fn default_retry_initial_ms() -> u64 {
    500
}

fn default_retry_max_ms() -> u64 {
    30_000
}

impl EtcdWatcherConfig {
    fn backoff(&self) -> RetryBackoff {
        RetryBackoff::new(
            Duration::from_millis(self.retry_initial_ms),
            Duration::from_millis(self.retry_max_ms),
        )
    }
}

struct EtcdState {
    name: String,
    prefix: String,
    cache: BackendCache,
    connected: AtomicBool,
    notifier: ChangeNotifier,
}

impl EtcdState {
    /// 重新读取整个前缀并发布
    async fn reload(&self, client: &mut Client) -> Result<()> {
        let resp = client
            .get(self.prefix.clone(), Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| DiscoveryError::unavailable(format!("etcd get {} failed: {}", self.prefix, e)))?;

        let mut backends = Vec::new();
        for kv in resp.kvs() {
            let key = String::from_utf8_lossy(kv.key()).to_string();
            match serde_json::from_slice::<Backend>(kv.value()) {
                Ok(mut backend) => {
                    if backend.name.is_empty() {
                        backend.name = key
                            .strip_prefix(&self.prefix)
                            .unwrap_or(&key)
                            .trim_start_matches('/')
                            .to_string();
                    }
                    backends.push(backend);
                }
                Err(e) => {
                    warn!(watcher = %self.name, key = %key, error = %e, "Skipping undecodable backend");
                }
            }
        }

        if self.cache.publish(backends) {
            debug!(
                watcher = %self.name,
                backends = self.cache.snapshot().len(),
                "etcd backends changed"
            );
            self.notifier.notify();
        }
        Ok(())
    }

    /// 建立前缀 watch 并重新读取整个前缀
    ///
    /// 先 watch 再读取，两者之间的变化不会丢失；成功后才标记为已连接
    async fn subscribe(&self, client: &mut Client) -> Result<(Watcher, WatchStream)> {
        let (watcher, stream) = client
            .watch(self.prefix.clone(), Some(WatchOptions::new().with_prefix()))
            .await
            .map_err(|e| DiscoveryError::unavailable(format!("etcd watch failed: {}", e)))?;
        self.reload(client).await?;
        self.connected.store(true, Ordering::SeqCst);
        Ok((watcher, stream))
    }
}

/// 后台 watch 循环，只在收到关闭信号（或发送端被丢弃）时退出
async fn run_watch(
    state: Arc<EtcdState>,
    mut client: Client,
    mut watcher: Watcher,
    mut stream: WatchStream,
    mut shutdown_rx: oneshot::Receiver<()>,
    mut backoff: RetryBackoff,
) {
    'session: loop {
        loop {
            tokio::select! {
                message = stream.message() => match message {
                    Ok(Some(resp)) => {
                        if resp.canceled() {
                            warn!(watcher = %state.name, reason = %resp.cancel_reason(), "etcd watch canceled by server");
                            break;
                        }
                        if let Err(e) = state.reload(&mut client).await {
                            warn!(watcher = %state.name, error = %e, "⚠️ Failed to reload etcd backends");
                        }
                    }
                    Ok(None) => {
                        warn!(watcher = %state.name, "etcd watch stream closed");
                        break;
                    }
                    Err(e) => {
                        warn!(watcher = %state.name, error = %e, "⚠️ etcd watch stream error");
                        break;
                    }
                },
                _ = &mut shutdown_rx => {
                    let _ = watcher.cancel().await;
                    break 'session;
                }
            }
        }

        state.connected.store(false, Ordering::SeqCst);

        loop {
            let delay = backoff.next_delay();
            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut shutdown_rx => break 'session,
            }
            match state.subscribe(&mut client).await {
                Ok((new_watcher, new_stream)) => {
                    watcher = new_watcher;
                    stream = new_stream;
                    backoff.reset();
                    info!(watcher = %state.name, prefix = %state.prefix, "🔄 etcd watch re-established");
                    break;
                }
                Err(e) => {
                    warn!(watcher = %state.name, error = %e, ?delay, "⚠️ Failed to re-establish etcd watch");
                }
            }
        }
    }
    state.connected.store(false, Ordering::SeqCst);
}

struct WatchTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// etcd 子 watcher
pub struct EtcdWatcher {
    config: EtcdWatcherConfig,
    state: Arc<EtcdState>,
    generator_config: GeneratorConfig,
    task: Mutex<Option<WatchTask>>,
}

impl EtcdWatcher {
    /// 校验配置
    pub fn validate(config: &ChildDiscoveryConfig) -> Result<EtcdWatcherConfig> {
        let parsed = config.decode::<EtcdWatcherConfig>()?;
        if parsed.endpoints.is_empty() || parsed.endpoints.iter().any(|e| e.is_empty()) {
            return Err(DiscoveryError::invalid_parameter(
                "etcd watcher requires non-empty endpoints",
            ));
        }
        if matches!(parsed.path.as_deref(), Some("")) {
            return Err(DiscoveryError::invalid_parameter(
                "etcd watcher path must not be empty",
            ));
        }
        if parsed.retry_initial_ms == 0 || parsed.retry_max_ms < parsed.retry_initial_ms {
            return Err(DiscoveryError::invalid_parameter(
                "etcd watcher retry_initial_ms must be positive and not above retry_max_ms",
            ));
        }
        Ok(parsed)
    }

    /// 创建新的 etcd watcher
    ///
    /// 构造时不连接 etcd，连接在 `start()` 中建立
    pub fn new(
        name: impl Into<String>,
        config: &ChildDiscoveryConfig,
        ctx: &ServiceContext,
        notifier: ChangeNotifier,
    ) -> Result<Self> {
        let config = Self::validate(config)?;
        let prefix = config
            .path
            .clone()
            .unwrap_or_else(|| format!("/services/{}/", ctx.service_name()));

        Ok(Self {
            config,
            state: Arc::new(EtcdState {
                name: name.into(),
                prefix,
                cache: BackendCache::new(),
                connected: AtomicBool::new(false),
                notifier,
            }),
            generator_config: ctx.generator_config().clone(),
            task: Mutex::new(None),
        })
    }

    /// 监听的键前缀
    pub fn prefix(&self) -> &str {
        &self.state.prefix
    }

    pub fn endpoints(&self) -> &[String] {
        &self.config.endpoints
    }
}

impl Drop for EtcdWatcher {
    fn drop(&mut self) {
        // 未调用 stop() 时只发出关闭信号，不等待任务结束
        if let Some(task) = self.task.get_mut().take() {
            let _ = task.shutdown_tx.send(());
        }
    }
}

#[async_trait]
impl ChildWatcher for EtcdWatcher {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn method(&self) -> WatcherMethod {
        WatcherMethod::Etcd
    }

    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let mut client = Client::connect(&self.config.endpoints, None)
            .await
            .map_err(|e| DiscoveryError::unavailable(format!("etcd connect failed: {}", e)))?;

        let (watcher, stream) = self.state.subscribe(&mut client).await?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(run_watch(
            self.state.clone(),
            client,
            watcher,
            stream,
            shutdown_rx,
            self.config.backoff(),
        ));

        *task = Some(WatchTask {
            shutdown_tx,
            handle,
        });
        info!(
            watcher = %self.state.name,
            prefix = %self.state.prefix,
            "🚀 etcd watcher started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let running = self.task.lock().await.take();
        if let Some(WatchTask {
            shutdown_tx,
            handle,
        }) = running
        {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                warn!(watcher = %self.state.name, error = %e, "etcd watch task join error");
            }
            info!(watcher = %self.state.name, "🛑 etcd watcher stopped");
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
        self.state.connected.load(Ordering::SeqCst)
    }
}
