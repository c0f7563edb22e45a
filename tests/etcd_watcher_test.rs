//! etcd watcher 集成测试
//!
//! 这些测试需要运行中的 etcd 服务器实例。
//! 默认情况下，测试会被忽略，需要使用 `cargo test --test etcd_watcher_test -- --ignored` 运行。
//!
//! 启动 etcd 服务器：
//! ```bash
//! docker run -d --name etcd-test -p 2379:2379 -p 2380:2380 \
//!   quay.io/coreos/etcd:v3.5.9 \
//!   etcd --advertise-client-urls=http://127.0.0.1:2379 \
//!        --listen-client-urls=http://0.0.0.0:2379
//! ```

use etcd_client::{Client, DeleteOptions};
use flare_discovery_multi::discovery::{
    Backend, ChangeNotifier, ChildDiscoveryConfig, ChildWatcher, EtcdWatcher, MultiWatcher,
};
use flare_discovery_multi::runtime::ServiceContext;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// etcd 服务器地址
/// 可以通过环境变量 ETCD_ENDPOINTS 覆盖，默认为 http://127.0.0.1:2379
fn etcd_endpoints() -> Vec<String> {
    std::env::var("ETCD_ENDPOINTS")
        .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["http://127.0.0.1:2379".to_string()])
}

/// 测试前缀
const TEST_PREFIX: &str = "/flare-test/discovery/";

async fn clean_prefix(client: &mut Client) {
    client
        .delete(TEST_PREFIX, Some(DeleteOptions::new().with_prefix()))
        .await
        .expect("Failed to clean test prefix");
}

async fn put_backend(client: &mut Client, key: &str, backend: &Backend) {
    client
        .put(
            format!("{}{}", TEST_PREFIX, key),
            serde_json::to_vec(backend).unwrap(),
            None,
        )
        .await
        .expect("Failed to put backend");
}

fn watcher_config() -> ChildDiscoveryConfig {
    ChildDiscoveryConfig::from_value(
        "primary",
        &json!({
            "method": "etcd",
            "endpoints": etcd_endpoints(),
            "path": TEST_PREFIX,
        }),
    )
    .expect("valid etcd config")
}

/// 测试：启动时加载已有后端
#[tokio::test]
#[ignore]
async fn test_etcd_initial_load() {
    let mut client = Client::connect(etcd_endpoints(), None)
        .await
        .expect("Failed to connect etcd");
    clean_prefix(&mut client).await;
    put_backend(&mut client, "node-1", &Backend::new("10.0.0.1", 8080).with_name("")).await;
    put_backend(&mut client, "node-2", &Backend::new("10.0.0.2", 8080)).await;
    client
        .put(format!("{}garbage", TEST_PREFIX), "not json", None)
        .await
        .expect("Failed to put garbage");

    let calls = Arc::new(AtomicUsize::new(0));
    let hook = calls.clone();
    let watcher = EtcdWatcher::new(
        "primary",
        &watcher_config(),
        &ServiceContext::new("test"),
        ChangeNotifier::new("primary", move |_| {
            hook.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .expect("Failed to create etcd watcher");

    watcher.start().await.expect("Failed to start etcd watcher");
    assert!(watcher.ping());

    // 无法解码的值被跳过；缺省名称取键的后缀
    let backends = watcher.backends();
    assert_eq!(backends.len(), 2);
    assert!(backends.iter().any(|b| b.name == "node-1"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    watcher.stop().await.expect("Failed to stop etcd watcher");
    assert!(!watcher.ping());
    clean_prefix(&mut client).await;
}

/// 测试：watch 事件触发通知
#[tokio::test]
#[ignore]
async fn test_etcd_watch_notifies_multi_watcher() {
    let mut client = Client::connect(etcd_endpoints(), None)
        .await
        .expect("Failed to connect etcd");
    clean_prefix(&mut client).await;

    let discovery = json!({
        "method": "multi",
        "watchers": {
            "primary": {
                "method": "etcd",
                "endpoints": etcd_endpoints(),
                "path": TEST_PREFIX,
            },
        },
        "resolver": { "method": "base" },
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let hook = calls.clone();
    let multi = MultiWatcher::new(&discovery, ServiceContext::new("test"), move || {
        hook.fetch_add(1, Ordering::SeqCst);
    })
    .expect("Failed to create multi watcher");

    multi.start().await.expect("Failed to start multi watcher");
    let before = multi.revision();

    put_backend(&mut client, "node-3", &Backend::new("10.0.0.3", 8080)).await;

    // 等待 etcd 推送
    for _ in 0..50 {
        if multi.revision() > before {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert!(multi.revision() > before, "revision did not advance");
    assert!(calls.load(Ordering::SeqCst) >= 1);

    let primary = multi.watchers().get("primary").expect("primary watcher");
    assert!(primary.backends().iter().any(|b| b.host == "10.0.0.3"));

    multi.stop().await.expect("Failed to stop multi watcher");
    clean_prefix(&mut client).await;
}

/// 位于 etcd 前面的 TCP 转发，可以随时切断已建立的连接
struct CuttableProxy {
    addr: SocketAddr,
    conns: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept: JoinHandle<()>,
}

impl CuttableProxy {
    async fn start(upstream: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind proxy");
        let addr = listener.local_addr().expect("proxy address");
        let conns = Arc::new(Mutex::new(Vec::new()));
        let registry = conns.clone();
        let accept = tokio::spawn(async move {
            while let Ok((mut inbound, _)) = listener.accept().await {
                let upstream = upstream.clone();
                let handle = tokio::spawn(async move {
                    if let Ok(mut outbound) = TcpStream::connect(&upstream).await {
                        let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                    }
                });
                registry.lock().unwrap().push(handle);
            }
        });
        Self { addr, conns, accept }
    }

    fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn cut(&self) {
        for handle in self.conns.lock().unwrap().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for CuttableProxy {
    fn drop(&mut self) {
        self.accept.abort();
        self.cut();
    }
}

/// 测试：连接断开后 watch 以退避重建，重建后的变化照常通知
#[tokio::test]
#[ignore]
async fn test_etcd_watch_reconnects_after_connection_loss() {
    let mut client = Client::connect(etcd_endpoints(), None)
        .await
        .expect("Failed to connect etcd");
    clean_prefix(&mut client).await;
    put_backend(&mut client, "node-1", &Backend::new("10.0.2.1", 8080)).await;

    let upstream = etcd_endpoints()[0].trim_start_matches("http://").to_string();
    let proxy = CuttableProxy::start(upstream).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let hook = calls.clone();
    let notifier = ChangeNotifier::new("primary", move |_| {
        hook.fetch_add(1, Ordering::SeqCst);
    });
    let config = ChildDiscoveryConfig::from_value(
        "primary",
        &json!({
            "method": "etcd",
            "endpoints": [proxy.endpoint()],
            "path": TEST_PREFIX,
            "retry_initial_ms": 100,
            "retry_max_ms": 1000,
        }),
    )
    .expect("valid etcd config");
    let watcher = EtcdWatcher::new("primary", &config, &ServiceContext::new("test"), notifier)
        .expect("Failed to create etcd watcher");
    watcher.start().await.expect("Failed to start etcd watcher");
    assert!(watcher.ping());
    assert_eq!(watcher.backends().len(), 1);

    // 切断 watch 所在的连接，断开期间写入新后端
    proxy.cut();
    put_backend(&mut client, "node-2", &Backend::new("10.0.2.2", 8080)).await;

    let mut recovered = false;
    for _ in 0..100 {
        if watcher.ping() && watcher.backends().len() == 2 {
            recovered = true;
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert!(recovered, "watch was not re-established");
    let before = calls.load(Ordering::SeqCst);

    // 重建后的 watch 继续推送
    put_backend(&mut client, "node-3", &Backend::new("10.0.2.3", 8080)).await;
    for _ in 0..50 {
        if watcher.backends().len() == 3 {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(watcher.backends().len(), 3);
    assert!(calls.load(Ordering::SeqCst) > before);

    watcher.stop().await.expect("Failed to stop etcd watcher");
    assert!(!watcher.ping());
    clean_prefix(&mut client).await;
}
