//! 变更通知
//!
//! 子 watcher 和 resolver 只通过 `ChangeNotifier` 向上游报告"有变化，请重新拉取"，
//! 不携带任何负载。调用是同步的：`notify()` 返回时上游已经处理完这次通知。

use std::fmt;
use std::sync::Arc;

type Hook = dyn Fn(&str) + Send + Sync;

/// 变更通知器
///
/// 绑定一个来源名称（子 watcher 的逻辑名，或 `resolver`），可以在任意线程并发调用。
#[derive(Clone)]
pub struct ChangeNotifier {
    source: Arc<str>,
    hook: Arc<Hook>,
}

impl ChangeNotifier {
    /// 创建通知器
    pub fn new<F>(source: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            source: Arc::from(source.into()),
            hook: Arc::new(hook),
        }
    }

    /// 不做任何事的通知器
    pub fn noop(source: impl Into<String>) -> Self {
        Self::new(source, |_| {})
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 发出变更通知
    pub fn notify(&self) {
        (self.hook)(&self.source);
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("source", &self.source)
            .finish()
    }
}
