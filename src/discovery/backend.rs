//! 后端实例定义

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 发现到的后端端点
///
/// 对 MultiWatcher 和 resolver 契约而言是不透明值，只有具体的合并策略才会读取字段。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Backend {
    /// 后端名称（来源内唯一）
    #[serde(default)]
    pub name: String,

    pub host: String,

    pub port: u16,

    /// 自定义标签（例如 az、version）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// 权重
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl Backend {
    /// 创建新的后端，名称默认为 `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            name: format!("{}:{}", host, port),
            host,
            port,
            labels: BTreeMap::new(),
            weight: None,
        }
    }

    /// 设置名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 添加标签
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// 设置权重
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// 名称缺省时补齐为 `host:port`
    pub(crate) fn normalized(mut self) -> Self {
        if self.name.is_empty() {
            self.name = format!("{}:{}", self.host, self.port);
        }
        self
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.host, self.port)
    }
}
