//! 服务发现配置
//!
//! 原始配置是一条记录：
//!
//! ```text
//! { "method": "multi",
//!   "watchers": { "<name>": { "method": "etcd" | "dns" | "static", ... }, ... },
//!   "resolver": { "method": "base", ... } }
//! ```
//!
//! `DiscoveryConfig::from_value` 在构造任何子 watcher 之前完成全部结构校验。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DiscoveryError, ErrorBuilder, ErrorCode, Result, map_param_error};

/// 顶层 method 必须等于该值
pub const MULTI_METHOD: &str = "multi";

/// 子 watcher 类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WatcherMethod {
    /// 基于 etcd 的一致性存储 watcher
    Etcd,
    /// 基于域名解析的 watcher
    Dns,
    /// 静态后端列表
    Static,
}

impl WatcherMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatcherMethod::Etcd => "etcd",
            WatcherMethod::Dns => "dns",
            WatcherMethod::Static => "static",
        }
    }
}

impl fmt::Display for WatcherMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WatcherMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "etcd" => Ok(WatcherMethod::Etcd),
            "dns" => Ok(WatcherMethod::Dns),
            "static" => Ok(WatcherMethod::Static),
            _ => Err(format!("Unknown watcher method: {}", s)),
        }
    }
}

/// resolver 类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMethod {
    /// 基础（空）resolver
    Base,
}

impl ResolverMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverMethod::Base => "base",
        }
    }
}

impl fmt::Display for ResolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResolverMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "base" => Ok(ResolverMethod::Base),
            _ => Err(format!("Unknown resolver method: {}", s)),
        }
    }
}

/// 单个子 watcher 的配置
///
/// `method` 决定由哪个实现构造，其余字段由具体实现解析。
#[derive(Debug, Clone, PartialEq)]
pub struct ChildDiscoveryConfig {
    pub method: WatcherMethod,
    /// 完整的原始记录（包含 `method`）
    pub params: Map<String, Value>,
}

impl ChildDiscoveryConfig {
    /// 从原始记录解析
    ///
    /// # 参数
    /// * `name` - 子 watcher 的逻辑名（仅用于错误信息）
    /// * `value` - 原始记录
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        let record = value.as_object().ok_or_else(|| {
            ErrorBuilder::new(
                ErrorCode::InvalidWatcherEntry,
                format!("watcher '{}' must be a record", name),
            )
            .param("watcher", name)
            .details(format!("got {}", value))
            .build_error()
        })?;

        let method = match record.get("method") {
            Some(Value::String(method)) => method.parse::<WatcherMethod>().map_err(|e| {
                ErrorBuilder::new(ErrorCode::UnknownWatcherMethod, e)
                    .param("watcher", name)
                    .param("method", method.as_str())
                    .build_error()
            })?,
            _ => {
                return Err(ErrorBuilder::new(
                    ErrorCode::InvalidWatcherEntry,
                    format!("watcher '{}' has no method", name),
                )
                .param("watcher", name)
                .build_error());
            }
        };

        Ok(Self {
            method,
            params: record.clone(),
        })
    }

    /// 将参数解码为具体实现的配置结构
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone()))
            .map_err(|e| map_param_error(e, format!("invalid parameters for {} watcher", self.method)))
    }
}

/// resolver 配置
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub method: ResolverMethod,
    pub params: Map<String, Value>,
}

impl ResolverConfig {
    /// 从原始记录解析（缺失、非记录或空记录均视为缺失）
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        let record = match value {
            Some(Value::Object(record)) if !record.is_empty() => record,
            _ => {
                return Err(DiscoveryError::config(
                    ErrorCode::MissingResolver,
                    "resolver must be a non-empty record",
                ));
            }
        };

        let method = match record.get("method") {
            Some(Value::String(method)) => method.parse::<ResolverMethod>().map_err(|e| {
                ErrorBuilder::new(ErrorCode::UnknownResolverMethod, e)
                    .param("method", method.as_str())
                    .build_error()
            })?,
            other => {
                return Err(ErrorBuilder::new(
                    ErrorCode::UnknownResolverMethod,
                    "resolver has no method",
                )
                .details(format!("got {:?}", other))
                .build_error());
            }
        };

        Ok(Self {
            method,
            params: record.clone(),
        })
    }

    /// 仅包含 method 的配置
    pub fn new(method: ResolverMethod) -> Self {
        let mut params = Map::new();
        params.insert("method".to_string(), Value::String(method.as_str().to_string()));
        Self { method, params }
    }
}

/// MultiWatcher 的完整发现配置
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// 子 watcher 配置，按逻辑名排序
    pub watchers: BTreeMap<String, ChildDiscoveryConfig>,
    pub resolver: ResolverConfig,
}

impl DiscoveryConfig {
    /// 从原始记录解析并校验
    ///
    /// 校验顺序：顶层 method → watchers（非空、每项为记录且 method 可识别）→ resolver
    pub fn from_value(value: &Value) -> Result<Self> {
        let record = value
            .as_object()
            .ok_or_else(|| DiscoveryError::invalid_method(MULTI_METHOD, None))?;

        match record.get("method").and_then(Value::as_str) {
            Some(MULTI_METHOD) => {}
            other => return Err(DiscoveryError::invalid_method(MULTI_METHOD, other)),
        }

        let entries = match record.get("watchers") {
            Some(Value::Object(entries)) if !entries.is_empty() => entries,
            _ => {
                return Err(DiscoveryError::config(
                    ErrorCode::MissingWatchers,
                    "watchers must be a non-empty record of name -> watcher config",
                ));
            }
        };

        let mut watchers = BTreeMap::new();
        for (name, entry) in entries {
            if name.is_empty() {
                return Err(DiscoveryError::config(
                    ErrorCode::InvalidWatcherEntry,
                    "watcher name must not be empty",
                ));
            }
            watchers.insert(name.clone(), ChildDiscoveryConfig::from_value(name, entry)?);
        }

        let resolver = ResolverConfig::from_value(record.get("resolver"))?;

        Ok(Self { watchers, resolver })
    }

    pub fn watcher_names(&self) -> Vec<String> {
        self.watchers.keys().cloned().collect()
    }
}
