use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::discovery::GeneratorConfig;
use crate::runtime::{LifecycleConfig, ServiceContext};

/// 服务配置文件
///
/// ```toml
/// name = "test"
///
/// [discovery]
/// method = "multi"
///
/// [discovery.watchers.primary]
/// method = "static"
/// servers = [{ host = "10.0.0.1", port = 8080 }]
///
/// [discovery.resolver]
/// method = "base"
///
/// [generators.haproxy]
/// port = 3212
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    /// 原始发现配置记录，交给 `MultiWatcher::new` 校验
    pub discovery: serde_json::Value,
    #[serde(default)]
    pub generators: GeneratorConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl ServiceConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ServiceConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let config: ServiceConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// 构建运行时上下文
    pub fn context(&self) -> ServiceContext {
        ServiceContext::new(self.name.clone())
            .with_generator_config(self.generators.clone())
            .with_lifecycle(self.lifecycle.clone())
    }
}
