//! `plugin.json` 与 `theme.json` 的结构定义

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::PressliError;
use crate::registry::ProviderRequest;

pub const PLUGIN_MANIFEST: &str = "plugin.json";
pub const THEME_MANIFEST: &str = "theme.json";

/// 依赖声明
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    /// 运行时版本要求，兼容旧清单中的 `php` 键
    #[serde(alias = "php", skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// CMS 版本要求
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressli: Option<String>,
    /// 依赖的插件 slug
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provides {
    pub content_types: Vec<String>,
    pub data_providers: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// 插件清单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// 显式指定入口工厂名，缺省时由 slug 推导
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default)]
    pub requires: Requirements,
    #[serde(default)]
    pub provides: Provides,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            name: None,
            version: default_version(),
            author: None,
            description: None,
            entry: None,
            requires: Requirements::default(),
            provides: Provides::default(),
        }
    }
}

impl PluginManifest {
    pub fn load(dir: &Path) -> Result<Self> {
        read_manifest(&dir.join(PLUGIN_MANIFEST))
    }

    /// 持久化记录中保存的配置快照
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// theme.json 中 `data_providers` 的单个条目：字符串或 `{name: options}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderSpec {
    Name(String),
    Configured(BTreeMap<String, Value>),
}

impl ProviderSpec {
    pub fn requests(&self) -> Vec<ProviderRequest> {
        match self {
            ProviderSpec::Name(name) => vec![ProviderRequest::new(name.clone())],
            ProviderSpec::Configured(map) => map
                .iter()
                .map(|(name, options)| {
                    let options = match options {
                        Value::Object(obj) => obj.clone(),
                        _ => Map::new(),
                    };
                    ProviderRequest::with_options(name.clone(), options)
                })
                .collect(),
        }
    }
}

/// 单个模板的声明
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSpec {
    pub template: Option<String>,
    pub data_providers: Vec<ProviderSpec>,
}

impl TemplateSpec {
    pub fn provider_requests(&self) -> Vec<ProviderRequest> {
        self.data_providers.iter().flat_map(ProviderSpec::requests).collect()
    }
}

/// 主题清单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default)]
    pub requires: Requirements,
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateSpec>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub menu_locations: BTreeMap<String, String>,
}

impl ThemeManifest {
    pub fn load(dir: &Path) -> Result<Self> {
        read_manifest(&dir.join(THEME_MANIFEST))
    }
}

/// 读取并解析 JSON 清单，缺失或格式错误都视为配置错误
fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(anyhow!(PressliError::config(format!(
            "清单文件不存在: {}",
            path.display()
        ))));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        anyhow!(PressliError::config(format!(
            "清单文件格式错误: {} - {}",
            path.display(),
            e
        )))
    })
}
