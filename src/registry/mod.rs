//! 每个请求新建一次的注册表上下文

pub mod content;
pub mod provider;

pub use content::{ContentRegistry, ContentTypeConfig, ContentTypeDescriptor, DEFAULT_FEATURES, DEFAULT_TABLE};
pub use provider::{Options, Provider, ProviderRegistry, ProviderRequest};

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

use crate::models::Config;
use crate::store::ContentStore;

/// 显式传递的请求级注册表，替代进程级的全局静态状态
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub content: ContentRegistry,
    pub providers: ProviderRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册内容类型并转发其绑定的提供者
    pub fn register_content_type(&mut self, name: &str, config: ContentTypeConfig) -> Result<()> {
        self.content.register(name, config, &mut self.providers)
    }

    pub fn register_provider<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(&Value, &Options) -> Result<Value> + Send + Sync + 'static,
    {
        self.providers.register(name, callback);
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.providers.clear();
    }
}

/// 插件与主题 `boot()` 时拿到的上下文
///
/// 提供者闭包若需要读取数据，从这里克隆 `store` 捕获进去。
pub struct BootContext<'a> {
    pub registry: &'a mut Registry,
    pub store: Arc<dyn ContentStore>,
    pub config: &'a Config,
}

impl<'a> BootContext<'a> {
    pub fn new(registry: &'a mut Registry, store: Arc<dyn ContentStore>, config: &'a Config) -> Self {
        Self { registry, store, config }
    }
}
