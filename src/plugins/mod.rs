//! 插件系统
//!
//! 插件以目录形式存放在 `plugins/<slug>/`，目录中的 `plugin.json` 描述元数据。
//! 插件代码通过 [`PluginCatalog`] 在编译期注册工厂函数，运行时由 slug 推导的入口名查找，
//! 不做任何动态加载。

mod directory_listing;
mod manager;

pub use directory_listing::DirectoryListingPlugin;
pub use manager::{PluginManager, ScanReport};

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::PluginManifest;
use crate::registry::BootContext;
use crate::utils;

/// 插件实例的基本信息，由插件目录与 plugin.json 构成
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub slug: String,
    pub path: PathBuf,
    pub manifest: PluginManifest,
}

impl PluginInfo {
    /// 从插件目录加载，plugin.json 缺失或格式错误时返回配置错误
    pub fn load(dir: &Path) -> Result<Self> {
        let slug = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            slug,
            path: dir.to_path_buf(),
            manifest: PluginManifest::load(dir)?,
        })
    }

    pub fn name(&self) -> &str {
        self.manifest.name.as_deref().unwrap_or(&self.slug)
    }

    /// 入口名：清单中的 `entry`，否则为 PascalCase(slug) + "Plugin"
    pub fn entry_name(&self) -> String {
        self.manifest
            .entry
            .clone()
            .unwrap_or_else(|| utils::class_name(&self.slug, "Plugin"))
    }
}

/// 插件需要实现的特征
///
/// `boot()` 每个请求都会调用，只用于注册内容类型与数据提供者，不得执行迁移。
/// 一次性的建表等工作放在 `activate()` 中，并且必须可重复执行。
pub trait Plugin: Send + Sync {
    fn info(&self) -> &PluginInfo;

    fn slug(&self) -> &str {
        &self.info().slug
    }

    fn name(&self) -> &str {
        self.info().name()
    }

    fn version(&self) -> &str {
        &self.info().manifest.version
    }

    /// 注册内容类型与数据提供者
    fn boot(&self, ctx: &mut BootContext<'_>) -> Result<()>;

    /// 启用时调用
    fn activate(&self) -> Result<()> {
        Ok(())
    }

    /// 停用时调用，不得删除数据
    fn deactivate(&self) -> Result<()> {
        Ok(())
    }

    /// 卸载数据，只能由用户显式触发；`PluginManager::delete` 不会调用它
    fn uninstall(&self) -> Result<()> {
        Ok(())
    }
}

/// 根据插件信息构造插件实例
pub type PluginFactory = Arc<dyn Fn(PluginInfo) -> Box<dyn Plugin> + Send + Sync>;

/// 入口名到工厂函数的注册表
#[derive(Clone, Default)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置插件
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        catalog.register("DirectoryListingPlugin", |info| {
            Box::new(DirectoryListingPlugin::new(info))
        });
        catalog
    }

    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F)
    where
        F: Fn(PluginInfo) -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(entry.into(), Arc::new(factory));
    }

    pub fn resolve(&self, entry: &str) -> Option<&PluginFactory> {
        self.factories.get(entry)
    }

    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog").field("entries", &self.entries()).finish()
    }
}
