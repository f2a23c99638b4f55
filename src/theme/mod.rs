//! 主题系统
//!
//! 同一时间只有一个启用的主题。主题在 theme.json 中为每个模板声明所需的数据提供者，
//! 渲染时只解析这些提供者。

mod config;
mod default;
mod manager;
pub mod renderer;

pub use config::ThemeConfig;
pub use default::{DefaultTheme, StaticTheme};
pub use manager::{ThemeManager, ThemeSummary};
pub use renderer::TemplateRenderer;

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::registry::{BootContext, ProviderRequest};

/// 模板约定目录
pub const TEMPLATES_DIR: &str = "templates";
/// 模板文件扩展名
pub const TEMPLATE_EXT: &str = "html";

/// 主题需要实现的特征
pub trait Theme: Send + Sync {
    fn config(&self) -> &ThemeConfig;

    fn slug(&self) -> &str {
        self.config().slug()
    }

    fn name(&self) -> &str {
        self.config().name()
    }

    fn version(&self) -> &str {
        self.config().version()
    }

    /// 注册主题自己的数据提供者
    fn boot(&self, ctx: &mut BootContext<'_>) -> Result<()>;

    /// 模板文件路径：优先使用 theme.json 中的映射，其次 `templates/<name>.html`，
    /// 都不存在时返回 `default`
    fn get_template(&self, name: &str, default: Option<PathBuf>) -> Option<PathBuf> {
        let config = self.config();
        if let Some(mapped) = config.get_template(name) {
            let path = config.path().join(mapped);
            if path.is_file() {
                return Some(path);
            }
        }
        let conventional = config
            .path()
            .join(TEMPLATES_DIR)
            .join(format!("{}.{}", name, TEMPLATE_EXT));
        if conventional.is_file() {
            return Some(conventional);
        }
        default
    }

    fn get_providers(&self, template_name: &str) -> Vec<ProviderRequest> {
        self.config().get_providers(template_name)
    }
}

pub type ThemeFactory = Arc<dyn Fn(ThemeConfig) -> Box<dyn Theme> + Send + Sync>;

/// 入口名到主题工厂的注册表
#[derive(Clone, Default)]
pub struct ThemeCatalog {
    factories: HashMap<String, ThemeFactory>,
}

impl ThemeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置主题；`StaticTheme` 供只有模板、没有代码的主题在 theme.json 中以 `entry` 引用
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        catalog.register("DefaultTheme", |config| Box::new(DefaultTheme::new(config)));
        catalog.register("StaticTheme", |config| Box::new(StaticTheme::new(config)));
        catalog
    }

    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F)
    where
        F: Fn(ThemeConfig) -> Box<dyn Theme> + Send + Sync + 'static,
    {
        self.factories.insert(entry.into(), Arc::new(factory));
    }

    pub fn resolve(&self, entry: &str) -> Option<&ThemeFactory> {
        self.factories.get(entry)
    }

    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }
}

impl fmt::Debug for ThemeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeCatalog").field("entries", &self.entries()).finish()
    }
}
