use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::models::Config;
use crate::plugins::{PluginCatalog, PluginManager};
use crate::providers::register_core_providers;
use crate::registry::{BootContext, ContentTypeConfig, Registry};
use crate::store::{ContentStore, MemoryStore, PluginRecordStore, YamlRecordStore};
use crate::theme::{TemplateRenderer, Theme, ThemeCatalog, ThemeManager};

/// 站点配置文件名
pub const CONFIG_FILE: &str = "_config.yml";

/// 注册核心内容类型 `post` 与 `page`，两者共用 `posts` 表
pub fn register_core_types(registry: &mut Registry) -> Result<()> {
    registry.register_content_type(
        "post",
        ContentTypeConfig::new("PostModel")
            .label("Posts")
            .searchable(true)
            .supports("thumbnail", true)
            .supports("excerpt", true)
            .supports("comments", true)
            .supports("revisions", true)
            .supports("categories", true)
            .supports("tags", true),
    )?;
    registry.register_content_type(
        "page",
        ContentTypeConfig::new("PageModel")
            .label("Pages")
            .searchable(true)
            .supports("thumbnail", true)
            .supports("revisions", true),
    )?;
    Ok(())
}

/// 磁盘上的站点及其持久化协作者
///
/// `Site` 本身跨请求存在，但不持有任何注册表状态；每次 [`Site::bootstrap`]
/// 都会得到一套全新的注册表。
pub struct Site {
    base_dir: PathBuf,
    config: Config,
    store: Arc<dyn ContentStore>,
    records: Arc<dyn PluginRecordStore>,
    plugin_catalog: PluginCatalog,
    theme_catalog: ThemeCatalog,
}

impl Site {
    /// 打开站点目录：读取 `_config.yml`、内容数据文件与插件记录文件
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        info!("打开站点: {}", base_dir.display());
        let config = Config::load_or_default(&base_dir.join(CONFIG_FILE))?;
        let store = Arc::new(MemoryStore::from_yaml_file(&config.data_path(&base_dir))?);
        let records = Arc::new(YamlRecordStore::new(config.plugin_records_path(&base_dir)));
        Ok(Self::with_collaborators(base_dir, config, store, records))
    }

    /// 使用指定的存储构造站点
    pub fn with_collaborators(
        base_dir: impl Into<PathBuf>,
        config: Config,
        store: Arc<dyn ContentStore>,
        records: Arc<dyn PluginRecordStore>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
            store,
            records,
            plugin_catalog: PluginCatalog::bundled(),
            theme_catalog: ThemeCatalog::bundled(),
        }
    }

    pub fn with_plugin_catalog(mut self, catalog: PluginCatalog) -> Self {
        self.plugin_catalog = catalog;
        self
    }

    pub fn with_theme_catalog(mut self, catalog: ThemeCatalog) -> Self {
        self.theme_catalog = catalog;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    pub fn store(&self) -> Arc<dyn ContentStore> {
        self.store.clone()
    }

    pub fn plugin_manager(&self) -> PluginManager {
        PluginManager::new(
            self.config.plugins_path(&self.base_dir),
            self.records.clone(),
            self.plugin_catalog.clone(),
        )
    }

    pub fn theme_manager(&self, active_plugins: Vec<String>) -> ThemeManager {
        ThemeManager::new(
            self.config.themes_path(&self.base_dir),
            self.config.clone(),
            self.theme_catalog.clone(),
        )
        .with_active_plugins(active_plugins)
    }

    /// 核心类型、内置提供者与启用的插件
    fn boot_core(&self) -> Result<(Registry, PluginManager)> {
        let mut registry = Registry::new();
        register_core_types(&mut registry)?;
        register_core_providers(&mut registry.providers, self.store.clone());

        let mut plugins = self.plugin_manager();
        plugins.boot_all(&mut BootContext::new(&mut registry, self.store.clone(), &self.config))?;
        Ok((registry, plugins))
    }

    /// 请求启动流程：核心类型与内置提供者 -> 启用的插件 -> 当前主题
    ///
    /// 任一配置错误都会中止启动，不会返回启动了一半的状态。
    pub fn bootstrap(&self) -> Result<RequestScope> {
        let (mut registry, plugins) = self.boot_core()?;
        let mut themes = self.theme_manager(plugins.active_slugs()?);
        let theme = themes.get_active_theme(&mut BootContext::new(&mut registry, self.store.clone(), &self.config))?;

        info!(
            "启动完成 - 内容类型: {}, 数据提供者: {}, 主题: {}",
            registry.content.all().len(),
            registry.providers.len(),
            theme.slug()
        );
        Ok(RequestScope {
            registry,
            plugins,
            themes,
            theme,
            config: self.config.clone(),
        })
    }

    /// 切换主题，启动成功后写回 `_config.yml`
    pub fn switch_theme(&mut self, slug: &str) -> Result<Arc<dyn Theme>> {
        let (mut registry, plugins) = self.boot_core()?;
        let mut themes = self.theme_manager(plugins.active_slugs()?);
        let theme = themes.switch_theme(slug, &mut BootContext::new(&mut registry, self.store.clone(), &self.config))?;

        self.config.active_theme = Some(slug.to_string());
        self.config.save(&self.config_path())?;
        Ok(theme)
    }
}

/// 一次请求的启动结果
pub struct RequestScope {
    pub registry: Registry,
    pub plugins: PluginManager,
    pub themes: ThemeManager,
    pub theme: Arc<dyn Theme>,
    config: Config,
}

impl RequestScope {
    pub fn renderer(&self) -> TemplateRenderer<'_> {
        TemplateRenderer::new(self.theme.as_ref(), &self.registry, &self.config)
    }

    pub fn render(&self, template_type: &str, context: &Value) -> Result<String> {
        self.renderer().render(template_type, context)
    }
}
