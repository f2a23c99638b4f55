use anyhow::{anyhow, Result};
use semver::Version;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{Theme, ThemeCatalog, ThemeConfig};
use crate::error::PressliError;
use crate::models::manifest::THEME_MANIFEST;
use crate::models::{Config, ThemeManifest};
use crate::registry::BootContext;
use crate::utils::{self, version};

/// 主题列表中的一项
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub screenshot: Option<String>,
    pub path: PathBuf,
}

/// 解析、校验并启动当前主题
pub struct ThemeManager {
    themes_dir: PathBuf,
    config: Config,
    catalog: ThemeCatalog,
    runtime_version: Option<Version>,
    active_plugins: Vec<String>,
    active: Option<Arc<dyn Theme>>,
}

impl ThemeManager {
    pub fn new(themes_dir: impl Into<PathBuf>, config: Config, catalog: ThemeCatalog) -> Self {
        let runtime_version = match version::parse_lenient(&config.runtime_version) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("运行时版本设置无效 {}: {}", config.runtime_version, e);
                None
            }
        };
        Self {
            themes_dir: themes_dir.into(),
            config,
            catalog,
            runtime_version,
            active_plugins: Vec::new(),
            active: None,
        }
    }

    /// 覆盖配置中用于 `requires.runtime` 比较的运行时版本
    pub fn with_runtime_version(mut self, version: Version) -> Self {
        self.runtime_version = Some(version);
        self
    }

    /// 当前启用的插件，用于检查 `requires.plugins`
    pub fn with_active_plugins(mut self, plugins: Vec<String>) -> Self {
        self.active_plugins = plugins;
        self
    }

    pub fn themes_dir(&self) -> &Path {
        &self.themes_dir
    }

    pub fn active_slug(&self) -> &str {
        self.config.active_theme()
    }

    /// 获取当前主题，首次调用时解析、校验依赖并启动
    pub fn get_active_theme(&mut self, ctx: &mut BootContext<'_>) -> Result<Arc<dyn Theme>> {
        if let Some(theme) = &self.active {
            return Ok(theme.clone());
        }

        let slug = self.config.active_theme().to_string();
        let theme = self.resolve(&slug)?;
        self.validate_dependencies(theme.config())?;
        theme.boot(ctx)?;

        info!("主题已启动: {} v{}", theme.name(), theme.version());
        self.active = Some(theme.clone());
        Ok(theme)
    }

    /// 由 slug 推导入口名并通过工厂构造主题实例
    fn resolve(&self, slug: &str) -> Result<Arc<dyn Theme>> {
        if !utils::is_valid_slug(slug) {
            return Err(anyhow!(PressliError::config(format!("非法的主题 slug: {}", slug))));
        }
        let config = ThemeConfig::load(&self.themes_dir, slug)?;
        let entry = config
            .manifest()
            .entry
            .clone()
            .unwrap_or_else(|| utils::class_name(slug, "Theme"));

        let factory = self.catalog.resolve(&entry).ok_or_else(|| {
            anyhow!(PressliError::config(format!("无法解析主题 {} 的入口 {}", slug, entry)))
        })?;
        debug!("解析主题 {} -> {}", slug, entry);
        Ok(Arc::from((**factory)(config)))
    }

    /// 校验运行时版本与 CMS 版本；`requires.plugins` 只记录警告，不会阻止启动
    pub fn validate_dependencies(&self, theme: &ThemeConfig) -> Result<()> {
        let requires = &theme.manifest().requires;

        if let Some(required) = &requires.runtime {
            match &self.runtime_version {
                Some(actual) if !version::satisfies(actual, required)? => {
                    return Err(anyhow!(PressliError::DependencyError {
                        theme: theme.name().to_string(),
                        requirement: "runtime".to_string(),
                        required: required.clone(),
                        actual: actual.to_string(),
                    }));
                }
                Some(_) => {}
                None => warn!("无法确定运行时版本，跳过主题 {} 的运行时检查", theme.name()),
            }
        }

        if let Some(required) = &requires.pressli {
            let actual = version::parse_lenient(&self.config.version)?;
            if !version::satisfies(&actual, required)? {
                return Err(anyhow!(PressliError::DependencyError {
                    theme: theme.name().to_string(),
                    requirement: "pressli".to_string(),
                    required: required.clone(),
                    actual: self.config.version.clone(),
                }));
            }
        }

        for plugin in &requires.plugins {
            if !self.active_plugins.contains(plugin) {
                warn!("主题 {} 声明依赖插件 {}，但该插件未启用", theme.name(), plugin);
            }
        }
        Ok(())
    }

    /// 切换主题并重新启动，不会持久化选择
    ///
    /// 切换失败时恢复之前的主题设置。
    pub fn switch_theme(&mut self, slug: &str, ctx: &mut BootContext<'_>) -> Result<Arc<dyn Theme>> {
        let dir = self.themes_dir.join(slug);
        if !utils::is_valid_slug(slug) || !dir.is_dir() {
            return Err(anyhow!(PressliError::config(format!("主题不存在: {}", slug))));
        }
        if !dir.join(THEME_MANIFEST).is_file() {
            return Err(anyhow!(PressliError::config(format!(
                "主题 {} 缺少 {}",
                slug, THEME_MANIFEST
            ))));
        }

        let previous = self.config.active_theme.replace(slug.to_string());
        let previous_theme = self.active.take();
        match self.get_active_theme(ctx) {
            Ok(theme) => {
                info!("已切换主题: {}", slug);
                Ok(theme)
            }
            Err(e) => {
                warn!("切换主题 {} 失败: {}", slug, e);
                self.config.active_theme = previous;
                self.active = previous_theme;
                Err(e)
            }
        }
    }

    /// 扫描主题目录，列出所有带有效 theme.json 的主题
    pub fn get_available_themes(&self) -> Result<Vec<ThemeSummary>> {
        let mut themes = Vec::new();
        if !self.themes_dir.is_dir() {
            warn!("主题目录不存在: {}", self.themes_dir.display());
            return Ok(themes);
        }

        let entries = WalkDir::new(&self.themes_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir());

        for entry in entries {
            let slug = entry.file_name().to_string_lossy().to_string();
            let manifest = match ThemeManifest::load(entry.path()) {
                Ok(manifest) => manifest,
                Err(e) => {
                    debug!("跳过主题目录 {}: {}", slug, e);
                    continue;
                }
            };
            themes.push(ThemeSummary {
                name: manifest.name.clone().unwrap_or_else(|| slug.clone()),
                version: manifest.version,
                author: manifest.author,
                description: manifest.description,
                screenshot: manifest.screenshot,
                path: entry.path().to_path_buf(),
                slug,
            });
        }
        Ok(themes)
    }
}
