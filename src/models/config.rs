use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 站点配置（`_config.yml`），同时充当设置存储
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 站点标题
    pub title: String,
    pub url: Option<String>,
    /// 站点根路径
    pub root: String,
    /// CMS 版本，主题 `requires.pressli` 以此为准
    pub version: String,
    /// 宿主运行时版本，主题 `requires.runtime`（旧清单中的 `php`）以此为准
    pub runtime_version: String,
    /// 当前启用的主题
    pub active_theme: Option<String>,
    pub plugins_dir: String,
    pub themes_dir: String,
    /// 内容数据文件
    pub data_file: String,
    /// 插件状态记录文件
    pub plugin_records: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Pressli".to_string(),
            url: None,
            root: "/".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_version: Self::DEFAULT_RUNTIME_VERSION.to_string(),
            active_theme: None,
            plugins_dir: "plugins".to_string(),
            themes_dir: "themes".to_string(),
            data_file: "data/site.yml".to_string(),
            plugin_records: "data/plugins.yml".to_string(),
        }
    }
}

impl Config {
    /// 未设置时使用的主题
    pub const DEFAULT_THEME: &'static str = "default";
    /// 未设置时的运行时版本
    pub const DEFAULT_RUNTIME_VERSION: &'static str = "8.3";

    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 文件不存在时返回默认配置
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn active_theme(&self) -> &str {
        self.active_theme.as_deref().unwrap_or(Self::DEFAULT_THEME)
    }

    /// 规范化的站点根路径，总是以 `/` 开头和结尾
    pub fn root_path(&self) -> String {
        let trimmed = self.root.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        }
    }

    /// 预览服务器的挂载前缀；站点位于 `/` 时为 `None`
    pub fn mount_path(&self) -> Option<String> {
        let root = self.root_path();
        let prefix = root.trim_end_matches('/');
        (!prefix.is_empty()).then(|| prefix.to_string())
    }

    /// 站内链接，例如根路径为 `/blog/` 时 `post/hello` -> `/blog/post/hello`
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.root_path(), path.trim_start_matches('/'))
    }

    pub fn plugins_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.plugins_dir)
    }

    pub fn themes_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.themes_dir)
    }

    pub fn data_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.data_file)
    }

    pub fn plugin_records_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.plugin_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("title: Demo\nactive_theme: aurora\n").unwrap();
        assert_eq!(config.title, "Demo");
        assert_eq!(config.active_theme(), "aurora");
        assert_eq!(config.root, "/");
        assert_eq!(config.plugins_dir, "plugins");
    }

    #[test]
    fn test_root_normalization() {
        let config = Config::default();
        assert_eq!(config.root_path(), "/");
        assert_eq!(config.mount_path(), None);
        assert_eq!(config.url_for("/post/hello"), "/post/hello");

        let config = Config {
            root: "blog".to_string(),
            ..Config::default()
        };
        assert_eq!(config.root_path(), "/blog/");
        assert_eq!(config.mount_path().as_deref(), Some("/blog"));
        assert_eq!(config.url_for("post/hello"), "/blog/post/hello");
    }

    #[test]
    fn test_runtime_version_default() {
        let config: Config = serde_yaml::from_str("title: Demo\n").unwrap();
        assert_eq!(config.runtime_version, Config::DEFAULT_RUNTIME_VERSION);

        let config: Config = serde_yaml::from_str("runtime_version: '7.4'\n").unwrap();
        assert_eq!(config.runtime_version, "7.4");
    }

    #[test]
    fn test_active_theme_falls_back() {
        assert_eq!(Config::default().active_theme(), "default");
    }
}
