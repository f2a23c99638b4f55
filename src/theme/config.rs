use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::PressliError;
use crate::models::ThemeManifest;
use crate::registry::ProviderRequest;

/// 单个主题 theme.json 的只读视图，与运行中的主题实例无关
#[derive(Debug, Clone)]
pub struct ThemeConfig {
    slug: String,
    path: PathBuf,
    manifest: ThemeManifest,
}

impl ThemeConfig {
    /// 加载 `themes_dir/<slug>/theme.json`
    pub fn load(themes_dir: &Path, slug: &str) -> Result<Self> {
        Self::open(&themes_dir.join(slug))
    }

    /// 从主题目录加载；目录或 theme.json 缺失、JSON 无效都是配置错误
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(anyhow!(PressliError::config(format!(
                "主题目录不存在: {}",
                dir.display()
            ))));
        }
        let slug = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            slug,
            path: dir.to_path_buf(),
            manifest: ThemeManifest::load(dir)?,
        })
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &ThemeManifest {
        &self.manifest
    }

    pub fn name(&self) -> &str {
        self.manifest.name.as_deref().unwrap_or(&self.slug)
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    /// 模板声明的数据提供者，模板未声明时为空
    pub fn get_providers(&self, template_type: &str) -> Vec<ProviderRequest> {
        self.manifest
            .templates
            .get(template_type)
            .map(|spec| spec.provider_requests())
            .unwrap_or_default()
    }

    pub fn get_provider_names(&self, template_type: &str) -> Vec<String> {
        self.get_providers(template_type).into_iter().map(|r| r.name).collect()
    }

    /// 模板声明的相对路径
    pub fn get_template(&self, template_type: &str) -> Option<&str> {
        self.manifest
            .templates
            .get(template_type)
            .and_then(|spec| spec.template.as_deref())
    }

    pub fn get_setting(&self, key: &str, default: Value) -> Value {
        self.manifest.settings.get(key).cloned().unwrap_or(default)
    }

    pub fn settings(&self) -> &serde_json::Map<String, Value> {
        &self.manifest.settings
    }

    pub fn get_menu_locations(&self) -> &BTreeMap<String, String> {
        &self.manifest.menu_locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use serde_json::json;
    use std::fs;

    fn write_theme(root: &Path, slug: &str, manifest: &str) -> PathBuf {
        let dir = root.join(slug);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("theme.json"), manifest).unwrap();
        dir
    }

    #[test]
    fn test_reads_templates_settings_and_locations() {
        let root = tempfile::tempdir().unwrap();
        write_theme(
            root.path(),
            "aurora",
            r#"{
                "name": "Aurora",
                "version": "2.1.0",
                "templates": {
                    "single": {"template": "templates/single.html", "data_providers": ["related_posts", "author_bio"]}
                },
                "settings": {"accent": "teal"},
                "menu_locations": {"primary": "Main navigation"}
            }"#,
        );

        let config = ThemeConfig::load(root.path(), "aurora").unwrap();
        assert_eq!(config.name(), "Aurora");
        assert_eq!(config.get_provider_names("single"), vec!["related_posts", "author_bio"]);
        assert!(config.get_providers("archive").is_empty());
        assert_eq!(config.get_template("single"), Some("templates/single.html"));
        assert_eq!(config.get_template("archive"), None);
        assert_eq!(config.get_setting("accent", json!("red")), json!("teal"));
        assert_eq!(config.get_setting("font", json!("serif")), json!("serif"));
        assert_eq!(config.get_menu_locations()["primary"], "Main navigation");
    }

    #[test]
    fn test_missing_or_malformed_manifest_is_config_error() {
        let root = tempfile::tempdir().unwrap();
        let missing_dir = ThemeConfig::load(root.path(), "ghost").unwrap_err();
        assert!(classify(&missing_dir).map(PressliError::is_config).unwrap_or(false));

        fs::create_dir_all(root.path().join("empty")).unwrap();
        let missing_file = ThemeConfig::load(root.path(), "empty").unwrap_err();
        assert!(classify(&missing_file).map(PressliError::is_config).unwrap_or(false));

        write_theme(root.path(), "broken", "{ not json");
        let malformed = ThemeConfig::load(root.path(), "broken").unwrap_err();
        assert!(classify(&malformed).map(PressliError::is_config).unwrap_or(false));
    }
}
