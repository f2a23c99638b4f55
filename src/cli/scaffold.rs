use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::core::CONFIG_FILE;
use crate::error::PressliError;
use crate::models::Config;

// 嵌入的初始站点文件
mod starter {
    pub const THEME_JSON: &str = include_str!("../../embed/site/themes/default/theme.json");
    pub const HOME_HTML: &str = include_str!("../../embed/site/themes/default/templates/home.html");
    pub const POST_HTML: &str = include_str!("../../embed/site/themes/default/templates/post.html");
    pub const PAGE_HTML: &str = include_str!("../../embed/site/themes/default/templates/page.html");
    pub const MENU_HTML: &str = include_str!("../../embed/site/themes/default/templates/menu.html");
    pub const LISTING_PLUGIN_JSON: &str = include_str!("../../embed/site/plugins/directory-listing/plugin.json");
    pub const SITE_DATA: &str = include_str!("../../embed/site/data/site.yml");
}

/// 在目标目录创建初始站点：配置、默认主题、目录列表插件与示例数据
pub fn initialize_site(site_path: &Path, title: &str) -> Result<()> {
    if site_path.join(CONFIG_FILE).exists() {
        return Err(anyhow!(PressliError::config(format!(
            "站点已存在: {}",
            site_path.display()
        ))));
    }

    let config = Config {
        title: title.to_string(),
        active_theme: Some(Config::DEFAULT_THEME.to_string()),
        ..Config::default()
    };

    let theme_dir = config.themes_path(site_path).join(Config::DEFAULT_THEME);
    let templates_dir = theme_dir.join(crate::theme::TEMPLATES_DIR);
    let plugin_dir = config.plugins_path(site_path).join("directory-listing");
    let data_path = config.data_path(site_path);

    for dir in [&templates_dir, &plugin_dir] {
        fs::create_dir_all(dir)?;
    }
    if let Some(parent) = data_path.parent() {
        fs::create_dir_all(parent)?;
    }

    config.save(&site_path.join(CONFIG_FILE))?;
    fs::write(theme_dir.join("theme.json"), starter::THEME_JSON)?;
    fs::write(templates_dir.join("home.html"), starter::HOME_HTML)?;
    fs::write(templates_dir.join("post.html"), starter::POST_HTML)?;
    fs::write(templates_dir.join("page.html"), starter::PAGE_HTML)?;
    fs::write(templates_dir.join("menu.html"), starter::MENU_HTML)?;
    fs::write(plugin_dir.join("plugin.json"), starter::LISTING_PLUGIN_JSON)?;
    fs::write(&data_path, starter::SITE_DATA)?;

    info!("已创建站点: {}", site_path.display());
    Ok(())
}
