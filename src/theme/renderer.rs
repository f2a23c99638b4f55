//! 模板渲染控制器
//!
//! 读取模板声明的数据提供者，批量解析后交给 Tera 渲染。

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::path::Path;
use tera::{Context as TeraContext, Tera};
use tracing::debug;

use super::{Theme, TEMPLATES_DIR, TEMPLATE_EXT};
use crate::error::PressliError;
use crate::models::Config;
use crate::registry::Registry;
use crate::utils::markdown;

pub struct TemplateRenderer<'a> {
    theme: &'a dyn Theme,
    registry: &'a Registry,
    site: &'a Config,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(theme: &'a dyn Theme, registry: &'a Registry, site: &'a Config) -> Self {
        Self { theme, registry, site }
    }

    /// 只解析模板声明的提供者
    pub fn template_data(&self, template_type: &str, context: &Value) -> Result<serde_json::Map<String, Value>> {
        let requests = self.theme.get_providers(template_type);
        debug!(
            "模板 {} 需要的数据提供者: {:?}",
            template_type,
            requests.iter().map(|r| r.name.as_str()).collect::<Vec<_>>()
        );
        self.registry.providers.get_batch(&requests, context)
    }

    /// 渲染指定类型的模板
    pub fn render(&self, template_type: &str, context: &Value) -> Result<String> {
        let path = self
            .theme
            .get_template(template_type, None)
            .ok_or_else(|| anyhow!(PressliError::not_found("模板", template_type)))?;

        let data = self.template_data(template_type, context)?;
        let (mut tera, name) = self.load_templates(&path, template_type)?;
        tera.register_filter("markdown", markdown::markdown_filter);

        let mut tera_context = TeraContext::new();
        tera_context.insert("data", &data);
        tera_context.insert("context", context);
        tera_context.insert("theme", self.theme.config().settings());
        tera_context.insert("menu_locations", self.theme.config().get_menu_locations());
        tera_context.insert("site", self.site);

        tera.render(&name, &tera_context)
            .with_context(|| format!("渲染模板失败: {}", path.display()))
    }

    /// 加载主题模板目录，使 `extends`/`include` 可用；返回目标模板在 Tera 中的名称
    fn load_templates(&self, path: &Path, template_type: &str) -> Result<(Tera, String)> {
        let templates_dir = self.theme.config().path().join(TEMPLATES_DIR);
        let mut tera = if templates_dir.is_dir() {
            Tera::new(&format!("{}/**/*.{}", templates_dir.display(), TEMPLATE_EXT))?
        } else {
            Tera::default()
        };

        match path.strip_prefix(&templates_dir) {
            Ok(relative) if tera.get_template_names().any(|n| Path::new(n) == relative) => {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                Ok((tera, name))
            }
            _ => {
                tera.add_template_file(path, Some(template_type))?;
                Ok((tera, template_type.to_string()))
            }
        }
    }
}
