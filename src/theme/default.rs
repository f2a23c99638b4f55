use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use super::{Theme, ThemeConfig};
use crate::registry::BootContext;

/// 内置默认主题，额外提供 `theme_settings`
pub struct DefaultTheme {
    config: ThemeConfig,
}

impl DefaultTheme {
    pub fn new(config: ThemeConfig) -> Self {
        Self { config }
    }
}

impl Theme for DefaultTheme {
    fn config(&self) -> &ThemeConfig {
        &self.config
    }

    fn boot(&self, ctx: &mut BootContext<'_>) -> Result<()> {
        let settings = self.config.settings().clone();
        ctx.registry
            .register_provider("theme_settings", move |_ctx, _opts| Ok(Value::Object(settings.clone())));
        debug!("默认主题已注册 theme_settings");
        Ok(())
    }
}

/// 只有模板与 theme.json 的主题，启动时不注册任何东西
pub struct StaticTheme {
    config: ThemeConfig,
}

impl StaticTheme {
    pub fn new(config: ThemeConfig) -> Self {
        Self { config }
    }
}

impl Theme for StaticTheme {
    fn config(&self) -> &ThemeConfig {
        &self.config
    }

    fn boot(&self, _ctx: &mut BootContext<'_>) -> Result<()> {
        debug!("静态主题 {} 无需注册", self.config.slug());
        Ok(())
    }
}
