use anyhow::Result;
use serde_json::json;
use tracing::info;

use super::{Plugin, PluginInfo};
use crate::providers::context_post_id;
use crate::registry::{BootContext, ContentTypeConfig, Provider};
use crate::store::PostQuery;

/// 内置的目录列表插件，提供 `listing` 内容类型
pub struct DirectoryListingPlugin {
    info: PluginInfo,
}

impl DirectoryListingPlugin {
    pub const CONTENT_TYPE: &'static str = "listing";

    pub fn new(info: PluginInfo) -> Self {
        Self { info }
    }
}

impl Plugin for DirectoryListingPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn boot(&self, ctx: &mut BootContext<'_>) -> Result<()> {
        let store = ctx.store.clone();
        let featured = Provider::new(move |context, options| {
            let limit = options.get("limit").and_then(|v| v.as_u64()).unwrap_or(6) as usize;
            let query = PostQuery::published(Self::CONTENT_TYPE)
                .exclude(context_post_id(context))
                .limit(limit);
            Ok(serde_json::to_value(store.find_posts(&query)?)?)
        });

        let config = ContentTypeConfig::new("ListingModel")
            .label("Listings")
            .controller("ListingController")
            .route("index", "/directory")
            .route("show", "/directory/{slug}")
            .searchable(true)
            .supports("thumbnail", true)
            .supports("categories", true)
            .field("address", json!({"type": "text", "required": true}))
            .field("phone", json!({"type": "text"}))
            .provider("featured_listings", featured);

        ctx.registry.register_content_type(Self::CONTENT_TYPE, config)?;
        info!("目录列表插件已注册内容类型 {}", Self::CONTENT_TYPE);
        Ok(())
    }

    fn activate(&self) -> Result<()> {
        info!("目录列表插件: 检查 listing 所需的数据结构");
        Ok(())
    }

    fn deactivate(&self) -> Result<()> {
        info!("目录列表插件已停用，数据保留");
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        info!("目录列表插件: 清除 listing 数据");
        Ok(())
    }
}
