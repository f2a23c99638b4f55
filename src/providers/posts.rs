use serde_json::{json, Value};
use std::sync::Arc;

use super::{context_post_id, option_usize, to_value};
use crate::models::types::TaxonomyKind;
use crate::registry::ProviderRegistry;
use crate::store::{ContentStore, PostOrder, PostQuery};

pub(super) fn register(registry: &mut ProviderRegistry, store: &Arc<dyn ContentStore>) {
    // related_posts(context{post.id}, {limit=5}) -> [Post]
    // 与当前文章共享任一分类的已发布文章，不含自身
    let s = store.clone();
    registry.register("related_posts", move |ctx, opts| {
        let Some(post_id) = context_post_id(ctx) else {
            return Ok(json!([]));
        };
        let categories: Vec<u64> = s
            .taxonomies_for_post(post_id, Some(TaxonomyKind::Category))?
            .iter()
            .map(|t| t.id)
            .collect();
        if categories.is_empty() {
            return Ok(json!([]));
        }

        let ids = s.post_ids_in_taxonomies(&categories)?;
        let query = PostQuery::published("post")
            .ids(ids)
            .exclude(Some(post_id))
            .limit(option_usize(opts, "limit", 5));
        to_value(s.find_posts(&query)?)
    });

    // recent_posts(context?, {limit=5}) -> [Post]，按发布时间倒序
    let s = store.clone();
    registry.register("recent_posts", move |ctx, opts| {
        let query = PostQuery::published("post")
            .exclude(context_post_id(ctx))
            .limit(option_usize(opts, "limit", 5));
        to_value(s.find_posts(&query)?)
    });

    // popular_posts(context?, {limit=5}) -> [Post]，按浏览量倒序
    let s = store.clone();
    registry.register("popular_posts", move |ctx, opts| {
        let query = PostQuery::published("post")
            .exclude(context_post_id(ctx))
            .order(PostOrder::ViewsDesc)
            .limit(option_usize(opts, "limit", 5));
        to_value(s.find_posts(&query)?)
    });

    // featured_posts({limit=3}) -> [Post]，带 featured=1 元数据的文章
    let s = store.clone();
    registry.register("featured_posts", move |_ctx, opts| {
        let ids = s.post_ids_with_meta("featured", "1")?;
        if ids.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        let query = PostQuery::published("post")
            .ids(ids)
            .limit(option_usize(opts, "limit", 3));
        to_value(s.find_posts(&query)?)
    });
}
