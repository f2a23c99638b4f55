//! 内置数据提供者
//!
//! 启动时一次性注册到 [`ProviderRegistry`]。注册表不约束返回值结构，
//! 每个提供者的输出形状在各自的函数文档中说明。

mod menus;
mod people;
mod posts;
mod taxonomy;

pub use menus::nest_one_level;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::registry::{Options, ProviderRegistry};
use crate::store::ContentStore;

/// 所有内置提供者的名称
pub const CORE_PROVIDERS: [&str; 15] = [
    "related_posts",
    "recent_posts",
    "popular_posts",
    "featured_posts",
    "post_comments",
    "comments_count",
    "site_taxonomies",
    "categories",
    "categories_with_count",
    "post_categories",
    "author_bio",
    "author_post_count",
    "site_menus",
    "primary_menu",
    "page_hierarchy",
];

/// 注册全部内置提供者
pub fn register_core_providers(registry: &mut ProviderRegistry, store: Arc<dyn ContentStore>) {
    posts::register(registry, &store);
    people::register(registry, &store);
    taxonomy::register(registry, &store);
    menus::register(registry, &store);
    info!("已注册 {} 个内置数据提供者", CORE_PROVIDERS.len());
}

/// 上下文中当前文章的 id
pub fn context_post_id(context: &Value) -> Option<u64> {
    context.get("post")?.get("id")?.as_u64()
}

pub fn context_page_id(context: &Value) -> Option<u64> {
    context.get("page")?.get("id")?.as_u64()
}

/// 当前文章或页面的作者 id
pub fn context_author_id(context: &Value) -> Option<u64> {
    ["post", "page"]
        .iter()
        .find_map(|key| context.get(*key)?.get("author_id")?.as_u64())
}

fn option_usize(options: &Options, key: &str, default: usize) -> usize {
    options
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(default)
}

fn option_str<'a>(options: &'a Options, key: &str, default: &'a str) -> &'a str {
    options.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::models::types::{
        Comment, CommentStatus, Menu, MenuItem, PostMeta, PostStatus, PostTaxonomy, Taxonomy, TaxonomyKind, User,
    };
    use crate::models::Post;
    use crate::store::MemoryData;

    pub fn post(id: u64, post_type: &str, day: u32) -> Post {
        Post {
            id,
            title: format!("Post {}", id),
            slug: format!("post-{}", id),
            post_type: post_type.to_string(),
            status: PostStatus::Published,
            author_id: Some(1),
            parent_id: None,
            excerpt: None,
            content: String::new(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()),
            view_count: 0,
            menu_order: 0,
            deleted_at: None,
        }
    }

    fn taxonomy(id: u64, name: &str, kind: TaxonomyKind) -> Taxonomy {
        Taxonomy {
            id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            kind,
            description: None,
            parent_id: None,
            deleted_at: None,
        }
    }

    pub fn menu_item(id: u64, menu_id: u64, parent_id: Option<u64>, title: &str) -> MenuItem {
        MenuItem {
            id,
            menu_id,
            parent_id,
            title: title.to_string(),
            url: format!("/{}", title.to_lowercase()),
            sort_order: id as i64,
            active: true,
        }
    }

    /// 一个小型站点：3 篇文章、1 个页面、分类标签、评论、菜单
    pub fn site() -> MemoryData {
        let mut draft = post(4, "post", 20);
        draft.status = PostStatus::Draft;
        let mut popular = post(2, "post", 2);
        popular.view_count = 500;
        let mut about = post(10, "page", 1);
        about.slug = "about".to_string();
        let mut team = post(11, "page", 1);
        team.parent_id = Some(10);
        let mut deleted_tag = taxonomy(4, "Old", TaxonomyKind::Tag);
        deleted_tag.deleted_at = Some(Utc::now());

        MemoryData {
            posts: vec![post(1, "post", 1), popular, post(3, "post", 3), draft, about, team],
            taxonomies: vec![
                taxonomy(1, "Rust", TaxonomyKind::Category),
                taxonomy(2, "News", TaxonomyKind::Category),
                taxonomy(3, "async", TaxonomyKind::Tag),
                deleted_tag,
            ],
            post_taxonomies: vec![
                PostTaxonomy { post_id: 1, taxonomy_id: 1 },
                PostTaxonomy { post_id: 2, taxonomy_id: 1 },
                PostTaxonomy { post_id: 3, taxonomy_id: 2 },
                PostTaxonomy { post_id: 4, taxonomy_id: 1 },
                PostTaxonomy { post_id: 1, taxonomy_id: 3 },
            ],
            comments: vec![
                Comment {
                    id: 1,
                    post_id: 1,
                    author_name: "later".to_string(),
                    content: "second".to_string(),
                    status: CommentStatus::Approved,
                    created_at: Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
                },
                Comment {
                    id: 2,
                    post_id: 1,
                    author_name: "early".to_string(),
                    content: "first".to_string(),
                    status: CommentStatus::Approved,
                    created_at: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
                },
                Comment {
                    id: 3,
                    post_id: 1,
                    author_name: "spammer".to_string(),
                    content: "buy".to_string(),
                    status: CommentStatus::Spam,
                    created_at: Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap(),
                },
            ],
            users: vec![User {
                id: 1,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "secret-hash".to_string(),
                display_name: Some("Ada".to_string()),
                bio: Some("Writes about Rust".to_string()),
                avatar: None,
                website: None,
            }],
            menus: vec![
                Menu {
                    id: 1,
                    name: "Main".to_string(),
                    location: Some("primary".to_string()),
                    active: true,
                    deleted_at: None,
                },
                Menu {
                    id: 2,
                    name: "Footer".to_string(),
                    location: Some("footer".to_string()),
                    active: true,
                    deleted_at: None,
                },
                Menu {
                    id: 3,
                    name: "Retired".to_string(),
                    location: Some("sidebar".to_string()),
                    active: false,
                    deleted_at: None,
                },
            ],
            menu_items: vec![
                menu_item(1, 1, None, "Home"),
                menu_item(2, 1, Some(1), "Blog"),
                menu_item(3, 1, Some(2), "Archive"),
                menu_item(4, 2, None, "Contact"),
                menu_item(5, 3, None, "Hidden"),
            ],
            post_meta: vec![PostMeta {
                post_id: 3,
                key: "featured".to_string(),
                value: "1".to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_all_core_providers_registered() {
        let mut registry = ProviderRegistry::new();
        register_core_providers(&mut registry, Arc::new(MemoryStore::new(fixtures::site())));
        for name in CORE_PROVIDERS {
            assert!(registry.has(name), "missing provider {}", name);
        }
        assert_eq!(registry.len(), CORE_PROVIDERS.len());
    }

    #[test]
    fn test_context_helpers() {
        let context = json!({"page": {"id": 10, "author_id": 3}});
        assert_eq!(context_post_id(&context), None);
        assert_eq!(context_page_id(&context), Some(10));
        assert_eq!(context_author_id(&context), Some(3));
        assert_eq!(context_author_id(&json!([])), None);
    }
}
