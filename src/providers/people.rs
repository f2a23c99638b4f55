use serde_json::{json, Value};
use std::sync::Arc;

use super::{context_author_id, context_post_id, to_value};
use crate::registry::ProviderRegistry;
use crate::store::{ContentStore, PostQuery};

pub(super) fn register(registry: &mut ProviderRegistry, store: &Arc<dyn ContentStore>) {
    // post_comments(context{post.id}) -> [Comment]，已审核，最早的在前
    let s = store.clone();
    registry.register("post_comments", move |ctx, _opts| match context_post_id(ctx) {
        Some(post_id) => to_value(s.approved_comments(post_id)?),
        None => Ok(json!([])),
    });

    // comments_count(context{post.id}) -> 整数
    let s = store.clone();
    registry.register("comments_count", move |ctx, _opts| match context_post_id(ctx) {
        Some(post_id) => Ok(json!(s.count_approved_comments(post_id)?)),
        None => Ok(json!(0)),
    });

    // author_bio(context{post|page}.author_id) -> 作者公开资料或 null
    let s = store.clone();
    registry.register("author_bio", move |ctx, _opts| {
        let Some(author_id) = context_author_id(ctx) else {
            return Ok(Value::Null);
        };
        Ok(s.find_user(author_id)?
            .map(|user| user.public_profile())
            .unwrap_or(Value::Null))
    });

    // author_post_count(context{post|page}.author_id) -> 作者已发布文章数
    let s = store.clone();
    registry.register("author_post_count", move |ctx, _opts| match context_author_id(ctx) {
        Some(author_id) => Ok(json!(s.count_posts(&PostQuery::published("post").author(author_id))?)),
        None => Ok(json!(0)),
    });
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::registry::Options;
    use crate::store::MemoryStore;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new(fixtures::site()));
        register(&mut registry, &store);
        registry
    }

    #[test]
    fn test_comments_oldest_first_and_approved_only() {
        let registry = registry();
        let context = json!({"post": {"id": 1}});
        let comments = registry.get("post_comments", &context, &Options::new()).unwrap();
        let authors: Vec<&str> = comments
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["author_name"].as_str().unwrap())
            .collect();
        assert_eq!(authors, vec!["early", "later"]);
        assert_eq!(registry.get("comments_count", &context, &Options::new()).unwrap(), json!(2));
    }

    #[test]
    fn test_comments_count_without_post_is_zero() {
        let registry = registry();
        assert_eq!(registry.get("comments_count", &json!({}), &Options::new()).unwrap(), json!(0));
    }

    #[test]
    fn test_author_bio_is_public_only() {
        let registry = registry();
        let bio = registry
            .get("author_bio", &json!({"page": {"id": 10, "author_id": 1}}), &Options::new())
            .unwrap();
        assert_eq!(bio["display_name"], "Ada");
        assert!(bio.get("password_hash").is_none());
        assert!(bio.get("email").is_none());

        let missing = registry.get("author_bio", &json!({"post": {"id": 1}}), &Options::new()).unwrap();
        assert!(missing.is_null());
    }

    #[test]
    fn test_author_post_count() {
        let registry = registry();
        let count = registry
            .get("author_post_count", &json!({"post": {"author_id": 1}}), &Options::new())
            .unwrap();
        assert_eq!(count, json!(3));
        let none = registry.get("author_post_count", &json!({}), &Options::new()).unwrap();
        assert_eq!(none, json!(0));
    }
}
