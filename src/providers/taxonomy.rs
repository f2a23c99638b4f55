use serde_json::{json, Value};
use std::sync::Arc;

use super::{context_post_id, to_value};
use crate::models::types::{Taxonomy, TaxonomyKind};
use crate::registry::ProviderRegistry;
use crate::store::ContentStore;

pub(super) fn register(registry: &mut ProviderRegistry, store: &Arc<dyn ContentStore>) {
    // site_taxonomies() -> {categories: [Taxonomy], tags: [Taxonomy]}
    // 一次查询取回所有分类和标签，在内存中按类型拆分
    let s = store.clone();
    registry.register("site_taxonomies", move |_ctx, _opts| {
        let (categories, tags): (Vec<Taxonomy>, Vec<Taxonomy>) = s
            .taxonomies()?
            .into_iter()
            .partition(|t| t.kind == TaxonomyKind::Category);
        Ok(json!({
            "categories": to_value(categories)?,
            "tags": to_value(tags)?,
        }))
    });

    // categories() -> [Taxonomy]，按名称排序
    let s = store.clone();
    registry.register("categories", move |_ctx, _opts| {
        let mut categories: Vec<Taxonomy> = s
            .taxonomies()?
            .into_iter()
            .filter(|t| t.kind == TaxonomyKind::Category)
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        to_value(categories)
    });

    // categories_with_count() -> [Taxonomy + post_count]
    let s = store.clone();
    registry.register("categories_with_count", move |_ctx, _opts| {
        let rows = s
            .taxonomy_post_counts(TaxonomyKind::Category)?
            .into_iter()
            .map(|(category, count)| -> anyhow::Result<Value> {
                let mut row = to_value(category)?;
                if let Value::Object(map) = &mut row {
                    map.insert("post_count".to_string(), json!(count));
                }
                Ok(row)
            })
            .collect::<anyhow::Result<Vec<Value>>>()?;
        Ok(Value::Array(rows))
    });

    // post_categories(context{post.id}) -> [Taxonomy]
    let s = store.clone();
    registry.register("post_categories", move |ctx, _opts| match context_post_id(ctx) {
        Some(post_id) => to_value(s.taxonomies_for_post(post_id, Some(TaxonomyKind::Category))?),
        None => Ok(json!([])),
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

    fn names(value: &Value) -> Vec<&str> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_site_taxonomies_partitioned() {
        let data = registry().get("site_taxonomies", &json!({}), &Options::new()).unwrap();
        assert_eq!(names(&data["categories"]), vec!["Rust", "News"]);
        // 已软删除的标签不会出现
        assert_eq!(names(&data["tags"]), vec!["async"]);
    }

    #[test]
    fn test_categories_with_count_counts_published_only() {
        let data = registry()
            .get("categories_with_count", &json!({}), &Options::new())
            .unwrap();
        let rows = data.as_array().unwrap();
        assert_eq!(rows[0]["name"], "News");
        assert_eq!(rows[0]["post_count"], 1);
        assert_eq!(rows[1]["name"], "Rust");
        assert_eq!(rows[1]["post_count"], 2);
    }

    #[test]
    fn test_post_categories() {
        let registry = registry();
        let data = registry
            .get("post_categories", &json!({"post": {"id": 1}}), &Options::new())
            .unwrap();
        assert_eq!(names(&data), vec!["Rust"]);
        assert_eq!(names(&registry.get("categories", &json!({}), &Options::new()).unwrap()), vec!["News", "Rust"]);
    }
}
