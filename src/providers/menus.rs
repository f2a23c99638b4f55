use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{context_page_id, option_str, to_value};
use crate::models::types::MenuItem;
use crate::registry::ProviderRegistry;
use crate::store::{ContentStore, PostOrder, PostQuery};

/// 构建一层父子树
///
/// 子节点的父节点必须是同组中的顶层节点；指向非顶层节点或不存在节点的条目被丢弃，
/// 因此第三层及更深的条目不会出现在树中。
pub fn nest_one_level<T, I, P>(items: Vec<T>, id: I, parent: P) -> Vec<(T, Vec<T>)>
where
    I: Fn(&T) -> u64,
    P: Fn(&T) -> Option<u64>,
{
    let (top, nested): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| parent(item).is_none());
    let mut tree: Vec<(T, Vec<T>)> = top.into_iter().map(|item| (item, Vec::new())).collect();

    for item in nested {
        let parent_id = parent(&item);
        match tree.iter_mut().find(|(top, _)| Some(id(top)) == parent_id) {
            Some((_, children)) => children.push(item),
            None => debug!("丢弃父节点 {:?} 不在顶层的条目 {}", parent_id, id(&item)),
        }
    }
    tree
}

/// 把树转换为带 `children` 字段的 JSON 数组
fn tree_to_value<T: Serialize>(tree: Vec<(T, Vec<T>)>) -> Result<Value> {
    let mut nodes = Vec::with_capacity(tree.len());
    for (item, children) in tree {
        let mut node = to_value(item)?;
        if let Value::Object(map) = &mut node {
            map.insert("children".to_string(), to_value(children)?);
        }
        nodes.push(node);
    }
    Ok(Value::Array(nodes))
}

fn menu_tree(items: Vec<MenuItem>) -> Result<Value> {
    tree_to_value(nest_one_level(items, |i| i.id, |i| i.parent_id))
}

pub(super) fn register(registry: &mut ProviderRegistry, store: &Arc<dyn ContentStore>) {
    // site_menus() -> {location: {id, name, location, items: [MenuItem + children]}}
    // 菜单与菜单项各查询一次，再在内存中分组
    let s = store.clone();
    registry.register("site_menus", move |_ctx, _opts| {
        let menus = s.active_menus()?;
        if menus.is_empty() {
            return Ok(json!({}));
        }
        let menu_ids: Vec<u64> = menus.iter().map(|m| m.id).collect();

        let mut grouped: BTreeMap<u64, Vec<MenuItem>> = BTreeMap::new();
        for item in s.active_menu_items(&menu_ids)? {
            grouped.entry(item.menu_id).or_default().push(item);
        }

        let mut by_location = Map::new();
        for menu in menus {
            let Some(location) = menu.location.clone() else {
                continue;
            };
            let items = grouped.remove(&menu.id).unwrap_or_default();
            by_location.insert(
                location.clone(),
                json!({
                    "id": menu.id,
                    "name": menu.name,
                    "location": location,
                    "items": menu_tree(items)?,
                }),
            );
        }
        Ok(Value::Object(by_location))
    });

    // primary_menu({location='primary'}) -> {id, name, location, items} 或 null
    let s = store.clone();
    registry.register("primary_menu", move |_ctx, opts| {
        let location = option_str(opts, "location", "primary");
        let Some(menu) = s
            .active_menus()?
            .into_iter()
            .find(|m| m.location.as_deref() == Some(location))
        else {
            return Ok(Value::Null);
        };
        let items = s.active_menu_items(&[menu.id])?;
        Ok(json!({
            "id": menu.id,
            "name": menu.name,
            "location": location,
            "items": menu_tree(items)?,
        }))
    });

    // page_hierarchy(context?) -> [Page + current + children]
    let s = store.clone();
    registry.register("page_hierarchy", move |ctx, _opts| {
        let current = context_page_id(ctx);
        let pages = s.find_posts(&PostQuery::published("page").order(PostOrder::MenuOrder))?;
        let tree = nest_one_level(pages, |p| p.id, |p| p.parent_id);

        let mut value = tree_to_value(tree)?;
        mark_current(&mut value, current);
        Ok(value)
    });
}

/// 标记当前页面；子页面为当前页时父页面同样标记
fn mark_current(nodes: &mut Value, current: Option<u64>) {
    let Value::Array(nodes) = nodes else {
        return;
    };
    for node in nodes {
        let Value::Object(map) = node else {
            continue;
        };
        let mut is_current = current.is_some() && map.get("id").and_then(Value::as_u64) == current;
        if let Some(children) = map.get_mut("children") {
            mark_current(children, current);
            is_current |= children
                .as_array()
                .map_or(false, |c| c.iter().any(|child| child["current"] == json!(true)));
        }
        map.insert("current".to_string(), json!(is_current));
    }
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
    fn test_nesting_stops_at_one_level() {
        let a = fixtures::menu_item(1, 1, None, "A");
        let b = fixtures::menu_item(2, 1, Some(1), "B");
        let c = fixtures::menu_item(3, 1, Some(2), "C");

        let tree = nest_one_level(vec![a, b, c], |i| i.id, |i| i.parent_id);
        assert_eq!(tree.len(), 1);
        let (top, children) = &tree[0];
        assert_eq!(top.title, "A");
        assert_eq!(children.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(), vec!["B"]);
        // C 既不在 B 之下，也不会作为顶层条目出现
        assert!(tree.iter().all(|(top, children)| top.title != "C" && children.iter().all(|i| i.title != "C")));
    }

    #[test]
    fn test_site_menus_keyed_by_location() {
        let menus = registry().get("site_menus", &json!({}), &Options::new()).unwrap();
        let menus = menus.as_object().unwrap();
        assert_eq!(menus.len(), 2);
        assert!(!menus.contains_key("sidebar"));

        let primary = &menus["primary"]["items"];
        assert_eq!(primary.as_array().unwrap().len(), 1);
        assert_eq!(primary[0]["title"], "Home");
        assert_eq!(primary[0]["children"][0]["title"], "Blog");
        assert_eq!(primary[0]["children"][0].get("children"), None);
        assert_eq!(menus["footer"]["items"][0]["title"], "Contact");
    }

    #[test]
    fn test_primary_menu_location_option() {
        let registry = registry();
        let primary = registry.get("primary_menu", &json!({}), &Options::new()).unwrap();
        assert_eq!(primary["name"], "Main");

        let mut options = Options::new();
        options.insert("location".to_string(), json!("footer"));
        let footer = registry.get("primary_menu", &json!({}), &options).unwrap();
        assert_eq!(footer["name"], "Footer");

        options.insert("location".to_string(), json!("nowhere"));
        assert!(registry.get("primary_menu", &json!({}), &options).unwrap().is_null());
    }

    #[test]
    fn test_page_hierarchy_marks_current_branch() {
        let registry = registry();
        let pages = registry
            .get("page_hierarchy", &json!({"page": {"id": 11}}), &Options::new())
            .unwrap();
        assert_eq!(pages[0]["slug"], "about");
        assert_eq!(pages[0]["current"], true);
        assert_eq!(pages[0]["children"][0]["id"], 11);
        assert_eq!(pages[0]["children"][0]["current"], true);

        let plain = registry.get("page_hierarchy", &json!({}), &Options::new()).unwrap();
        assert_eq!(plain[0]["current"], false);
    }
}
