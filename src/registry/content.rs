//! 内容类型注册表
//!
//! 记录系统中有哪些内容类型、它们存在哪张表、支持哪些特性以及绑定了哪些数据提供者。
//! 所有访问器都是全函数：未知的类型名返回安全的默认值而不是错误。

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::provider::{Provider, ProviderRegistry};
use crate::error::PressliError;

/// 未指定时内容类型使用的存储表
pub const DEFAULT_TABLE: &str = "posts";

/// 默认特性及其默认值
pub const DEFAULT_FEATURES: [(&str, bool); 9] = [
    ("title", true),
    ("editor", true),
    ("author", true),
    ("thumbnail", false),
    ("excerpt", false),
    ("comments", false),
    ("revisions", false),
    ("categories", false),
    ("tags", false),
];

/// 注册时提交的配置，未填写的字段由默认模板补全
#[derive(Debug, Clone, Default)]
pub struct ContentTypeConfig {
    pub label: Option<String>,
    pub table: Option<String>,
    pub type_value: Option<String>,
    pub model: Option<String>,
    pub controller: Option<String>,
    /// 动作到 URI 模板，例如 `show -> /jobs/{slug}`
    pub routes: BTreeMap<String, String>,
    pub searchable: Option<bool>,
    pub providers: BTreeMap<String, Provider>,
    pub fields: BTreeMap<String, Value>,
    /// 只需给出需要改变的特性，其余沿用默认值
    pub supports: BTreeMap<String, bool>,
}

impl ContentTypeConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn type_value(mut self, value: impl Into<String>) -> Self {
        self.type_value = Some(value.into());
        self
    }

    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    pub fn route(mut self, action: impl Into<String>, uri: impl Into<String>) -> Self {
        self.routes.insert(action.into(), uri.into());
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = Some(searchable);
        self
    }

    pub fn provider(mut self, name: impl Into<String>, provider: Provider) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    pub fn field(mut self, name: impl Into<String>, definition: Value) -> Self {
        self.fields.insert(name.into(), definition);
        self
    }

    pub fn supports(mut self, feature: impl Into<String>, enabled: bool) -> Self {
        self.supports.insert(feature.into(), enabled);
        self
    }
}

/// 已注册内容类型的完整描述
#[derive(Debug, Clone)]
pub struct ContentTypeDescriptor {
    pub name: String,
    pub label: String,
    pub table: String,
    pub type_value: String,
    pub model: String,
    pub controller: Option<String>,
    pub routes: BTreeMap<String, String>,
    pub searchable: bool,
    pub providers: BTreeMap<String, Provider>,
    pub fields: BTreeMap<String, Value>,
    pub supports: BTreeMap<String, bool>,
}

impl ContentTypeDescriptor {
    /// 将配置合并到完整的默认模板上；缺少 `model` 时失败
    fn from_config(name: &str, config: ContentTypeConfig) -> Result<Self> {
        let model = config.model.ok_or_else(|| {
            anyhow!(PressliError::config(format!("内容类型 {} 必须声明 model", name)))
        })?;

        let mut supports: BTreeMap<String, bool> = DEFAULT_FEATURES
            .iter()
            .map(|(feature, enabled)| (feature.to_string(), *enabled))
            .collect();
        supports.extend(config.supports);

        Ok(Self {
            name: name.to_string(),
            label: config.label.unwrap_or_else(|| name.to_string()),
            table: config.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            type_value: config.type_value.unwrap_or_else(|| name.to_string()),
            model,
            controller: config.controller,
            routes: config.routes,
            searchable: config.searchable.unwrap_or(false),
            providers: config.providers,
            fields: config.fields,
            supports,
        })
    }

    /// 路由模板的第一段路径，例如 `/jobs/{slug}` 得到 `jobs`
    fn top_level_segments(&self) -> impl Iterator<Item = &str> {
        self.routes.values().filter_map(|uri| {
            uri.trim_start_matches('/')
                .split('/')
                .next()
                .filter(|segment| !segment.is_empty() && !segment.starts_with('{'))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    types: BTreeMap<String, ContentTypeDescriptor>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册内容类型，同名时整体覆盖
    ///
    /// 配置中的 `providers` 会同时转发到提供者注册表。
    pub fn register(
        &mut self,
        name: &str,
        config: ContentTypeConfig,
        providers: &mut ProviderRegistry,
    ) -> Result<()> {
        let descriptor = ContentTypeDescriptor::from_config(name, config)?;

        for (provider_name, provider) in &descriptor.providers {
            providers.insert(provider_name.clone(), provider.clone());
        }

        if self.types.insert(name.to_string(), descriptor).is_some() {
            info!("内容类型 {} 被重新注册，旧配置已被替换", name);
        } else {
            debug!("注册内容类型: {}", name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ContentTypeDescriptor> {
        self.types.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn all(&self) -> &BTreeMap<String, ContentTypeDescriptor> {
        &self.types
    }

    /// 顶层路径段到控制器的映射，只包含同时声明了路由和控制器的类型
    pub fn get_routes(&self) -> BTreeMap<String, String> {
        let mut routes = BTreeMap::new();
        for descriptor in self.types.values() {
            let Some(controller) = &descriptor.controller else {
                continue;
            };
            for segment in descriptor.top_level_segments() {
                routes.insert(segment.to_string(), controller.clone());
            }
        }
        routes
    }

    pub fn get_providers(&self, name: &str) -> BTreeMap<String, Provider> {
        self.get(name).map(|d| d.providers.clone()).unwrap_or_default()
    }

    pub fn get_model(&self, name: &str) -> Option<&str> {
        self.get(name).map(|d| d.model.as_str())
    }

    pub fn get_controller(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|d| d.controller.as_deref())
    }

    pub fn get_table(&self, name: &str) -> &str {
        self.get(name).map(|d| d.table.as_str()).unwrap_or(DEFAULT_TABLE)
    }

    pub fn get_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).map(|d| d.type_value.as_str()).unwrap_or(name)
    }

    pub fn get_fields(&self, name: &str) -> BTreeMap<String, Value> {
        self.get(name).map(|d| d.fields.clone()).unwrap_or_default()
    }

    pub fn get_features(&self, name: &str) -> BTreeMap<String, bool> {
        self.get(name).map(|d| d.supports.clone()).unwrap_or_default()
    }

    pub fn supports(&self, name: &str, feature: &str) -> bool {
        self.get(name)
            .and_then(|d| d.supports.get(feature).copied())
            .unwrap_or(false)
    }

    pub fn get_searchable(&self) -> Vec<&str> {
        self.types
            .values()
            .filter(|d| d.searchable)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// 共用同一张表的类型名
    pub fn get_by_table(&self, table: &str) -> Vec<&str> {
        self.types
            .values()
            .filter(|d| d.table == table)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// 按存储中的类型区分值反查内容类型名
    pub fn find_by_type_value(&self, table: &str, type_value: &str) -> Option<&str> {
        self.types
            .values()
            .find(|d| d.table == table && d.type_value == type_value)
            .map(|d| d.name.as_str())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.types.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use serde_json::json;

    fn register(registry: &mut ContentRegistry, name: &str, config: ContentTypeConfig) {
        let mut providers = ProviderRegistry::new();
        registry.register(name, config, &mut providers).unwrap();
    }

    #[test]
    fn test_model_only_registration_gets_all_defaults() {
        let mut registry = ContentRegistry::new();
        register(&mut registry, "job", ContentTypeConfig::new("JobModel"));

        let job = registry.get("job").unwrap();
        for (feature, default) in DEFAULT_FEATURES {
            assert_eq!(job.supports.get(feature), Some(&default), "feature {}", feature);
        }
        assert_eq!(job.supports["comments"], false);
        assert_eq!(registry.get_table("job"), "posts");
        assert_eq!(registry.get_type("job"), "job");
        assert!(!job.searchable);
    }

    #[test]
    fn test_missing_model_is_config_error() {
        let mut registry = ContentRegistry::new();
        let mut providers = ProviderRegistry::new();
        let err = registry
            .register("broken", ContentTypeConfig::default(), &mut providers)
            .unwrap_err();
        assert!(classify(&err).map(PressliError::is_config).unwrap_or(false));
        assert!(!registry.has("broken"));
    }

    #[test]
    fn test_reregistration_replaces_whole_descriptor() {
        let mut registry = ContentRegistry::new();
        register(
            &mut registry,
            "event",
            ContentTypeConfig::new("EventModel")
                .table("events")
                .searchable(true)
                .supports("comments", true)
                .field("venue", json!({"type": "text"})),
        );
        register(&mut registry, "event", ContentTypeConfig::new("OtherModel"));

        let event = registry.get("event").unwrap();
        assert_eq!(event.model, "OtherModel");
        assert_eq!(event.table, "posts");
        assert!(!event.searchable);
        assert!(!registry.supports("event", "comments"));
        assert!(registry.get_fields("event").is_empty());
    }

    #[test]
    fn test_providers_forwarded_to_provider_registry() {
        let mut registry = ContentRegistry::new();
        let mut providers = ProviderRegistry::new();
        let config = ContentTypeConfig::new("JobModel")
            .provider("open_jobs", Provider::new(|_, _| Ok(json!(["a"]))));
        registry.register("job", config, &mut providers).unwrap();

        assert!(providers.has("open_jobs"));
        assert!(registry.get_providers("job").contains_key("open_jobs"));
    }

    #[test]
    fn test_unknown_type_accessors_use_safe_defaults() {
        let registry = ContentRegistry::new();
        assert!(registry.get("ghost").is_none());
        assert!(!registry.has("ghost"));
        assert_eq!(registry.get_table("ghost"), "posts");
        assert_eq!(registry.get_type("ghost"), "ghost");
        assert!(registry.get_model("ghost").is_none());
        assert!(registry.get_controller("ghost").is_none());
        assert!(registry.get_fields("ghost").is_empty());
        assert!(registry.get_features("ghost").is_empty());
        assert!(registry.get_providers("ghost").is_empty());
        assert!(!registry.supports("ghost", "title"));
    }

    #[test]
    fn test_get_by_table_includes_implicit_default() {
        let mut registry = ContentRegistry::new();
        register(&mut registry, "post", ContentTypeConfig::new("PostModel"));
        register(&mut registry, "page", ContentTypeConfig::new("PageModel").table("posts"));
        register(&mut registry, "product", ContentTypeConfig::new("ProductModel").table("products"));

        let mut shared = registry.get_by_table("posts");
        shared.sort();
        assert_eq!(shared, vec!["page", "post"]);
        assert_eq!(registry.get_by_table("products"), vec!["product"]);
        assert_eq!(registry.find_by_type_value("posts", "page"), Some("page"));
    }

    #[test]
    fn test_routes_require_controller() {
        let mut registry = ContentRegistry::new();
        register(
            &mut registry,
            "listing",
            ContentTypeConfig::new("ListingModel")
                .controller("ListingController")
                .route("index", "/directory")
                .route("show", "/directory/{slug}"),
        );
        register(
            &mut registry,
            "note",
            ContentTypeConfig::new("NoteModel").route("index", "/notes"),
        );

        let routes = registry.get_routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes["directory"], "ListingController");
    }

    #[test]
    fn test_searchable_and_removal() {
        let mut registry = ContentRegistry::new();
        register(&mut registry, "post", ContentTypeConfig::new("PostModel").searchable(true));
        register(&mut registry, "page", ContentTypeConfig::new("PageModel"));
        assert_eq!(registry.get_searchable(), vec!["post"]);

        assert!(registry.unregister("post"));
        assert!(registry.get_searchable().is_empty());
        registry.clear();
        assert!(registry.all().is_empty());
    }
}
