//! 数据提供者注册表
//!
//! 模板只声明自己需要的提供者名称，控制器通过 [`ProviderRegistry::get_batch`]
//! 按需调用，未被点名的提供者永远不会执行。

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PressliError;

/// 提供者调用参数
pub type Options = Map<String, Value>;

type ProviderFn = dyn Fn(&Value, &Options) -> Result<Value> + Send + Sync;

/// 可调用的数据提供者，接收 `(context, options)`，返回任意结构的数据
#[derive(Clone)]
pub struct Provider(Arc<ProviderFn>);

impl Provider {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Value, &Options) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub fn call(&self, context: &Value, options: &Options) -> Result<Value> {
        (self.0)(context, options)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Provider(<fn>)")
    }
}

/// 批量解析中的一项：名称加可选参数
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderRequest {
    pub name: String,
    pub options: Options,
}

impl ProviderRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Options::new(),
        }
    }

    pub fn with_options(name: impl Into<String>, options: Options) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl From<&str> for ProviderRequest {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProviderRequest {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// 名称到提供者的映射，后注册者覆盖先注册者
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册提供者闭包
    pub fn register<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(&Value, &Options) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(name, Provider::new(callback));
    }

    /// 注册已包装好的提供者
    pub fn insert(&mut self, name: impl Into<String>, provider: Provider) {
        let name = name.into();
        if self.providers.insert(name.clone(), provider).is_some() {
            warn!("数据提供者 {} 已存在，新的注册将覆盖旧的", name);
        } else {
            debug!("注册数据提供者: {}", name);
        }
    }

    /// 调用单个提供者，未注册时返回 `NotFound`
    pub fn get(&self, name: &str, context: &Value, options: &Options) -> Result<Value> {
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| anyhow!(PressliError::not_found("数据提供者", name)))?;
        provider.call(context, options)
    }

    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn all(&self) -> &BTreeMap<String, Provider> {
        &self.providers
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// 依次调用所有已注册的请求项，静默跳过未注册的名称
    ///
    /// 提供者自身返回的错误会向上传播。
    pub fn get_batch(&self, requests: &[ProviderRequest], context: &Value) -> Result<Map<String, Value>> {
        let mut data = Map::new();
        for request in requests {
            match self.providers.get(&request.name) {
                Some(provider) => {
                    let value = provider.call(context, &request.options)?;
                    data.insert(request.name.clone(), value);
                }
                None => debug!("跳过未注册的数据提供者: {}", request.name),
            }
        }
        Ok(data)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.providers.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options(value: Value) -> Options {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_get_passes_options_through() {
        let mut registry = ProviderRegistry::new();
        registry.register("double", |_ctx, opts| {
            let n = opts.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(n * 2))
        });

        let result = registry.get("double", &json!([]), &options(json!({"n": 21}))).unwrap();
        assert_eq!(result, json!(42));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry = ProviderRegistry::new();
        let err = registry.get("missing", &Value::Null, &Options::new()).unwrap_err();
        assert!(classify(&err).map(PressliError::is_not_found).unwrap_or(false));
    }

    #[test]
    fn test_batch_skips_missing_names() {
        let mut registry = ProviderRegistry::new();
        registry.register("exists", |_, _| Ok(json!("here")));

        let data = registry
            .get_batch(&[ProviderRequest::new("exists"), ProviderRequest::new("missing")], &Value::Null)
            .unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["exists"], json!("here"));
        assert!(!data.contains_key("missing"));
    }

    #[test]
    fn test_batch_only_invokes_requested_providers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let idle_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ProviderRegistry::new();

        let counter = calls.clone();
        registry.register("wanted", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });
        let counter = idle_calls.clone();
        registry.register("idle", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });

        registry.get_batch(&[ProviderRequest::new("wanted")], &Value::Null).unwrap();
        registry.get("wanted", &Value::Null, &Options::new()).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(idle_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_batch_options_per_request() {
        let mut registry = ProviderRegistry::new();
        registry.register("limit", |_, opts| Ok(opts.get("limit").cloned().unwrap_or(json!(5))));

        let requests = vec![
            ProviderRequest::with_options("limit", options(json!({"limit": 2}))),
        ];
        let data = registry.get_batch(&requests, &Value::Null).unwrap();
        assert_eq!(data["limit"], json!(2));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ProviderRegistry::new();
        registry.register("name", |_, _| Ok(json!("first")));
        registry.register("name", |_, _| Ok(json!("second")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("name", &Value::Null, &Options::new()).unwrap(), json!("second"));
    }

    #[test]
    fn test_unregister_and_clear() {
        let mut registry = ProviderRegistry::new();
        registry.register("a", |_, _| Ok(Value::Null));
        registry.register("b", |_, _| Ok(Value::Null));
        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(registry.has("b"));
        registry.clear();
        assert!(registry.is_empty());
    }
}
