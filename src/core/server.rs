use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::site::Site;
use crate::store::PostQuery;

/// 本地预览服务器，每个请求都重新启动一次注册表
pub struct Server {
    site: Arc<Site>,
    port: u16,
}

enum Outcome {
    Page(String),
    Delegated(String),
    Missing,
}

impl Server {
    pub fn new(site: Site, port: u16) -> Self {
        Self {
            site: Arc::new(site),
            port,
        }
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let root = self.site.config().root_path();
        let app = routes(self.site.config().mount_path())
            .layer(TraceLayer::new_for_http())
            .with_state(self.site);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse()?;
        info!("Server started at http://localhost:{}{}", self.port, root);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// 站点根路径不是 `/` 时，所有路由挂载到该前缀下
fn routes(mount: Option<String>) -> Router<Arc<Site>> {
    let routes = Router::new()
        .route("/", get(home))
        .route("/:segment/:slug", get(content));
    match mount {
        Some(prefix) => Router::new().nest(&prefix, routes),
        None => routes,
    }
}

async fn home(State(site): State<Arc<Site>>) -> Response {
    respond(site, None).await
}

async fn content(State(site): State<Arc<Site>>, Path((segment, slug)): Path<(String, String)>) -> Response {
    respond(site, Some((segment, slug))).await
}

async fn respond(site: Arc<Site>, target: Option<(String, String)>) -> Response {
    match tokio::task::spawn_blocking(move || resolve(&site, target)).await {
        Ok(Ok(Outcome::Page(html))) => Html(html).into_response(),
        Ok(Ok(Outcome::Delegated(note))) => note.into_response(),
        Ok(Ok(Outcome::Missing)) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Ok(Err(e)) => {
            error!("渲染失败: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!("渲染任务异常: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// 插件路由交给插件控制器；其余按内容类型查找已发布的条目并渲染同名模板
fn resolve(site: &Site, target: Option<(String, String)>) -> Result<Outcome> {
    let scope = site.bootstrap()?;
    let Some((segment, slug)) = target else {
        return Ok(Outcome::Page(scope.render("home", &json!({}))?));
    };

    if let Some(controller) = scope.registry.content.get_routes().get(&segment) {
        let path = site.config().url_for(&format!("{}/{}", segment, slug));
        return Ok(Outcome::Delegated(format!("{} 由控制器 {} 处理", path, controller)));
    }

    let Some(descriptor) = scope.registry.content.get(&segment) else {
        return Ok(Outcome::Missing);
    };
    let query = PostQuery::published(descriptor.type_value.clone()).slug(slug).limit(1);
    let Some(item) = site.store().find_posts(&query)?.into_iter().next() else {
        return Ok(Outcome::Missing);
    };

    let key = if descriptor.type_value == "page" { "page" } else { "post" };
    let context = json!({ key: item });
    Ok(Outcome::Page(scope.render(&segment, &context)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Config, PluginRecord, PluginStatus};
    use crate::store::{MemoryRecordStore, MemoryStore, PluginRecordStore};
    use std::fs;
    use std::path::Path;

    fn site_under(base: &Path, root: &str) -> Site {
        let theme = base.join("themes").join("default");
        fs::create_dir_all(theme.join("templates")).unwrap();
        fs::write(theme.join("theme.json"), r#"{"name": "Default"}"#).unwrap();
        fs::write(theme.join("templates").join("home.html"), "home at {{ site.root | safe }}").unwrap();

        let plugin = base.join("plugins").join("directory-listing");
        fs::create_dir_all(&plugin).unwrap();
        fs::write(plugin.join("plugin.json"), r#"{"name": "Directory Listing"}"#).unwrap();

        let records = Arc::new(MemoryRecordStore::new());
        let mut record = PluginRecord::new("directory-listing", "Directory Listing", "1.0.0", json!({}));
        record.status = PluginStatus::Active;
        records.save(record).unwrap();

        let config = Config {
            root: root.to_string(),
            ..Config::default()
        };
        Site::with_collaborators(base, config, Arc::new(MemoryStore::default()), records)
    }

    #[test]
    fn test_plugin_route_is_delegated_under_site_root() {
        let dir = tempfile::tempdir().unwrap();
        let site = site_under(dir.path(), "/blog/");

        match resolve(&site, Some(("directory".to_string(), "acme".to_string()))).unwrap() {
            Outcome::Delegated(note) => assert_eq!(note, "/blog/directory/acme 由控制器 ListingController 处理"),
            _ => panic!("expected a delegated route"),
        }
        match resolve(&site, None).unwrap() {
            Outcome::Page(html) => assert_eq!(html, "home at /blog/"),
            _ => panic!("expected the home page"),
        }
        assert!(matches!(
            resolve(&site, Some(("post".to_string(), "missing".to_string()))).unwrap(),
            Outcome::Missing
        ));
        assert!(matches!(
            resolve(&site, Some(("unknown".to_string(), "x".to_string()))).unwrap(),
            Outcome::Missing
        ));
    }
}
