use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 文章状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// 文章、页面以及插件定义的内容类型共用这一张表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub slug: String,
    /// 类型区分值，对应内容类型描述的 `type_value`
    #[serde(rename = "type", default = "default_post_type")]
    pub post_type: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub author_id: Option<u64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub menu_order: i64,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn default_post_type() -> String {
    "post".to_string()
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Category,
    Tag,
}

/// 分类与标签
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: TaxonomyKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// 文章与分类/标签的关联
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTaxonomy {
    pub post_id: u64,
    pub taxonomy_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    Pending,
    Approved,
    Spam,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
}

/// 用户，包含不可对外暴露的凭据字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl User {
    /// 作者的公开资料，不含邮箱与密码哈希
    pub fn public_profile(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "display_name": self.display_name.clone().unwrap_or_else(|| self.username.clone()),
            "bio": self.bio,
            "avatar": self.avatar,
            "website": self.website,
        })
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u64,
    pub menu_id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMeta {
    pub post_id: u64,
    pub key: String,
    pub value: String,
}

/// 插件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    Active,
    Inactive,
}

/// 插件的持久化记录，跨请求保存启用状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub status: PluginStatus,
    /// plugin.json 快照
    #[serde(default)]
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PluginRecord {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, version: impl Into<String>, config: Value) -> Self {
        let now = Utc::now();
        Self {
            slug: slug.into(),
            name: name.into(),
            version: version.into(),
            status: PluginStatus::Inactive,
            config,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PluginStatus::Active
    }
}
