//! 持久化协作者接口
//!
//! 核心只依赖这里的两个 trait：内容查询（供数据提供者使用）与插件状态记录。

pub mod file;
pub mod memory;

pub use file::YamlRecordStore;
pub use memory::{MemoryData, MemoryRecordStore, MemoryStore};

use anyhow::Result;

use crate::models::types::{Comment, Menu, MenuItem, PluginRecord, PostStatus, Taxonomy, TaxonomyKind, User};
use crate::models::Post;

/// 文章排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    #[default]
    PublishedDesc,
    ViewsDesc,
    /// 按 menu_order 升序，再按标题
    MenuOrder,
}

/// 文章过滤条件，默认排除软删除的记录
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub post_type: Option<String>,
    pub status: Option<PostStatus>,
    pub slug: Option<String>,
    pub ids: Option<Vec<u64>>,
    pub exclude: Vec<u64>,
    pub author_id: Option<u64>,
    pub order: PostOrder,
    pub limit: Option<usize>,
    pub include_deleted: bool,
}

impl PostQuery {
    /// 指定类型的已发布文章
    pub fn published(post_type: impl Into<String>) -> Self {
        Self {
            post_type: Some(post_type.into()),
            status: Some(PostStatus::Published),
            ..Self::default()
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn ids(mut self, ids: Vec<u64>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn exclude(mut self, id: Option<u64>) -> Self {
        self.exclude.extend(id);
        self
    }

    pub fn author(mut self, author_id: u64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn order(mut self, order: PostOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 不考虑排序与数量限制时，文章是否满足条件
    pub fn matches(&self, post: &Post) -> bool {
        (self.include_deleted || !post.is_deleted())
            && self.post_type.as_deref().map_or(true, |t| post.post_type == t)
            && self.status.map_or(true, |s| post.status == s)
            && self.slug.as_deref().map_or(true, |s| post.slug == s)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&post.id))
            && !self.exclude.contains(&post.id)
            && self.author_id.map_or(true, |a| post.author_id == Some(a))
    }
}

/// 内容数据访问能力
pub trait ContentStore: Send + Sync {
    fn find_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;

    fn count_posts(&self, query: &PostQuery) -> Result<u64>;

    /// 所有未删除的分类与标签
    fn taxonomies(&self) -> Result<Vec<Taxonomy>>;

    fn taxonomies_for_post(&self, post_id: u64, kind: Option<TaxonomyKind>) -> Result<Vec<Taxonomy>>;

    fn post_ids_in_taxonomies(&self, taxonomy_ids: &[u64]) -> Result<Vec<u64>>;

    /// 聚合查询：每个分类下已发布文章的数量
    fn taxonomy_post_counts(&self, kind: TaxonomyKind) -> Result<Vec<(Taxonomy, u64)>>;

    /// 已审核的评论，按时间正序
    fn approved_comments(&self, post_id: u64) -> Result<Vec<Comment>>;

    fn count_approved_comments(&self, post_id: u64) -> Result<u64>;

    fn find_user(&self, id: u64) -> Result<Option<User>>;

    fn post_ids_with_meta(&self, key: &str, value: &str) -> Result<Vec<u64>>;

    fn active_menus(&self) -> Result<Vec<Menu>>;

    /// 指定菜单下所有启用的菜单项，按 sort_order 排序
    fn active_menu_items(&self, menu_ids: &[u64]) -> Result<Vec<MenuItem>>;
}

/// 插件状态记录的持久化能力，写入时自动维护时间戳
pub trait PluginRecordStore: Send + Sync {
    fn find(&self, slug: &str) -> Result<Option<PluginRecord>>;

    fn all(&self) -> Result<Vec<PluginRecord>>;

    fn save(&self, record: PluginRecord) -> Result<()>;

    fn remove(&self, slug: &str) -> Result<bool>;

    fn exists(&self, slug: &str) -> Result<bool> {
        Ok(self.find(slug)?.is_some())
    }
}
