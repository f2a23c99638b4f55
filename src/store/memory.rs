use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

use super::{ContentStore, PluginRecordStore, PostOrder, PostQuery};
use crate::models::types::{
    Comment, CommentStatus, Menu, MenuItem, PluginRecord, PostMeta, PostStatus, PostTaxonomy, Taxonomy,
    TaxonomyKind, User,
};
use crate::models::Post;

/// 内存数据集，可从 YAML 夹具加载
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryData {
    pub posts: Vec<Post>,
    pub taxonomies: Vec<Taxonomy>,
    pub post_taxonomies: Vec<PostTaxonomy>,
    pub comments: Vec<Comment>,
    pub users: Vec<User>,
    pub menus: Vec<Menu>,
    pub menu_items: Vec<MenuItem>,
    pub post_meta: Vec<PostMeta>,
}

/// 只读的内存内容存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: MemoryData,
}

impl MemoryStore {
    pub fn new(data: MemoryData) -> Self {
        Self { data }
    }

    /// 从 YAML 文件加载，文件不存在时得到空数据集
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("数据文件不存在，使用空数据集: {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取数据文件失败: {}", path.display()))?;
        let data: MemoryData = serde_yaml::from_str(&content)
            .with_context(|| format!("解析数据文件失败: {}", path.display()))?;
        Ok(Self::new(data))
    }

    pub fn data(&self) -> &MemoryData {
        &self.data
    }

    fn live_taxonomies(&self) -> impl Iterator<Item = &Taxonomy> {
        self.data.taxonomies.iter().filter(|t| t.deleted_at.is_none())
    }
}

impl ContentStore for MemoryStore {
    fn find_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .data
            .posts
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();

        match query.order {
            PostOrder::PublishedDesc => posts.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
            PostOrder::ViewsDesc => posts.sort_by(|a, b| b.view_count.cmp(&a.view_count)),
            PostOrder::MenuOrder => {
                posts.sort_by(|a, b| a.menu_order.cmp(&b.menu_order).then_with(|| a.title.cmp(&b.title)))
            }
        }

        if let Some(limit) = query.limit {
            posts.truncate(limit);
        }
        Ok(posts)
    }

    fn count_posts(&self, query: &PostQuery) -> Result<u64> {
        Ok(self.data.posts.iter().filter(|p| query.matches(p)).count() as u64)
    }

    fn taxonomies(&self) -> Result<Vec<Taxonomy>> {
        Ok(self.live_taxonomies().cloned().collect())
    }

    fn taxonomies_for_post(&self, post_id: u64, kind: Option<TaxonomyKind>) -> Result<Vec<Taxonomy>> {
        let ids: HashSet<u64> = self
            .data
            .post_taxonomies
            .iter()
            .filter(|pt| pt.post_id == post_id)
            .map(|pt| pt.taxonomy_id)
            .collect();
        Ok(self
            .live_taxonomies()
            .filter(|t| ids.contains(&t.id) && kind.map_or(true, |k| t.kind == k))
            .cloned()
            .collect())
    }

    fn post_ids_in_taxonomies(&self, taxonomy_ids: &[u64]) -> Result<Vec<u64>> {
        let mut ids: Vec<u64> = self
            .data
            .post_taxonomies
            .iter()
            .filter(|pt| taxonomy_ids.contains(&pt.taxonomy_id))
            .map(|pt| pt.post_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn taxonomy_post_counts(&self, kind: TaxonomyKind) -> Result<Vec<(Taxonomy, u64)>> {
        let published: HashSet<u64> = self
            .data
            .posts
            .iter()
            .filter(|p| p.status == PostStatus::Published && !p.is_deleted())
            .map(|p| p.id)
            .collect();

        let mut counts: Vec<(Taxonomy, u64)> = self
            .live_taxonomies()
            .filter(|t| t.kind == kind)
            .map(|t| {
                let count = self
                    .data
                    .post_taxonomies
                    .iter()
                    .filter(|pt| pt.taxonomy_id == t.id && published.contains(&pt.post_id))
                    .count() as u64;
                (t.clone(), count)
            })
            .collect();
        counts.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(counts)
    }

    fn approved_comments(&self, post_id: u64) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .data
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.status == CommentStatus::Approved)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    fn count_approved_comments(&self, post_id: u64) -> Result<u64> {
        Ok(self
            .data
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.status == CommentStatus::Approved)
            .count() as u64)
    }

    fn find_user(&self, id: u64) -> Result<Option<User>> {
        Ok(self.data.users.iter().find(|u| u.id == id).cloned())
    }

    fn post_ids_with_meta(&self, key: &str, value: &str) -> Result<Vec<u64>> {
        Ok(self
            .data
            .post_meta
            .iter()
            .filter(|m| m.key == key && m.value == value)
            .map(|m| m.post_id)
            .collect())
    }

    fn active_menus(&self) -> Result<Vec<Menu>> {
        Ok(self
            .data
            .menus
            .iter()
            .filter(|m| m.active && m.deleted_at.is_none())
            .cloned()
            .collect())
    }

    fn active_menu_items(&self, menu_ids: &[u64]) -> Result<Vec<MenuItem>> {
        let mut items: Vec<MenuItem> = self
            .data
            .menu_items
            .iter()
            .filter(|i| i.active && menu_ids.contains(&i.menu_id))
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.sort_order, i.id));
        Ok(items)
    }
}

/// 内存中的插件记录，主要用于测试
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, PluginRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PluginRecordStore for MemoryRecordStore {
    fn find(&self, slug: &str) -> Result<Option<PluginRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("插件记录锁已损坏"))?;
        Ok(records.get(slug).cloned())
    }

    fn all(&self) -> Result<Vec<PluginRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("插件记录锁已损坏"))?;
        Ok(records.values().cloned().collect())
    }

    fn save(&self, mut record: PluginRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| anyhow!("插件记录锁已损坏"))?;
        record.updated_at = Utc::now();
        if let Some(existing) = records.get(&record.slug) {
            record.created_at = existing.created_at;
        }
        records.insert(record.slug.clone(), record);
        Ok(())
    }

    fn remove(&self, slug: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| anyhow!("插件记录锁已损坏"))?;
        Ok(records.remove(slug).is_some())
    }
}
