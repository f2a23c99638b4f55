use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use super::PluginRecordStore;
use crate::models::types::PluginRecord;

/// 以 YAML 文件保存插件记录，每次写入整体覆盖文件
#[derive(Debug, Clone)]
pub struct YamlRecordStore {
    path: PathBuf,
}

impl YamlRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<BTreeMap<String, PluginRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("读取插件记录失败: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let records: Vec<PluginRecord> = serde_yaml::from_str(&content)
            .with_context(|| format!("解析插件记录失败: {}", self.path.display()))?;
        Ok(records.into_iter().map(|r| (r.slug.clone(), r)).collect())
    }

    fn write(&self, records: &BTreeMap<String, PluginRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let list: Vec<&PluginRecord> = records.values().collect();
        fs::write(&self.path, serde_yaml::to_string(&list)?)
            .with_context(|| format!("写入插件记录失败: {}", self.path.display()))?;
        debug!("插件记录已写入: {}", self.path.display());
        Ok(())
    }
}

impl PluginRecordStore for YamlRecordStore {
    fn find(&self, slug: &str) -> Result<Option<PluginRecord>> {
        Ok(self.read()?.remove(slug))
    }

    fn all(&self) -> Result<Vec<PluginRecord>> {
        Ok(self.read()?.into_values().collect())
    }

    fn save(&self, mut record: PluginRecord) -> Result<()> {
        let mut records = self.read()?;
        record.updated_at = Utc::now();
        if let Some(existing) = records.get(&record.slug) {
            record.created_at = existing.created_at;
        }
        records.insert(record.slug.clone(), record);
        self.write(&records)
    }

    fn remove(&self, slug: &str) -> Result<bool> {
        let mut records = self.read()?;
        let removed = records.remove(slug).is_some();
        if removed {
            self.write(&records)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::PluginStatus;
    use serde_json::json;

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("plugins.yml");

        let store = YamlRecordStore::new(&path);
        let mut record = PluginRecord::new("seo", "SEO Tools", "2.0.0", json!({"name": "SEO Tools"}));
        record.status = PluginStatus::Active;
        store.save(record).unwrap();

        let reopened = YamlRecordStore::new(&path);
        let stored = reopened.find("seo").unwrap().unwrap();
        assert!(stored.is_active());
        assert_eq!(stored.config["name"], "SEO Tools");

        assert!(reopened.remove("seo").unwrap());
        assert!(!reopened.remove("seo").unwrap());
        assert!(reopened.all().unwrap().is_empty());
    }
}
