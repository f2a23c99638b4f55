use anyhow::{anyhow, Result};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::{Plugin, PluginCatalog, PluginInfo};
use crate::error::PressliError;
use crate::models::manifest::PLUGIN_MANIFEST;
use crate::models::{PluginManifest, PluginRecord, PluginStatus};
use crate::registry::BootContext;
use crate::store::PluginRecordStore;
use crate::utils;

/// `scan()` 的统计结果
///
/// `removed` 统计本次扫描时所有目录已不存在的记录，已是未启用状态的记录同样计入，
/// 因此记录删除前重复扫描会重复计数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub discovered: usize,
    pub updated: usize,
    pub removed: usize,
}

/// 插件管理器，负责发现、启用、停用、删除和启动插件
///
/// 已加载的实例只在当前请求内缓存；跨请求的状态全部保存在记录存储中。
pub struct PluginManager {
    plugins_dir: PathBuf,
    records: Arc<dyn PluginRecordStore>,
    catalog: PluginCatalog,
    loaded: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginManager {
    pub fn new(plugins_dir: impl Into<PathBuf>, records: Arc<dyn PluginRecordStore>, catalog: PluginCatalog) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            records,
            catalog,
            loaded: HashMap::new(),
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    pub fn records(&self) -> Result<Vec<PluginRecord>> {
        self.records.all()
    }

    pub fn active_slugs(&self) -> Result<Vec<String>> {
        Ok(self
            .records
            .all()?
            .into_iter()
            .filter(PluginRecord::is_active)
            .map(|r| r.slug)
            .collect())
    }

    pub fn is_loaded(&self, slug: &str) -> bool {
        self.loaded.contains_key(slug)
    }

    /// 扫描插件目录并同步持久化记录
    ///
    /// 新目录创建未启用的记录；版本变化时更新元数据；磁盘上消失的插件
    /// 只会被置为未启用，不会被删除。
    pub fn scan(&mut self) -> Result<ScanReport> {
        info!("扫描插件目录: {}", self.plugins_dir.display());
        let mut report = ScanReport::default();
        let mut found = HashSet::new();

        if self.plugins_dir.is_dir() {
            let entries = WalkDir::new(&self.plugins_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_dir());

            for entry in entries {
                let dir = entry.path();
                if !dir.join(PLUGIN_MANIFEST).is_file() {
                    continue;
                }
                let slug = entry.file_name().to_string_lossy().to_string();
                found.insert(slug.clone());

                let manifest = match PluginManifest::load(dir) {
                    Ok(manifest) => manifest,
                    Err(e) => {
                        warn!("跳过插件 {}: {}", slug, e);
                        continue;
                    }
                };
                let name = manifest.name.clone().unwrap_or_else(|| slug.clone());

                match self.records.find(&slug)? {
                    None => {
                        info!("发现新插件: {} v{}", slug, manifest.version);
                        let record = PluginRecord::new(&slug, name, &manifest.version, manifest.snapshot());
                        self.records.save(record)?;
                        report.discovered += 1;
                    }
                    Some(mut record) if record.version != manifest.version => {
                        info!("插件 {} 版本变化: {} -> {}", slug, record.version, manifest.version);
                        record.name = name;
                        record.version = manifest.version.clone();
                        record.config = manifest.snapshot();
                        self.records.save(record)?;
                        report.updated += 1;
                    }
                    Some(_) => debug!("插件 {} 无变化", slug),
                }
            }
        } else {
            warn!("插件目录不存在: {}", self.plugins_dir.display());
        }

        for mut record in self.records.all()? {
            if found.contains(&record.slug) {
                continue;
            }
            self.loaded.remove(&record.slug);
            report.removed += 1;
            if record.is_active() {
                warn!("插件 {} 已从磁盘移除，标记为未启用", record.slug);
                record.status = PluginStatus::Inactive;
                self.records.save(record)?;
            } else {
                debug!("插件 {} 已从磁盘移除", record.slug);
            }
        }

        info!(
            "插件扫描完成 - 新发现: {}, 更新: {}, 移除: {}",
            report.discovered, report.updated, report.removed
        );
        Ok(report)
    }

    /// 加载插件实例，本请求内缓存
    ///
    /// 目录、plugin.json 或工厂缺失时返回 `None`，调用方把它当作不存在的插件处理。
    /// plugin.json 无法解析时返回配置错误。
    pub fn load_plugin(&mut self, slug: &str) -> Result<Option<Arc<dyn Plugin>>> {
        if let Some(plugin) = self.loaded.get(slug) {
            return Ok(Some(plugin.clone()));
        }
        if !utils::is_valid_slug(slug) {
            warn!("非法的插件 slug: {}", slug);
            return Ok(None);
        }

        let dir = self.plugins_dir.join(slug);
        if !dir.join(PLUGIN_MANIFEST).is_file() {
            debug!("插件 {} 缺少 {}", slug, PLUGIN_MANIFEST);
            return Ok(None);
        }

        let info = PluginInfo::load(&dir)?;
        let entry = info.entry_name();
        let Some(factory) = self.catalog.resolve(&entry) else {
            warn!("插件 {} 的入口 {} 未注册", slug, entry);
            return Ok(None);
        };

        let plugin: Arc<dyn Plugin> = Arc::from((**factory)(info));
        debug!("已加载插件: {} v{}", plugin.name(), plugin.version());
        self.loaded.insert(slug.to_string(), plugin.clone());
        Ok(Some(plugin))
    }

    /// 加载失败一律视为插件不存在
    fn try_load(&mut self, slug: &str) -> Option<Arc<dyn Plugin>> {
        match self.load_plugin(slug) {
            Ok(plugin) => plugin,
            Err(e) => {
                warn!("加载插件 {} 失败: {}", slug, e);
                None
            }
        }
    }

    /// 启用插件；记录不存在或无法加载时返回 `false` 且不修改任何记录
    pub fn activate(&mut self, slug: &str) -> Result<bool> {
        let Some(mut record) = self.records.find(slug)? else {
            warn!("未知插件，无法启用: {}", slug);
            return Ok(false);
        };
        let Some(plugin) = self.try_load(slug) else {
            return Ok(false);
        };

        plugin.activate().map_err(|e| {
            anyhow!(PressliError::HookError {
                plugin: slug.to_string(),
                hook: "activate",
                message: e.to_string(),
            })
        })?;

        record.status = PluginStatus::Active;
        self.records.save(record)?;
        info!("插件已启用: {}", slug);
        Ok(true)
    }

    /// 停用插件，保留其数据
    pub fn deactivate(&mut self, slug: &str) -> Result<bool> {
        let Some(mut record) = self.records.find(slug)? else {
            warn!("未知插件，无法停用: {}", slug);
            return Ok(false);
        };

        if let Some(plugin) = self.try_load(slug) {
            plugin.deactivate().map_err(|e| {
                anyhow!(PressliError::HookError {
                    plugin: slug.to_string(),
                    hook: "deactivate",
                    message: e.to_string(),
                })
            })?;
        }

        record.status = PluginStatus::Inactive;
        self.records.save(record)?;
        self.loaded.remove(slug);
        info!("插件已停用: {}", slug);
        Ok(true)
    }

    /// 由用户显式触发的数据卸载，只调用插件的 `uninstall()`，不改动记录和目录
    pub fn uninstall(&mut self, slug: &str) -> Result<bool> {
        let Some(plugin) = self.try_load(slug) else {
            return Ok(false);
        };
        plugin.uninstall().map_err(|e| {
            anyhow!(PressliError::HookError {
                plugin: slug.to_string(),
                hook: "uninstall",
                message: e.to_string(),
            })
        })?;
        info!("插件数据已卸载: {}", slug);
        Ok(true)
    }

    /// 删除插件记录与目录，不可恢复
    ///
    /// 启用中的插件会先停用。不会调用 `uninstall()`。
    pub fn delete(&mut self, slug: &str) -> Result<bool> {
        if !utils::is_valid_slug(slug) {
            warn!("非法的插件 slug: {}", slug);
            return Ok(false);
        }

        if let Some(record) = self.records.find(slug)? {
            if record.is_active() {
                self.deactivate(slug)?;
            }
        }

        let had_record = self.records.remove(slug)?;
        let had_dir = utils::remove_dir_tolerant(&self.plugins_dir.join(slug))?;
        self.loaded.remove(slug);

        if had_record || had_dir {
            info!("插件已删除: {}", slug);
        }
        Ok(had_record || had_dir)
    }

    /// 加载并启动所有启用的插件，返回启动的数量
    ///
    /// 按 `requires.plugins` 的依赖顺序启动；依赖缺失只记录警告。
    /// 无法加载的插件（包括 plugin.json 损坏）视为不存在并跳过，不影响其他插件。
    pub fn boot_all(&mut self, ctx: &mut BootContext<'_>) -> Result<usize> {
        let mut plugins = Vec::new();
        for slug in self.active_slugs()? {
            match self.try_load(&slug) {
                Some(plugin) => plugins.push(plugin),
                None => warn!("启用中的插件 {} 无法加载，已跳过", slug),
            }
        }

        for index in boot_order(&plugins) {
            let plugin = &plugins[index];
            plugin.boot(ctx).map_err(|e| {
                error!("插件 {} 启动失败: {}", plugin.slug(), e);
                anyhow!(PressliError::HookError {
                    plugin: plugin.slug().to_string(),
                    hook: "boot",
                    message: e.to_string(),
                })
            })?;
            debug!("插件已启动: {}", plugin.slug());
        }

        info!("已启动 {} 个插件", plugins.len());
        Ok(plugins.len())
    }
}

/// 依赖在前的启动顺序；出现循环依赖时退回 slug 顺序
fn boot_order(plugins: &[Arc<dyn Plugin>]) -> Vec<usize> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..plugins.len()).map(|i| graph.add_node(i)).collect();
    let index: HashMap<&str, usize> = plugins.iter().enumerate().map(|(i, p)| (p.slug(), i)).collect();

    for (i, plugin) in plugins.iter().enumerate() {
        for dependency in &plugin.info().manifest.requires.plugins {
            match index.get(dependency.as_str()) {
                Some(&dep) => {
                    graph.add_edge(nodes[dep], nodes[i], ());
                }
                None => warn!("插件 {} 依赖的插件 {} 未启用", plugin.slug(), dependency),
            }
        }
    }

    match toposort(&graph, None) {
        Ok(sorted) => sorted.into_iter().map(|node| graph[node]).collect(),
        Err(cycle) => {
            warn!("插件依赖存在循环 (涉及 {})，按 slug 顺序启动", plugins[graph[cycle.node_id()]].slug());
            let mut order: Vec<usize> = (0..plugins.len()).collect();
            order.sort_by(|a, b| plugins[*a].slug().cmp(plugins[*b].slug()));
            order
        }
    }
}
