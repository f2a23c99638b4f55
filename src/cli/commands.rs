use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use super::scaffold;
use crate::core::{Server, Site};
use crate::error::PressliError;
use crate::models::PluginStatus;
use crate::store::PostQuery;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化新的站点
    Init(InitArgs),

    /// 插件管理
    Plugin(PluginArgs),

    /// 主题管理
    Theme(ThemeArgs),

    /// 列出已注册的内容类型
    Types,

    /// 渲染一个模板并输出到标准输出
    Render(RenderArgs),

    /// 启动本地预览服务器
    Server(ServerArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    command: PluginCommands,
}

#[derive(Subcommand)]
pub enum PluginCommands {
    /// 扫描插件目录并同步记录
    Scan,
    /// 列出插件记录
    List,
    /// 启用插件
    Activate { slug: String },
    /// 停用插件
    Deactivate { slug: String },
    /// 卸载插件（清理数据，保留文件）
    Uninstall { slug: String },
    /// 删除插件目录与记录
    Delete { slug: String },
}

#[derive(Args)]
pub struct ThemeArgs {
    #[command(subcommand)]
    command: ThemeCommands,
}

#[derive(Subcommand)]
pub enum ThemeCommands {
    /// 列出可用主题
    List,
    /// 切换并保存当前主题
    Switch { slug: String },
    /// 显示当前主题
    Show,
}

#[derive(Args)]
pub struct RenderArgs {
    /// 模板类型，例如 home、post、page
    pub template: String,

    /// 以该 slug 的已发布条目作为上下文
    #[arg(long)]
    pub slug: Option<String>,

    /// 条目的内容类型
    #[arg(long = "type", default_value = "post")]
    pub content_type: String,
}

#[derive(Args)]
pub struct ServerArgs {
    /// 服务器端口
    #[arg(short, long, default_value = "4000")]
    pub port: u16,
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let site_path = cli.path.clone();

    match cli.command {
        Commands::Init(args) => {
            let site_path = site_path.join(&args.name);
            let title = args.title.unwrap_or_else(|| args.name.clone());
            scaffold::initialize_site(&site_path, &title)?;
            println!("{} {}", "Initialized new site at".green(), site_path.display());
        }
        Commands::Plugin(args) => plugin_command(Site::open(&site_path)?, args.command)?,
        Commands::Theme(args) => theme_command(Site::open(&site_path)?, args.command)?,
        Commands::Types => {
            let scope = Site::open(&site_path)?.bootstrap()?;
            for (name, descriptor) in scope.registry.content.all() {
                println!(
                    "{} {} (table: {}, type: {})",
                    name.bright_cyan(),
                    descriptor.label,
                    descriptor.table,
                    descriptor.type_value
                );
                if let Some(controller) = &descriptor.controller {
                    println!("  controller: {}", controller);
                }
                for (action, uri) in &descriptor.routes {
                    println!("  {} -> {}", action, uri);
                }
                let features: Vec<&str> = descriptor
                    .supports
                    .iter()
                    .filter(|(_, enabled)| **enabled)
                    .map(|(feature, _)| feature.as_str())
                    .collect();
                println!("  supports: {}", features.join(", "));
            }
        }
        Commands::Render(args) => {
            let site = Site::open(&site_path)?;
            let scope = site.bootstrap()?;
            let context = match &args.slug {
                Some(slug) => {
                    let query = PostQuery::published(args.content_type.clone()).slug(slug.clone()).limit(1);
                    let item = site
                        .store()
                        .find_posts(&query)?
                        .into_iter()
                        .next()
                        .ok_or_else(|| anyhow!(PressliError::not_found("内容", slug.clone())))?;
                    let key = if args.content_type == "page" { "page" } else { "post" };
                    json!({ key: item })
                }
                None => json!({}),
            };
            println!("{}", scope.render(&args.template, &context)?);
        }
        Commands::Server(args) => {
            let site = Site::open(&site_path)?;
            info!("预览站点: {}", site.base_dir().display());
            Server::new(site, args.port).start().await?;
        }
    }

    Ok(())
}

fn plugin_command(site: Site, command: PluginCommands) -> Result<()> {
    let mut plugins = site.plugin_manager();
    match command {
        PluginCommands::Scan => {
            let report = plugins.scan()?;
            println!(
                "{} discovered: {}, updated: {}, removed: {}",
                "Scan complete".green(),
                report.discovered,
                report.updated,
                report.removed
            );
        }
        PluginCommands::List => {
            let records = plugins.records()?;
            if records.is_empty() {
                println!("没有插件记录，请先运行 plugin scan");
            }
            for record in records {
                let status = match record.status {
                    PluginStatus::Active => "active".green(),
                    PluginStatus::Inactive => "inactive".yellow(),
                };
                println!("{} {} v{} [{}]", record.slug.bright_cyan(), record.name, record.version, status);
            }
        }
        PluginCommands::Activate { slug } => report(plugins.activate(&slug)?, "activated", &slug),
        PluginCommands::Deactivate { slug } => report(plugins.deactivate(&slug)?, "deactivated", &slug),
        PluginCommands::Uninstall { slug } => report(plugins.uninstall(&slug)?, "uninstalled", &slug),
        PluginCommands::Delete { slug } => report(plugins.delete(&slug)?, "deleted", &slug),
    }
    Ok(())
}

fn theme_command(mut site: Site, command: ThemeCommands) -> Result<()> {
    match command {
        ThemeCommands::List => {
            let themes = site.theme_manager(Vec::new());
            let active = themes.active_slug().to_string();
            for theme in themes.get_available_themes()? {
                let marker = if theme.slug == active { "*".green() } else { " ".normal() };
                println!("{} {} {} v{}", marker, theme.slug.bright_cyan(), theme.name, theme.version);
            }
        }
        ThemeCommands::Switch { slug } => {
            let theme = site.switch_theme(&slug)?;
            println!("{} {} v{}", "Switched to".green(), theme.name(), theme.version());
        }
        ThemeCommands::Show => {
            let scope = site.bootstrap()?;
            let config = scope.theme.config();
            println!("{} v{}", config.name().bright_cyan(), config.version());
            println!("path: {}", config.path().display());
            for (location, label) in config.get_menu_locations() {
                println!("  menu {}: {}", location, label);
            }
        }
    }
    Ok(())
}

fn report(changed: bool, action: &str, slug: &str) {
    if changed {
        println!("{} {}", slug.bright_cyan(), action.green());
    } else {
        println!("{} {}", "Nothing to do for".yellow(), slug);
    }
}
