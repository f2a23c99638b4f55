pub mod config;
pub mod manifest;
pub mod types;

pub use config::Config;
pub use manifest::{PluginManifest, ProviderSpec, Requirements, TemplateSpec, ThemeManifest};
pub use types::{Comment, Menu, MenuItem, PluginRecord, PluginStatus, Post, PostMeta, Taxonomy, User};
