pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod plugins;
pub mod providers;
pub mod registry;
pub mod store;
pub mod theme;
pub mod utils;

// Re-export commonly used types and traits
pub use crate::core::{RequestScope, Site};
pub use crate::error::PressliError;
pub use crate::plugins::{Plugin, PluginCatalog, PluginManager};
pub use crate::registry::{BootContext, ContentTypeConfig, Provider, ProviderRequest, Registry};
pub use crate::theme::{TemplateRenderer, Theme, ThemeCatalog, ThemeManager};
