pub mod server;
pub mod site;

pub use server::Server;
pub use site::{register_core_types, RequestScope, Site, CONFIG_FILE};
