mod commands;
mod scaffold;

pub use commands::{execute, Cli, Commands};
pub use scaffold::initialize_site;
