//! Configuration loading and management.
//!
//! - [`cli`]: command-line flags (clap)
//! - [`types`]: the optional TOML file, hostspec parsing and the resolved [`Config`]
//! - [`defaults`]: values used when neither source sets a key

mod cli;
mod defaults;
mod types;

pub use cli::Cli;
pub use defaults::{LISTEN_PORT, SERVER_PORT};
pub use types::{Config, ConfigError, FileConfig, ServerAddr};
