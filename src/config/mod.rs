//! Configuration for scalerim
//!
//! Provides types and discovery for the optional `scalerim.toml` file.

pub mod loader;
pub mod schema;

pub use loader::{find_config, find_config_from, load_config, ConfigError, CONFIG_FILE, CONFIG_ENV};
pub use schema::*;
