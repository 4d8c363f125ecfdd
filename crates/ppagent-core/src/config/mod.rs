//! Configuration system: schema and environment loading.
//!
//! # Usage
//! ```no_run
//! use ppagent_core::config;
//!
//! let cfg = config::load_config().expect("OPENAI_API_KEY must be set");
//! println!("Model: {}", cfg.model);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{
    load_config, load_config_from, load_settings, load_settings_from, resolve_root, ConfigError,
};
pub use schema::Config;
