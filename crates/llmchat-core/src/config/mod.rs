//! Configuration: schema, loading, env var overrides.
//!
//! # Usage
//! ```no_run
//! use llmchat_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Default provider: {}", cfg.app.default_provider);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{
    load_config, load_config_file, read_config_file, save_config, update_model_parameters,
};
pub use schema::{Config, ModelParameters, ProviderSettings};
