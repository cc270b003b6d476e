//! Shared types, error model, and configuration for sitecorpus.
//!
//! This crate is the foundation depended on by all other sitecorpus crates.
//! It provides:
//! - [`SiteCorpusError`]: the unified error type
//! - Domain types ([`OutputFormat`])
//! - Configuration ([`AppConfig`], [`RoutingPolicy`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, RoutingConfig, RoutingPolicy, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, SiteCorpusError};
pub use types::{OutputFormat, PLACEHOLDER_TEXTS};
