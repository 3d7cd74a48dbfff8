//! Shared types, error model, and configuration for sitescribe.
//!
//! This crate is the foundation depended on by all other sitescribe crates.
//! It provides:
//! - [`SiteScribeError`] - the unified error type
//! - Domain types ([`CredentialSet`], [`Cookie`])
//! - Configuration ([`AppConfig`], [`FetchSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, DEFAULT_USER_AGENT, DefaultsConfig, FetchSettings, FetcherKind,
    HttpConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, SiteScribeError};
pub use types::{Cookie, CredentialSet, SameSite};
