//! Shared types, error model, and configuration for Glimpse.
//!
//! This crate is the foundation depended on by all other Glimpse crates.
//! It provides:
//! - [`GlimpseError`]: the unified error type
//! - Domain types ([`Item`], [`ItemHandle`], [`RevealStep`]) and the
//!   collaborator traits ([`ItemSource`], [`Region`])
//! - Configuration ([`AppConfig`], config loading)
//! - Credential persistence ([`CredentialStore`], [`FileCredentialStore`])

pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PromptConfig, PromptLocale, RevealConfig, RevealStrategy, ScheduleConfig,
    ServiceConfig, SourceConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{GlimpseError, Result};
pub use types::{
    Item, ItemHandle, ItemSource, Region, RegionHandle, RevealStep, SummaryResult, sanitize,
};
