//! Shared types, error model, and configuration for offliner.
//!
//! This crate is the foundation depended on by all other offliner crates.
//! It provides:
//! - [`OfflinerError`]: the unified error type
//! - Domain types ([`AssetKind`], [`LocalizeReport`], [`FileOutcome`], [`RunSummary`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_USER_AGENT, FetchConfig, FontServiceConfig, OutputConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{OfflinerError, Result};
pub use types::{AssetKind, FileOutcome, FileResult, LocalizeReport, RunSummary};
