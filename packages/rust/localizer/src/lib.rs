//! Asset localization for static HTML pages.
//!
//! This crate provides:
//! - [`http`]: the HTTP client every download goes through
//! - [`cache`]: the per-run, URL-keyed download cache
//! - [`fonts`]: font-service stylesheet resolution
//! - [`scan`]: recognising remote references in a document
//! - [`localize`]: the in-place document rewrite
//! - [`persist`]: backup-once write-back
//! - [`runner`]: folder-level orchestration

pub mod cache;
pub mod fonts;
pub mod http;
pub mod localize;
pub mod persist;
pub mod runner;
pub mod scan;

pub use cache::FetchCache;
pub use fonts::{FontResolver, ResolvedStylesheet};
pub use http::HttpClient;
pub use localize::AssetLocalizer;
pub use persist::{PersistOutcome, backup_path, persist};
pub use runner::{
    OutputDirs, ProgressReporter, Runner, SilentProgress, discover_html_files, scan_file,
};
pub use scan::{AssetLocation, AssetMatcher, AssetReference};
