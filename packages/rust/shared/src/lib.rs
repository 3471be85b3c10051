//! Shared types, error model, and configuration for docweave.
//!
//! This crate is the foundation depended on by all other docweave crates.
//! It provides:
//! - [`DocweaveError`], the unified error type
//! - Domain types ([`Document`], [`Section`], [`Block`], [`NavigationIndex`])
//! - Configuration ([`AppConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, CONFIG_FILE_NAME, ContentConfig, RenderConfig, SiteConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_config,
};
pub use error::{DocweaveError, Result};
pub use types::{
    Block, CURRENT_SCHEMA_VERSION, CodeSample, DocId, Document, FrontMatter, List, NavEntry,
    NavHeading, NavigationIndex, Section, SectionWalk, Toc, TocEntry,
};
