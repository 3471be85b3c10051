//! Application configuration for docweave.
//!
//! Config is read from `docweave.toml`. Resolution order: an explicit
//! `--config` path, then `<input>/docweave.toml`, then
//! `~/.docweave/docweave.toml`, then built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocweaveError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "docweave.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docweave";

// ---------------------------------------------------------------------------
// Config structs (matching docweave.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Site-wide settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Which files are treated as content.
    #[serde(default)]
    pub content: ContentConfig,

    /// Rendering and artifact options.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Title shown in every page header and on the index page.
    #[serde(default = "default_site_title")]
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
        }
    }
}

fn default_site_title() -> String {
    "Reference".into()
}

/// `[content]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// File extensions (without the dot) treated as documents.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns, relative to the input root, to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["md".into(), "markdown".into()]
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Class prefix for code samples (`language-js`).
    #[serde(default = "default_code_class_prefix")]
    pub code_class_prefix: String,

    /// Whether to emit `search.json`.
    #[serde(default = "default_true")]
    pub search_index: bool,

    /// Maximum characters of section text kept per search entry.
    #[serde(default = "default_search_excerpt_chars")]
    pub search_excerpt_chars: usize,

    /// Maximum documents parsed concurrently.
    #[serde(default = "default_parse_concurrency")]
    pub parse_concurrency: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            code_class_prefix: default_code_class_prefix(),
            search_index: true,
            search_excerpt_chars: default_search_excerpt_chars(),
            parse_concurrency: default_parse_concurrency(),
        }
    }
}

fn default_code_class_prefix() -> String {
    "language-".into()
}
fn default_true() -> bool {
    true
}
fn default_search_excerpt_chars() -> usize {
    280
}
fn default_parse_concurrency() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Build config (runtime, merged from config + CLI arguments)
// ---------------------------------------------------------------------------

/// Runtime build configuration: resolved config plus the CLI paths.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory of content files.
    pub input_root: PathBuf,
    /// Directory receiving the rendered artifacts.
    pub output_root: PathBuf,
    pub site: SiteConfig,
    pub content: ContentConfig,
    pub render: RenderConfig,
    /// Tool version recorded in `manifest.json`.
    pub tool_version: String,
}

impl BuildConfig {
    pub fn new(config: &AppConfig, input_root: PathBuf, output_root: PathBuf) -> Self {
        Self {
            input_root,
            output_root,
            site: config.site.clone(),
            content: config.content.clone(),
            render: config.render.clone(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.docweave/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocweaveError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.docweave/docweave.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the user config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DocweaveError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    toml::from_str(&content).map_err(|e| {
        DocweaveError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Resolve the effective config for a build over `input_root`.
///
/// An explicit path must exist. Otherwise `<input_root>/docweave.toml` wins
/// over the user config, which wins over defaults.
pub fn resolve_config(explicit: Option<&Path>, input_root: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        tracing::debug!(?path, "using explicit config file");
        return load_config_from(path);
    }

    if let Some(root) = input_root {
        let local = root.join(CONFIG_FILE_NAME);
        if local.is_file() {
            tracing::debug!(path = ?local, "using project config file");
            return load_config_from(&local);
        }
    }

    load_config()
}

/// Create the user config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocweaveError::write(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocweaveError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocweaveError::write(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
