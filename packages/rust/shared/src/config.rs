//! Application configuration for offliner.
//!
//! User config lives at `~/.offliner/offliner.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OfflinerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "offliner.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".offliner";

/// Desktop-browser User-Agent. Font services pick the served font format
/// (woff2 vs. ttf) from this header.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching offliner.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP settings shared by every download.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Which remote stylesheets count as font-service stylesheets.
    #[serde(default)]
    pub fonts: FontServiceConfig,

    /// Local layout of downloaded assets and backups.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_timeout_secs() -> u64 {
    15
}

/// `[fonts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontServiceConfig {
    /// Substring identifying a font-service stylesheet URL.
    #[serde(default = "default_stylesheet_marker")]
    pub stylesheet_marker: String,

    /// Scheme given to protocol-relative (`//host/...`) and scheme-less
    /// stylesheet hrefs.
    #[serde(default = "default_stylesheet_scheme")]
    pub stylesheet_scheme: String,

    /// URL prefix of the font binaries referenced from those stylesheets.
    #[serde(default = "default_file_host")]
    pub file_host: String,

    /// Hosts whose `rel="preconnect"` hints are dropped once fonts are local.
    #[serde(default = "default_preconnect_hosts")]
    pub preconnect_hosts: Vec<String>,
}

impl Default for FontServiceConfig {
    fn default() -> Self {
        Self {
            stylesheet_marker: default_stylesheet_marker(),
            stylesheet_scheme: default_stylesheet_scheme(),
            file_host: default_file_host(),
            preconnect_hosts: default_preconnect_hosts(),
        }
    }
}

fn default_stylesheet_marker() -> String {
    "fonts.googleapis.com/css".into()
}
fn default_stylesheet_scheme() -> String {
    "https".into()
}
fn default_file_host() -> String {
    "https://fonts.gstatic.com/".into()
}
fn default_preconnect_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into()]
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Folder (relative to the document folder) for font files.
    #[serde(default = "default_fonts_dir")]
    pub fonts_dir: String,

    /// Folder (relative to the document folder) for images.
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    /// Extension appended to a document's file name for its backup.
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// File name used for images whose URL has no path segment.
    #[serde(default = "default_image_name")]
    pub default_image_name: String,

    /// Write indented markup (`true`) or compact markup (`false`).
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fonts_dir: default_fonts_dir(),
            images_dir: default_images_dir(),
            backup_suffix: default_backup_suffix(),
            default_image_name: default_image_name(),
            pretty: true,
        }
    }
}

fn default_fonts_dir() -> String {
    "fonts".into()
}
fn default_images_dir() -> String {
    "images".into()
}
fn default_backup_suffix() -> String {
    "bak".into()
}
fn default_image_name() -> String {
    "image.jpg".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject values that would make a run misbehave (zero timeout, empty markers,
    /// output folders escaping the document folder).
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            return Err(OfflinerError::config("fetch.timeout_secs must be greater than 0"));
        }
        if self.fonts.stylesheet_marker.trim().is_empty() {
            return Err(OfflinerError::config("fonts.stylesheet_marker must not be empty"));
        }
        if !matches!(self.fonts.stylesheet_scheme.as_str(), "http" | "https") {
            return Err(OfflinerError::config(format!(
                "fonts.stylesheet_scheme must be 'http' or 'https', got '{}'",
                self.fonts.stylesheet_scheme
            )));
        }
        if self.fonts.file_host.trim().is_empty() {
            return Err(OfflinerError::config("fonts.file_host must not be empty"));
        }
        for (key, dir) in [
            ("output.fonts_dir", &self.output.fonts_dir),
            ("output.images_dir", &self.output.images_dir),
        ] {
            if !is_plain_file_name(dir) {
                return Err(OfflinerError::config(format!(
                    "{key} must be a single folder name, got '{dir}'"
                )));
            }
        }
        if !is_plain_file_name(&self.output.default_image_name) {
            return Err(OfflinerError::config(format!(
                "output.default_image_name must be a plain file name, got '{}'",
                self.output.default_image_name
            )));
        }
        if self.output.fonts_dir == self.output.images_dir {
            return Err(OfflinerError::config(
                "output.fonts_dir and output.images_dir must differ",
            ));
        }
        if self.output.backup_suffix.is_empty() || self.output.backup_suffix.contains('/') {
            return Err(OfflinerError::config("output.backup_suffix is invalid"));
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.offliner/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OfflinerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.offliner/offliner.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OfflinerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        OfflinerError::parse(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OfflinerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OfflinerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OfflinerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
