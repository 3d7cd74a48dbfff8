//! Application configuration for sitescribe.
//!
//! User config lives at `~/.sitescribe/sitescribe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteScribeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitescribe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitescribe";

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("sitescribe/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config structs (matching sitescribe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Headless browser settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Static HTTP fetcher settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Which engine renders pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Headless Chromium; executes JavaScript before capturing the DOM.
    #[default]
    Browser,
    /// Plain HTTP GET; the served HTML is used as-is.
    Http,
}

impl std::fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Browser => f.write_str("browser"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Fetch engine used when `--fetcher` is not given.
    #[serde(default)]
    pub fetcher: FetcherKind,
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run Chromium without a window.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chromium executable (auto-detected when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// Seconds to wait for a page to finish loading.
    #[serde(default = "default_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Override the browser's User-Agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            navigation_timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override the User-Agent header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Fetch settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetcher configuration - merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Engine to launch.
    pub kind: FetcherKind,
    /// Browser only: run without a window.
    pub headless: bool,
    /// Browser only: explicit executable path.
    pub executable: Option<PathBuf>,
    /// Navigation / request timeout.
    pub timeout: Duration,
    /// User-Agent for the selected engine.
    pub user_agent: String,
}

impl From<&AppConfig> for FetchSettings {
    fn from(config: &AppConfig) -> Self {
        let kind = config.defaults.fetcher;
        let (timeout_secs, user_agent) = match kind {
            FetcherKind::Browser => (
                config.browser.navigation_timeout_secs,
                config.browser.user_agent.clone(),
            ),
            FetcherKind::Http => (config.http.timeout_secs, config.http.user_agent.clone()),
        };

        Self {
            kind,
            headless: config.browser.headless,
            executable: config.browser.executable.as_ref().map(PathBuf::from),
            timeout: Duration::from_secs(timeout_secs),
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitescribe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteScribeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitescribe/sitescribe.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SiteScribeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteScribeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteScribeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteScribeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteScribeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
