//! Application configuration for the enrichment engine.
//!
//! User config lives at `~/.companyintel/companyintel.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CompanyIntelError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "companyintel.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".companyintel";

// ---------------------------------------------------------------------------
// Config structs (matching companyintel.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache, pacing, and output locations.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP client politeness settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// robots.txt policy.
    #[serde(default)]
    pub robots: RobotsConfig,

    /// Official-site search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Industry keyword table, in tie-break order.
    #[serde(default = "default_industries")]
    pub industries: Vec<IndustryEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            http: HttpConfig::default(),
            robots: RobotsConfig::default(),
            search: SearchConfig::default(),
            industries: default_industries(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Freshness window in days.
    #[serde(default = "default_cache_days")]
    pub cache_days: u32,

    /// Pause after each enrichment that touched the network, in ms.
    #[serde(default = "default_polite_sleep_ms")]
    pub polite_sleep_ms: u64,

    /// Directory holding the database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// JSON mirror of all records, rewritten per batch.
    #[serde(default = "default_export_path")]
    pub export_path: String,

    /// Directory for downloaded logo assets.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Label used when no industry keyword matches.
    #[serde(default = "default_industry_label")]
    pub default_industry: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cache_days: default_cache_days(),
            polite_sleep_ms: default_polite_sleep_ms(),
            data_dir: default_data_dir(),
            export_path: default_export_path(),
            assets_dir: default_assets_dir(),
            default_industry: default_industry_label(),
        }
    }
}

fn default_cache_days() -> u32 {
    30
}
fn default_polite_sleep_ms() -> u64 {
    1000
}
fn default_data_dir() -> String {
    "~/.companyintel/data".into()
}
fn default_export_path() -> String {
    "~/.companyintel/data/companies.json".into()
}
fn default_assets_dir() -> String {
    "~/.companyintel/data/logos".into()
}
fn default_industry_label() -> String {
    "Other".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-attempt timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt on 429/5xx or transport errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in ms.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Multiplier applied per further retry.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Descriptive client identity.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Bodies larger than this are rejected.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_factor: default_backoff_factor(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_user_agent() -> String {
    concat!(
        "CompanyIntelBot/",
        env!("CARGO_PKG_VERSION"),
        " (+company enrichment; respects robots.txt)"
    )
    .into()
}
fn default_max_response_bytes() -> u64 {
    10 * 1024 * 1024
}

/// `[robots]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotsConfig {
    /// Allow fetching when robots.txt itself cannot be retrieved.
    #[serde(default = "default_true")]
    pub fail_open: bool,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self { fail_open: true }
    }
}

fn default_true() -> bool {
    true
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Static-HTML search results endpoint; queried with `?q=`.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Hosts never accepted as an official site (subdomains included).
    #[serde(default = "default_disallowed_hosts")]
    pub disallowed_hosts: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            disallowed_hosts: default_disallowed_hosts(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".into()
}

fn default_disallowed_hosts() -> Vec<String> {
    [
        "linkedin.com",
        "facebook.com",
        "twitter.com",
        "x.com",
        "instagram.com",
        "youtube.com",
        "youtu.be",
        "tiktok.com",
        "pinterest.com",
        "reddit.com",
        "wikipedia.org",
        "glassdoor.com",
        "crunchbase.com",
        "vimeo.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[[industries]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryEntry {
    /// Label returned by the classifier.
    pub label: String,
    /// Lower-case keywords; each one found in the text scores one point.
    pub keywords: Vec<String>,
}

fn industry(label: &str, keywords: &[&str]) -> IndustryEntry {
    IndustryEntry {
        label: label.into(),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
    }
}

/// Built-in industry table. Order is the tie-break order.
pub fn default_industries() -> Vec<IndustryEntry> {
    vec![
        industry(
            "Technology",
            &[
                "software", "cloud", "platform", "api", "saas", "data", "machine learning",
                "developer", "digital", "cyber", "app",
            ],
        ),
        industry(
            "Finance",
            &[
                "bank", "finance", "financial", "insurance", "invest", "payment", "fintech",
                "capital", "lending", "wealth",
            ],
        ),
        industry(
            "Healthcare",
            &[
                "health", "medical", "clinic", "pharma", "hospital", "patient", "biotech",
                "therapy", "care",
            ],
        ),
        industry(
            "Aerospace",
            &[
                "aerospace", "rocket", "orbital", "launch", "satellite", "space", "aviation",
                "aircraft",
            ],
        ),
        industry(
            "Manufacturing",
            &[
                "manufactur", "factory", "industrial", "machinery", "engineering", "production",
            ],
        ),
        industry(
            "Retail",
            &["retail", "shop", "store", "ecommerce", "e-commerce", "fashion", "consumer"],
        ),
        industry(
            "Education",
            &["education", "school", "university", "learning", "course", "training"],
        ),
        industry(
            "Energy",
            &["energy", "solar", "oil", "gas", "renewable", "power", "utility"],
        ),
        industry(
            "Consulting",
            &["consulting", "advisory", "consultancy", "strategy", "professional services"],
        ),
        industry(
            "Media",
            &["media", "news", "publishing", "entertainment", "film", "music", "broadcast"],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime HTTP client configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_factor: f64,
    pub user_agent: String,
    pub max_response_bytes: u64,
    pub robots_fail_open: bool,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.http.timeout_secs),
            max_retries: config.http.max_retries,
            backoff_base: Duration::from_millis(config.http.backoff_base_ms),
            backoff_factor: config.http.backoff_factor,
            user_agent: config.http.user_agent.clone(),
            max_response_bytes: config.http.max_response_bytes,
            robots_fail_open: config.robots.fail_open,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime enrichment configuration.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Freshness window.
    pub cache_days: u32,
    /// Soft pacing after each network-touching enrichment.
    pub polite_sleep: Duration,
    /// Database file.
    pub db_path: PathBuf,
    /// JSON mirror path.
    pub export_path: PathBuf,
    /// Logo asset directory.
    pub assets_dir: PathBuf,
    pub default_industry: String,
    pub search_endpoint: String,
    pub disallowed_hosts: Vec<String>,
    pub industries: Vec<IndustryEntry>,
    pub fetch: FetchConfig,
}

impl EnrichConfig {
    /// Freshness window as a chrono duration.
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cache_days))
    }
}

impl From<&AppConfig> for EnrichConfig {
    fn from(config: &AppConfig) -> Self {
        let data_dir = expand_home(&config.defaults.data_dir);
        Self {
            cache_days: config.defaults.cache_days,
            polite_sleep: Duration::from_millis(config.defaults.polite_sleep_ms),
            db_path: data_dir.join("companyintel.db"),
            export_path: expand_home(&config.defaults.export_path),
            assets_dir: expand_home(&config.defaults.assets_dir),
            default_industry: config.defaults.default_industry.clone(),
            search_endpoint: config.search.endpoint.clone(),
            disallowed_hosts: config.search.disallowed_hosts.clone(),
            industries: config.industries.clone(),
            fetch: FetchConfig::from(config),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.companyintel/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CompanyIntelError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.companyintel/companyintel.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| CompanyIntelError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CompanyIntelError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would break the freshness or retry math.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.cache_days == 0 {
        return Err(CompanyIntelError::config("defaults.cache_days must be at least 1"));
    }
    if config.http.backoff_factor < 1.0 {
        return Err(CompanyIntelError::config(
            "http.backoff_factor must be >= 1.0",
        ));
    }
    if config.industries.iter().any(|i| i.label.trim().is_empty()) {
        return Err(CompanyIntelError::config("industry labels must not be empty"));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CompanyIntelError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CompanyIntelError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CompanyIntelError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
