use crate::chart::{ChartKind, DateRange};
use crate::models::DataSource;
use crate::table::PageSize;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Backend used by debug builds when nothing overrides it.
pub const DEV_BASE_URL: &str = "http://localhost:5000";
/// Backend used by release builds when nothing overrides it.
pub const PROD_BASE_URL: &str = "https://stock-dash.example.com";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Explicit override; see [`ApiConfig::resolved_base_url`].
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub data_source: DataSource,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TableConfig {
    #[serde(default)]
    pub page_size: PageSize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub kind: ChartKind,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("stock-dash/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            data_source: DataSource::default(),
        }
    }
}

// ── Base URL ─────────────────────────────────────────────────────────────────

/// Override first, then the development default, then the production fallback.
pub fn resolve_base_url(override_url: Option<&str>, development: bool) -> String {
    match override_url.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None if development => DEV_BASE_URL.to_string(),
        None => PROD_BASE_URL.to_string(),
    }
}

impl ApiConfig {
    pub fn resolved_base_url(&self) -> String {
        resolve_base_url(self.base_url.as_deref(), cfg!(debug_assertions))
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::load_with(config::Environment::with_prefix("STOCKDASH"))
    }

    fn load_with(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(env.separator("__").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize()
            .context("Invalid configuration")
    }
}
