//! Environment-driven configuration.
//!
//! Values are read from the process environment after `.env` has been loaded
//! with `dotenvy`. Anything unset falls back to a default suitable for a
//! local run.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::models::ImportOptions;

const DEFAULT_DATABASE_URL: &str = "sqlite:database/catalog.db";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 card-catalog-importer";
const DEFAULT_SCRAPE_DELAY_MS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// HTTP behaviour shared by every remote source
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Pause between consecutive fetches against the same site
    pub scrape_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            scrape_delay: Duration::from_millis(DEFAULT_SCRAPE_DELAY_MS),
        }
    }
}

/// Settings for building the catalog and its sources
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub database_url: String,
    pub http: HttpSettings,
    pub pokemontcg_api_key: Option<String>,
    /// Base URL overrides keyed by lower-case source key
    pub base_urls: HashMap<String, String>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            http: HttpSettings::default(),
            pokemontcg_api_key: None,
            base_urls: HashMap::new(),
        }
    }
}

impl ImporterConfig {
    pub fn from_env() -> Result<Self> {
        let mut base_urls = HashMap::new();
        for (name, value) in env::vars() {
            if let Some(key) = name
                .strip_prefix("IMPORT_")
                .and_then(|rest| rest.strip_suffix("_BASE_URL"))
            {
                base_urls.insert(key.to_lowercase(), value);
            }
        }

        Ok(Self {
            database_url: env_string("CATALOG_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            http: HttpSettings {
                user_agent: env_string("IMPORT_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                timeout: Duration::from_secs(
                    env_parse("IMPORT_HTTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
                ),
                scrape_delay: Duration::from_millis(
                    env_parse("IMPORT_SCRAPE_DELAY_MS")?.unwrap_or(DEFAULT_SCRAPE_DELAY_MS),
                ),
            },
            pokemontcg_api_key: env_string("POKEMONTCG_API_KEY"),
            base_urls,
        })
    }

    /// Configured base URL for `key`, or `default`.
    pub fn base_url(&self, key: &str, default: &str) -> String {
        self.base_urls
            .get(&key.to_lowercase())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// What the runner binary should import
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub source: String,
    pub file: Option<String>,
    pub schedule: Option<String>,
    pub options: ImportOptions,
}

impl RunSettings {
    pub fn from_env() -> Result<Self> {
        let source = env_string("IMPORT_SOURCE").context("IMPORT_SOURCE must be set")?;

        let options = ImportOptions {
            dry_run: env_parse("IMPORT_DRY_RUN")?.unwrap_or(true),
            upsert: true,
            limit: env_parse("IMPORT_LIMIT")?,
            user_id: env_string("IMPORT_USER_ID"),
            set_code: env_string("IMPORT_SET_CODE"),
        };

        Ok(Self {
            source,
            file: env_string("IMPORT_FILE"),
            schedule: env_string("IMPORT_SCHEDULE"),
            options,
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{name} has an invalid value: {raw}"))
        })
        .transpose()
}
