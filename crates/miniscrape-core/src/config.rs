use std::path::PathBuf;

use crate::error::AppError;
use crate::runner::DEFAULT_MAX_CONCURRENCY;

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Ignore existing entries on lookup (they are still never overwritten).
    pub update: bool,
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update: false,
            root: default_cache_root(),
        }
    }
}

/// `<tmp>/mini-scrape`.
pub fn default_cache_root() -> PathBuf {
    std::env::temp_dir().join("mini-scrape")
}

/// Application configuration shared by the CLI and the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub categories_dir: PathBuf,
    /// Category names to load. Empty = every definition file in the directory.
    pub categories: Vec<String>,
    pub cache: CacheConfig,
    /// Pages resolved at the same time. 0 = unbounded.
    pub max_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            categories_dir: PathBuf::from("config/categories"),
            categories: Vec::new(),
            cache: CacheConfig::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// - `MINISCRAPE_CATEGORIES_DIR` (optional, defaults to `config/categories`)
    /// - `MINISCRAPE_CATEGORIES` (optional, comma-separated names)
    /// - `MINISCRAPE_CACHE_ENABLED` (optional, defaults to true)
    /// - `MINISCRAPE_CACHE_UPDATE` (optional, defaults to false)
    /// - `MINISCRAPE_CACHE_ROOT` (optional, defaults to `<tmp>/mini-scrape`)
    /// - `APP_NO_CACHE=true` disables the cache regardless of the above
    /// - `MINISCRAPE_MAX_CONCURRENCY` (optional, defaults to 32)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let categories_dir = var("MINISCRAPE_CATEGORIES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.categories_dir);

        let categories = var("MINISCRAPE_CATEGORIES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut enabled = match var("MINISCRAPE_CACHE_ENABLED") {
            None => defaults.cache.enabled,
            Some(raw) => parse_bool("MINISCRAPE_CACHE_ENABLED", &raw)?,
        };
        if lookup("APP_NO_CACHE").as_deref() == Some("true") {
            tracing::info!("Cache is explicitly disabled");
            enabled = false;
        }

        let update = match var("MINISCRAPE_CACHE_UPDATE") {
            None => defaults.cache.update,
            Some(raw) => parse_bool("MINISCRAPE_CACHE_UPDATE", &raw)?,
        };

        let root = var("MINISCRAPE_CACHE_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache.root);

        let max_concurrency = match var("MINISCRAPE_MAX_CONCURRENCY") {
            None => defaults.max_concurrency,
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid MINISCRAPE_MAX_CONCURRENCY '{raw}': must be a non-negative integer"
                ))
            })?,
        };

        Ok(Self {
            categories_dir,
            categories,
            cache: CacheConfig {
                enabled,
                update,
                root,
            },
            max_concurrency,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {key} '{raw}': expected true or false"
        ))),
    }
}
