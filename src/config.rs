//! Configuration for strmsync.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (AGTV_*, TMDB_API_KEY, STRMSYNC_*, DEBUG)
//! 2. Config file (strmsync.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - `STRMSYNC_CONFIG` if set
//! - `./strmsync.yaml`
//! - `<user config dir>/strmsync/config.yaml`

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::adapters::{apollo, tmdb};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_SCAN_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_MAX_TV_SHOWS_PAGES: u32 = 10;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 5;
pub const DEFAULT_WORK_CONCURRENCY: usize = 50;

/// Startup errors that halt all processing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing playlist credentials: set AGTV_USERNAME and AGTV_PASSWORD")]
    MissingCredentials,

    #[error("Invalid value for {name}: '{value}'")]
    InvalidNumber { name: String, value: String },
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub username: Option<String>,
    pub password: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub scan_interval: Option<u64>,
    pub max_tv_shows_pages: Option<u32>,
    pub data_dir: Option<String>,
    pub output_dir: Option<String>,
    pub fetch_concurrency: Option<usize>,
    pub work_concurrency: Option<usize>,
    pub playlist_base_url: Option<String>,
    pub metadata_base_url: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub username: String,
    pub password: String,
    /// TMDB read access token; lookups fail per unit without it
    pub tmdb_api_key: Option<String>,
    /// Pause between sync cycles
    pub scan_interval: Duration,
    /// Number of paged `tvshows/<n>` endpoints
    pub max_tv_shows_pages: u32,
    /// Persisted catalog state
    pub data_dir: PathBuf,
    /// Root of the `media/` tree
    pub output_dir: PathBuf,
    pub fetch_concurrency: usize,
    pub work_concurrency: usize,
    pub playlist_base_url: String,
    pub metadata_base_url: String,
    pub debug: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Playlist endpoints in fetch order
    pub fn endpoints(&self) -> Vec<String> {
        (1..=self.max_tv_shows_pages)
            .map(|page| format!("tvshows/{}", page))
            .chain(std::iter::once("movies".to_string()))
            .collect()
    }
}

/// Mask a secret for display, keeping a short prefix
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(2).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

/// Find config file from the explicit path, working directory, or user config dir
fn find_config_file(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(explicit) = env("STRMSYNC_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    let local = PathBuf::from("strmsync.yaml");
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("strmsync").join("config.yaml"))
        .filter(|path| path.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn parse_number<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    name: &str,
    fallback: T,
) -> Result<T, ConfigError> {
    match env(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            name: name.to_string(),
            value,
        }),
        None => Ok(fallback),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve configuration from an environment lookup and an optional config file
fn resolve(env: impl Fn(&str) -> Option<String>, config_file: Option<PathBuf>) -> Result<ResolvedConfig> {
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let username = non_empty(env("AGTV_USERNAME")).or(non_empty(file.username));
    let password = non_empty(env("AGTV_PASSWORD")).or(non_empty(file.password));
    let (username, password) = match (username, password) {
        (Some(username), Some(password)) => (username, password),
        _ => return Err(ConfigError::MissingCredentials.into()),
    };

    let scan_minutes = parse_number(
        &env,
        "AGTV_SCAN_INTERVAL",
        file.scan_interval.unwrap_or(DEFAULT_SCAN_INTERVAL_MINUTES),
    )?;

    let debug = match env("DEBUG") {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => file.debug,
    };

    Ok(ResolvedConfig {
        username,
        password,
        tmdb_api_key: non_empty(env("TMDB_API_KEY")).or(non_empty(file.tmdb_api_key)),
        scan_interval: Duration::from_secs(scan_minutes * 60),
        max_tv_shows_pages: parse_number(
            &env,
            "AGTV_MAX_TV_SHOWS_PAGES",
            file.max_tv_shows_pages.unwrap_or(DEFAULT_MAX_TV_SHOWS_PAGES),
        )?,
        data_dir: env("STRMSYNC_DATA_DIR")
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data")),
        output_dir: env("STRMSYNC_OUTPUT_DIR")
            .or(file.output_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        fetch_concurrency: parse_number(
            &env,
            "STRMSYNC_FETCH_CONCURRENCY",
            file.fetch_concurrency.unwrap_or(DEFAULT_FETCH_CONCURRENCY),
        )?,
        work_concurrency: parse_number(
            &env,
            "STRMSYNC_WORK_CONCURRENCY",
            file.work_concurrency.unwrap_or(DEFAULT_WORK_CONCURRENCY),
        )?,
        playlist_base_url: file
            .playlist_base_url
            .unwrap_or_else(|| apollo::DEFAULT_BASE_URL.to_string()),
        metadata_base_url: file
            .metadata_base_url
            .unwrap_or_else(|| tmdb::DEFAULT_BASE_URL.to_string()),
        debug,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env = |name: &str| std::env::var(name).ok();
    let config_file = find_config_file(&env);
    resolve(env, config_file)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
