use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheOptions, DEFAULT_GC_TIME, DEFAULT_RETRY, DEFAULT_STALE_TIME};
use crate::query::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const ENV_API_URL: &str = "TASKDECK_API_URL";
pub const ENV_PAGE_SIZE: &str = "TASKDECK_PAGE_SIZE";

// ─── Config Types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_time_ms: Option<u64>,
}

/// Effective settings after defaults and environment overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub page_size: u32,
    pub log_level: Option<LogLevel>,
    pub cache: CacheOptions,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve_config(ClientConfig::default(), |_| None)
    }
}

// ─── Config Format ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Environment Variable Interpolation ──────────────────────────────────────

/// Replace `${VAR_NAME}` patterns in a string with environment variable values.
/// If the environment variable is not set, the original `${VAR_NAME}` is kept.
pub fn interpolate_env_vars(value: &str) -> String {
    let re = Regex::new(r"\$\{([^}]+)\}").expect("invalid regex");
    re.replace_all(value, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

fn interpolate_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(interpolate_env_vars(&s)),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(interpolate_value).collect())
        }
        serde_json::Value::Object(map) => {
            serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, interpolate_value(v))).collect())
        }
        other => other,
    }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a config string in the given format, with environment variable interpolation.
///
/// - **YAML**: env vars are interpolated in the raw string *before* YAML parsing.
/// - **JSON**: the string is parsed first, then env vars are interpolated in values.
///
/// Numeric keys that ended up as strings are coerced to numbers, or dropped
/// if they are not numeric.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ClientConfig, ConfigError> {
    let raw: serde_json::Value = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => {
            let interpolated = interpolate_env_vars(content);
            let parsed: serde_json::Value = serde_yaml::from_str(&interpolated)?;
            // Empty YAML content parses to null
            if parsed.is_null() {
                return Ok(ClientConfig::default());
            }
            parsed
        }
    };

    let interpolated = interpolate_value(raw);
    let final_value = coerce_numbers(interpolated, &["pageSize", "timeoutMs"]);

    let config: ClientConfig =
        serde_json::from_value(final_value).map_err(ConfigError::JsonParse)?;
    Ok(config)
}

fn coerce_numbers(mut value: serde_json::Value, keys: &[&str]) -> serde_json::Value {
    if let serde_json::Value::Object(ref mut map) = value {
        for key in keys {
            let Some(serde_json::Value::String(s)) = map.get(*key) else {
                continue;
            };
            match s.trim().parse::<u64>() {
                Ok(n) => {
                    map.insert(key.to_string(), serde_json::Value::Number(n.into()));
                }
                Err(_) => {
                    map.remove(*key);
                }
            }
        }
    }
    value
}

// ─── File Loading ────────────────────────────────────────────────────────────

/// Default config file candidate names, checked in order.
const DEFAULT_CANDIDATES: &[&str] = &[
    "taskdeck.config.yaml",
    "taskdeck.config.yml",
    "taskdeck.config.json",
];

/// Load a config file from disk. If `config_path` is provided, only that path
/// is tried. Otherwise the default candidates are checked in the current
/// directory and then in the user config directory.
///
/// If no matching file is found, returns a default (empty) config.
pub fn load_config_file(config_path: Option<&str>) -> Result<ClientConfig, ConfigError> {
    let mut dirs = vec![std::env::current_dir()?];
    if let Some(user_dir) = dirs::config_dir() {
        dirs.push(user_dir.join("taskdeck"));
    }
    load_config_file_from_dirs(config_path, &dirs)
}

fn load_config_file_from_dirs(
    config_path: Option<&str>,
    base_dirs: &[PathBuf],
) -> Result<ClientConfig, ConfigError> {
    for base_dir in base_dirs {
        if let Some(config) = load_config_file_from_dir(config_path, base_dir)? {
            return Ok(config);
        }
    }
    Ok(ClientConfig::default())
}

fn load_config_file_from_dir(
    config_path: Option<&str>,
    base_dir: &Path,
) -> Result<Option<ClientConfig>, ConfigError> {
    let candidates: Vec<&str> = match config_path {
        Some(path) => vec![path],
        None => DEFAULT_CANDIDATES.to_vec(),
    };

    for candidate in candidates {
        let full_path = if Path::new(candidate).is_absolute() {
            PathBuf::from(candidate)
        } else {
            base_dir.join(candidate)
        };

        if !full_path.exists() {
            continue;
        }

        let ext = full_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let content = std::fs::read_to_string(&full_path)?;
        let format = if ext == "json" {
            ConfigFormat::Json
        } else {
            ConfigFormat::Yaml
        };

        tracing::debug!(path = %full_path.display(), "loaded config file");
        return parse_config(&content, format).map(Some);
    }

    Ok(None)
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Apply environment overrides and defaults. `env` looks up a variable.
pub fn resolve_config<F>(config: ClientConfig, env: F) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let api_url = env(ENV_API_URL)
        .filter(|v| !v.trim().is_empty())
        .or(config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let page_size = env(ENV_PAGE_SIZE)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .or(config.page_size)
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let query = config.query.unwrap_or(QueryConfig {
        stale_time_ms: None,
        retry: None,
        gc_time_ms: None,
    });

    ResolvedConfig {
        api_url: api_url.trim_end_matches('/').to_string(),
        timeout: Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        page_size,
        log_level: config.log_level,
        cache: CacheOptions {
            stale_time: query
                .stale_time_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_STALE_TIME),
            retry: query.retry.unwrap_or(DEFAULT_RETRY),
            gc_time: query
                .gc_time_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_GC_TIME),
        },
    }
}

/// [`resolve_config`] against the process environment.
pub fn resolve_from_env(config: ClientConfig) -> ResolvedConfig {
    resolve_config(config, |name| std::env::var(name).ok())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
