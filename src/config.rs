// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::rotation::KeyPolicy;
use crate::sources::DEFAULT_SOURCES;

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

/// Highest `KEYn` variable scanned; scanning also stops at the first gap.
const MAX_INDEXED_KEYS: usize = 64;

fn default_port() -> u16 {
    3000
}
fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}
fn default_timeout_secs() -> Option<u64> {
    Some(30)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub key_policy: KeyPolicy,
    /// Enabled source names, in registry order.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Outbound call timeout; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            key_policy: KeyPolicy::default(),
            sources: default_sources(),
            request_timeout_secs: default_timeout_secs(),
            api_keys: Vec::new(),
        }
    }
}

impl AggregatorConfig {
    /// Load config using env var + fallbacks, then apply env overrides:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::from_path(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::from_path(&default)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides(|k| std::env::var(k).ok())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.api_keys = clean_list(cfg.api_keys);
        cfg.sources = clean_list(cfg.sources);
        Ok(cfg)
    }

    /// Apply `PORT`, `KEY_POLICY`, `JOB_SOURCES`, `REQUEST_TIMEOUT_SECS` and
    /// credentials (`KEY1..`, `RAPIDAPI_KEYS`) from `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup("PORT") {
            self.port = p
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{p}'"))?;
        }
        if let Some(p) = lookup("KEY_POLICY") {
            self.key_policy = p.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(s) = lookup("JOB_SOURCES") {
            self.sources = split_list(&s);
        }
        if let Some(t) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = Some(
                t.trim()
                    .parse()
                    .with_context(|| format!("REQUEST_TIMEOUT_SECS must be seconds, got '{t}'"))?,
            );
        }

        let env_keys = keys_from_env(&lookup);
        if !env_keys.is_empty() {
            self.api_keys = env_keys;
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }
}

/// `KEY1`, `KEY2`, ... until the first missing index, then `RAPIDAPI_KEYS`.
fn keys_from_env<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys = Vec::new();
    for i in 1..=MAX_INDEXED_KEYS {
        match lookup(&format!("KEY{i}")) {
            Some(k) => keys.push(k),
            None => break,
        }
    }
    if let Some(list) = lookup("RAPIDAPI_KEYS") {
        keys.extend(split_list(&list));
    }
    clean_list(keys)
}

fn split_list(s: &str) -> Vec<String> {
    clean_list(s.split(',').map(str::to_string).collect())
}

/// Trim and drop blanks; order is kept.
fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty())
        .collect()
}
