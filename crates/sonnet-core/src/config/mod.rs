//! Runtime configuration for the engine.
//!
//! `SonnetConfig` groups the remote store endpoint and the sync log
//! housekeeping schedule. Clients load it from JSON (or build it directly) and
//! must call [`SonnetConfig::validate`] before use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_TABLE: &str = "blogs";
const DEFAULT_RETENTION_DAYS: u64 = 30;
const DEFAULT_INTERVAL_SECS: u64 = 60 * 60;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Remote store endpoint (a PostgREST/Supabase project).
///
/// The anon key is public and safe to ship; the per-user access token is not
/// part of this config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            table: default_table(),
        }
    }

    /// Trim values, drop the trailing slash and reject unusable settings.
    pub fn validate(self) -> Result<Self> {
        let url = normalize_required_value(self.url, "url")?;
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(
                "remote field 'url' must include http:// or https://".to_string(),
            ));
        }
        let anon_key = normalize_required_value(self.anon_key, "anon_key")?;
        let table = normalize_text_option(Some(self.table)).unwrap_or_else(default_table);
        if !table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::InvalidInput(format!(
                "remote field 'table' is not a plain identifier: {table}"
            )));
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            table,
        })
    }
}

/// Sync log retention schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HousekeepingConfig {
    /// Log entries older than this many days are pruned
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Seconds between pruning passes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_retention_days() -> u64 {
    DEFAULT_RETENTION_DAYS
}

const fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl HousekeepingConfig {
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(SECS_PER_DAY))
    }

    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(self) -> Result<Self> {
        if self.retention_days == 0 {
            return Err(Error::InvalidInput(
                "housekeeping 'retention_days' must be at least 1".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(Error::InvalidInput(
                "housekeeping 'interval_secs' must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SonnetConfig {
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
}

impl SonnetConfig {
    /// Parse and validate a JSON config payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::InvalidInput(format!("invalid config JSON: {error}")))?;
        config.validate()
    }

    pub fn validate(self) -> Result<Self> {
        Ok(Self {
            remote: self.remote.map(RemoteConfig::validate).transpose()?,
            housekeeping: self.housekeeping.validate()?,
        })
    }
}

fn normalize_required_value(raw: String, field: &str) -> Result<String> {
    normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput(format!("remote field '{field}' is required")))
}
