//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sonnet_core::util::normalize_text_option;
use sonnet_core::{HousekeepingConfig, RemoteConfig, SonnetConfig};

const CONFIG_FILE_NAME: &str = "cli-config.json";

pub const ENV_PROFILE: &str = "SONNET_PROFILE";
pub const ENV_SUPABASE_URL: &str = "SONNET_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SONNET_SUPABASE_ANON_KEY";
pub const ENV_ACCESS_TOKEN: &str = "SONNET_ACCESS_TOKEN";
pub const ENV_OWNER_ID: &str = "SONNET_OWNER_ID";
pub const ENV_LOG_RETENTION_DAYS: &str = "SONNET_LOG_RETENTION_DAYS";
pub const ENV_HOUSEKEEPING_INTERVAL_SECS: &str = "SONNET_HOUSEKEEPING_INTERVAL_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub housekeeping: Option<HousekeepingConfig>,
}

/// Profile values after environment overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub table: Option<String>,
    pub owner_id: Option<String>,
    pub access_token: Option<String>,
    pub housekeeping: HousekeepingConfig,
}

impl ResolvedSettings {
    /// Remote endpoint, when both URL and anon key are known
    pub fn remote_config(&self) -> Option<RemoteConfig> {
        let mut config = RemoteConfig::new(
            self.supabase_url.clone()?,
            self.supabase_anon_key.clone()?,
        );
        if let Some(table) = &self.table {
            config.table.clone_from(table);
        }
        Some(config)
    }

    /// Validated engine configuration for these settings
    pub fn engine_config(&self) -> sonnet_core::Result<SonnetConfig> {
        SonnetConfig {
            remote: self.remote_config(),
            housekeeping: self.housekeeping,
        }
        .validate()
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sonnet")
        .join(CONFIG_FILE_NAME)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(std::env::var(ENV_PROFILE).ok().as_deref()) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Overlay environment values (looked up through `env`) on this profile.
    ///
    /// Environment values win; blank values count as unset.
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> ResolvedSettings {
        let pick = |key: &str, fallback: &Option<String>| {
            normalize_text_option(env(key)).or_else(|| normalize_text_option(fallback.clone()))
        };

        let stored = self.housekeeping.unwrap_or_default();
        let housekeeping = HousekeepingConfig {
            retention_days: parse_number(&env, ENV_LOG_RETENTION_DAYS)
                .unwrap_or(stored.retention_days),
            interval_secs: parse_number(&env, ENV_HOUSEKEEPING_INTERVAL_SECS)
                .unwrap_or(stored.interval_secs),
        };

        ResolvedSettings {
            supabase_url: pick(ENV_SUPABASE_URL, &self.supabase_url),
            supabase_anon_key: pick(ENV_SUPABASE_ANON_KEY, &self.supabase_anon_key),
            table: normalize_text_option(self.table.clone()),
            owner_id: pick(ENV_OWNER_ID, &self.owner_id),
            access_token: normalize_text_option(env(ENV_ACCESS_TOKEN)),
            housekeeping,
        }
    }

    fn normalize(&mut self) {
        self.supabase_url = normalize_text_option(self.supabase_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.clone());
        self.table = normalize_text_option(self.table.clone());
        self.owner_id = normalize_text_option(self.owner_id.clone());
    }
}

fn parse_number(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = normalize_text_option(env(key))?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring non-numeric environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(
            normalize_profile_name(Some(" work ")),
            Some("work".to_string())
        );
    }

    #[test]
    fn config_roundtrip_normalizes_profiles() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                supabase_url: Some(" https://project.supabase.co/ ".to_string()),
                supabase_anon_key: Some(" anon-key ".to_string()),
                table: Some("   ".to_string()),
                owner_id: Some("owner-1".to_string()),
                housekeeping: None,
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        assert_eq!(
            loaded.profile("default"),
            Some(&CliProfile {
                supabase_url: Some("https://project.supabase.co".to_string()),
                supabase_anon_key: Some("anon-key".to_string()),
                table: None,
                owner_id: Some("owner-1".to_string()),
                housekeeping: None,
            })
        );
    }

    #[test]
    fn missing_config_file_loads_default() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name(Some("mobile")), "mobile");
        if std::env::var_os(ENV_PROFILE).is_none() {
            assert_eq!(config.resolve_profile_name(None), "work");
        }
    }

    #[test]
    fn environment_overrides_profile_values() {
        let profile = CliProfile {
            supabase_url: Some("https://profile.supabase.co".to_string()),
            supabase_anon_key: Some("profile-key".to_string()),
            table: Some("posts".to_string()),
            owner_id: Some("profile-owner".to_string()),
            housekeeping: None,
        };

        let resolved = profile.resolve_with(|key| match key {
            ENV_SUPABASE_URL => Some("https://env.supabase.co".to_string()),
            ENV_OWNER_ID => Some("  ".to_string()),
            ENV_ACCESS_TOKEN => Some("token".to_string()),
            _ => None,
        });

        assert_eq!(
            resolved,
            ResolvedSettings {
                supabase_url: Some("https://env.supabase.co".to_string()),
                supabase_anon_key: Some("profile-key".to_string()),
                table: Some("posts".to_string()),
                owner_id: Some("profile-owner".to_string()),
                access_token: Some("token".to_string()),
                housekeeping: HousekeepingConfig::default(),
            }
        );

        let remote = resolved.remote_config().unwrap();
        assert_eq!(remote.url, "https://env.supabase.co");
        assert_eq!(remote.table, "posts");
    }

    #[test]
    fn remote_config_needs_url_and_key() {
        let resolved = CliProfile::default().resolve_with(|_| None);
        assert_eq!(resolved.remote_config(), None);
        assert_eq!(resolved.access_token, None);
    }

    #[test]
    fn housekeeping_comes_from_profile_then_environment() {
        let profile = CliProfile {
            housekeeping: Some(HousekeepingConfig {
                retention_days: 7,
                interval_secs: 600,
            }),
            ..CliProfile::default()
        };

        let stored = profile.resolve_with(|_| None);
        assert_eq!(stored.housekeeping.retention_days, 7);
        assert_eq!(stored.housekeeping.interval_secs, 600);

        let overridden = profile.resolve_with(|key| match key {
            ENV_LOG_RETENTION_DAYS => Some(" 2 ".to_string()),
            ENV_HOUSEKEEPING_INTERVAL_SECS => Some("often".to_string()),
            _ => None,
        });
        assert_eq!(overridden.housekeeping.retention_days, 2);
        assert_eq!(overridden.housekeeping.interval_secs, 600);

        let engine = overridden.engine_config().unwrap();
        assert_eq!(engine.remote, None);
        assert_eq!(engine.housekeeping, overridden.housekeeping);
    }

    #[test]
    fn engine_config_rejects_zero_retention() {
        let resolved = CliProfile::default().resolve_with(|key| {
            (key == ENV_LOG_RETENTION_DAYS).then(|| "0".to_string())
        });
        let error = resolved.engine_config().unwrap_err();
        assert!(error.to_string().contains("retention_days"));
    }
}
