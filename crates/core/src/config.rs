use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

/// File name `napthe init` writes and the binary reads by default.
pub const CONFIG_FILE_NAME: &str = "napthe.yaml";

pub const DEFAULT_API_URL: &str = "https://trumthe.vn/chargingws/v2";

pub const ENV_PARTNER_ID: &str = "NAPTHE_PARTNER_ID";
pub const ENV_PARTNER_KEY: &str = "NAPTHE_PARTNER_KEY";
pub const ENV_API_URL: &str = "NAPTHE_API_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("partner_id is not configured")]
    MissingPartnerId,
    #[error("partner_key is not configured")]
    MissingPartnerKey,
    #[error("Invalid api_url {0}: {1}")]
    InvalidApiUrl(String, url::ParseError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    #[error("{} not found at {}. Run `napthe init` to create one.", CONFIG_FILE_NAME, .0.display())]
    FileNotFound(std::path::PathBuf),
    #[error("Failed to read {}: {}", .0.display(), .1)]
    ReadError(std::path::PathBuf, std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    ParseError(std::path::PathBuf, serde_yml::Error),
}

/// Minimum spacing between two provider calls of the same kind, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CooldownConfig {
    pub charge: u64,
    pub check: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            charge: 2,
            check: 1,
        }
    }
}

/// Timing of the periodic sweep and of accelerated rechecks, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval: u64,
    /// A payment younger than this is never checked.
    pub min_age: u64,
    /// A payment still pending past this age gets an accelerated recheck chain.
    pub stale_after: u64,
    pub recheck_interval: u64,
    pub recheck_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: 30,
            min_age: 30,
            stale_after: 60,
            recheck_interval: 5,
            recheck_attempts: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AntiSpamConfig {
    /// Per-player spacing between two submissions, in seconds.
    pub form_cooldown: u64,
}

impl Default for AntiSpamConfig {
    fn default() -> Self {
        Self { form_cooldown: 5 }
    }
}

/// NapThe configuration file
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NapTheConfig {
    pub partner_id: String,
    pub partner_key: String,
    pub api_url: String,
    /// Per-request timeout in seconds
    pub api_timeout: u64,
    pub cooldowns: CooldownConfig,
    pub reconcile: ReconcileConfig,
    pub anti_spam: AntiSpamConfig,
    /// Multiplier applied by the host when crediting a donation
    pub bonus: i64,
    pub log_level: String,
}

impl Default for NapTheConfig {
    fn default() -> Self {
        Self {
            partner_id: String::new(),
            partner_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: 10,
            cooldowns: CooldownConfig::default(),
            reconcile: ReconcileConfig::default(),
            anti_spam: AntiSpamConfig::default(),
            bonus: 1,
            log_level: "info".to_string(),
        }
    }
}

impl std::fmt::Debug for NapTheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NapTheConfig")
            .field("partner_id", &self.partner_id)
            .field("partner_key", &redact(&self.partner_key))
            .field("api_url", &self.api_url)
            .field("api_timeout", &self.api_timeout)
            .field("cooldowns", &self.cooldowns)
            .field("reconcile", &self.reconcile)
            .field("anti_spam", &self.anti_spam)
            .field("bonus", &self.bonus)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

/// Partner id and secret, validated non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub partner_id: String,
    pub partner_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("partner_id", &self.partner_id)
            .field("partner_key", &redact(&self.partner_key))
            .finish()
    }
}

impl NapTheConfig {
    /// Load configuration from the specified file path
    pub fn load(path: &Path) -> Result<Self, LoadConfigError> {
        if !path.exists() {
            return Err(LoadConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| LoadConfigError::ReadError(path.to_path_buf(), e))?;

        Self::from_yaml(&content).map_err(|e| LoadConfigError::ParseError(path.to_path_buf(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }

    /// Overlay `NAPTHE_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay `NAPTHE_*` variables resolved through `lookup`. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(id) = lookup(ENV_PARTNER_ID) {
            self.partner_id = id;
        }
        if let Some(key) = lookup(ENV_PARTNER_KEY) {
            self.partner_key = key;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let partner_id = self.partner_id.trim();
        let partner_key = self.partner_key.trim();
        if partner_id.is_empty() {
            return Err(ConfigError::MissingPartnerId);
        }
        if partner_key.is_empty() {
            return Err(ConfigError::MissingPartnerKey);
        }
        Ok(Credentials {
            partner_id: partner_id.to_string(),
            partner_key: partner_key.to_string(),
        })
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidApiUrl(self.api_url.clone(), e))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout.max(1))
    }

    pub fn form_cooldown(&self) -> Duration {
        Duration::from_secs(self.anti_spam.form_cooldown.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = NapTheConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.api_timeout(), Duration::from_secs(10));
        assert_eq!(config.cooldowns, CooldownConfig { charge: 2, check: 1 });
        assert_eq!(config.reconcile.min_age, 30);
        assert_eq!(config.reconcile.stale_after, 60);
        assert_eq!(config.reconcile.recheck_interval, 5);
        assert_eq!(config.reconcile.recheck_attempts, 12);
        assert_eq!(config.form_cooldown(), Duration::from_secs(5));
        assert_eq!(config.bonus, 1);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = NapTheConfig::from_yaml(
            "partner_id: \"123\"\npartner_key: secret\nreconcile:\n  interval: 10\n",
        )
        .unwrap();
        assert_eq!(config.partner_id, "123");
        assert_eq!(config.reconcile.interval, 10);
        assert_eq!(config.reconcile.min_age, 30);
        assert_eq!(config.cooldowns.charge, 2);
    }

    #[test]
    fn test_yaml_round_trip_through_init_output() {
        let yaml = NapTheConfig::default().to_yaml().unwrap();
        let parsed = NapTheConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.api_url, DEFAULT_API_URL);
        assert_eq!(parsed.reconcile, ReconcileConfig::default());
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = NapTheConfig::default();
        assert!(matches!(config.credentials(), Err(ConfigError::MissingPartnerId)));
        config.partner_id = "42".into();
        config.partner_key = "   ".into();
        assert!(matches!(config.credentials(), Err(ConfigError::MissingPartnerKey)));
        config.partner_key = "k".into();
        assert_eq!(config.credentials().unwrap().partner_id, "42");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_PARTNER_ID, "env-id"),
            (ENV_PARTNER_KEY, ""),
            (ENV_API_URL, "http://localhost:9999/charge"),
        ]);
        let mut config = NapTheConfig {
            partner_key: "file-key".into(),
            ..Default::default()
        };
        config.apply_env_with(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.partner_id, "env-id");
        assert_eq!(config.partner_key, "file-key");
        assert_eq!(config.api_url().unwrap().port(), Some(9999));
    }

    #[test]
    fn test_clamped_durations_and_bad_url() {
        let config = NapTheConfig {
            api_timeout: 0,
            anti_spam: AntiSpamConfig { form_cooldown: 0 },
            api_url: "not a url".into(),
            ..Default::default()
        };
        assert_eq!(config.api_timeout(), Duration::from_secs(1));
        assert_eq!(config.form_cooldown(), Duration::from_secs(1));
        assert!(matches!(config.api_url(), Err(ConfigError::InvalidApiUrl(..))));
    }

    #[test]
    fn test_secret_not_in_debug() {
        let config = NapTheConfig {
            partner_key: "topsecret".into(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("topsecret"));
    }
}
