use anyhow::{Context, Result};
use ip_reputation::{ReputationConfig, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "shield.yaml";
pub const DEFAULT_STORE_PATH: &str = "data/scan_logs.db";
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const API_KEY_ENV: &str = "ABUSEIPDB_API_KEY";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ModelsConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ReputationSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AlertsConfig {
    pub enabled: Option<bool>,
    /// Relay endpoint that receives `{recipient, subject, body}` as JSON.
    pub webhook_url: Option<String>,
    pub recipient: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub store: Option<StoreConfig>,
    pub models: Option<ModelsConfig>,
    pub reputation: Option<ReputationSection>,
    pub alerts: Option<AlertsConfig>,
}

impl Config {
    pub fn store_path(&self) -> PathBuf {
        self.store
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    pub fn models_dir(&self) -> PathBuf {
        self.models
            .as_ref()
            .and_then(|m| m.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR))
    }

    /// File values win over the environment key.
    pub fn reputation(&self, env_key: Option<String>) -> ReputationConfig {
        let sec = self.reputation.clone().unwrap_or_default();
        let defaults = ReputationConfig::default();
        ReputationConfig {
            base_url: sec.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: sec.api_key.or(env_key).filter(|k| !k.trim().is_empty()),
            timeout: sec.timeout_ms.map(Duration::from_millis).unwrap_or(defaults.timeout),
            max_age_days: sec.max_age_days.unwrap_or(defaults.max_age_days),
            use_system_proxy: true,
        }
    }

    pub fn alerts(&self) -> AlertsConfig {
        self.alerts.clone().unwrap_or_default()
    }
}

/// Explicit path must exist; otherwise `./shield.yaml` is used when present.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.exists() { p.to_path_buf() } else { return Ok(Config::default()); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let c: Config = serde_yaml::from_str("store:\n  path: /tmp/x.db\n").unwrap();
        assert_eq!(c.store_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(c.models_dir(), PathBuf::from(DEFAULT_MODELS_DIR));
        assert!(c.alerts().webhook_url.is_none());
    }

    #[test]
    fn reputation_key_precedence() {
        let c: Config = serde_yaml::from_str("reputation:\n  timeout_ms: 1500\n").unwrap();
        let r = c.reputation(Some("from-env".into()));
        assert_eq!(r.api_key.as_deref(), Some("from-env"));
        assert_eq!(r.timeout, Duration::from_millis(1500));
        assert_eq!(r.max_age_days, 90);

        let c: Config = serde_yaml::from_str("reputation:\n  api_key: from-file\n").unwrap();
        assert_eq!(c.reputation(Some("from-env".into())).api_key.as_deref(), Some("from-file"));
        assert_eq!(Config::default().reputation(Some(" ".into())).api_key, None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.yaml"))).is_err());
        let p = dir.path().join("shield.yaml");
        fs::write(&p, "alerts:\n  enabled: true\n  recipient: soc@example.org\n").unwrap();
        let c = load_config(Some(&p)).unwrap();
        assert_eq!(c.alerts().enabled, Some(true));
    }
}
