//! Runtime configuration read from `CARDIORISK_*` environment variables.
//!
//! Command-line flags override these values in the binary.

use std::path::PathBuf;

use ed25519_dalek::VerifyingKey;

use crate::adapters::artifact_file::decode_verifying_key;
use crate::domain::{ConfigurationError, RangeProfile, Schema};

pub const ARTIFACT_ENV: &str = "CARDIORISK_ARTIFACT";
pub const RANGE_PROFILE_ENV: &str = "CARDIORISK_RANGE_PROFILE";
pub const PARALLEL_ENV: &str = "CARDIORISK_PARALLEL";
pub const TRUSTED_KEY_ENV: &str = "CARDIORISK_TRUSTED_KEY_B64";
pub const LOG_MODE_ENV: &str = "CARDIORISK_LOG_MODE";
pub const LOG_FILE_ENV: &str = "CARDIORISK_LOG_FILE";

const DEFAULT_ARTIFACT: &str = "models/heart_model.json";
const DEFAULT_LOG_FILE: &str = "cardiorisk.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stderr" => Ok(Self::Stderr),
            "file" => Ok(Self::File),
            other => Err(format!("unknown log mode '{other}' (expected stderr or file)")),
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub artifact: PathBuf,
    pub profile: RangeProfile,
    pub parallel: bool,
    /// When set, artifacts must carry a manifest signed by this key.
    pub trusted_key: Option<VerifyingKey>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from(DEFAULT_ARTIFACT),
            profile: RangeProfile::default(),
            parallel: true,
            trusted_key: None,
            log_mode: LogMode::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigurationError::Setting` for any value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function.
    ///
    /// Unset and empty variables fall back to the defaults.
    ///
    /// # Errors
    /// Returns `ConfigurationError::Setting` for any value that cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let invalid = |name: &str, detail: String| ConfigurationError::Setting {
            name: name.to_string(),
            detail,
        };

        let mut config = Self::default();

        if let Some(path) = get(ARTIFACT_ENV) {
            config.artifact = PathBuf::from(path.trim());
        }
        if let Some(v) = get(RANGE_PROFILE_ENV) {
            config.profile = v.parse().map_err(|e| invalid(RANGE_PROFILE_ENV, e))?;
        }
        if let Some(v) = get(PARALLEL_ENV) {
            config.parallel = parse_bool(&v)
                .ok_or_else(|| invalid(PARALLEL_ENV, format!("not a boolean: '{v}'")))?;
        }
        if let Some(v) = get(TRUSTED_KEY_ENV) {
            let key = decode_verifying_key(&v).map_err(|e| invalid(TRUSTED_KEY_ENV, e.to_string()))?;
            config.trusted_key = Some(key);
        }
        if let Some(v) = get(LOG_MODE_ENV) {
            config.log_mode = v.parse().map_err(|e| invalid(LOG_MODE_ENV, e))?;
        }
        if let Some(path) = get(LOG_FILE_ENV) {
            config.log_file = PathBuf::from(path.trim());
        }

        Ok(config)
    }

    /// Schema for the configured range profile.
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema::new(self.profile)
    }
}

/// Parse the usual boolean spellings.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use ed25519_dalek::SigningKey;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigurationError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).expect("Should load");
        assert_eq!(config.artifact, PathBuf::from("models/heart_model.json"));
        assert_eq!(config.profile, RangeProfile::Standard);
        assert!(config.parallel);
        assert!(config.trusted_key.is_none());
        assert_eq!(config.log_mode, LogMode::Stderr);
    }

    #[test]
    fn test_overrides() {
        let key = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.as_bytes());
        let config = config_from(&[
            (ARTIFACT_ENV, "/srv/models/v3"),
            (RANGE_PROFILE_ENV, "Extended"),
            (PARALLEL_ENV, "no"),
            (TRUSTED_KEY_ENV, &b64),
            (LOG_MODE_ENV, "file"),
            (LOG_FILE_ENV, "/var/log/cardiorisk.log"),
        ])
        .expect("Should load");

        assert_eq!(config.artifact, PathBuf::from("/srv/models/v3"));
        assert_eq!(config.profile, RangeProfile::Extended);
        assert!(!config.parallel);
        assert_eq!(config.trusted_key, Some(key));
        assert_eq!(config.log_mode, LogMode::File);
        assert_eq!(config.schema().profile(), RangeProfile::Extended);
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = config_from(&[(RANGE_PROFILE_ENV, ""), (PARALLEL_ENV, "  ")]).expect("Should load");
        assert_eq!(config.profile, RangeProfile::Standard);
        assert!(config.parallel);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        for (name, value) in [
            (RANGE_PROFILE_ENV, "lenient"),
            (PARALLEL_ENV, "maybe"),
            (TRUSTED_KEY_ENV, "AAAA"),
            (LOG_MODE_ENV, "syslog"),
        ] {
            match config_from(&[(name, value)]) {
                Err(ConfigurationError::Setting { name: n, .. }) => assert_eq!(n, name),
                other => panic!("{name}={value}: expected setting error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
