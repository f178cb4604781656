//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Standard config file search paths, relative to the working directory
const CONFIG_PATHS: &[&str] = &["orgfleet.toml", "config.toml", "./config/orgfleet.toml"];

/// Per-user config file, relative to `$HOME`
const USER_CONFIG_PATH: &str = ".config/orgfleet/config.toml";

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file()? {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use.
    ///
    /// An explicit path must exist; the other candidates are skipped when
    /// missing.
    fn find_config_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Ok(Some(path.clone()));
            }
            return Err(ConfigError::NotFound(path.clone()));
        }

        if let Ok(path) = env::var("ORGFLEET_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(Some(path));
            }
            warn!(?path, "ORGFLEET_CONFIG points to a missing file, searching defaults");
        }

        let home = env::var_os("HOME").map(|home| PathBuf::from(home).join(USER_CONFIG_PATH));
        Ok(CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .chain(home)
            .find(|path| path.exists()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `ORGFLEET_*` overrides, reading values through `lookup`.
///
/// Unparseable numbers and booleans are ignored with a warning.
fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    // AWS
    if let Some(val) = lookup("ORGFLEET_REGION") {
        config.aws.region = Some(val);
    }
    if let Some(val) = lookup("ORGFLEET_PROFILE") {
        config.aws.profile = Some(val);
    }
    if let Some(val) = lookup("ORGFLEET_ENDPOINT_URL") {
        config.aws.endpoint_url = Some(val);
    }
    if let Some(attempts) = parsed(&lookup, "ORGFLEET_MAX_ATTEMPTS") {
        config.aws.max_attempts = Some(attempts);
    }

    // Role
    if let Some(val) = lookup("ORGFLEET_ROLE_NAME") {
        config.role.role_name = val;
    }
    if let Some(val) = lookup("ORGFLEET_SESSION_NAME") {
        config.role.session_name = val;
    }
    if let Some(val) = lookup("ORGFLEET_EXTERNAL_ID") {
        config.role.external_id = Some(val);
    }
    if let Some(duration) = parsed(&lookup, "ORGFLEET_DURATION_SECONDS") {
        config.role.duration_seconds = duration;
    }

    // Fan-out
    if let Some(limit) = parsed(&lookup, "ORGFLEET_MAX_CONCURRENCY") {
        config.fanout.max_concurrency = limit;
    }
    if let Some(skip) = parsed(&lookup, "ORGFLEET_SKIP_SUSPENDED") {
        config.fanout.skip_suspended = skip;
    }
    if let Some(val) = lookup("ORGFLEET_MANAGEMENT_ACCOUNT") {
        config.fanout.management_account = Some(val).filter(|v| !v.is_empty());
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let val = lookup(key)?;
    match val.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %val, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("ORGFLEET_REGION", "eu-west-1"),
                ("ORGFLEET_MAX_ATTEMPTS", "5"),
                ("ORGFLEET_ROLE_NAME", "Auditor"),
                ("ORGFLEET_DURATION_SECONDS", "900"),
                ("ORGFLEET_MAX_CONCURRENCY", "8"),
                ("ORGFLEET_SKIP_SUSPENDED", "true"),
                ("ORGFLEET_MANAGEMENT_ACCOUNT", "999999999999"),
            ]),
        );

        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.aws.max_attempts, Some(5));
        assert_eq!(config.role.role_name, "Auditor");
        assert_eq!(config.role.duration_seconds, 900);
        assert_eq!(config.fanout.max_concurrency, 8);
        assert!(config.fanout.skip_suspended);
        assert_eq!(config.fanout.management_account.as_deref(), Some("999999999999"));
    }

    #[test]
    fn test_unparseable_overrides_are_ignored() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("ORGFLEET_MAX_CONCURRENCY", "lots"),
                ("ORGFLEET_SKIP_SUSPENDED", "maybe"),
                ("ORGFLEET_MANAGEMENT_ACCOUNT", ""),
            ]),
        );

        assert_eq!(config.fanout.max_concurrency, 0);
        assert!(!config.fanout.skip_suspended);
        assert!(config.fanout.management_account.is_none());
    }

    #[test]
    fn test_explicit_path_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fanout]\nmax_concurrency = 4\n").unwrap();

        let config = ConfigLoader::with_path(file.path()).load().unwrap();
        assert_eq!(config.fanout.max_concurrency, 4);
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let err = ConfigLoader::with_path(&missing).load().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(path) if path == missing));
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[role]\nduration_seconds = 10\n").unwrap();

        let err = ConfigLoader::with_path(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
