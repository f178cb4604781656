//! OrgFleet Configuration System
//!
//! TOML configuration with environment variable overrides. Every section is
//! optional; an absent file yields the defaults.

use of_common::{RoleAssumptionSpec, DEFAULT_DURATION_SECONDS, DEFAULT_ROLE_NAME, DEFAULT_SESSION_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// STS bounds for an assumed-role session, in seconds.
pub const MIN_DURATION_SECONDS: u32 = 900;
pub const MAX_DURATION_SECONDS: u32 = 43_200;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub aws: AwsConfig,
    pub role: RoleConfig,
    pub fanout: FanoutSettings,
}

/// Base AWS client settings, applied to every client the invoker builds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region; falls back to the AWS shared config when unset
    pub region: Option<String>,
    /// Named profile from the AWS shared config files
    pub profile: Option<String>,
    /// Endpoint override, e.g. a local emulator
    pub endpoint_url: Option<String>,
    /// Transport retry attempts per call
    pub max_attempts: Option<u32>,
}

/// Role assumed in each target account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub role_name: String,
    pub session_name: String,
    pub external_id: Option<String>,
    pub duration_seconds: u32,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            role_name: DEFAULT_ROLE_NAME.to_string(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            external_id: None,
            duration_seconds: DEFAULT_DURATION_SECONDS,
        }
    }
}

impl RoleConfig {
    pub fn to_spec(&self) -> RoleAssumptionSpec {
        RoleAssumptionSpec {
            role_name: self.role_name.clone(),
            session_name: self.session_name.clone(),
            external_id: self.external_id.clone(),
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Fan-out behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutSettings {
    /// Accounts processed at once, 0 for no limit
    pub max_concurrency: usize,
    pub skip_suspended: bool,
    /// Account to assume into before listing the organization
    pub management_account: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject values the remote API would refuse anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.role.role_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("role.role_name must not be empty".into()));
        }
        if self.role.session_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("role.session_name must not be empty".into()));
        }
        if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&self.role.duration_seconds) {
            return Err(ConfigError::ValidationError(format!(
                "role.duration_seconds must be between {} and {}, got {}",
                MIN_DURATION_SECONDS, MAX_DURATION_SECONDS, self.role.duration_seconds
            )));
        }
        if self.aws.max_attempts == Some(0) {
            return Err(ConfigError::ValidationError("aws.max_attempts must be at least 1".into()));
        }
        if let Some(account) = &self.fanout.management_account {
            if account.len() != 12 || !account.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ConfigError::ValidationError(format!(
                    "fanout.management_account must be a 12-digit account id, got {}",
                    account
                )));
            }
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# OrgFleet Configuration
# Environment variables (ORGFLEET_*) override these settings

[aws]
# region = "us-east-1"        # default: AWS shared config / AWS_REGION
# profile = "org-admin"       # named profile from ~/.aws/config
# endpoint_url = ""           # endpoint override, e.g. a local emulator
max_attempts = 3              # transport retries per call

[role]
role_name = "OrganizationAccountAccessRole"
session_name = "orgfleet"
# external_id = ""
duration_seconds = 3600       # 900 - 43200

[fanout]
max_concurrency = 0           # 0 = all accounts at once
skip_suspended = true
# management_account = "123456789012"  # assume into this account before listing
"#
        .to_string()
    }
}
