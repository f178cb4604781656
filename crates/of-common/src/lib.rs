//! OrgFleet shared types
//!
//! Value types passed between the invoker, the directory builder and the
//! fan-out executor, plus the logging setup used by every binary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod logging;

/// Role assumed in every account when no role name is configured.
pub const DEFAULT_ROLE_NAME: &str = "OrganizationAccountAccessRole";
/// Session name used when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "orgfleet";
/// Assumed-role session lifetime in seconds (STS default).
pub const DEFAULT_DURATION_SECONDS: u32 = 3600;

// ============================================================================
// Credentials
// ============================================================================

/// Temporary credentials scoped to one account and one assumed-role session.
///
/// Field names follow the STS response shape so the value can be lifted
/// straight out of an `AssumeRole` result. The `Debug` output never contains
/// the secret key or the session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration: None,
        }
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &"***")
            .field("expiration", &self.expiration)
            .finish()
    }
}

// ============================================================================
// Role Assumption
// ============================================================================

/// Template for the role assumed in each target account.
///
/// The concrete role ARN is derived per account by binding `role_name` into
/// that account's namespace, see [`RoleAssumptionSpec::role_arn`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoleAssumptionSpec {
    pub role_name: String,
    pub session_name: String,
    pub external_id: Option<String>,
    pub duration_seconds: u32,
}

impl Default for RoleAssumptionSpec {
    fn default() -> Self {
        Self {
            role_name: DEFAULT_ROLE_NAME.to_string(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            external_id: None,
            duration_seconds: DEFAULT_DURATION_SECONDS,
        }
    }
}

impl RoleAssumptionSpec {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            ..Self::default()
        }
    }

    /// Role ARN for `account_id` in the given partition (`aws`, `aws-cn`, ...).
    ///
    /// A role name carrying an IAM path (`path/to/Role`) keeps its path.
    pub fn role_arn(&self, partition: &str, account_id: &str) -> String {
        let role_name = self.role_name.trim_start_matches('/');
        format!("arn:{}:iam::{}:role/{}", partition, account_id, role_name)
    }
}

/// Partition segment of an ARN, `aws` when the value is not an ARN.
pub fn partition_of(arn: &str) -> &str {
    let mut parts = arn.split(':');
    match (parts.next(), parts.next()) {
        (Some("arn"), Some(partition)) if !partition.is_empty() => partition,
        _ => "aws",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_arn() {
        let spec = RoleAssumptionSpec::new("Auditor");
        assert_eq!(
            spec.role_arn("aws", "111122223333"),
            "arn:aws:iam::111122223333:role/Auditor"
        );

        let spec = RoleAssumptionSpec::new("/ops/Auditor");
        assert_eq!(
            spec.role_arn("aws-us-gov", "111122223333"),
            "arn:aws-us-gov:iam::111122223333:role/ops/Auditor"
        );
    }

    #[test]
    fn test_partition_of() {
        assert_eq!(partition_of("arn:aws-cn:organizations::1:account/o-1/2"), "aws-cn");
        assert_eq!(partition_of("arn:aws:organizations::1:root/o-1/r-1"), "aws");
        assert_eq!(partition_of("not-an-arn"), "aws");
        assert_eq!(partition_of(""), "aws");
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials::new("AKIAEXAMPLE", "very-secret", "token-value");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("AKIAEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("token-value"));
    }

    #[test]
    fn test_credentials_from_sts_shape() {
        let value = serde_json::json!({
            "AccessKeyId": "AKIA",
            "SecretAccessKey": "secret",
            "SessionToken": "token",
            "Expiration": "2026-10-19T12:00:00Z"
        });
        let creds: Credentials = serde_json::from_value(value).unwrap();
        assert_eq!(creds.access_key_id, "AKIA");
        assert!(creds.expiration.is_some());
    }

    #[test]
    fn test_role_spec_defaults() {
        let spec = RoleAssumptionSpec::default();
        assert_eq!(spec.role_name, DEFAULT_ROLE_NAME);
        assert_eq!(spec.session_name, DEFAULT_SESSION_NAME);
        assert_eq!(spec.duration_seconds, 3600);
        assert!(spec.external_id.is_none());
    }
}
