//! AWS service adapters
//!
//! The shared AWS configuration (region, profile, credential chain) is loaded
//! once; every invocation then builds its own SDK client from it, overlaid
//! with the call's [`ClientParams`](crate::ClientParams).

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_organizations::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_organizations::primitives::DateTime;
use chrono::SecondsFormat;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::{ServiceError, ServiceRegistry};

mod organizations;
mod sts;

pub use organizations::{OrganizationsFactory, OrganizationsService};
pub use sts::{StsFactory, StsService};

/// Provider name attached to credentials passed in through `ClientParams`.
const STATIC_PROVIDER_NAME: &str = "orgfleet";

/// Loaded AWS configuration shared by all AWS adapters.
#[derive(Debug, Clone)]
pub struct AwsServices {
    base: SdkConfig,
}

impl AwsServices {
    /// Load the default AWS configuration chain.
    ///
    /// # Arguments
    /// * `region` - Optional region override (uses the chain's region otherwise)
    /// * `profile` - Optional named profile from the shared config files
    pub async fn load(region: Option<String>, profile: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let base = loader.load().await;

        info!(
            region = ?base.region().map(|r| r.as_ref().to_string()),
            "Loaded AWS configuration"
        );

        Self { base }
    }

    pub fn from_config(base: SdkConfig) -> Self {
        Self { base }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.base
    }

    /// Register the Organizations and STS adapters.
    pub fn register(&self, registry: &mut ServiceRegistry) {
        registry.register(Arc::new(OrganizationsFactory::new(self.base.clone())));
        registry.register(Arc::new(StsFactory::new(self.base.clone())));
    }

    /// A registry holding only the AWS adapters.
    pub fn registry(&self) -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        self.register(&mut registry);
        registry
    }
}

fn static_credentials(creds: &of_common::Credentials) -> aws_sdk_sts::config::Credentials {
    aws_sdk_sts::config::Credentials::new(
        creds.access_key_id.clone(),
        creds.secret_access_key.clone(),
        Some(creds.session_token.clone()),
        creds.expiration.map(std::time::SystemTime::from),
        STATIC_PROVIDER_NAME,
    )
}

/// Convert an SDK failure, keeping the remote error code.
fn sdk_error<E, R>(err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err.code() {
        Some(code) => ServiceError::with_code(code, message),
        None => ServiceError::new(message),
    }
}

/// RFC 3339 rendering of an SDK timestamp.
fn timestamp(value: &DateTime) -> Value {
    chrono::DateTime::<chrono::Utc>::from_timestamp(value.secs(), value.subsec_nanos())
        .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or(Value::Null)
}
