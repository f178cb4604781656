//! Role assumption through the paged invoker

use of_common::{Credentials, RoleAssumptionSpec};
use of_invoke::{ClientParams, PagedCallDescriptor, PagedInvoker};
use serde_json::Value;
use tracing::debug;

use crate::TaskFailure;

/// Service answering `AssumeRole`.
pub const STS_SERVICE: &str = "sts";

/// Assume `role_arn` with the session settings of `spec`.
///
/// `client_params` carries the caller's own credentials and region; the
/// returned credentials are scoped to the assumed role.
pub async fn assume_role(
    invoker: &PagedInvoker,
    client_params: &ClientParams,
    spec: &RoleAssumptionSpec,
    role_arn: &str,
) -> Result<Credentials, TaskFailure> {
    let mut call = PagedCallDescriptor::new(STS_SERVICE, "AssumeRole")
        .client_params(client_params.clone())
        .param("RoleArn", role_arn)
        .param("RoleSessionName", spec.session_name.as_str())
        .param("DurationSeconds", spec.duration_seconds)
        .result_key("Credentials");
    if let Some(external_id) = &spec.external_id {
        call = call.param("ExternalId", external_id.as_str());
    }

    let output = invoker
        .invoke(&call)
        .await
        .map_err(|source| TaskFailure::RoleAssumption {
            role_arn: role_arn.to_string(),
            source,
        })?;

    let value = match output.value {
        Value::Null => {
            return Err(TaskFailure::InvalidCredentials {
                role_arn: role_arn.to_string(),
                message: "response carried no Credentials".to_string(),
            })
        }
        value => value,
    };

    let credentials: Credentials =
        serde_json::from_value(value).map_err(|e| TaskFailure::InvalidCredentials {
            role_arn: role_arn.to_string(),
            message: e.to_string(),
        })?;

    debug!(role_arn = %role_arn, expiration = ?credentials.expiration, "Assumed role");
    Ok(credentials)
}
