//! AWS STS adapter

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::config::retry::RetryConfig;
use aws_sdk_sts::config::{Builder, Region};
use aws_sdk_sts::operation::assume_role::AssumeRoleOutput;
use aws_sdk_sts::Client;
use serde_json::json;
use std::sync::Arc;

use super::{sdk_error, static_credentials, timestamp};
use crate::params::{insert_opt, optional_i32, optional_str, required_str};
use crate::{ClientParams, OperationSpec, Page, ServiceClient, ServiceError, ServiceFactory};

pub const SERVICE_NAME: &str = "sts";

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::single("AssumeRole"),
    OperationSpec::single("GetCallerIdentity"),
];

pub struct StsFactory {
    base: SdkConfig,
}

impl StsFactory {
    pub fn new(base: SdkConfig) -> Self {
        Self { base }
    }
}

impl ServiceFactory for StsFactory {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    fn create(&self, params: &ClientParams) -> Result<Arc<dyn ServiceClient>, ServiceError> {
        let mut builder = Builder::from(&self.base);

        if let Some(region) = &params.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(creds) = &params.credentials {
            builder = builder.credentials_provider(static_credentials(creds));
        }
        if let Some(url) = &params.endpoint_url {
            builder = builder.endpoint_url(url.clone());
        }
        if let Some(attempts) = params.max_attempts {
            builder = builder.retry_config(RetryConfig::standard().with_max_attempts(attempts));
        }

        Ok(Arc::new(StsService {
            client: Client::from_conf(builder.build()),
        }))
    }
}

pub struct StsService {
    client: Client,
}

impl StsService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn assume_role(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .assume_role()
            .role_arn(required_str(params, "RoleArn")?)
            .role_session_name(required_str(params, "RoleSessionName")?)
            .set_external_id(optional_str(params, "ExternalId")?)
            .set_duration_seconds(optional_i32(params, "DurationSeconds")?)
            .set_policy(optional_str(params, "Policy")?)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(assume_role_page(&output))
    }

    async fn get_caller_identity(&self) -> Result<Page, ServiceError> {
        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        insert_opt(&mut page, "Account", output.account());
        insert_opt(&mut page, "Arn", output.arn());
        insert_opt(&mut page, "UserId", output.user_id());
        Ok(page)
    }
}

#[async_trait]
impl ServiceClient for StsService {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    fn operations(&self) -> &[OperationSpec] {
        OPERATIONS
    }

    async fn call(&self, operation: &str, params: &Page) -> Result<Page, ServiceError> {
        match operation {
            "AssumeRole" => self.assume_role(params).await,
            "GetCallerIdentity" => self.get_caller_identity().await,
            other => Err(ServiceError::new(format!(
                "Operation {} is not supported by the {} adapter",
                other, SERVICE_NAME
            ))),
        }
    }
}

fn assume_role_page(output: &AssumeRoleOutput) -> Page {
    let mut page = Page::new();
    if let Some(creds) = output.credentials() {
        page.insert(
            "Credentials".into(),
            json!({
                "AccessKeyId": creds.access_key_id,
                "SecretAccessKey": creds.secret_access_key,
                "SessionToken": creds.session_token,
                "Expiration": timestamp(&creds.expiration),
            }),
        );
    }
    if let Some(user) = output.assumed_role_user() {
        page.insert(
            "AssumedRoleUser".into(),
            json!({
                "Arn": user.arn,
                "AssumedRoleId": user.assumed_role_id,
            }),
        );
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sts::primitives::DateTime;
    use aws_sdk_sts::types::{AssumedRoleUser, Credentials};

    #[test]
    #[allow(deprecated)]
    fn test_assume_role_page_shape() {
        let output = AssumeRoleOutput::builder()
            .credentials(
                Credentials::builder()
                    .access_key_id("AKIAEXAMPLE")
                    .secret_access_key("secret")
                    .session_token("token")
                    .expiration(DateTime::from_secs(1_700_000_000))
                    .build()
                    .unwrap(),
            )
            .assumed_role_user(
                AssumedRoleUser::builder()
                    .arn("arn:aws:sts::111122223333:assumed-role/Admin/orgfleet")
                    .assumed_role_id("AROAEXAMPLE:orgfleet")
                    .build()
                    .unwrap(),
            )
            .packed_policy_size(12)
            .build();

        let page = assume_role_page(&output);
        assert_eq!(page["Credentials"]["AccessKeyId"], "AKIAEXAMPLE");
        assert_eq!(page["Credentials"]["Expiration"], "2023-11-14T22:13:20Z");
        assert_eq!(page["AssumedRoleUser"]["AssumedRoleId"], "AROAEXAMPLE:orgfleet");
        assert!(page.get("PackedPolicySize").is_none());
    }
}
