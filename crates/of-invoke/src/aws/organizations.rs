//! AWS Organizations adapter
//!
//! Responses are rendered with the API's own field names (`Accounts`,
//! `OrganizationalUnits`, `NextToken`, ...).

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::config::retry::RetryConfig;
use aws_sdk_organizations::config::{Builder, Region};
use aws_sdk_organizations::types::{Account, ChildType, Organization, OrganizationalUnit, Root};
use aws_sdk_organizations::Client;
use serde_json::Value;
use std::sync::Arc;

use super::{sdk_error, static_credentials, timestamp};
use crate::params::{insert_opt, optional_i32, optional_str, required_str};
use crate::{
    ClientParams, OperationSpec, Page, PaginationSpec, ServiceClient, ServiceError, ServiceFactory,
};

pub const SERVICE_NAME: &str = "organizations";

/// Organizations is a global service homed in us-east-1.
const DEFAULT_REGION: &str = "us-east-1";

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::paged("ListRoots", PaginationSpec::next_token("Roots")),
    OperationSpec::single("DescribeOrganization"),
    OperationSpec::paged("ListAccounts", PaginationSpec::next_token("Accounts")),
    OperationSpec::paged("ListAccountsForParent", PaginationSpec::next_token("Accounts")),
    OperationSpec::paged(
        "ListOrganizationalUnitsForParent",
        PaginationSpec::next_token("OrganizationalUnits"),
    ),
    OperationSpec::paged("ListChildren", PaginationSpec::next_token("Children")),
    OperationSpec::paged("ListParents", PaginationSpec::next_token("Parents")),
    OperationSpec::single("DescribeOrganizationalUnit"),
    OperationSpec::single("DescribeAccount"),
];

pub struct OrganizationsFactory {
    base: SdkConfig,
}

impl OrganizationsFactory {
    pub fn new(base: SdkConfig) -> Self {
        Self { base }
    }
}

impl ServiceFactory for OrganizationsFactory {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    fn create(&self, params: &ClientParams) -> Result<Arc<dyn ServiceClient>, ServiceError> {
        let mut builder = Builder::from(&self.base);

        match &params.region {
            Some(region) => builder = builder.region(Region::new(region.clone())),
            None if self.base.region().is_none() => {
                builder = builder.region(Region::new(DEFAULT_REGION))
            }
            None => {}
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

        Ok(Arc::new(OrganizationsService {
            client: Client::from_conf(builder.build()),
        }))
    }
}

pub struct OrganizationsService {
    client: Client,
}

impl OrganizationsService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_roots(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .list_roots()
            .set_next_token(optional_str(params, "NextToken")?)
            .set_max_results(optional_i32(params, "MaxResults")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        page.insert("Roots".into(), output.roots().iter().map(root_json).collect());
        insert_opt(&mut page, "NextToken", output.next_token());
        Ok(page)
    }

    async fn describe_organization(&self) -> Result<Page, ServiceError> {
        let output = self
            .client
            .describe_organization()
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        if let Some(org) = output.organization() {
            page.insert("Organization".into(), organization_json(org));
        }
        Ok(page)
    }

    async fn list_accounts(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .list_accounts()
            .set_next_token(optional_str(params, "NextToken")?)
            .set_max_results(optional_i32(params, "MaxResults")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        page.insert("Accounts".into(), output.accounts().iter().map(account_json).collect());
        insert_opt(&mut page, "NextToken", output.next_token());
        Ok(page)
    }

    async fn list_accounts_for_parent(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .list_accounts_for_parent()
            .parent_id(required_str(params, "ParentId")?)
            .set_next_token(optional_str(params, "NextToken")?)
            .set_max_results(optional_i32(params, "MaxResults")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        page.insert("Accounts".into(), output.accounts().iter().map(account_json).collect());
        insert_opt(&mut page, "NextToken", output.next_token());
        Ok(page)
    }

    async fn list_organizational_units_for_parent(
        &self,
        params: &Page,
    ) -> Result<Page, ServiceError> {
        let output = self
            .client
            .list_organizational_units_for_parent()
            .parent_id(required_str(params, "ParentId")?)
            .set_next_token(optional_str(params, "NextToken")?)
            .set_max_results(optional_i32(params, "MaxResults")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        page.insert(
            "OrganizationalUnits".into(),
            output.organizational_units().iter().map(ou_json).collect(),
        );
        insert_opt(&mut page, "NextToken", output.next_token());
        Ok(page)
    }

    async fn list_children(&self, params: &Page) -> Result<Page, ServiceError> {
        let child_type = required_str(params, "ChildType")?;
        let output = self
            .client
            .list_children()
            .parent_id(required_str(params, "ParentId")?)
            .child_type(ChildType::from(child_type.as_str()))
            .set_next_token(optional_str(params, "NextToken")?)
            .set_max_results(optional_i32(params, "MaxResults")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let children = output
            .children()
            .iter()
            .map(|child| {
                let mut entry = Page::new();
                insert_opt(&mut entry, "Id", child.id());
                insert_opt(&mut entry, "Type", child.r#type().map(|t| t.as_str()));
                Value::Object(entry)
            })
            .collect();

        let mut page = Page::new();
        page.insert("Children".into(), children);
        insert_opt(&mut page, "NextToken", output.next_token());
        Ok(page)
    }

    async fn list_parents(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .list_parents()
            .child_id(required_str(params, "ChildId")?)
            .set_next_token(optional_str(params, "NextToken")?)
            .set_max_results(optional_i32(params, "MaxResults")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let parents = output
            .parents()
            .iter()
            .map(|parent| {
                let mut entry = Page::new();
                insert_opt(&mut entry, "Id", parent.id());
                insert_opt(&mut entry, "Type", parent.r#type().map(|t| t.as_str()));
                Value::Object(entry)
            })
            .collect();

        let mut page = Page::new();
        page.insert("Parents".into(), parents);
        insert_opt(&mut page, "NextToken", output.next_token());
        Ok(page)
    }

    async fn describe_organizational_unit(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .describe_organizational_unit()
            .organizational_unit_id(required_str(params, "OrganizationalUnitId")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        if let Some(ou) = output.organizational_unit() {
            page.insert("OrganizationalUnit".into(), ou_json(ou));
        }
        Ok(page)
    }

    async fn describe_account(&self, params: &Page) -> Result<Page, ServiceError> {
        let output = self
            .client
            .describe_account()
            .account_id(required_str(params, "AccountId")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut page = Page::new();
        if let Some(account) = output.account() {
            page.insert("Account".into(), account_json(account));
        }
        Ok(page)
    }
}

#[async_trait]
impl ServiceClient for OrganizationsService {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    fn operations(&self) -> &[OperationSpec] {
        OPERATIONS
    }

    async fn call(&self, operation: &str, params: &Page) -> Result<Page, ServiceError> {
        match operation {
            "ListRoots" => self.list_roots(params).await,
            "DescribeOrganization" => self.describe_organization().await,
            "ListAccounts" => self.list_accounts(params).await,
            "ListAccountsForParent" => self.list_accounts_for_parent(params).await,
            "ListOrganizationalUnitsForParent" => {
                self.list_organizational_units_for_parent(params).await
            }
            "ListChildren" => self.list_children(params).await,
            "ListParents" => self.list_parents(params).await,
            "DescribeOrganizationalUnit" => self.describe_organizational_unit(params).await,
            "DescribeAccount" => self.describe_account(params).await,
            other => Err(ServiceError::new(format!(
                "Operation {} is not supported by the {} adapter",
                other, SERVICE_NAME
            ))),
        }
    }
}

fn root_json(root: &Root) -> Value {
    let mut entry = Page::new();
    insert_opt(&mut entry, "Id", root.id());
    insert_opt(&mut entry, "Arn", root.arn());
    insert_opt(&mut entry, "Name", root.name());
    Value::Object(entry)
}

fn ou_json(ou: &OrganizationalUnit) -> Value {
    let mut entry = Page::new();
    insert_opt(&mut entry, "Id", ou.id());
    insert_opt(&mut entry, "Arn", ou.arn());
    insert_opt(&mut entry, "Name", ou.name());
    Value::Object(entry)
}

#[allow(deprecated)]
fn account_json(account: &Account) -> Value {
    let mut entry = Page::new();
    insert_opt(&mut entry, "Id", account.id());
    insert_opt(&mut entry, "Arn", account.arn());
    insert_opt(&mut entry, "Email", account.email());
    insert_opt(&mut entry, "Name", account.name());
    insert_opt(&mut entry, "Status", account.status().map(|s| s.as_str()));
    insert_opt(&mut entry, "JoinedMethod", account.joined_method().map(|m| m.as_str()));
    if let Some(joined) = account.joined_timestamp() {
        entry.insert("JoinedTimestamp".into(), timestamp(joined));
    }
    Value::Object(entry)
}

fn organization_json(org: &Organization) -> Value {
    let mut entry = Page::new();
    insert_opt(&mut entry, "Id", org.id());
    insert_opt(&mut entry, "Arn", org.arn());
    insert_opt(&mut entry, "FeatureSet", org.feature_set().map(|f| f.as_str()));
    insert_opt(&mut entry, "MasterAccountArn", org.master_account_arn());
    insert_opt(&mut entry, "MasterAccountId", org.master_account_id());
    insert_opt(&mut entry, "MasterAccountEmail", org.master_account_email());
    Value::Object(entry)
}
