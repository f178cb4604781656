//! Capability table for named remote services.
//!
//! Every concrete API client is wrapped once in a [`ServiceClient`] adapter
//! that declares, per operation, whether it paginates and which fields carry
//! the tokens. The invoker reads this table instead of inspecting clients.

use async_trait::async_trait;
use of_common::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::ServiceError;

/// One request or response body: a JSON object keyed by API field name.
pub type Page = Map<String, Value>;

/// Pagination contract of a pageable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSpec {
    /// Request field receiving the continuation token
    pub input_token: &'static str,
    /// Response field carrying the next continuation token
    pub output_token: &'static str,
    /// Response field holding the page's items
    pub result_key: &'static str,
}

impl PaginationSpec {
    /// The common `NextToken` in / `NextToken` out shape.
    pub const fn next_token(result_key: &'static str) -> Self {
        Self {
            input_token: "NextToken",
            output_token: "NextToken",
            result_key,
        }
    }
}

/// Declared capabilities of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub pagination: Option<PaginationSpec>,
}

impl OperationSpec {
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            pagination: None,
        }
    }

    pub const fn paged(name: &'static str, pagination: PaginationSpec) -> Self {
        Self {
            name,
            pagination: Some(pagination),
        }
    }

    pub fn is_pageable(&self) -> bool {
        self.pagination.is_some()
    }
}

/// Constructor parameters for a remote-call client.
///
/// Each invocation builds a private client from these, so a tree node or a
/// fan-out task can be bound to its own credentials and region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientParams {
    pub region: Option<String>,
    pub credentials: Option<Credentials>,
    pub endpoint_url: Option<String>,
    /// Transport-level attempts per request, including the first
    pub max_attempts: Option<u32>,
}

impl ClientParams {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Adapter over one concrete remote API client.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Canonical service name (e.g. "organizations")
    fn service_name(&self) -> &str;

    /// Capability table: every operation this adapter can execute
    fn operations(&self) -> &[OperationSpec];

    /// Look up an operation by name, ignoring ASCII case
    fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations()
            .iter()
            .find(|op| op.name.eq_ignore_ascii_case(name))
    }

    /// Issue exactly one request for `operation` and return the raw response.
    ///
    /// `operation` is always a canonical name taken from [`Self::operations`].
    async fn call(&self, operation: &str, params: &Page) -> Result<Page, ServiceError>;
}

/// Builds a [`ServiceClient`] bound to the given constructor parameters.
pub trait ServiceFactory: Send + Sync {
    fn service_name(&self) -> &str;

    fn create(&self, params: &ClientParams) -> Result<Arc<dyn ServiceClient>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    const OPS: &[OperationSpec] = &[
        OperationSpec::paged("ListThings", PaginationSpec::next_token("Things")),
        OperationSpec::single("DescribeThing"),
    ];

    #[async_trait]
    impl ServiceClient for Empty {
        fn service_name(&self) -> &str {
            "things"
        }

        fn operations(&self) -> &[OperationSpec] {
            OPS
        }

        async fn call(&self, _operation: &str, _params: &Page) -> Result<Page, ServiceError> {
            Ok(Page::new())
        }
    }

    #[test]
    fn test_operation_lookup_ignores_case() {
        let client = Empty;
        assert_eq!(client.operation("listThings").map(|op| op.name), Some("ListThings"));
        assert!(client.operation("LISTTHINGS").unwrap().is_pageable());
        assert!(!client.operation("describething").unwrap().is_pageable());
        assert!(client.operation("DeleteThing").is_none());
    }

    #[test]
    fn test_client_params_from_json() {
        let params: ClientParams = serde_json::from_value(serde_json::json!({
            "region": "eu-west-1",
            "maxAttempts": 5
        }))
        .unwrap();
        assert_eq!(params.region.as_deref(), Some("eu-west-1"));
        assert_eq!(params.max_attempts, Some(5));
        assert!(params.credentials.is_none());
    }
}
