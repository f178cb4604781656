//! PagedInvoker - run one named operation against one named service
//!
//! - Pageable operations are followed to the last page, threading each
//!   page's output token into the next request
//! - Page payloads are merged key by key: arrays are appended, any other
//!   value is replaced by the latest page's
//! - A failure on any page fails the whole call; nothing partial is returned

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{ClientParams, InvokeError, Page, ServiceRegistry};

/// Key under which [`InvokeOutput::into_json`] attaches the pagination block.
pub const PAGINATION_METADATA_KEY: &str = "PaginationMetadata";

/// Full description of one remote call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PagedCallDescriptor {
    pub service_name: String,
    pub operation_name: String,
    pub constructor_params: ClientParams,
    pub operation_params: Page,
    pub result_key: Option<String>,
}

impl PagedCallDescriptor {
    pub fn new(service_name: impl Into<String>, operation_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            operation_name: operation_name.into(),
            ..Self::default()
        }
    }

    pub fn client_params(mut self, params: ClientParams) -> Self {
        self.constructor_params = params;
        self
    }

    /// Set the operation parameters. Non-object values are ignored.
    pub fn params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.operation_params = map;
        }
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operation_params.insert(key.into(), value.into());
        self
    }

    pub fn result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }
}

/// How a result was paginated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub pageable: bool,
    pub paged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// Merged result of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOutput {
    /// The selected result-key value, or the whole merged payload
    pub value: Value,
    pub pagination: PaginationMetadata,
    /// Result key that produced `value`, if one was requested
    pub result_key: Option<String>,
}

impl InvokeOutput {
    /// Consume into a list of items.
    ///
    /// An array yields its elements, null yields nothing, and any other
    /// value yields itself.
    pub fn into_items(self) -> Vec<Value> {
        match self.value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Consume into a JSON value.
    ///
    /// Without a result key the pagination block is attached to the merged
    /// payload under [`PAGINATION_METADATA_KEY`]; with one, the selected
    /// value is returned as-is.
    pub fn into_json(self) -> Value {
        match (self.result_key, self.value) {
            (None, Value::Object(mut map)) => {
                map.insert(
                    PAGINATION_METADATA_KEY.to_string(),
                    serde_json::to_value(self.pagination).unwrap_or(Value::Null),
                );
                Value::Object(map)
            }
            (_, value) => value,
        }
    }
}

/// Executes [`PagedCallDescriptor`]s against the services of a registry.
#[derive(Debug, Clone)]
pub struct PagedInvoker {
    registry: Arc<ServiceRegistry>,
}

impl PagedInvoker {
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_shared(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Positional form of [`PagedInvoker::invoke`].
    pub async fn call(
        &self,
        service_name: &str,
        operation_name: &str,
        constructor_params: &ClientParams,
        operation_params: Value,
        result_key: Option<&str>,
    ) -> Result<InvokeOutput, InvokeError> {
        let mut descriptor = PagedCallDescriptor::new(service_name, operation_name)
            .client_params(constructor_params.clone())
            .params(operation_params);
        descriptor.result_key = result_key.map(str::to_string);
        self.invoke(&descriptor).await
    }

    pub async fn invoke(&self, call: &PagedCallDescriptor) -> Result<InvokeOutput, InvokeError> {
        let client = self
            .registry
            .client(&call.service_name, &call.constructor_params)?;

        let spec = *client
            .operation(&call.operation_name)
            .ok_or_else(|| InvokeError::UnknownOperation {
                service: call.service_name.clone(),
                operation: call.operation_name.clone(),
            })?;

        let call_error = |page: u32, source| InvokeError::Call {
            service: client.service_name().to_string(),
            operation: spec.name.to_string(),
            page,
            source,
        };

        let mut merged = Page::new();
        let pagination = match spec.pagination {
            None => {
                merged = client
                    .call(spec.name, &call.operation_params)
                    .await
                    .map_err(|e| call_error(1, e))?;
                PaginationMetadata::default()
            }
            Some(paging) => {
                let mut params = call.operation_params.clone();
                let mut pages = 0u32;

                loop {
                    pages += 1;
                    let mut page = client
                        .call(spec.name, &params)
                        .await
                        .map_err(|e| call_error(pages, e))?;

                    let next_token = page
                        .remove(paging.output_token)
                        .and_then(|token| match token {
                            Value::String(s) if !s.is_empty() => Some(s),
                            _ => None,
                        });

                    let items = page
                        .get(paging.result_key)
                        .and_then(serde_json::Value::as_array)
                        .map(Vec::len);
                    debug!(
                        service = %client.service_name(),
                        operation = %spec.name,
                        page = pages,
                        items = ?items,
                        more = next_token.is_some(),
                        "Fetched page"
                    );

                    merge_page(&mut merged, page);

                    match next_token {
                        Some(token) => {
                            params.insert(paging.input_token.to_string(), Value::String(token));
                        }
                        None => break,
                    }
                }

                PaginationMetadata {
                    pageable: true,
                    paged: pages > 1,
                    pages: Some(pages),
                }
            }
        };

        let value = match &call.result_key {
            Some(key) => merged.remove(key).unwrap_or_else(|| {
                warn!(
                    service = %call.service_name,
                    operation = %call.operation_name,
                    result_key = %key,
                    "Result key not present in any response page"
                );
                Value::Null
            }),
            None => Value::Object(merged),
        };

        Ok(InvokeOutput {
            value,
            pagination,
            result_key: call.result_key.clone(),
        })
    }
}

/// Fold one page into the accumulator.
fn merge_page(acc: &mut Page, page: Page) {
    for (key, value) in page {
        match value {
            Value::Array(items) => match acc.get_mut(&key) {
                Some(Value::Array(existing)) => existing.extend(items),
                _ => {
                    acc.insert(key, Value::Array(items));
                }
            },
            other => {
                acc.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OperationSpec, PaginationSpec, ServiceClient, ServiceError, ServiceFactory};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    const OPS: &[OperationSpec] = &[
        OperationSpec::paged(
            "ListWidgets",
            PaginationSpec {
                input_token: "Marker",
                output_token: "NextMarker",
                result_key: "Widgets",
            },
        ),
        OperationSpec::single("GetStatus"),
    ];

    /// Three pages of widgets, optionally failing on one of them.
    struct Widgets {
        fail_on_page: Option<usize>,
        requests: Arc<Mutex<Vec<Page>>>,
    }

    fn pages() -> Vec<Value> {
        vec![
            json!({ "Widgets": ["a", "b"], "Owner": "first", "NextMarker": "m1" }),
            json!({ "Widgets": ["c"], "Owner": "second", "NextMarker": "m2" }),
            json!({ "Widgets": ["d", "e"], "Owner": "third" }),
        ]
    }

    #[async_trait]
    impl ServiceClient for Widgets {
        fn service_name(&self) -> &str {
            "widgets"
        }

        fn operations(&self) -> &[OperationSpec] {
            OPS
        }

        async fn call(&self, operation: &str, params: &Page) -> Result<Page, ServiceError> {
            self.requests.lock().push(params.clone());
            let index = match params.get("Marker").and_then(Value::as_str) {
                None => 0,
                Some("m1") => 1,
                Some("m2") => 2,
                Some(other) => return Err(ServiceError::new(format!("bad marker {}", other))),
            };
            if self.fail_on_page == Some(index + 1) {
                return Err(ServiceError::with_code("ThrottlingException", "slow down"));
            }
            match operation {
                "ListWidgets" => Ok(pages()[index].as_object().cloned().unwrap_or_default()),
                "GetStatus" => Ok(json!({ "Status": "OK", "Count": 3 })
                    .as_object()
                    .cloned()
                    .unwrap_or_default()),
                other => Err(ServiceError::new(format!("unexpected {}", other))),
            }
        }
    }

    struct WidgetsFactory {
        fail_on_page: Option<usize>,
        requests: Arc<Mutex<Vec<Page>>>,
    }

    impl ServiceFactory for WidgetsFactory {
        fn service_name(&self) -> &str {
            "Widgets"
        }

        fn create(&self, _params: &ClientParams) -> Result<Arc<dyn ServiceClient>, ServiceError> {
            Ok(Arc::new(Widgets {
                fail_on_page: self.fail_on_page,
                requests: self.requests.clone(),
            }))
        }
    }

    fn invoker(fail_on_page: Option<usize>) -> (PagedInvoker, Arc<Mutex<Vec<Page>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let registry = ServiceRegistry::new().with_service(Arc::new(WidgetsFactory {
            fail_on_page,
            requests: requests.clone(),
        }));
        (PagedInvoker::new(registry), requests)
    }

    #[tokio::test]
    async fn test_result_key_concatenates_pages_in_order() {
        let (invoker, requests) = invoker(None);
        let call = PagedCallDescriptor::new("widgets", "ListWidgets").result_key("Widgets");

        let output = invoker.invoke(&call).await.unwrap();

        assert_eq!(output.value, json!(["a", "b", "c", "d", "e"]));
        assert_eq!(
            output.pagination,
            PaginationMetadata { pageable: true, paged: true, pages: Some(3) }
        );

        let requests = requests.lock();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].get("Marker").is_none());
        assert_eq!(requests[1]["Marker"], "m1");
        assert_eq!(requests[2]["Marker"], "m2");
    }

    #[tokio::test]
    async fn test_full_merge_without_result_key() {
        let (invoker, _) = invoker(None);
        let output = invoker
            .call("WIDGETS", "listWidgets", &ClientParams::default(), json!({}), None)
            .await
            .unwrap();

        let map = output.value.as_object().unwrap();
        assert_eq!(map["Widgets"], json!(["a", "b", "c", "d", "e"]));
        assert_eq!(map["Owner"], "third");
        assert!(!map.contains_key("NextMarker"));

        let json = output.into_json();
        assert_eq!(
            json[PAGINATION_METADATA_KEY],
            json!({ "pageable": true, "paged": true, "pages": 3 })
        );
    }

    #[tokio::test]
    async fn test_single_page_is_not_paged() {
        let (invoker, _) = invoker(None);
        let call = PagedCallDescriptor::new("widgets", "ListWidgets")
            .param("Marker", "m2")
            .result_key("Widgets");

        let output = invoker.invoke(&call).await.unwrap();
        assert_eq!(output.value, json!(["d", "e"]));
        assert_eq!(
            output.pagination,
            PaginationMetadata { pageable: true, paged: false, pages: Some(1) }
        );
    }

    #[tokio::test]
    async fn test_non_pageable_returns_single_response() {
        let (invoker, requests) = invoker(None);
        let output = invoker
            .invoke(&PagedCallDescriptor::new("widgets", "GetStatus"))
            .await
            .unwrap();

        assert_eq!(requests.lock().len(), 1);
        assert_eq!(output.pagination, PaginationMetadata { pageable: false, paged: false, pages: None });
        assert_eq!(
            output.into_json(),
            json!({
                "Status": "OK",
                "Count": 3,
                "PaginationMetadata": { "pageable": false, "paged": false }
            })
        );
    }

    #[tokio::test]
    async fn test_missing_result_key_yields_null() {
        let (invoker, _) = invoker(None);
        let call = PagedCallDescriptor::new("widgets", "GetStatus").result_key("Nope");

        let output = invoker.invoke(&call).await.unwrap();
        assert_eq!(output.value, Value::Null);
        assert!(output.into_items().is_empty());
    }

    #[tokio::test]
    async fn test_failure_on_later_page_discards_everything() {
        let (invoker, requests) = invoker(Some(2));
        let call = PagedCallDescriptor::new("widgets", "ListWidgets").result_key("Widgets");

        let err = invoker.invoke(&call).await.unwrap_err();
        match &err {
            InvokeError::Call { service, operation, page, .. } => {
                assert_eq!(service, "widgets");
                assert_eq!(operation, "ListWidgets");
                assert_eq!(*page, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.code(), Some("ThrottlingException"));
        assert_eq!(requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_service_and_operation() {
        let (invoker, _) = invoker(None);

        let err = invoker
            .invoke(&PagedCallDescriptor::new("gadgets", "ListGadgets"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::UnknownService(ref s) if s == "gadgets"));

        let err = invoker
            .invoke(&PagedCallDescriptor::new("widgets", "DeleteWidget"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::UnknownOperation { .. }));
    }

    #[test]
    fn test_merge_page_rules() {
        let mut acc = Page::new();
        merge_page(&mut acc, json!({ "Items": [1], "Meta": { "a": 1 } }).as_object().cloned().unwrap());
        merge_page(&mut acc, json!({ "Items": [2, 3], "Meta": { "b": 2 }, "Extra": [9] }).as_object().cloned().unwrap());

        assert_eq!(acc["Items"], json!([1, 2, 3]));
        assert_eq!(acc["Meta"], json!({ "b": 2 }));
        assert_eq!(acc["Extra"], json!([9]));
    }
}
