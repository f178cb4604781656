//! In-memory organization for tests
//!
//! [`FakeOrganization`] answers the Organizations operations the tree builder
//! uses, paginating every listing, and records each call it receives.

use async_trait::async_trait;
use of_invoke::{
    ClientParams, OperationSpec, Page, PagedInvoker, PaginationSpec, ServiceClient, ServiceError,
    ServiceFactory, ServiceRegistry,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

pub const ORG_ID: &str = "o-example123";
pub const ROOT_ID: &str = "r-ab12";
pub const MANAGEMENT_ACCOUNT_ID: &str = "999999999999";

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::paged("ListRoots", PaginationSpec::next_token("Roots")),
    OperationSpec::single("DescribeOrganization"),
    OperationSpec::paged("ListAccounts", PaginationSpec::next_token("Accounts")),
    OperationSpec::paged("ListAccountsForParent", PaginationSpec::next_token("Accounts")),
    OperationSpec::paged(
        "ListOrganizationalUnitsForParent",
        PaginationSpec::next_token("OrganizationalUnits"),
    ),
    OperationSpec::single("DescribeOrganizationalUnit"),
    OperationSpec::single("DescribeAccount"),
];

#[derive(Debug, Clone)]
struct FakeUnit {
    id: String,
    name: String,
    parent_id: String,
}

#[derive(Debug, Clone)]
struct FakeAccount {
    id: String,
    name: String,
    status: String,
    parent_id: String,
}

#[derive(Debug, Default)]
struct FakeState {
    units: Vec<FakeUnit>,
    accounts: Vec<FakeAccount>,
    page_size: usize,
    failing: HashSet<String>,
    calls: Vec<String>,
}

/// Organization snapshot served as the `organizations` service.
#[derive(Clone)]
pub struct FakeOrganization {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeOrganization {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOrganization {
    /// An empty organization with root [`ROOT_ID`] and two items per page.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                page_size: 2,
                ..FakeState::default()
            })),
        }
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().page_size = page_size.max(1);
        self
    }

    pub fn with_unit(self, id: &str, name: &str, parent_id: &str) -> Self {
        self.state.lock().units.push(FakeUnit {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        });
        self
    }

    pub fn with_account(self, id: &str, name: &str, parent_id: &str) -> Self {
        self.with_account_status(id, name, parent_id, "ACTIVE")
    }

    pub fn with_suspended_account(self, id: &str, name: &str, parent_id: &str) -> Self {
        self.with_account_status(id, name, parent_id, "SUSPENDED")
    }

    fn with_account_status(self, id: &str, name: &str, parent_id: &str, status: &str) -> Self {
        self.state.lock().accounts.push(FakeAccount {
            id: id.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            parent_id: parent_id.to_string(),
        });
        self
    }

    /// Make every call to `operation` fail with `AccessDeniedException`.
    pub fn failing(self, operation: &str) -> Self {
        self.state.lock().failing.insert(operation.to_string());
        self
    }

    /// Operation names received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == operation).count()
    }

    pub fn register(&self, registry: &mut ServiceRegistry) {
        registry.register(Arc::new(self.clone()));
    }

    /// An invoker whose registry holds only this organization.
    pub fn invoker(&self) -> PagedInvoker {
        let mut registry = ServiceRegistry::new();
        self.register(&mut registry);
        PagedInvoker::new(registry)
    }

    /// The sample layout: Root -> OU_A -> [Account1, Account2],
    /// Root -> OU_B -> [Account3].
    pub fn two_ou_sample() -> Self {
        Self::new()
            .with_unit("ou-ab12-aaaaaaaa", "OU_A", ROOT_ID)
            .with_unit("ou-ab12-bbbbbbbb", "OU_B", ROOT_ID)
            .with_account("111111111111", "Account1", "ou-ab12-aaaaaaaa")
            .with_account("222222222222", "Account2", "ou-ab12-aaaaaaaa")
            .with_account("333333333333", "Account3", "ou-ab12-bbbbbbbb")
    }

    fn root_json() -> Value {
        json!({
            "Id": ROOT_ID,
            "Arn": format!("arn:aws:organizations::{}:root/{}/{}", MANAGEMENT_ACCOUNT_ID, ORG_ID, ROOT_ID),
            "Name": "Root",
        })
    }

    fn unit_json(unit: &FakeUnit) -> Value {
        json!({
            "Id": unit.id,
            "Arn": format!("arn:aws:organizations::{}:ou/{}/{}", MANAGEMENT_ACCOUNT_ID, ORG_ID, unit.id),
            "Name": unit.name,
        })
    }

    fn account_json(account: &FakeAccount) -> Value {
        json!({
            "Id": account.id,
            "Arn": format!("arn:aws:organizations::{}:account/{}/{}", MANAGEMENT_ACCOUNT_ID, ORG_ID, account.id),
            "Name": account.name,
            "Email": format!("{}@example.com", account.name.to_lowercase()),
            "Status": account.status,
        })
    }

    fn paginate(&self, key: &str, items: Vec<Value>, params: &Page) -> Result<Page, ServiceError> {
        let page_size = self.state.lock().page_size;
        let start = match params.get("NextToken").and_then(Value::as_str) {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ServiceError::with_code("InvalidInputException", "bad token"))?,
            None => 0,
        };
        let end = (start + page_size).min(items.len());

        let mut page = Page::new();
        page.insert(key.to_string(), Value::Array(items[start.min(end)..end].to_vec()));
        if end < items.len() {
            page.insert("NextToken".to_string(), Value::String(end.to_string()));
        }
        Ok(page)
    }

    fn parent_param(params: &Page) -> Result<String, ServiceError> {
        params
            .get("ParentId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::validation("Missing required parameter: ParentId"))
    }
}

#[async_trait]
impl ServiceClient for FakeOrganization {
    fn service_name(&self) -> &str {
        "organizations"
    }

    fn operations(&self) -> &[OperationSpec] {
        OPERATIONS
    }

    async fn call(&self, operation: &str, params: &Page) -> Result<Page, ServiceError> {
        let (units, accounts) = {
            let mut state = self.state.lock();
            state.calls.push(operation.to_string());
            if state.failing.contains(operation) {
                return Err(ServiceError::with_code(
                    "AccessDeniedException",
                    format!("not authorized to perform {}", operation),
                ));
            }
            (state.units.clone(), state.accounts.clone())
        };

        match operation {
            "ListRoots" => self.paginate("Roots", vec![Self::root_json()], params),
            "DescribeOrganization" => {
                let mut page = Page::new();
                page.insert(
                    "Organization".into(),
                    json!({
                        "Id": ORG_ID,
                        "Arn": format!("arn:aws:organizations::{}:organization/{}", MANAGEMENT_ACCOUNT_ID, ORG_ID),
                        "FeatureSet": "ALL",
                        "MasterAccountId": MANAGEMENT_ACCOUNT_ID,
                        "MasterAccountEmail": "management@example.com",
                    }),
                );
                Ok(page)
            }
            "ListAccounts" => {
                let items = accounts.iter().map(Self::account_json).collect();
                self.paginate("Accounts", items, params)
            }
            "ListAccountsForParent" => {
                let parent = Self::parent_param(params)?;
                let items = accounts
                    .iter()
                    .filter(|a| a.parent_id == parent)
                    .map(Self::account_json)
                    .collect();
                self.paginate("Accounts", items, params)
            }
            "ListOrganizationalUnitsForParent" => {
                let parent = Self::parent_param(params)?;
                let items = units
                    .iter()
                    .filter(|u| u.parent_id == parent)
                    .map(Self::unit_json)
                    .collect();
                self.paginate("OrganizationalUnits", items, params)
            }
            "DescribeOrganizationalUnit" => {
                let id = params.get("OrganizationalUnitId").and_then(Value::as_str);
                let unit = units.iter().find(|u| Some(u.id.as_str()) == id).ok_or_else(|| {
                    ServiceError::with_code("OrganizationalUnitNotFoundException", "no such unit")
                })?;
                let mut page = Page::new();
                page.insert("OrganizationalUnit".into(), Self::unit_json(unit));
                Ok(page)
            }
            "DescribeAccount" => {
                let id = params.get("AccountId").and_then(Value::as_str);
                let account = accounts.iter().find(|a| Some(a.id.as_str()) == id).ok_or_else(|| {
                    ServiceError::with_code("AccountNotFoundException", "no such account")
                })?;
                let mut page = Page::new();
                page.insert("Account".into(), Self::account_json(account));
                Ok(page)
            }
            other => Err(ServiceError::new(format!("unsupported {}", other))),
        }
    }
}

impl ServiceFactory for FakeOrganization {
    fn service_name(&self) -> &str {
        "organizations"
    }

    fn create(&self, _params: &ClientParams) -> Result<Arc<dyn ServiceClient>, ServiceError> {
        Ok(Arc::new(self.clone()))
    }
}
