//! DirectoryTreeBuilder - resolve a root, OU or account into a tree
//!
//! - Root + recursive takes the fast path: one bulk `ListAccounts`, no tree
//! - Everything else resolves the addressed node, then lists its child
//!   accounts and child OUs concurrently and resolves each child OU in turn
//! - Child resolutions return their subtree; the parent attaches them once
//!   all of them have settled, so nothing is mutated concurrently
//! - Any remote failure aborts the whole build; no partial tree is returned

use futures::future::{try_join_all, BoxFuture, FutureExt};
use of_invoke::{ClientParams, PagedCallDescriptor, PagedInvoker};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{DirectoryError, DirectoryNode, NodeType, OrganizationInfo, Target};

/// Service every directory call goes to.
pub const ORGANIZATIONS_SERVICE: &str = "organizations";

/// Outcome of [`DirectoryTreeBuilder::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Tree(DirectoryNode),
    /// Flat listing produced by the fast path
    Accounts(Vec<DirectoryNode>),
}

impl Resolved {
    /// The accounts addressed by this result.
    ///
    /// An account tree yields itself; any other tree yields its accounts,
    /// direct or recursive.
    pub fn into_accounts(self, recursive: bool) -> Vec<DirectoryNode> {
        match self {
            Resolved::Accounts(accounts) => accounts,
            Resolved::Tree(node) if node.is_account() => vec![node],
            Resolved::Tree(node) => node.get_accounts(recursive).into_iter().cloned().collect(),
        }
    }

    pub fn tree(&self) -> Option<&DirectoryNode> {
        match self {
            Resolved::Tree(node) => Some(node),
            Resolved::Accounts(_) => None,
        }
    }
}

/// Identity fields shared by roots, OUs and accounts in listing responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Record {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    arn: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

fn parse_node(value: Value, node_type: NodeType, operation: &str) -> Result<DirectoryNode, DirectoryError> {
    let record: Record =
        serde_json::from_value(value).map_err(|e| DirectoryError::MalformedResponse {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;

    Ok(DirectoryNode {
        status: record.status,
        email: record.email,
        ..DirectoryNode::new(node_type, record.id, record.name, record.arn)
    })
}

fn parse_nodes(
    values: Vec<Value>,
    node_type: NodeType,
    operation: &str,
) -> Result<Vec<DirectoryNode>, DirectoryError> {
    values
        .into_iter()
        .map(|v| parse_node(v, node_type, operation))
        .collect()
}

/// Where a node to resolve comes from.
enum NodeSeed {
    Root(Option<String>),
    /// OU, with its metadata when a parent listing already provided it
    Unit(String, Option<DirectoryNode>),
    Account(String, Option<DirectoryNode>),
}

/// Builds organization trees through a [`PagedInvoker`].
#[derive(Debug, Clone)]
pub struct DirectoryTreeBuilder {
    invoker: PagedInvoker,
    client_params: ClientParams,
}

impl DirectoryTreeBuilder {
    /// # Arguments
    /// * `invoker` - Invoker whose registry provides the `organizations` service
    /// * `client_params` - Constructor params for every directory call
    pub fn new(invoker: PagedInvoker, client_params: ClientParams) -> Self {
        Self {
            invoker,
            client_params,
        }
    }

    pub fn invoker(&self) -> &PagedInvoker {
        &self.invoker
    }

    /// Resolve `target` into a tree, or into a flat account list when the
    /// whole organization is wanted recursively.
    pub async fn resolve(
        &self,
        target: Option<&str>,
        recursive: bool,
        skip_suspended: bool,
    ) -> Result<Resolved, DirectoryError> {
        let target = Target::parse(target)?;

        if target.is_root() && recursive {
            info!(node = %target, "Listing all accounts in one bulk call");
            let accounts = self.list_all_accounts(skip_suspended).await?;
            return Ok(Resolved::Accounts(accounts));
        }

        let tree = self.build_tree(&target, recursive, skip_suspended).await?;
        if skip_suspended && tree.is_suspended() {
            info!(account_id = %tree.id, "Target account is suspended, nothing to resolve");
            return Ok(Resolved::Accounts(Vec::new()));
        }
        Ok(Resolved::Tree(tree))
    }

    /// Build the tree for `target`, skipping the fast path.
    ///
    /// The target's direct children are always attached; with `recursive`
    /// every OU below it is populated as well.
    pub async fn build_tree(
        &self,
        target: &Target,
        recursive: bool,
        skip_suspended: bool,
    ) -> Result<DirectoryNode, DirectoryError> {
        info!(node = %target, recursive, skip_suspended, "Building organization tree");

        let ctx = TreeContext {
            builder: self,
            recursive,
            skip_suspended,
            accounts: OnceCell::new(),
        };

        let seed = match target {
            Target::Root(id) => NodeSeed::Root(id.clone()),
            Target::OrganizationalUnit(id) => NodeSeed::Unit(id.clone(), None),
            Target::Account(id) => NodeSeed::Account(id.clone(), None),
        };

        let tree = ctx.resolve_node(seed, true).await?;
        debug!(node = %target, accounts = tree.count_accounts(), "Organization tree built");
        Ok(tree)
    }

    /// Every account in the organization, from one paginated listing.
    pub async fn list_all_accounts(
        &self,
        skip_suspended: bool,
    ) -> Result<Vec<DirectoryNode>, DirectoryError> {
        let items = self.items("organization", "ListAccounts", json!({}), "Accounts").await?;
        let accounts = parse_nodes(items, NodeType::Account, "ListAccounts")?;

        Ok(accounts
            .into_iter()
            .filter(|account| !(skip_suspended && account.is_suspended()))
            .collect())
    }

    /// Run one directory call and return the items under `result_key`.
    async fn items(
        &self,
        node: &str,
        operation: &str,
        params: Value,
        result_key: &str,
    ) -> Result<Vec<Value>, DirectoryError> {
        let call = PagedCallDescriptor::new(ORGANIZATIONS_SERVICE, operation)
            .client_params(self.client_params.clone())
            .params(params)
            .result_key(result_key);

        self.invoker
            .invoke(&call)
            .await
            .map(|output| output.into_items())
            .map_err(|source| DirectoryError::Resolution {
                node: node.to_string(),
                source,
            })
    }

    /// Like [`Self::items`] for a single-object result.
    async fn single(
        &self,
        node: &str,
        operation: &str,
        params: Value,
        result_key: &str,
    ) -> Result<Value, DirectoryError> {
        self.items(node, operation, params, result_key)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::MalformedResponse {
                operation: operation.to_string(),
                message: format!("{} missing from response", result_key),
            })
    }
}

/// State shared by every node resolution of one tree build.
struct TreeContext<'a> {
    builder: &'a DirectoryTreeBuilder,
    recursive: bool,
    skip_suspended: bool,
    /// Bulk account listing, fetched at most once per tree
    accounts: OnceCell<HashMap<String, DirectoryNode>>,
}

impl TreeContext<'_> {
    fn resolve_node(&self, seed: NodeSeed, populate: bool) -> BoxFuture<'_, Result<DirectoryNode, DirectoryError>> {
        async move {
            let mut node = match seed {
                NodeSeed::Root(id) => self.resolve_root(id).await?,
                NodeSeed::Unit(_, Some(known)) => known,
                NodeSeed::Unit(id, None) => self.describe_unit(&id).await?,
                NodeSeed::Account(_, Some(known)) if !known.name.is_empty() => return Ok(known),
                NodeSeed::Account(id, _) => return self.lookup_account(&id).await,
            };

            if populate {
                self.populate(&mut node).await?;
            }
            Ok(node)
        }
        .boxed()
    }

    /// Attach the node's direct accounts and OUs.
    async fn populate(&self, node: &mut DirectoryNode) -> Result<(), DirectoryError> {
        let params = json!({ "ParentId": node.id });
        let (accounts, units) = tokio::try_join!(
            self.builder.items(&node.id, "ListAccountsForParent", params.clone(), "Accounts"),
            self.builder.items(
                &node.id,
                "ListOrganizationalUnitsForParent",
                params,
                "OrganizationalUnits"
            ),
        )?;

        let accounts = parse_nodes(accounts, NodeType::Account, "ListAccountsForParent")?;
        let units = parse_nodes(
            units,
            NodeType::OrganizationalUnit,
            "ListOrganizationalUnitsForParent",
        )?;

        let account_count = accounts.len();
        let accounts = try_join_all(
            accounts
                .into_iter()
                .filter(|account| !(self.skip_suspended && account.is_suspended()))
                .map(|account| self.resolve_node(NodeSeed::Account(account.id.clone(), Some(account)), false)),
        );
        let units = try_join_all(
            units
                .into_iter()
                .map(|unit| self.resolve_node(NodeSeed::Unit(unit.id.clone(), Some(unit)), self.recursive)),
        );
        let (accounts, units) = futures::try_join!(accounts, units)?;

        debug!(
            node = %node.id,
            accounts = accounts.len(),
            skipped = account_count - accounts.len(),
            units = units.len(),
            "Resolved children"
        );

        node.children.extend(accounts);
        node.children.extend(units);
        Ok(())
    }

    async fn resolve_root(&self, id: Option<String>) -> Result<DirectoryNode, DirectoryError> {
        let label = id.clone().unwrap_or_else(|| "Root".to_string());
        let (roots, organization) = tokio::try_join!(
            self.builder.items(&label, "ListRoots", json!({}), "Roots"),
            self.builder.single(&label, "DescribeOrganization", json!({}), "Organization"),
        )?;

        let roots = parse_nodes(roots, NodeType::Root, "ListRoots")?;
        let mut root = match &id {
            Some(id) => roots.into_iter().find(|root| &root.id == id),
            None => roots.into_iter().next(),
        }
        .ok_or(DirectoryError::RootNotFound(label))?;

        let organization: OrganizationInfo =
            serde_json::from_value(organization).map_err(|e| DirectoryError::MalformedResponse {
                operation: "DescribeOrganization".to_string(),
                message: e.to_string(),
            })?;
        root.organization = Some(organization);
        Ok(root)
    }

    async fn describe_unit(&self, id: &str) -> Result<DirectoryNode, DirectoryError> {
        let value = self
            .builder
            .single(
                id,
                "DescribeOrganizationalUnit",
                json!({ "OrganizationalUnitId": id }),
                "OrganizationalUnit",
            )
            .await?;
        parse_node(value, NodeType::OrganizationalUnit, "DescribeOrganizationalUnit")
    }

    async fn lookup_account(&self, id: &str) -> Result<DirectoryNode, DirectoryError> {
        let accounts = self
            .accounts
            .get_or_try_init(|| async {
                let accounts = self.builder.list_all_accounts(false).await?;
                debug!(count = accounts.len(), "Loaded bulk account listing");
                Ok::<_, DirectoryError>(
                    accounts
                        .into_iter()
                        .map(|account| (account.id.clone(), account))
                        .collect(),
                )
            })
            .await?;

        accounts
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::AccountNotFound(id.to_string()))
    }
}
