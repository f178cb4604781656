//! In-memory organization tree
//!
//! Built once per discovery call and read-only afterwards. Every query here
//! walks the loaded tree only; none of them touch the remote API.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Account status excluded by `skip_suspended`.
pub const SUSPENDED: &str = "SUSPENDED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Root,
    OrganizationalUnit,
    Account,
}

/// Organization-wide metadata, attached to the ROOT node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OrganizationInfo {
    pub id: String,
    pub arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_account_email: Option<String>,
}

/// One node of the organization tree. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectoryNode {
    pub id: String,
    pub node_type: NodeType,
    pub name: String,
    pub arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DirectoryNode>,
}

impl DirectoryNode {
    pub fn new(
        node_type: NodeType,
        id: impl Into<String>,
        name: impl Into<String>,
        arn: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            arn: arn.into(),
            status: None,
            email: None,
            organization: None,
            children: Vec::new(),
        }
    }

    pub fn root(id: impl Into<String>, name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self::new(NodeType::Root, id, name, arn)
    }

    pub fn organizational_unit(
        id: impl Into<String>,
        name: impl Into<String>,
        arn: impl Into<String>,
    ) -> Self {
        Self::new(NodeType::OrganizationalUnit, id, name, arn)
    }

    pub fn account(id: impl Into<String>, name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self::new(NodeType::Account, id, name, arn)
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_child(mut self, child: DirectoryNode) -> Self {
        self.attach(child);
        self
    }

    /// Append a child. Accounts never own children; attaching to one is
    /// refused and reported by the return value.
    pub fn attach(&mut self, child: DirectoryNode) -> bool {
        if self.is_account() {
            return false;
        }
        self.children.push(child);
        true
    }

    pub fn is_account(&self) -> bool {
        self.node_type == NodeType::Account
    }

    pub fn is_root(&self) -> bool {
        self.node_type == NodeType::Root
    }

    pub fn is_suspended(&self) -> bool {
        self.status.as_deref() == Some(SUSPENDED)
    }

    /// Direct child with exactly this id.
    pub fn get_child(&self, id: &str) -> Option<&DirectoryNode> {
        self.children.iter().find(|child| child.id == id)
    }

    /// Accounts below this node: direct children only, or the whole subtree.
    ///
    /// Depth-first, children in stored order. Each account id appears once.
    pub fn get_accounts(&self, recursive: bool) -> Vec<&DirectoryNode> {
        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        self.collect_accounts(recursive, &mut seen, &mut accounts);
        accounts
    }

    fn collect_accounts<'a>(
        &'a self,
        recursive: bool,
        seen: &mut HashSet<&'a str>,
        out: &mut Vec<&'a DirectoryNode>,
    ) {
        for child in &self.children {
            if child.is_account() {
                if seen.insert(child.id.as_str()) {
                    out.push(child);
                }
            } else if recursive {
                child.collect_accounts(true, seen, out);
            }
        }
    }

    /// First account with this id among [`Self::get_accounts`].
    pub fn get_account(&self, id: &str, recursive: bool) -> Option<&DirectoryNode> {
        self.get_accounts(recursive)
            .into_iter()
            .find(|account| account.id == id)
    }

    /// Nodes whose subtree holds `id`, from this node downwards.
    ///
    /// The node carrying `id` itself is not part of the result.
    pub fn get_parents_for(&self, id: &str) -> Vec<&DirectoryNode> {
        let mut parents = Vec::new();
        if !self.contains(id) {
            return parents;
        }

        let mut node = self;
        loop {
            parents.push(node);
            match node
                .children
                .iter()
                .find(|child| child.id != id && child.contains(id))
            {
                Some(next) => node = next,
                None => break,
            }
        }
        parents
    }

    /// [`Self::get_parents_for`] without ROOT nodes.
    pub fn get_parent_ous_for(&self, id: &str) -> Vec<&DirectoryNode> {
        self.get_parents_for(id)
            .into_iter()
            .filter(|node| !node.is_root())
            .collect()
    }

    /// True when a strict descendant has this id.
    pub fn contains(&self, id: &str) -> bool {
        self.children
            .iter()
            .any(|child| child.id == id || child.contains(id))
    }

    /// Depth-first search over this node and its subtree.
    pub fn find(&self, id: &str) -> Option<&DirectoryNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn count_accounts(&self) -> usize {
        self.get_accounts(true).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> DirectoryNode {
        DirectoryNode::account(id, format!("acct-{}", id), format!("arn:aws:organizations::1:account/o-1/{}", id))
    }

    /// Root -> OU_A -> [111, 222], Root -> OU_B -> [333] + OU_C -> [444], Root -> [555]
    fn sample() -> DirectoryNode {
        DirectoryNode::root("r-ab12", "Root", "arn:aws:organizations::1:root/o-1/r-ab12")
            .with_child(account("555555555555"))
            .with_child(
                DirectoryNode::organizational_unit("ou-ab12-aaaaaaaa", "OU_A", "arn:ou-a")
                    .with_child(account("111111111111"))
                    .with_child(account("222222222222")),
            )
            .with_child(
                DirectoryNode::organizational_unit("ou-ab12-bbbbbbbb", "OU_B", "arn:ou-b")
                    .with_child(account("333333333333"))
                    .with_child(
                        DirectoryNode::organizational_unit("ou-ab12-cccccccc", "OU_C", "arn:ou-c")
                            .with_child(account("444444444444")),
                    ),
            )
    }

    fn ids(nodes: &[&DirectoryNode]) -> Vec<String> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_get_child_is_direct_only() {
        let tree = sample();
        assert_eq!(tree.get_child("ou-ab12-aaaaaaaa").map(|n| n.name.as_str()), Some("OU_A"));
        assert!(tree.get_child("111111111111").is_none());
        assert!(tree.get_child("999999999999").is_none());
    }

    #[test]
    fn test_get_accounts_direct_and_recursive() {
        let tree = sample();
        assert_eq!(ids(&tree.get_accounts(false)), vec!["555555555555"]);

        let all = tree.get_accounts(true);
        assert_eq!(
            ids(&all),
            vec!["555555555555", "111111111111", "222222222222", "333333333333", "444444444444"]
        );
        assert_eq!(tree.count_accounts(), 5);

        let ou_b = tree.get_child("ou-ab12-bbbbbbbb").unwrap();
        assert_eq!(ids(&ou_b.get_accounts(false)), vec!["333333333333"]);
        assert_eq!(ids(&ou_b.get_accounts(true)), vec!["333333333333", "444444444444"]);
    }

    #[test]
    fn test_get_account() {
        let tree = sample();
        assert_eq!(
            tree.get_account("444444444444", true).map(|n| n.name.as_str()),
            Some("acct-444444444444")
        );
        assert!(tree.get_account("444444444444", false).is_none());
        assert!(tree.get_account("000000000000", true).is_none());
    }

    #[test]
    fn test_parents_for_account() {
        let tree = sample();
        assert_eq!(
            ids(&tree.get_parents_for("444444444444")),
            vec!["r-ab12", "ou-ab12-bbbbbbbb", "ou-ab12-cccccccc"]
        );
        assert_eq!(
            ids(&tree.get_parent_ous_for("444444444444")),
            vec!["ou-ab12-bbbbbbbb", "ou-ab12-cccccccc"]
        );
        assert_eq!(ids(&tree.get_parents_for("555555555555")), vec!["r-ab12"]);
        assert!(tree.get_parent_ous_for("555555555555").is_empty());
    }

    #[test]
    fn test_parents_for_unknown_or_self() {
        let tree = sample();
        assert!(tree.get_parents_for("000000000000").is_empty());
        assert!(tree.get_parents_for("r-ab12").is_empty());
        assert_eq!(ids(&tree.get_parents_for("ou-ab12-cccccccc")), vec!["r-ab12", "ou-ab12-bbbbbbbb"]);
    }

    #[test]
    fn test_two_ou_scenario() {
        let tree = DirectoryNode::root("r-ab12", "Root", "arn:root")
            .with_child(
                DirectoryNode::organizational_unit("ou-ab12-aaaaaaaa", "OU_A", "arn:a")
                    .with_child(account("111111111111"))
                    .with_child(account("222222222222")),
            )
            .with_child(
                DirectoryNode::organizational_unit("ou-ab12-bbbbbbbb", "OU_B", "arn:b")
                    .with_child(account("333333333333")),
            );

        let mut all = ids(&tree.get_accounts(true));
        all.sort();
        assert_eq!(all, vec!["111111111111", "222222222222", "333333333333"]);

        let ous = tree.get_parent_ous_for("111111111111");
        assert_eq!(ous.len(), 1);
        assert_eq!(ous[0].name, "OU_A");
    }

    #[test]
    fn test_accounts_never_own_children() {
        let mut leaf = account("111111111111");
        assert!(!leaf.attach(account("222222222222")));
        assert!(leaf.children.is_empty());
    }

    #[test]
    fn test_find_and_status() {
        let tree = sample();
        assert_eq!(tree.find("r-ab12").map(|n| n.node_type), Some(NodeType::Root));
        assert_eq!(tree.find("ou-ab12-cccccccc").map(|n| n.node_type), Some(NodeType::OrganizationalUnit));
        assert!(tree.find("nope").is_none());

        assert!(account("1").with_status(SUSPENDED).is_suspended());
        assert!(!account("1").with_status("ACTIVE").is_suspended());
    }

    #[test]
    fn test_serialized_shape() {
        let node = account("111111111111").with_status("ACTIVE");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["NodeType"], "ACCOUNT");
        assert_eq!(value["Status"], "ACTIVE");
        assert!(value.get("Children").is_none());

        let ou = serde_json::to_value(DirectoryNode::organizational_unit("ou-ab12-aaaaaaaa", "A", "arn")).unwrap();
        assert_eq!(ou["NodeType"], "ORGANIZATIONAL_UNIT");
    }
}
