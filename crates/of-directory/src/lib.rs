//! OrgFleet Directory
//!
//! Discovers the organization structure and answers queries over it:
//! - Target: classifies root, OU and account identifiers
//! - DirectoryTreeBuilder: resolves a target into a tree through the invoker
//! - DirectoryNode: in-memory tree with account and ancestry queries

mod builder;
mod error;
mod node;
mod target;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use builder::{DirectoryTreeBuilder, Resolved, ORGANIZATIONS_SERVICE};
pub use error::DirectoryError;
pub use node::{DirectoryNode, NodeType, OrganizationInfo, SUSPENDED};
pub use target::{Target, ROOT_ALIAS};

pub type Result<T> = std::result::Result<T, DirectoryError>;
