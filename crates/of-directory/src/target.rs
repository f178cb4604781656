//! Target identifier classification

use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::{DirectoryError, NodeType};

/// Literal accepted in place of a root id.
pub const ROOT_ALIAS: &str = "Root";

fn root_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^r-[0-9a-z]{4,32}$").unwrap())
}

fn ou_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^ou-[0-9a-z]{4,32}-[a-z0-9]{8,32}$").unwrap())
}

fn account_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{12}$").unwrap())
}

/// What a resolve call is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The organization root; `None` means "the" root, whatever its id
    Root(Option<String>),
    OrganizationalUnit(String),
    Account(String),
}

impl Target {
    /// Classify an identifier by its shape. Absent, empty and `Root` all
    /// address the organization root.
    pub fn parse(value: Option<&str>) -> Result<Self, DirectoryError> {
        let value = match value.map(str::trim) {
            None | Some("") => return Ok(Target::Root(None)),
            Some(v) => v,
        };

        if value.eq_ignore_ascii_case(ROOT_ALIAS) {
            Ok(Target::Root(None))
        } else if root_pattern().is_match(value) {
            Ok(Target::Root(Some(value.to_string())))
        } else if ou_pattern().is_match(value) {
            Ok(Target::OrganizationalUnit(value.to_string()))
        } else if account_pattern().is_match(value) {
            Ok(Target::Account(value.to_string()))
        } else {
            Err(DirectoryError::InvalidTarget(value.to_string()))
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Target::Root(_) => NodeType::Root,
            Target::OrganizationalUnit(_) => NodeType::OrganizationalUnit,
            Target::Account(_) => NodeType::Account,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Target::Root(_))
    }
}

impl FromStr for Target {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(Some(s))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Root(None) => f.write_str(ROOT_ALIAS),
            Target::Root(Some(id)) | Target::OrganizationalUnit(id) | Target::Account(id) => {
                f.write_str(id)
            }
        }
    }
}
