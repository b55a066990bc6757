//! Namespaced actions (`s3:GetObject`, `admin:Heal`, `kms:CreateKey`, ...)
//!
//! An action is a literal string whose namespace prefix decides how the
//! statement carrying it validates and matches resources. Stored actions are
//! patterns: `s3:Get*` matches every S3 read action.

use super::catalog;
use super::pattern::PatternMatcher;
use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Action namespace, derived from the action prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionType {
    /// `s3:` object and bucket operations
    S3,
    /// `admin:` cluster administration
    Admin,
    /// `sts:` temporary credentials
    Sts,
    /// `kms:` key management
    Kms,
    /// `s3tables:` table buckets, namespaces and tables
    S3Tables,
    /// `s3vectors:` vector buckets and indexes
    S3Vectors,
}

impl ActionType {
    /// Every namespace, in catalog order
    pub const ALL: [ActionType; 6] = [
        ActionType::S3,
        ActionType::Admin,
        ActionType::Sts,
        ActionType::Kms,
        ActionType::S3Tables,
        ActionType::S3Vectors,
    ];

    /// Action prefix for this namespace, including the colon
    pub fn prefix(&self) -> &'static str {
        match self {
            ActionType::S3 => "s3:",
            ActionType::Admin => "admin:",
            ActionType::Sts => "sts:",
            ActionType::Kms => "kms:",
            ActionType::S3Tables => "s3tables:",
            ActionType::S3Vectors => "s3vectors:",
        }
    }

    fn from_action(action: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| action.starts_with(t.prefix()))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(':'))
    }
}

/// A single action or action pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    kind: ActionType,
    literal: String,
}

impl Action {
    /// Parse an action, requiring a known namespace and a non-empty name
    pub fn parse(literal: &str) -> Result<Self> {
        let kind = ActionType::from_action(literal)
            .filter(|t| literal.len() > t.prefix().len())
            .ok_or_else(|| Error::InvalidAction(literal.to_string()))?;
        Ok(Action {
            kind,
            literal: literal.to_string(),
        })
    }

    /// Namespace of this action
    pub fn action_type(&self) -> ActionType {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// True if this action contains `*` or `?` and so is a pattern
    pub fn is_wildcard(&self) -> bool {
        PatternMatcher::has_wildcard(&self.literal)
    }

    /// Match this (stored, possibly wildcard) action against a request action
    pub fn matches(&self, requested: &Action) -> bool {
        PatternMatcher::matches(&self.literal, &requested.literal)
    }

    /// True if this action matches at least one catalog action of its namespace
    pub fn is_valid(&self) -> bool {
        catalog::actions_of(self.kind)
            .iter()
            .any(|known| PatternMatcher::matches(&self.literal, known))
    }

    /// True if this table action implicitly grants the given S3 action
    ///
    /// `s3tables:GetTableData` grants `s3:GetObject` on the table's data
    /// files, so a table-scoped statement also covers the plain S3 calls
    /// that read and write table data.
    pub fn implies(&self, requested: &Action) -> bool {
        if self.kind != ActionType::S3Tables || requested.kind != ActionType::S3 {
            return false;
        }
        catalog::TABLE_DATA_IMPLIED_ACTIONS
            .iter()
            .filter(|(table_action, _)| PatternMatcher::matches(&self.literal, table_action))
            .any(|(_, implied)| implied.contains(&requested.literal.as_str()))
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Action::parse(s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// Set of actions from a statement's `Action` or `NotAction`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        ActionSet(BTreeSet::new())
    }

    /// Build from action strings, rejecting invalid and duplicate entries
    pub fn parse<'a>(actions: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut set = BTreeSet::new();
        for literal in actions {
            let action = Action::parse(literal)?;
            if !set.insert(action) {
                return Err(Error::DuplicateAction(literal.to_string()));
            }
        }
        Ok(ActionSet(set))
    }

    pub fn insert(&mut self, action: Action) -> bool {
        self.0.insert(action)
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.0.contains(action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    /// True if any action in the set matches the request action
    pub fn matches(&self, requested: &Action) -> bool {
        self.0.iter().any(|a| a.matches(requested))
    }

    /// True if any table action in the set implicitly grants the request action
    pub fn implies(&self, requested: &Action) -> bool {
        self.0.iter().any(|a| a.implies(requested))
    }

    /// The single namespace shared by every action, if there is one
    ///
    /// Returns `Err` with the first two conflicting namespaces when mixed.
    pub(crate) fn common_type(&self) -> std::result::Result<Option<ActionType>, (Action, Action)> {
        let mut iter = self.0.iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        match iter.find(|a| a.kind != first.kind) {
            Some(other) => Err((first.clone(), other.clone())),
            None => Ok(Some(first.kind)),
        }
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        ActionSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::collections::btree_set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Action::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

impl Serialize for ActionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for action in &self.0 {
            seq.serialize_element(action.as_str())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ActionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = StringOrArray::deserialize(deserializer)?;
        ActionSet::parse(raw.iter()).map_err(de::Error::custom)
    }
}

/// Either a single string or an array of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrArray {
    Single(String),
    Array(Vec<String>),
}

impl StringOrArray {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            StringOrArray::Single(s) => std::slice::from_ref(s),
            StringOrArray::Array(v) => v,
        };
        items.iter().map(String::as_str)
    }
}
