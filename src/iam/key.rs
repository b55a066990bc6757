//! Condition keys
//!
//! A key has a namespaced full name (`aws:username`, `s3:prefix`,
//! `s3:ExistingObjectTag/<tag>`). Requests supply values under the short
//! name, with the namespace stripped (`username`, `prefix`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Namespaces a condition key may live in
const KEY_NAMESPACES: &[&str] = &[
    "aws:",
    "s3:",
    "jwt:",
    "ldap:",
    "sts:",
    "svc:",
    "kms:",
    "s3tables:",
    "s3vectors:",
];

/// A condition key, e.g. `aws:SourceIp`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConditionKey(String);

impl ConditionKey {
    /// Parse a key, checking its namespace
    pub fn parse(full_name: &str) -> Result<Self> {
        let known = KEY_NAMESPACES
            .iter()
            .any(|ns| full_name.len() > ns.len() && full_name.starts_with(ns));
        if !known {
            return Err(Error::InvalidCondition(format!(
                "unknown condition key '{}'",
                full_name
            )));
        }
        Ok(ConditionKey(full_name.to_string()))
    }

    /// Full namespaced name (`aws:username`)
    pub fn full_name(&self) -> &str {
        &self.0
    }

    /// Name without its namespace (`username`); the lookup key into request values
    pub fn name(&self) -> &str {
        KEY_NAMESPACES
            .iter()
            .find_map(|ns| self.0.strip_prefix(ns))
            .unwrap_or(&self.0)
    }

    /// Policy-variable token for this key (`${aws:username}`)
    pub fn var_name(&self) -> String {
        format!("${{{}}}", self.0)
    }

    /// Key name with any `/<qualifier>` suffix removed
    ///
    /// `s3:ExistingObjectTag/project` has base `s3:ExistingObjectTag`.
    pub fn base(&self) -> &str {
        match self.0.split_once('/') {
            Some((base, _)) => base,
            None => &self.0,
        }
    }
}

impl TryFrom<String> for ConditionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ConditionKey::parse(&value)
    }
}

impl From<ConditionKey> for String {
    fn from(key: ConditionKey) -> Self {
        key.0
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of condition keys used by a statement
pub type KeySet = BTreeSet<ConditionKey>;

/// Render a key set as `[a, b]` for error messages
pub(crate) fn format_keys<'a>(keys: impl IntoIterator<Item = &'a ConditionKey>) -> String {
    let names: Vec<&str> = keys.into_iter().map(|k| k.full_name()).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_namespaces() {
        assert!(ConditionKey::parse("aws:username").is_ok());
        assert!(ConditionKey::parse("s3:prefix").is_ok());
        assert!(ConditionKey::parse("jwt:sub").is_ok());
        assert!(ConditionKey::parse("s3tables:namespace").is_ok());
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(ConditionKey::parse("foo:bar").is_err());
        assert!(ConditionKey::parse("username").is_err());
        assert!(ConditionKey::parse("aws:").is_err());
    }

    #[test]
    fn test_name_strips_namespace() {
        assert_eq!(ConditionKey::parse("aws:username").unwrap().name(), "username");
        assert_eq!(ConditionKey::parse("s3:max-keys").unwrap().name(), "max-keys");
        // s3tables: must not be mistaken for s3:
        assert_eq!(
            ConditionKey::parse("s3tables:namespace").unwrap().name(),
            "namespace"
        );
    }

    #[test]
    fn test_var_name_and_base() {
        let key = ConditionKey::parse("aws:username").unwrap();
        assert_eq!(key.var_name(), "${aws:username}");
        assert_eq!(key.base(), "aws:username");

        let tag = ConditionKey::parse("s3:ExistingObjectTag/project").unwrap();
        assert_eq!(tag.base(), "s3:ExistingObjectTag");
        assert_eq!(tag.name(), "ExistingObjectTag/project");
    }
}
