//! Bucket policy principals
//!
//! Written as `"*"` or `{"AWS": "<account>"}` / `{"AWS": ["<a>", "<b>"]}`.
//! Entries are matched against the requesting account with `*` as the only
//! wildcard.

use super::action::StringOrArray;
use super::pattern::PatternMatcher;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Accounts a bucket policy statement applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Principal {
    aws: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Principal {
            aws: accounts.into_iter().map(Into::into).collect(),
        }
    }

    /// Every account
    pub fn any() -> Self {
        Principal::new(["*"])
    }

    pub fn is_valid(&self) -> bool {
        !self.aws.is_empty() && self.aws.iter().all(|a| !a.is_empty())
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.aws.iter().map(String::as_str)
    }

    /// True if any entry matches the account
    pub fn matches(&self, account: &str) -> bool {
        self.aws
            .iter()
            .any(|pattern| PatternMatcher::matches_simple(pattern, account))
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("AWS", &self.aws)?;
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrincipal {
    Wildcard(String),
    Accounts(AwsPrincipal),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AwsPrincipal {
    #[serde(rename = "AWS")]
    aws: StringOrArray,
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawPrincipal::deserialize(deserializer)? {
            RawPrincipal::Wildcard(s) if s == "*" => Ok(Principal::any()),
            RawPrincipal::Wildcard(s) => Err(de::Error::custom(format!(
                "invalid principal '{}', expected \"*\"",
                s
            ))),
            RawPrincipal::Accounts(accounts) => Ok(Principal::new(accounts.aws.iter())),
        }
    }
}
