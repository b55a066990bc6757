//! Condition evaluation for IAM policies
//!
//! Conditions gate a statement on request attributes:
//! - String operations (Equals, EqualsIgnoreCase, Like and their negations)
//! - Numeric operations (Equals, LessThan, GreaterThan, ...)
//! - Date operations (RFC 3339 timestamps)
//! - Bool, IpAddress/NotIpAddress (CIDR), Null
//!
//! The policy engine only relies on [`ConditionEvaluator`]; [`Functions`] is
//! the implementation decoded from the JSON `Condition` block:
//!
//! ```json
//! { "StringEquals": { "aws:username": ["alice", "bob"] },
//!   "IpAddress":    { "aws:SourceIp": "10.0.0.0/8" } }
//! ```

use super::catalog::substitute_variables;
use super::key::{ConditionKey, KeySet};
use super::pattern::PatternMatcher;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};
use ipnet::IpNet;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::net::IpAddr;

/// Request attribute values, keyed by condition key short name
pub type ConditionValues = HashMap<String, Vec<String>>;

/// Anything that can decide a statement's condition gate
pub trait ConditionEvaluator {
    /// True if the conditions hold for the given request values
    fn evaluate(&self, values: &ConditionValues) -> bool;

    /// Condition keys referenced by these conditions
    fn keys(&self) -> KeySet;
}

/// Condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionOperator {
    StringEquals,
    StringNotEquals,
    StringEqualsIgnoreCase,
    StringNotEqualsIgnoreCase,
    StringLike,
    StringNotLike,
    NumericEquals,
    NumericNotEquals,
    NumericLessThan,
    NumericLessThanEquals,
    NumericGreaterThan,
    NumericGreaterThanEquals,
    DateEquals,
    DateNotEquals,
    DateLessThan,
    DateLessThanEquals,
    DateGreaterThan,
    DateGreaterThanEquals,
    Bool,
    IpAddress,
    NotIpAddress,
    Null,
}

impl ConditionOperator {
    const ALL: [ConditionOperator; 22] = [
        Self::StringEquals,
        Self::StringNotEquals,
        Self::StringEqualsIgnoreCase,
        Self::StringNotEqualsIgnoreCase,
        Self::StringLike,
        Self::StringNotLike,
        Self::NumericEquals,
        Self::NumericNotEquals,
        Self::NumericLessThan,
        Self::NumericLessThanEquals,
        Self::NumericGreaterThan,
        Self::NumericGreaterThanEquals,
        Self::DateEquals,
        Self::DateNotEquals,
        Self::DateLessThan,
        Self::DateLessThanEquals,
        Self::DateGreaterThan,
        Self::DateGreaterThanEquals,
        Self::Bool,
        Self::IpAddress,
        Self::NotIpAddress,
        Self::Null,
    ];

    /// Operator name as written in policy documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringEquals => "StringEquals",
            Self::StringNotEquals => "StringNotEquals",
            Self::StringEqualsIgnoreCase => "StringEqualsIgnoreCase",
            Self::StringNotEqualsIgnoreCase => "StringNotEqualsIgnoreCase",
            Self::StringLike => "StringLike",
            Self::StringNotLike => "StringNotLike",
            Self::NumericEquals => "NumericEquals",
            Self::NumericNotEquals => "NumericNotEquals",
            Self::NumericLessThan => "NumericLessThan",
            Self::NumericLessThanEquals => "NumericLessThanEquals",
            Self::NumericGreaterThan => "NumericGreaterThan",
            Self::NumericGreaterThanEquals => "NumericGreaterThanEquals",
            Self::DateEquals => "DateEquals",
            Self::DateNotEquals => "DateNotEquals",
            Self::DateLessThan => "DateLessThan",
            Self::DateLessThanEquals => "DateLessThanEquals",
            Self::DateGreaterThan => "DateGreaterThan",
            Self::DateGreaterThanEquals => "DateGreaterThanEquals",
            Self::Bool => "Bool",
            Self::IpAddress => "IpAddress",
            Self::NotIpAddress => "NotIpAddress",
            Self::Null => "Null",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    fn is_string(&self) -> bool {
        matches!(
            self,
            Self::StringEquals
                | Self::StringNotEquals
                | Self::StringEqualsIgnoreCase
                | Self::StringNotEqualsIgnoreCase
                | Self::StringLike
                | Self::StringNotLike
        )
    }

    /// Operators whose result is the negation of a positive operator
    fn negated(&self) -> Option<Self> {
        match self {
            Self::StringNotEquals => Some(Self::StringEquals),
            Self::StringNotEqualsIgnoreCase => Some(Self::StringEqualsIgnoreCase),
            Self::StringNotLike => Some(Self::StringLike),
            Self::NumericNotEquals => Some(Self::NumericEquals),
            Self::DateNotEquals => Some(Self::DateEquals),
            Self::NotIpAddress => Some(Self::IpAddress),
            _ => None,
        }
    }
}

/// Set operator prefix for multi-valued keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    /// Plain operator: any request value may satisfy it
    None,
    /// `ForAnyValue:` - at least one request value satisfies it
    ForAnyValue,
    /// `ForAllValues:` - every request value satisfies it
    ForAllValues,
}

impl Qualifier {
    fn prefix(&self) -> &'static str {
        match self {
            Qualifier::None => "",
            Qualifier::ForAnyValue => "ForAnyValue:",
            Qualifier::ForAllValues => "ForAllValues:",
        }
    }
}

/// A single condition: operator applied to one key with a value set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Function {
    pub qualifier: Qualifier,
    pub operator: ConditionOperator,
    pub key: ConditionKey,
    pub values: BTreeSet<String>,
}

impl Function {
    /// Create a new condition, checking values against the operator
    pub fn new(
        qualifier: Qualifier,
        operator: ConditionOperator,
        key: ConditionKey,
        values: BTreeSet<String>,
    ) -> Result<Self> {
        let function = Function {
            qualifier,
            operator,
            key,
            values,
        };
        function.check_values()?;
        Ok(function)
    }

    /// Operator name including any qualifier (`ForAllValues:StringLike`)
    pub fn operator_name(&self) -> String {
        format!("{}{}", self.qualifier.prefix(), self.operator.as_str())
    }

    fn check_values(&self) -> Result<()> {
        let invalid = |what: &str| -> Result<()> {
            Err(Error::InvalidCondition(format!(
                "{} for {} on key {}",
                what,
                self.operator_name(),
                self.key
            )))
        };

        if self.values.is_empty() {
            return invalid("no values");
        }
        if self.qualifier != Qualifier::None && !self.operator.is_string() {
            return invalid("set qualifier not supported");
        }

        match self.operator {
            ConditionOperator::NumericEquals
            | ConditionOperator::NumericNotEquals
            | ConditionOperator::NumericLessThan
            | ConditionOperator::NumericLessThanEquals
            | ConditionOperator::NumericGreaterThan
            | ConditionOperator::NumericGreaterThanEquals => {
                if self.values.len() != 1 || self.single_value().and_then(parse_number).is_none() {
                    return invalid("expected one numeric value");
                }
            }
            ConditionOperator::DateEquals
            | ConditionOperator::DateNotEquals
            | ConditionOperator::DateLessThan
            | ConditionOperator::DateLessThanEquals
            | ConditionOperator::DateGreaterThan
            | ConditionOperator::DateGreaterThanEquals => {
                if self.values.len() != 1 || self.single_value().and_then(parse_date).is_none() {
                    return invalid("expected one RFC 3339 date");
                }
            }
            ConditionOperator::Bool | ConditionOperator::Null => {
                if self.values.len() != 1 || self.single_value().and_then(parse_bool).is_none() {
                    return invalid("expected one boolean");
                }
            }
            ConditionOperator::IpAddress | ConditionOperator::NotIpAddress => {
                if self.values.iter().any(|v| parse_net(v).is_none()) {
                    return invalid("expected IP addresses or CIDR ranges");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn single_value(&self) -> Option<&str> {
        self.values.iter().next().map(String::as_str)
    }

    /// Evaluate this condition against the request values
    pub fn evaluate(&self, values: &ConditionValues) -> bool {
        if let Some(positive) = self.operator.negated() {
            return !self.evaluate_as(positive, values);
        }
        self.evaluate_as(self.operator, values)
    }

    fn evaluate_as(&self, operator: ConditionOperator, values: &ConditionValues) -> bool {
        let request: &[String] = values
            .get(self.key.name())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match operator {
            ConditionOperator::StringEquals => {
                let expected = self.expanded_values(values, false);
                self.string_set_match(request, |v| expected.contains(v))
            }
            ConditionOperator::StringEqualsIgnoreCase => {
                let expected = self.expanded_values(values, true);
                self.string_set_match(request, |v| expected.contains(&v.to_lowercase()))
            }
            ConditionOperator::StringLike => {
                let patterns = self.expanded_values(values, false);
                self.string_set_match(request, |v| {
                    patterns.iter().any(|p| PatternMatcher::matches(p, v))
                })
            }
            ConditionOperator::NumericEquals
            | ConditionOperator::NumericLessThan
            | ConditionOperator::NumericLessThanEquals
            | ConditionOperator::NumericGreaterThan
            | ConditionOperator::NumericGreaterThanEquals => {
                let (Some(expected), Some(actual)) = (
                    self.single_value().and_then(parse_number),
                    request.first().and_then(|v| parse_number(v)),
                ) else {
                    return false;
                };
                match operator {
                    ConditionOperator::NumericEquals => (expected - actual).abs() < f64::EPSILON,
                    ConditionOperator::NumericLessThan => actual < expected,
                    ConditionOperator::NumericLessThanEquals => actual <= expected,
                    ConditionOperator::NumericGreaterThan => actual > expected,
                    _ => actual >= expected,
                }
            }
            ConditionOperator::DateEquals
            | ConditionOperator::DateLessThan
            | ConditionOperator::DateLessThanEquals
            | ConditionOperator::DateGreaterThan
            | ConditionOperator::DateGreaterThanEquals => {
                let (Some(expected), Some(actual)) = (
                    self.single_value().and_then(parse_date),
                    request.first().and_then(|v| parse_date(v)),
                ) else {
                    return false;
                };
                match operator {
                    ConditionOperator::DateEquals => actual == expected,
                    ConditionOperator::DateLessThan => actual < expected,
                    ConditionOperator::DateLessThanEquals => actual <= expected,
                    ConditionOperator::DateGreaterThan => actual > expected,
                    _ => actual >= expected,
                }
            }
            ConditionOperator::Bool => {
                match (
                    self.single_value().and_then(parse_bool),
                    request.first().and_then(|v| parse_bool(v)),
                ) {
                    (Some(expected), Some(actual)) => expected == actual,
                    _ => false,
                }
            }
            ConditionOperator::IpAddress => {
                let Some(addr) = request.first().and_then(|v| v.parse::<IpAddr>().ok()) else {
                    return false;
                };
                self.values
                    .iter()
                    .filter_map(|v| parse_net(v))
                    .any(|net| net.contains(&addr))
            }
            ConditionOperator::Null => {
                let absent = request.iter().all(|v| v.is_empty());
                self.single_value().and_then(parse_bool) == Some(absent)
            }
            // Negated operators are dispatched through their positive form
            _ => false,
        }
    }

    /// Apply the set qualifier to a per-value predicate
    fn string_set_match(&self, request: &[String], pred: impl Fn(&str) -> bool) -> bool {
        match self.qualifier {
            Qualifier::ForAllValues => request.iter().all(|v| pred(v)),
            Qualifier::None | Qualifier::ForAnyValue => request.iter().any(|v| pred(v)),
        }
    }

    /// Policy values with `${...}` variables replaced from the request
    fn expanded_values(&self, values: &ConditionValues, lowercase: bool) -> BTreeSet<String> {
        self.values
            .iter()
            .map(|v| {
                let expanded = substitute_variables(v, values).into_owned();
                if lowercase {
                    expanded.to_lowercase()
                } else {
                    expanded
                }
            })
            .collect()
    }

    /// Stable textual form used for structural hashing
    pub(crate) fn canonical(&self) -> String {
        let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
        format!("{}|{}|{}", self.operator_name(), self.key, values.join("\u{0}"))
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_net(value: &str) -> Option<IpNet> {
    let value = value.trim();
    value
        .parse::<IpNet>()
        .ok()
        .or_else(|| value.parse::<IpAddr>().ok().map(IpNet::from))
}

/// Ordered conjunction of condition functions
///
/// An empty set of functions always evaluates to true.
#[derive(Debug, Clone, Default, Eq)]
pub struct Functions(Vec<Function>);

impl Functions {
    /// Create from a list of functions, dropping exact duplicates
    pub fn new(functions: Vec<Function>) -> Self {
        let mut seen = BTreeSet::new();
        Functions(
            functions
                .into_iter()
                .filter(|f| seen.insert(f.clone()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.0.iter()
    }
}

impl ConditionEvaluator for Functions {
    fn evaluate(&self, values: &ConditionValues) -> bool {
        self.0.iter().all(|f| f.evaluate(values))
    }

    fn keys(&self) -> KeySet {
        self.0.iter().map(|f| f.key.clone()).collect()
    }
}

/// Set equality, order-independent
impl PartialEq for Functions {
    fn eq(&self, other: &Self) -> bool {
        let mine: BTreeSet<&Function> = self.0.iter().collect();
        let theirs: BTreeSet<&Function> = other.0.iter().collect();
        mine == theirs
    }
}

impl fmt::Display for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|func| format!("{}:{}:{:?}", func.operator_name(), func.key, func.values))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

impl Serialize for Functions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut grouped: BTreeMap<String, BTreeMap<&str, &BTreeSet<String>>> = BTreeMap::new();
        for func in &self.0 {
            grouped
                .entry(func.operator_name())
                .or_default()
                .insert(func.key.full_name(), &func.values);
        }

        let mut map = serializer.serialize_map(Some(grouped.len()))?;
        for (operator, keys) in &grouped {
            map.serialize_entry(operator, keys)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Functions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
            BTreeMap::deserialize(deserializer)?;
        parse_functions(raw).map_err(de::Error::custom)
    }
}

fn parse_functions(raw: BTreeMap<String, BTreeMap<String, serde_json::Value>>) -> Result<Functions> {
    let mut functions = Vec::new();

    for (operator_name, keys) in raw {
        let (qualifier, bare) = if let Some(rest) = operator_name.strip_prefix("ForAnyValue:") {
            (Qualifier::ForAnyValue, rest)
        } else if let Some(rest) = operator_name.strip_prefix("ForAllValues:") {
            (Qualifier::ForAllValues, rest)
        } else {
            (Qualifier::None, operator_name.as_str())
        };
        let operator = ConditionOperator::parse(bare).ok_or_else(|| {
            Error::InvalidCondition(format!("unknown operator '{}'", operator_name))
        })?;

        if keys.is_empty() {
            return Err(Error::InvalidCondition(format!(
                "operator '{}' has no keys",
                operator_name
            )));
        }

        for (key, value) in keys {
            let key = ConditionKey::parse(&key)?;
            let values = json_values(&value).ok_or_else(|| {
                Error::InvalidCondition(format!("unsupported value for key '{}'", key))
            })?;
            functions.push(Function::new(qualifier, operator, key, values)?);
        }
    }

    Ok(Functions::new(functions))
}

/// Normalise a JSON scalar or array of scalars to strings
fn json_values(value: &serde_json::Value) -> Option<BTreeSet<String>> {
    fn scalar(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    match value {
        serde_json::Value::Array(items) => items.iter().map(scalar).collect(),
        other => scalar(other).map(|s| BTreeSet::from([s])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions(json: &str) -> Functions {
        serde_json::from_str(json).unwrap()
    }

    fn values(pairs: &[(&str, &[&str])]) -> ConditionValues {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_string_equals() {
        let conds = functions(r#"{"StringEquals": {"aws:username": ["alice", "bob"]}}"#);

        assert!(conds.evaluate(&values(&[("username", &["alice"])])));
        assert!(conds.evaluate(&values(&[("username", &["bob"])])));
        assert!(!conds.evaluate(&values(&[("username", &["carol"])])));
        // Missing key - condition fails
        assert!(!conds.evaluate(&ConditionValues::new()));
    }

    #[test]
    fn test_string_not_equals_on_missing_key() {
        let conds = functions(r#"{"StringNotEquals": {"s3:prefix": "private/"}}"#);

        assert!(conds.evaluate(&ConditionValues::new()));
        assert!(conds.evaluate(&values(&[("prefix", &["public/"])])));
        assert!(!conds.evaluate(&values(&[("prefix", &["private/"])])));
    }

    #[test]
    fn test_string_equals_ignore_case() {
        let conds = functions(r#"{"StringEqualsIgnoreCase": {"aws:UserAgent": "MinIO"}}"#);
        assert!(conds.evaluate(&values(&[("UserAgent", &["minio"])])));
        assert!(!conds.evaluate(&values(&[("UserAgent", &["curl"])])));
    }

    #[test]
    fn test_string_like() {
        let conds = functions(r#"{"StringLike": {"s3:prefix": ["home/*", "shared/*"]}}"#);

        assert!(conds.evaluate(&values(&[("prefix", &["home/alice/"])])));
        assert!(conds.evaluate(&values(&[("prefix", &["shared/x"])])));
        assert!(!conds.evaluate(&values(&[("prefix", &["private/x"])])));
    }

    #[test]
    fn test_string_like_with_policy_variable() {
        let conds = functions(r#"{"StringLike": {"s3:prefix": "home/${aws:username}/*"}}"#);

        let ok = values(&[("prefix", &["home/alice/docs"]), ("username", &["alice"])]);
        let other = values(&[("prefix", &["home/bob/docs"]), ("username", &["alice"])]);
        assert!(conds.evaluate(&ok));
        assert!(!conds.evaluate(&other));
    }

    #[test]
    fn test_for_all_values() {
        let conds = functions(r#"{"ForAllValues:StringEquals": {"aws:groups": ["dev", "ops"]}}"#);

        assert!(conds.evaluate(&values(&[("groups", &["dev", "ops"])])));
        assert!(!conds.evaluate(&values(&[("groups", &["dev", "admin"])])));

        let any = functions(r#"{"ForAnyValue:StringEquals": {"aws:groups": ["dev"]}}"#);
        assert!(any.evaluate(&values(&[("groups", &["dev", "admin"])])));
    }

    #[test]
    fn test_numeric() {
        let conds = functions(r#"{"NumericLessThanEquals": {"s3:max-keys": 100}}"#);

        assert!(conds.evaluate(&values(&[("max-keys", &["10"])])));
        assert!(conds.evaluate(&values(&[("max-keys", &["100"])])));
        assert!(!conds.evaluate(&values(&[("max-keys", &["101"])])));
        assert!(!conds.evaluate(&values(&[("max-keys", &["lots"])])));
    }

    #[test]
    fn test_date() {
        let conds =
            functions(r#"{"DateLessThan": {"aws:CurrentTime": "2030-01-01T00:00:00Z"}}"#);

        assert!(conds.evaluate(&values(&[("CurrentTime", &["2024-06-01T12:00:00Z"])])));
        assert!(!conds.evaluate(&values(&[("CurrentTime", &["2031-06-01T12:00:00Z"])])));
    }

    #[test]
    fn test_bool_and_null() {
        let secure = functions(r#"{"Bool": {"aws:SecureTransport": true}}"#);
        assert!(secure.evaluate(&values(&[("SecureTransport", &["true"])])));
        assert!(!secure.evaluate(&values(&[("SecureTransport", &["false"])])));

        let null = functions(r#"{"Null": {"aws:Referer": "true"}}"#);
        assert!(null.evaluate(&ConditionValues::new()));
        assert!(!null.evaluate(&values(&[("Referer", &["https://example.com"])])));
    }

    #[test]
    fn test_ip_address() {
        let conds = functions(r#"{"IpAddress": {"aws:SourceIp": ["10.0.0.0/8", "192.168.1.7"]}}"#);

        assert!(conds.evaluate(&values(&[("SourceIp", &["10.1.2.3"])])));
        assert!(conds.evaluate(&values(&[("SourceIp", &["192.168.1.7"])])));
        assert!(!conds.evaluate(&values(&[("SourceIp", &["192.168.1.8"])])));

        let not = functions(r#"{"NotIpAddress": {"aws:SourceIp": "10.0.0.0/8"}}"#);
        assert!(not.evaluate(&values(&[("SourceIp", &["172.16.0.1"])])));
        assert!(!not.evaluate(&values(&[("SourceIp", &["10.9.9.9"])])));
    }

    #[test]
    fn test_all_functions_must_hold() {
        let conds = functions(
            r#"{"StringEquals": {"aws:username": "alice"},
                "Bool": {"aws:SecureTransport": "true"}}"#,
        );
        assert!(conds.evaluate(&values(&[("username", &["alice"]), ("SecureTransport", &["true"])])));
        assert!(!conds.evaluate(&values(&[("username", &["alice"]), ("SecureTransport", &["false"])])));
    }

    #[test]
    fn test_empty_functions_pass() {
        assert!(Functions::default().evaluate(&ConditionValues::new()));
    }

    #[test]
    fn test_invalid_conditions_rejected() {
        let bad = [
            r#"{"StringEqualz": {"aws:username": "a"}}"#,
            r#"{"StringEquals": {"bogus:key": "a"}}"#,
            r#"{"NumericEquals": {"s3:max-keys": "ten"}}"#,
            r#"{"DateLessThan": {"aws:CurrentTime": "yesterday"}}"#,
            r#"{"IpAddress": {"aws:SourceIp": "not-an-ip"}}"#,
            r#"{"ForAllValues:NumericEquals": {"s3:max-keys": 1}}"#,
            r#"{"StringEquals": {"aws:username": []}}"#,
            r#"{"StringEquals": {"aws:username": {"nested": 1}}}"#,
        ];
        for json in bad {
            assert!(serde_json::from_str::<Functions>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_keys_and_equality() {
        let a = functions(
            r#"{"StringEquals": {"aws:username": ["a", "b"]}, "Bool": {"aws:SecureTransport": true}}"#,
        );
        let b = functions(
            r#"{"Bool": {"aws:SecureTransport": "true"}, "StringEquals": {"aws:username": ["b", "a"]}}"#,
        );
        assert_eq!(a, b);

        let keys: Vec<String> = a.keys().into_iter().map(String::from).collect();
        assert_eq!(keys, vec!["aws:SecureTransport", "aws:username"]);
    }

    #[test]
    fn test_serialize_groups_by_operator() {
        let conds = functions(
            r#"{"StringEquals": {"aws:username": "alice", "aws:userid": "42"}}"#,
        );
        let json = serde_json::to_value(&conds).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"StringEquals": {"aws:userid": ["42"], "aws:username": ["alice"]}})
        );
        let back: Functions = serde_json::from_value(json).unwrap();
        assert_eq!(back, conds);
    }
}
