//! Request description passed to policy evaluation

use super::action::{Action, ActionType};
use super::condition::ConditionValues;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// One authorization request
///
/// Created per request and dropped after the decision; nothing here is
/// retained by the policy.
#[derive(Debug, Clone)]
pub struct Args {
    pub account: String,
    pub groups: Vec<String>,
    pub action: Action,
    pub bucket: String,
    pub object: String,
    /// Request attribute values keyed by condition-key short name
    pub condition_values: ConditionValues,
    pub is_owner: bool,
    /// Only check for an explicit Deny; anything not denied is allowed
    pub deny_only: bool,
    /// Identity token claims
    pub claims: HashMap<String, Value>,
}

impl Args {
    /// Request for `action` on `bucket`/`object` with no extra context
    pub fn new(action: Action, bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Args {
            account: String::new(),
            groups: Vec::new(),
            action,
            bucket: bucket.into(),
            object: object.into(),
            condition_values: ConditionValues::new(),
            is_owner: false,
            deny_only: false,
            claims: HashMap::new(),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    pub fn with_deny_only(mut self, deny_only: bool) -> Self {
        self.deny_only = deny_only;
        self
    }

    pub fn with_condition_values(mut self, values: ConditionValues) -> Self {
        self.condition_values = values;
        self
    }

    pub fn with_claims(mut self, claims: HashMap<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    /// Resource string the request addresses
    ///
    /// `bucket/object`, or `bucket/` for bucket-level requests.
    pub fn resource_path(&self) -> String {
        resource_path(&self.bucket, &self.object)
    }

    /// Resource strings for one decision
    pub(crate) fn target(&self) -> RequestTarget {
        let path = self.resource_path();
        match self.action.action_type() {
            ActionType::S3Tables | ActionType::S3Vectors => RequestTarget {
                resource: format!("bucket/{}", path),
                table: None,
            },
            ActionType::S3 => RequestTarget {
                table: table_resource(&self.bucket, &self.object),
                resource: path,
            },
            _ => RequestTarget {
                resource: path,
                table: None,
            },
        }
    }

    /// Policy names carried in an identity claim
    ///
    /// The claim may be a comma-separated string or an array of strings.
    /// Names are trimmed and blanks dropped; `None` if the claim is absent,
    /// of another type, or names no policy.
    pub fn policies_from_claim(&self, claim_name: &str) -> Option<BTreeSet<String>> {
        let names: BTreeSet<String> = match self.claims.get(claim_name)? {
            Value::String(joined) => split_names(joined.split(',')),
            Value::Array(items) => {
                let mut names = BTreeSet::new();
                for item in items {
                    names.extend(split_names(item.as_str()?.split(',')));
                }
                names
            }
            _ => return None,
        };
        (!names.is_empty()).then_some(names)
    }
}

fn split_names<'a>(parts: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    parts
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resource strings a request is matched against, built once per decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTarget {
    /// `bucket/object`, with a `bucket/` prefix for table and vector actions
    pub(crate) resource: String,
    /// Table resource for an S3 request on table data
    pub(crate) table: Option<String>,
}

/// Canonical table resource for an S3 request on table data
///
/// The bucket is the warehouse and the first object path segment is the
/// table: `wh` + `uuid/data/f.parquet` becomes `bucket/wh/table/uuid`.
fn table_resource(bucket: &str, object: &str) -> Option<String> {
    if bucket.is_empty() {
        return None;
    }
    let table = object.trim_start_matches('/').split('/').next()?;
    if table.is_empty() {
        return None;
    }
    Some(format!("bucket/{}/table/{}", bucket, table))
}

/// Build the resource string for a bucket and optional object
pub fn resource_path(bucket: &str, object: &str) -> String {
    if object.is_empty() {
        return format!("{}/", bucket);
    }
    if object.starts_with('/') {
        format!("{}{}", bucket, object)
    } else {
        format!("{}/{}", bucket, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get_object(bucket: &str, object: &str) -> Args {
        Args::new(Action::parse("s3:GetObject").unwrap(), bucket, object)
    }

    #[test]
    fn test_resource_path() {
        assert_eq!(get_object("mybucket", "myobject").resource_path(), "mybucket/myobject");
        assert_eq!(get_object("mybucket", "/myobject").resource_path(), "mybucket/myobject");
        assert_eq!(get_object("mybucket", "").resource_path(), "mybucket/");
        assert_eq!(get_object("mybucket", "a/b/c").resource_path(), "mybucket/a/b/c");
    }

    #[test]
    fn test_target_per_namespace() {
        let s3 = get_object("wh", "uuid/data/f.parquet").target();
        assert_eq!(s3.resource, "wh/uuid/data/f.parquet");
        assert_eq!(s3.table.as_deref(), Some("bucket/wh/table/uuid"));

        let bucket_level = get_object("wh", "").target();
        assert_eq!(bucket_level.resource, "wh/");
        assert_eq!(bucket_level.table, None);

        let table = Args::new(Action::parse("s3tables:GetTable").unwrap(), "wh", "table/t1").target();
        assert_eq!(table.resource, "bucket/wh/table/t1");
        assert_eq!(table.table, None);

        let kms = Args::new(Action::parse("kms:CreateKey").unwrap(), "my-key", "").target();
        assert_eq!(kms.resource, "my-key/");
    }

    #[test]
    fn test_policies_from_claim_string() {
        let mut claims = HashMap::new();
        claims.insert("policy".to_string(), json!("readonly, writeonly,,"));
        let args = get_object("b", "o").with_claims(claims);

        let names = args.policies_from_claim("policy").unwrap();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["readonly".to_string(), "writeonly".to_string()]
        );
        assert!(args.policies_from_claim("missing").is_none());
    }

    #[test]
    fn test_policies_from_claim_array() {
        let mut claims = HashMap::new();
        claims.insert("policy".to_string(), json!(["readonly", "diagnostics"]));
        claims.insert("bad".to_string(), json!(["readonly", 5]));
        claims.insert("number".to_string(), json!(5));
        claims.insert("blank".to_string(), json!(" , "));
        let args = get_object("b", "o").with_claims(claims);

        assert_eq!(args.policies_from_claim("policy").map(|n| n.len()), Some(2));
        assert!(args.policies_from_claim("bad").is_none());
        assert!(args.policies_from_claim("number").is_none());
        assert!(args.policies_from_claim("blank").is_none());
    }
}
