//! Bucket policies
//!
//! Same statement machinery as identity policies, plus a required
//! `Principal` that must match the requesting account before any other gate
//! is checked. Only S3 actions are allowed, and every resource must address
//! the bucket the policy is attached to.

use super::action::{Action, ActionSet, ActionType};
use super::args::{Args, RequestTarget};
use super::condition::{ConditionValues, Functions};
use super::dedup::{dedup_statements, Fingerprint, SEED_PRINCIPALS};
use super::policy::{Decision, DEFAULT_VERSION};
use super::principal::Principal;
use super::resource::ResourceSet;
use super::statement::{Effect, Statement};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_128_with_seed;

/// Request against a bucket policy
#[derive(Debug, Clone)]
pub struct BucketPolicyArgs {
    pub account: String,
    pub groups: Vec<String>,
    pub action: Action,
    pub bucket: String,
    pub object: String,
    pub condition_values: ConditionValues,
    pub is_owner: bool,
}

impl BucketPolicyArgs {
    pub fn new(
        account: impl Into<String>,
        action: Action,
        bucket: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        BucketPolicyArgs {
            account: account.into(),
            groups: Vec::new(),
            action,
            bucket: bucket.into(),
            object: object.into(),
            condition_values: ConditionValues::new(),
            is_owner: false,
        }
    }

    pub fn with_owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    pub fn with_condition_values(mut self, values: ConditionValues) -> Self {
        self.condition_values = values;
        self
    }
}

impl From<&BucketPolicyArgs> for Args {
    fn from(args: &BucketPolicyArgs) -> Self {
        Args::new(args.action.clone(), args.bucket.clone(), args.object.clone())
            .with_account(args.account.clone())
            .with_groups(args.groups.clone())
            .with_condition_values(args.condition_values.clone())
            .with_owner(args.is_owner)
    }
}

/// A bucket policy statement: a principal plus an ordinary statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBucketStatement", into = "RawBucketStatement")]
pub struct BucketPolicyStatement {
    pub principal: Principal,
    pub statement: Statement,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBucketStatement {
    #[serde(rename = "Sid", default, skip_serializing_if = "String::is_empty")]
    sid: String,
    #[serde(rename = "Effect")]
    effect: String,
    #[serde(rename = "Principal", default)]
    principal: Principal,
    #[serde(rename = "Action", default, skip_serializing_if = "ActionSet::is_empty")]
    actions: ActionSet,
    #[serde(rename = "NotAction", default, skip_serializing_if = "ActionSet::is_empty")]
    not_actions: ActionSet,
    #[serde(rename = "Resource", default, skip_serializing_if = "ResourceSet::is_empty")]
    resources: ResourceSet,
    #[serde(rename = "Condition", default, skip_serializing_if = "Functions::is_empty")]
    conditions: Functions,
}

impl TryFrom<RawBucketStatement> for BucketPolicyStatement {
    type Error = Error;

    fn try_from(raw: RawBucketStatement) -> Result<Self> {
        let statement = Statement::new(raw.effect.parse()?, raw.actions, raw.resources)
            .with_sid(raw.sid)
            .with_not_actions(raw.not_actions)
            .with_conditions(raw.conditions);
        Ok(BucketPolicyStatement {
            principal: raw.principal,
            statement,
        })
    }
}

impl From<BucketPolicyStatement> for RawBucketStatement {
    fn from(bps: BucketPolicyStatement) -> Self {
        let Statement {
            sid,
            effect,
            actions,
            not_actions,
            resources,
            conditions,
            ..
        } = bps.statement;
        RawBucketStatement {
            sid,
            effect: effect.to_string(),
            principal: bps.principal,
            actions,
            not_actions,
            resources,
            conditions,
        }
    }
}

impl BucketPolicyStatement {
    pub fn new(principal: Principal, statement: Statement) -> Self {
        BucketPolicyStatement {
            principal,
            statement,
        }
    }

    pub fn effect(&self) -> Effect {
        self.statement.effect
    }

    /// True if this statement grants the request; principal is checked first
    pub fn is_allowed(&self, args: &Args) -> bool {
        self.is_allowed_for(args, &args.target())
    }

    pub(crate) fn is_allowed_for(&self, args: &Args, target: &RequestTarget) -> bool {
        let matched =
            self.principal.matches(&args.account) && self.statement.matches(args, target);
        self.statement.effect.is_allowed(matched)
    }

    /// Check principal, S3-only actions and that resources name `bucket`
    pub fn validate(&self, bucket: &str) -> Result<()> {
        if !self.principal.is_valid() {
            return Err(Error::InvalidPrincipal(format!(
                "statement '{}' has no principal",
                self.statement.sid
            )));
        }

        self.statement.validate()?;
        if self.statement.action_type() != Some(ActionType::S3) {
            let actions = self
                .statement
                .actions
                .iter()
                .chain(self.statement.not_actions.iter())
                .next()
                .map(Action::to_string)
                .unwrap_or_default();
            return Err(Error::InvalidAction(actions));
        }
        if self.statement.resources.is_empty() {
            return Err(Error::NonResource);
        }
        self.statement.resources.validate_bucket(bucket)
    }
}

impl Fingerprint for BucketPolicyStatement {
    fn fingerprint(&self, seed: u64) -> u128 {
        let principal_seed = seed.wrapping_add(SEED_PRINCIPALS);
        self.principal
            .accounts()
            .fold(self.statement.fingerprint(seed), |acc, account| {
                acc ^ xxh3_128_with_seed(account.as_bytes(), principal_seed)
            })
    }
}

/// Policy attached to a bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "BucketPolicyDocument")]
pub struct BucketPolicy {
    #[serde(rename = "ID", skip_serializing_if = "String::is_empty")]
    id: String,

    #[serde(rename = "Version", skip_serializing_if = "String::is_empty")]
    version: String,

    #[serde(rename = "Statement")]
    statements: Vec<BucketPolicyStatement>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BucketPolicyDocument {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "Statement", default)]
    statements: Vec<RawBucketStatement>,
}

impl TryFrom<BucketPolicyDocument> for BucketPolicy {
    type Error = Error;

    fn try_from(doc: BucketPolicyDocument) -> Result<Self> {
        if !doc.version.is_empty() && doc.version != DEFAULT_VERSION {
            return Err(Error::InvalidVersion(doc.version));
        }
        let statements = doc
            .statements
            .into_iter()
            .map(BucketPolicyStatement::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(BucketPolicy {
            id: doc.id,
            version: doc.version,
            statements: dedup_statements(&statements),
        })
    }
}

impl BucketPolicy {
    pub fn new(statements: Vec<BucketPolicyStatement>) -> Self {
        BucketPolicy {
            id: String::new(),
            version: DEFAULT_VERSION.to_string(),
            statements: dedup_statements(&statements),
        }
    }

    /// Decode and validate a bucket policy for `bucket`
    pub fn parse_config<R: Read>(reader: R, bucket: &str) -> Result<Self> {
        let doc: BucketPolicyDocument = serde_json::from_reader(reader)?;
        let policy = BucketPolicy::try_from(doc)?;
        policy.validate(bucket)?;
        debug!(
            bucket,
            statements = policy.statements.len(),
            "bucket policy parsed"
        );
        Ok(policy)
    }

    pub fn from_json(json: &str, bucket: &str) -> Result<Self> {
        Self::parse_config(json.as_bytes(), bucket)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn statements(&self) -> &[BucketPolicyStatement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn validate(&self, bucket: &str) -> Result<()> {
        if !self.version.is_empty() && self.version != DEFAULT_VERSION {
            return Err(Error::InvalidVersion(self.version.clone()));
        }
        self.statements.iter().try_for_each(|s| s.validate(bucket))
    }

    /// Deny statements first, then Allow statements, then owner bypass
    pub fn decide(&self, args: &BucketPolicyArgs) -> Decision {
        let args = Args::from(args);
        let target = args.target();

        let denied = self
            .statements
            .iter()
            .filter(|s| s.effect() == Effect::Deny)
            .any(|s| !s.is_allowed_for(&args, &target));
        if denied {
            return Decision::Deny;
        }

        let allowed = self
            .statements
            .iter()
            .filter(|s| s.effect() == Effect::Allow)
            .any(|s| s.is_allowed_for(&args, &target));
        if allowed || args.is_owner {
            Decision::Allow
        } else {
            Decision::Undecided
        }
    }

    pub fn is_allowed(&self, args: &BucketPolicyArgs) -> bool {
        self.decide(args) == Decision::Allow
    }

    pub fn drop_duplicate_statements(&mut self) {
        self.statements = dedup_statements(&self.statements);
    }

    /// Set-equality of statements, plus matching id and version
    pub fn equals(&self, other: &BucketPolicy) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.statements.len() == other.statements.len()
            && self.statements.iter().all(|s| other.statements.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_READ: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [
            {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject",
             "Resource": "arn:aws:s3:::photos/public/*"},
            {"Effect": "Allow", "Principal": {"AWS": ["uploader"]}, "Action": "s3:PutObject",
             "Resource": "arn:aws:s3:::photos/*"},
            {"Effect": "Deny", "Principal": "*", "Action": "s3:DeleteObject",
             "Resource": "arn:aws:s3:::photos/*"}
        ]
    }"#;

    fn req(account: &str, action: &str, object: &str) -> BucketPolicyArgs {
        BucketPolicyArgs::new(account, Action::parse(action).unwrap(), "photos", object)
    }

    #[test]
    fn test_principal_gates_statement() {
        let p = BucketPolicy::from_json(PUBLIC_READ, "photos").unwrap();
        assert!(p.is_allowed(&req("anyone", "s3:GetObject", "public/cat.png")));
        assert!(!p.is_allowed(&req("anyone", "s3:GetObject", "private/cat.png")));
        assert!(p.is_allowed(&req("uploader", "s3:PutObject", "private/cat.png")));
        assert!(!p.is_allowed(&req("anyone", "s3:PutObject", "private/cat.png")));
    }

    #[test]
    fn test_owner_bypass_after_statements() {
        let p = BucketPolicy::from_json(PUBLIC_READ, "photos").unwrap();
        let owner_put = req("owner", "s3:PutObject", "x").with_owner(true);
        assert_eq!(p.decide(&owner_put), Decision::Allow);

        let owner_delete = req("owner", "s3:DeleteObject", "x").with_owner(true);
        assert_eq!(p.decide(&owner_delete), Decision::Deny);

        assert_eq!(
            p.decide(&req("stranger", "s3:ListBucket", "")),
            Decision::Undecided
        );
    }

    #[test]
    fn test_validate_bucket_binding() {
        let err = BucketPolicy::from_json(PUBLIC_READ, "other").unwrap_err();
        assert!(matches!(err, Error::ResourceBucketMismatch(_, _)));
    }

    #[test]
    fn test_validate_requires_principal_and_s3() {
        let no_principal = r#"{"Statement": [
            {"Effect": "Allow", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::b/*"}
        ]}"#;
        assert!(matches!(
            BucketPolicy::from_json(no_principal, "b"),
            Err(Error::InvalidPrincipal(_))
        ));

        let admin = r#"{"Statement": [
            {"Effect": "Allow", "Principal": "*", "Action": "admin:Heal"}
        ]}"#;
        assert!(matches!(
            BucketPolicy::from_json(admin, "b"),
            Err(Error::InvalidAction(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_fields_and_version() {
        assert!(BucketPolicy::from_json(r#"{"Statement": [], "Owner": "x"}"#, "b").is_err());
        assert!(matches!(
            BucketPolicy::from_json(r#"{"Version": "2008-10-17", "Statement": []}"#, "b"),
            Err(Error::InvalidVersion(_))
        ));
        assert!(matches!(
            BucketPolicy::from_json(
                r#"{"Statement": [{"Effect": "allow", "Principal": "*", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::b/*"}]}"#,
                "b"
            ),
            Err(Error::InvalidEffect(e)) if e == "allow"
        ));
    }

    #[test]
    fn test_dedup_considers_principal() {
        let json = r#"{"Statement": [
            {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::b/*"},
            {"Effect": "Allow", "Principal": {"AWS": "*"}, "Action": "s3:GetObject", "Resource": "arn:aws:s3:::b/*"},
            {"Effect": "Allow", "Principal": {"AWS": "alice"}, "Action": "s3:GetObject", "Resource": "arn:aws:s3:::b/*"}
        ]}"#;
        let p = BucketPolicy::from_json(json, "b").unwrap();
        assert_eq!(p.statements().len(), 2);

        let first = &p.statements()[0];
        let second = &p.statements()[1];
        assert_ne!(first.fingerprint(1), second.fingerprint(1));
    }

    #[test]
    fn test_json_round_trip() {
        let p = BucketPolicy::from_json(PUBLIC_READ, "photos").unwrap();
        let json = p.to_json().unwrap();
        assert!(json.contains("\"Principal\""));
        let parsed = BucketPolicy::from_json(&json, "photos").unwrap();
        assert!(p.equals(&parsed));
    }
}
