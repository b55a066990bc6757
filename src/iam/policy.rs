//! IAM policy documents and the decision procedure
//!
//! A policy is an ordered list of statements. Decoding deduplicates the
//! statements and builds an index from concrete action to the Allow
//! statements naming it; both are fixed until the policy is rebuilt.

use super::action::{Action, ActionSet};
use super::args::Args;
use super::catalog;
use super::condition::ConditionValues;
use super::dedup::{dedup_hashed, dedup_statements, random_seed};
use super::statement::{Effect, Statement, StatementDocument};
use crate::error::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;

/// The one supported policy language version
pub const DEFAULT_VERSION: &str = "2012-10-17";

/// Outcome of evaluating one policy against one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// No statement applied
    Undecided,
    Allow,
    Deny,
}

/// Complete IAM policy document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "PolicyDocument")]
pub struct Policy {
    #[serde(rename = "ID", skip_serializing_if = "String::is_empty")]
    id: String,

    #[serde(rename = "Version", skip_serializing_if = "String::is_empty")]
    version: String,

    #[serde(rename = "Statement")]
    statements: Vec<Statement>,

    /// Concrete action -> positions of Allow statements naming it
    #[serde(skip)]
    index: AHashMap<String, Vec<usize>>,

    #[serde(skip)]
    has_deny: bool,
}

/// Wire form, decoded before dedup and indexing
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyDocument {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "Statement", default)]
    statements: Vec<StatementDocument>,
}

impl TryFrom<PolicyDocument> for Policy {
    type Error = Error;

    fn try_from(doc: PolicyDocument) -> Result<Self> {
        check_version(&doc.version)?;
        let statements = doc
            .statements
            .into_iter()
            .map(Statement::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Policy::build(doc.id, doc.version, statements))
    }
}

fn check_version(version: &str) -> Result<()> {
    if version.is_empty() || version == DEFAULT_VERSION {
        Ok(())
    } else {
        Err(Error::InvalidVersion(version.to_string()))
    }
}

impl Policy {
    /// Create a policy at the default version
    pub fn new(statements: Vec<Statement>) -> Self {
        Policy::build(String::new(), DEFAULT_VERSION.to_string(), statements)
    }

    fn build(id: String, version: String, statements: Vec<Statement>) -> Self {
        let mut policy = Policy {
            id,
            version,
            statements,
            index: AHashMap::new(),
            has_deny: false,
        };
        policy.drop_duplicate_statements();
        policy
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Decode and validate a policy document
    ///
    /// Nothing is returned unless the whole document is valid.
    pub fn parse_config<R: Read>(reader: R) -> Result<Self> {
        let doc: PolicyDocument = serde_json::from_reader(reader)?;
        let policy = Policy::try_from(doc)?;
        policy.validate()?;
        debug!(
            id = %policy.id,
            statements = policy.statements.len(),
            "policy parsed"
        );
        Ok(policy)
    }

    /// Decode and validate a policy from a JSON string
    ///
    /// # Examples
    /// ```
    /// use gatekeep::iam::{Action, Args, Policy};
    ///
    /// let policy = Policy::from_json(r#"{
    ///     "Version": "2012-10-17",
    ///     "Statement": [{
    ///         "Effect": "Allow",
    ///         "Action": "s3:GetObject",
    ///         "Resource": "arn:aws:s3:::public/*"
    ///     }]
    /// }"#).unwrap();
    ///
    /// let args = Args::new(Action::parse("s3:GetObject").unwrap(), "public", "index.html");
    /// assert!(policy.is_allowed(&args));
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Self::parse_config(json.as_bytes())
    }

    /// Serialize policy to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn has_deny(&self) -> bool {
        self.has_deny
    }

    /// Validate version and every statement
    pub fn validate(&self) -> Result<()> {
        check_version(&self.version)?;
        self.statements.iter().try_for_each(Statement::validate)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Evaluate the request against this policy
    ///
    /// Deny statements are checked first and win over everything, including
    /// ownership. Allow statements are looked up through the action index,
    /// then scanned in full.
    pub fn decide(&self, args: &Args) -> Decision {
        let target = args.target();
        if self.has_deny
            && self
                .statements
                .iter()
                .filter(|s| s.effect == Effect::Deny)
                .any(|s| !s.is_allowed_for(args, &target))
        {
            return Decision::Deny;
        }

        if args.deny_only || args.is_owner {
            return Decision::Allow;
        }

        if let Some(positions) = self.index.get(args.action.as_str()) {
            let indexed_hit = positions
                .iter()
                .filter_map(|&i| self.statements.get(i))
                .any(|s| s.is_allowed_for(args, &target));
            if indexed_hit {
                return Decision::Allow;
            }
        }

        // Wildcard actions never reach the index
        let allowed = self
            .statements
            .iter()
            .filter(|s| s.effect == Effect::Allow)
            .any(|s| s.is_allowed_for(args, &target));
        if allowed {
            Decision::Allow
        } else {
            Decision::Undecided
        }
    }

    /// True only for an explicit Allow; Undecided and Deny are both false
    pub fn is_allowed(&self, args: &Args) -> bool {
        self.decide(args) == Decision::Allow
    }

    /// Every catalog action this policy allows on `bucket`/`object`
    pub fn is_allowed_actions(
        &self,
        bucket: &str,
        object: &str,
        condition_values: &ConditionValues,
    ) -> ActionSet {
        let mut allowed = ActionSet::new();
        let Some(first) = catalog::all_actions().first() else {
            return allowed;
        };

        let mut args = Args::new(first.clone(), bucket, object)
            .with_condition_values(condition_values.clone());
        for action in catalog::all_actions() {
            args.action = action.clone();
            if self.is_allowed(&args) {
                allowed.insert(action.clone());
            }
        }
        allowed
    }

    /// Set-equality of statements, plus matching id and version
    pub fn equals(&self, other: &Policy) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.statements.len() == other.statements.len()
            && self.statements.iter().all(|s| other.statements.contains(s))
            && other.statements.iter().all(|s| self.statements.contains(s))
    }

    /// Remove structural duplicates and rebuild the index
    pub fn drop_duplicate_statements(&mut self) {
        self.statements = dedup_statements(&self.statements);
        self.rebuild_index();
    }

    /// Recompute the action index and deny flag from the statements
    pub fn rebuild_index(&mut self) {
        let mut index: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (position, stmt) in self.statements.iter().enumerate() {
            if stmt.effect != Effect::Allow {
                continue;
            }
            for action in stmt.actions.iter().filter(|a| !a.is_wildcard()) {
                index
                    .entry(action.as_str().to_string())
                    .or_default()
                    .push(position);
            }
        }
        self.index = index;
        self.has_deny = self.statements.iter().any(|s| s.effect == Effect::Deny);
    }

    /// Copy of this policy with an empty index, forcing full scans
    pub fn without_index(&self) -> Policy {
        let mut policy = self.clone();
        policy.index.clear();
        policy
    }

    /// Statement positions indexed under a concrete action
    pub fn indexed_statements(&self, action: &Action) -> &[usize] {
        self.index
            .get(action.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Combine policies into one, keeping the first non-empty version
///
/// Statements are concatenated in order, deduplicated under a fresh seed and
/// re-indexed.
pub fn merge_policies(policies: &[Policy]) -> Policy {
    let mut merged = Policy::default();
    for policy in policies {
        if merged.version.is_empty() {
            merged.version = policy.version.clone();
        }
        merged.statements.extend(policy.statements.iter().cloned());
    }

    let total = merged.statements.len();
    merged.statements = dedup_hashed(&merged.statements, random_seed());
    merged.rebuild_index();

    debug!(
        policies = policies.len(),
        statements = total,
        unique = merged.statements.len(),
        "policies merged"
    );
    merged
}
