//! Policy statements
//!
//! A statement grants or forbids a set of actions on a set of resources,
//! optionally gated by conditions. Matching runs three gates in order
//! (action, resource, condition) and the effect turns the result into a
//! uniform "grants access" boolean.

use super::action::{Action, ActionSet, ActionType};
use super::args::{Args, RequestTarget};
use super::catalog;
use super::condition::{ConditionEvaluator, ConditionValues, Functions};
use super::key::{format_keys, ConditionKey, KeySet};
use super::resource::{ResourceSet, ResourceType};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// SIDs may hold any printable text
static SID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\p{Cc}]*$").unwrap());

/// Effect of a policy statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Effect {
    /// Grant the matched request
    Allow,
    /// Forbid the matched request (overrides any Allow)
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }

    /// Turn "the statement matched" into "the statement grants access"
    pub fn is_allowed(&self, matched: bool) -> bool {
        match self {
            Effect::Allow => matched,
            Effect::Deny => !matched,
        }
    }
}

impl FromStr for Effect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Allow" => Ok(Effect::Allow),
            "Deny" => Ok(Effect::Deny),
            other => Err(Error::InvalidEffect(other.to_string())),
        }
    }
}

impl TryFrom<String> for Effect {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single policy statement
///
/// Equality is structural and ignores the SID: two statements are equal
/// when effect, action sets, resource sets and conditions are set-equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StatementDocument")]
pub struct Statement {
    #[serde(rename = "Sid", default, skip_serializing_if = "String::is_empty")]
    pub sid: String,

    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Action", default, skip_serializing_if = "ActionSet::is_empty")]
    pub actions: ActionSet,

    #[serde(rename = "NotAction", default, skip_serializing_if = "ActionSet::is_empty")]
    pub not_actions: ActionSet,

    #[serde(rename = "Resource", default, skip_serializing_if = "ResourceSet::is_empty")]
    pub resources: ResourceSet,

    #[serde(rename = "NotResource", default, skip_serializing_if = "ResourceSet::is_empty")]
    pub not_resources: ResourceSet,

    #[serde(rename = "Condition", default, skip_serializing_if = "Functions::is_empty")]
    pub conditions: Functions,
}

/// Wire form of a statement; Effect is parsed on conversion
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StatementDocument {
    #[serde(rename = "Sid", default)]
    sid: String,
    #[serde(rename = "Effect")]
    effect: String,
    #[serde(rename = "Action", default)]
    actions: ActionSet,
    #[serde(rename = "NotAction", default)]
    not_actions: ActionSet,
    #[serde(rename = "Resource", default)]
    resources: ResourceSet,
    #[serde(rename = "NotResource", default)]
    not_resources: ResourceSet,
    #[serde(rename = "Condition", default)]
    conditions: Functions,
}

impl TryFrom<StatementDocument> for Statement {
    type Error = Error;

    fn try_from(doc: StatementDocument) -> Result<Self> {
        Ok(Statement {
            sid: doc.sid,
            effect: doc.effect.parse()?,
            actions: doc.actions,
            not_actions: doc.not_actions,
            resources: doc.resources,
            not_resources: doc.not_resources,
            conditions: doc.conditions,
        })
    }
}

impl Statement {
    /// Create a statement over `actions` and `resources` with no conditions
    pub fn new(effect: Effect, actions: ActionSet, resources: ResourceSet) -> Self {
        Statement {
            sid: String::new(),
            effect,
            actions,
            not_actions: ActionSet::new(),
            resources,
            not_resources: ResourceSet::new(),
            conditions: Functions::default(),
        }
    }

    /// Create a statement from action and resource strings
    ///
    /// # Examples
    /// ```
    /// use gatekeep::iam::{Args, Action, Effect, Statement};
    ///
    /// let stmt = Statement::parse(Effect::Allow, &["s3:GetObject"], &["arn:aws:s3:::public/*"])
    ///     .unwrap();
    /// let args = Args::new(Action::parse("s3:GetObject").unwrap(), "public", "index.html");
    /// assert!(stmt.is_allowed(&args));
    /// ```
    pub fn parse(effect: Effect, actions: &[&str], resources: &[&str]) -> Result<Self> {
        Ok(Statement::new(
            effect,
            ActionSet::parse(actions.iter().copied())?,
            ResourceSet::parse(resources.iter().copied())?,
        ))
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = sid.into();
        self
    }

    pub fn with_not_actions(mut self, not_actions: ActionSet) -> Self {
        self.not_actions = not_actions;
        self
    }

    pub fn with_not_resources(mut self, not_resources: ResourceSet) -> Self {
        self.not_resources = not_resources;
        self
    }

    pub fn with_conditions(mut self, conditions: Functions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Namespace of the statement's actions
    ///
    /// Validated statements are homogeneous, so the first action decides.
    pub fn action_type(&self) -> Option<ActionType> {
        self.actions
            .iter()
            .chain(self.not_actions.iter())
            .next()
            .map(Action::action_type)
    }

    /// True if this statement grants the request
    ///
    /// For a Deny statement this is false exactly when the statement matches.
    pub fn is_allowed(&self, args: &Args) -> bool {
        self.is_allowed_for(args, &args.target())
    }

    /// `is_allowed` against resource strings already built for the request
    pub(crate) fn is_allowed_for(&self, args: &Args, target: &RequestTarget) -> bool {
        let matched = self.matches(args, target);
        trace!(
            sid = %self.sid,
            effect = %self.effect,
            action = %args.action,
            matched,
            "statement evaluated"
        );
        self.effect.is_allowed(matched)
    }

    /// True if every gate passes, before the effect is applied
    pub(crate) fn matches(&self, args: &Args, target: &RequestTarget) -> bool {
        let Some(kind) = self.action_type() else {
            return false;
        };
        if !self.action_matches(kind, &args.action) {
            return false;
        }

        let resource_ok = match (kind, args.action.action_type()) {
            (ActionType::Admin | ActionType::Sts, _) => true,
            (ActionType::Kms, _) => {
                target.resource == "/"
                    || self.resources.is_empty()
                    || self.resources_match(&target.resource, args)
            }
            // Table statements reach S3 requests only through the table
            // resource, and only when they name positive resources
            (ActionType::S3Tables, ActionType::S3) => match target.table.as_deref() {
                Some(table) => !self.resources.is_empty() && self.resources_match(table, args),
                None => false,
            },
            _ => self.resources_match(&target.resource, args),
        };

        resource_ok && self.conditions.evaluate(&args.condition_values)
    }

    fn action_matches(&self, kind: ActionType, requested: &Action) -> bool {
        if !self.actions.is_empty() {
            let granted = self.actions.matches(requested)
                || (kind == ActionType::S3Tables && self.actions.implies(requested));
            if !granted {
                return false;
            }
        }
        !self.not_actions.matches(requested)
    }

    /// Resource gate: Resource must match (when present) and NotResource vetoes
    fn resources_match(&self, resource: &str, args: &Args) -> bool {
        let values = &args.condition_values;
        if !self.resources.is_empty() && !self.resources.matches(resource, values) {
            return false;
        }
        self.not_resources.is_empty() || !self.not_resources.matches(resource, values)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the statement is well formed for its action namespace
    pub fn validate(&self) -> Result<()> {
        let kind = self.validate_actions()?;

        match kind {
            ActionType::Admin | ActionType::Sts => {}
            ActionType::Kms => {
                self.validate_resource_exclusivity()?;
                self.validate_resource_types(&[ResourceType::Kms])?;
            }
            ActionType::S3 => {
                if !SID_PATTERN.is_match(&self.sid) {
                    return Err(Error::InvalidSid(self.sid.clone()));
                }
                self.validate_required_resources(&[ResourceType::S3])?;
                self.validate_resource_shape()?;
            }
            ActionType::S3Tables => {
                self.validate_required_resources(&[ResourceType::S3Tables])?;
            }
            ActionType::S3Vectors => {
                self.validate_required_resources(&[ResourceType::S3Vectors])?;
            }
        }

        self.validate_condition_keys(kind)
    }

    /// Action/NotAction presence, namespace homogeneity and catalog membership
    fn validate_actions(&self) -> Result<ActionType> {
        match (self.actions.is_empty(), self.not_actions.is_empty()) {
            (true, true) => return Err(Error::NonAction),
            (false, false) => return Err(Error::BothActionAndNotAction),
            _ => {}
        }

        let all: ActionSet = self
            .actions
            .iter()
            .chain(self.not_actions.iter())
            .cloned()
            .collect();
        let kind = match all.common_type() {
            Ok(Some(kind)) => kind,
            Ok(None) => return Err(Error::NonAction),
            Err((first, other)) => {
                return Err(Error::MixedActionTypes(first.to_string(), other.to_string()))
            }
        };

        if let Some(unknown) = all.iter().find(|a| !a.is_valid()) {
            return Err(Error::InvalidAction(unknown.to_string()));
        }
        Ok(kind)
    }

    fn validate_resource_exclusivity(&self) -> Result<()> {
        if !self.resources.is_empty() && !self.not_resources.is_empty() {
            return Err(Error::BothResourceAndNotResource);
        }
        Ok(())
    }

    fn validate_resource_types(&self, allowed: &[ResourceType]) -> Result<()> {
        self.resources.validate_types(allowed)?;
        self.not_resources.validate_types(allowed)
    }

    fn validate_required_resources(&self, allowed: &[ResourceType]) -> Result<()> {
        self.validate_resource_exclusivity()?;
        if self.resources.is_empty() && self.not_resources.is_empty() {
            return Err(Error::NonResource);
        }
        self.validate_resource_types(allowed)
    }

    /// Object actions need an object-shaped resource, bucket actions a
    /// bucket-shaped one; patterns spanning both accept either
    fn validate_resource_shape(&self) -> Result<()> {
        if self.resources.is_empty() {
            return Ok(());
        }

        for action in &self.actions {
            let expanded: Vec<&str> = catalog::expand(action).collect();
            let object_only = expanded.iter().all(|a| catalog::is_object_action(a));
            let bucket_only = expanded.iter().all(|a| !catalog::is_object_action(a));

            let supported = if object_only {
                self.resources.object_resource_exists()
            } else if bucket_only {
                self.resources.bucket_resource_exists()
            } else {
                self.resources.object_resource_exists() || self.resources.bucket_resource_exists()
            };
            if !supported {
                return Err(Error::UnsupportedResource {
                    resources: self.resources.to_string(),
                    action: action.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_condition_keys(&self, kind: ActionType) -> Result<()> {
        let keys = self.conditions.keys();
        if keys.is_empty() {
            return Ok(());
        }

        if self.actions.is_empty() {
            let allowed = catalog::condition_keys_of(kind);
            return check_keys(&keys, &allowed, &self.not_actions.to_string());
        }
        for action in &self.actions {
            let allowed = catalog::condition_keys_for(action);
            check_keys(&keys, &allowed, action.as_str())?;
        }
        Ok(())
    }

    /// Every condition key referenced by this statement
    pub fn condition_keys(&self) -> KeySet {
        self.conditions.keys()
    }

    /// Evaluate only the condition gate
    pub fn conditions_hold(&self, values: &ConditionValues) -> bool {
        self.conditions.evaluate(values)
    }
}

fn check_keys(keys: &KeySet, allowed: &BTreeSet<&'static str>, action: &str) -> Result<()> {
    let unsupported: Vec<&ConditionKey> = keys
        .iter()
        .filter(|k| !allowed.contains(k.full_name()) && !allowed.contains(k.base()))
        .collect();
    if unsupported.is_empty() {
        return Ok(());
    }
    Err(Error::UnsupportedConditionKeys {
        keys: format_keys(unsupported),
        action: action.to_string(),
    })
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.effect == other.effect
            && self.actions == other.actions
            && self.not_actions == other.not_actions
            && self.resources == other.resources
            && self.not_resources == other.not_resources
            && self.conditions == other.conditions
    }
}

impl Eq for Statement {}
