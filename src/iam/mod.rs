//! Identity and Access Management (IAM) policy engine
//!
//! Decides whether a request is allowed by a set of JSON policy documents:
//! - Namespaced actions (`s3:`, `admin:`, `sts:`, `kms:`, `s3tables:`, `s3vectors:`)
//! - ARN resource patterns with `*`/`?` wildcards and policy variables
//! - Allow/Deny statements where any matching Deny wins
//! - Condition functions over request attributes
//! - Statement deduplication, policy merging and an action index
//! - Serial and parallel evaluation across many policies
//! - Bucket policies with principals

mod action;
mod args;
mod bucket_policy;
pub mod catalog;
mod condition;
mod dedup;
mod evaluator;
mod key;
mod pattern;
mod policy;
mod principal;
mod resource;
mod statement;

pub use action::{Action, ActionSet, ActionType};
pub use args::{resource_path, Args};
pub use bucket_policy::{BucketPolicy, BucketPolicyArgs, BucketPolicyStatement};
pub use condition::{
    ConditionEvaluator, ConditionOperator, ConditionValues, Function, Functions, Qualifier,
};
pub use dedup::{dedup_hashed, dedup_pairwise, dedup_statements, random_seed, Fingerprint};
pub use evaluator::{
    is_allowed_par, is_allowed_par_with, is_allowed_serial, CancelToken, Evaluator,
};
pub use key::{ConditionKey, KeySet};
pub use pattern::PatternMatcher;
pub use policy::{merge_policies, Decision, Policy, DEFAULT_VERSION};
pub use principal::Principal;
pub use resource::{Resource, ResourceSet, ResourceType};
pub use statement::{Effect, Statement};
