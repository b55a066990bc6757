//! Error types for policy parsing and validation
//!
//! Evaluation never fails: `decide`/`is_allowed` always return a value.
//! Everything here is raised while a document is decoded or validated,
//! before it can be installed.

use thiserror::Error;

/// Policy operation result type
pub type Result<T> = std::result::Result<T, Error>;

/// Policy parse and validation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Document is not valid JSON or has unknown fields
    #[error("Malformed policy document: {0}")]
    Json(#[from] serde_json::Error),

    /// Version is neither empty nor the supported version
    #[error("Invalid Version '{0}'")]
    InvalidVersion(String),

    /// Effect is neither Allow nor Deny
    #[error("Invalid Effect '{0}'")]
    InvalidEffect(String),

    /// Statement has neither Action nor NotAction
    #[error("Action must not be empty")]
    NonAction,

    /// Statement has both Action and NotAction
    #[error("Unsupported Action and NotAction in the same statement")]
    BothActionAndNotAction,

    /// Statement requires a Resource but has none
    #[error("Resource must not be empty")]
    NonResource,

    /// Statement has both Resource and NotResource
    #[error("Unsupported Resource and NotResource in the same statement")]
    BothResourceAndNotResource,

    /// Action is unknown or malformed
    #[error("Invalid action '{0}'")]
    InvalidAction(String),

    /// Actions from more than one namespace in a single statement
    #[error("Mixed action namespaces in one statement: {0} and {1}")]
    MixedActionTypes(String, String),

    /// Same action listed twice in one set
    #[error("Duplicate action '{0}'")]
    DuplicateAction(String),

    /// Resource is unknown or malformed
    #[error("Invalid resource, type: '{0}', pattern: '{1}'")]
    InvalidResource(String, String),

    /// Same resource listed twice in one set
    #[error("Duplicate resource '{0}'")]
    DuplicateResource(String),

    /// Resource cannot address the bucket the policy is attached to
    #[error("Resource '{0}' does not match bucket '{1}'")]
    ResourceBucketMismatch(String, String),

    /// No resource of the right shape for an action
    #[error("Unsupported Resource found {resources} for action {action}")]
    UnsupportedResource { resources: String, action: String },

    /// Condition keys not allowed for an action
    #[error("Unsupported condition keys '{keys}' used for action '{action}'")]
    UnsupportedConditionKeys { keys: String, action: String },

    /// Condition block could not be parsed
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// SID contains characters that are not allowed
    #[error("Invalid SID '{0}'")]
    InvalidSid(String),

    /// Bucket policy principal is missing or malformed
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Evaluator configuration rejected
    #[error("Invalid evaluator config: {0}")]
    Config(String),

    /// Config file is not valid TOML
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
