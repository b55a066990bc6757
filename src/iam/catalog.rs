//! Static action catalog and per-action condition key tables
//!
//! Tables are built once on first use and never mutated afterwards.
//! Validation looks up which condition keys an action accepts; the
//! allowed-actions probe walks every known action.

use super::action::{Action, ActionType};
use super::condition::ConditionValues;
use super::key::ConditionKey;
use super::pattern::PatternMatcher;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

/// S3 actions that address an object (`bucket/key`)
pub const S3_OBJECT_ACTIONS: &[&str] = &[
    "s3:GetObject",
    "s3:PutObject",
    "s3:DeleteObject",
    "s3:AbortMultipartUpload",
    "s3:ListMultipartUploadParts",
    "s3:GetObjectVersion",
    "s3:DeleteObjectVersion",
    "s3:GetObjectAttributes",
    "s3:GetObjectVersionAttributes",
    "s3:GetObjectTagging",
    "s3:PutObjectTagging",
    "s3:DeleteObjectTagging",
    "s3:GetObjectVersionTagging",
    "s3:PutObjectVersionTagging",
    "s3:DeleteObjectVersionTagging",
    "s3:GetObjectRetention",
    "s3:PutObjectRetention",
    "s3:GetObjectLegalHold",
    "s3:PutObjectLegalHold",
    "s3:BypassGovernanceRetention",
    "s3:GetObjectAcl",
    "s3:PutObjectAcl",
    "s3:RestoreObject",
    "s3:ReplicateObject",
    "s3:ReplicateDelete",
    "s3:ReplicateTags",
    "s3:GetObjectVersionForReplication",
];

/// S3 actions that address a bucket (or no bucket at all)
pub const S3_BUCKET_ACTIONS: &[&str] = &[
    "s3:CreateBucket",
    "s3:DeleteBucket",
    "s3:ForceDeleteBucket",
    "s3:ListAllMyBuckets",
    "s3:ListBucket",
    "s3:ListBucketVersions",
    "s3:ListBucketMultipartUploads",
    "s3:GetBucketLocation",
    "s3:GetBucketPolicy",
    "s3:PutBucketPolicy",
    "s3:DeleteBucketPolicy",
    "s3:GetBucketPolicyStatus",
    "s3:GetBucketVersioning",
    "s3:PutBucketVersioning",
    "s3:GetBucketTagging",
    "s3:PutBucketTagging",
    "s3:GetBucketNotification",
    "s3:PutBucketNotification",
    "s3:ListenNotification",
    "s3:ListenBucketNotification",
    "s3:GetLifecycleConfiguration",
    "s3:PutLifecycleConfiguration",
    "s3:GetBucketObjectLockConfiguration",
    "s3:PutBucketObjectLockConfiguration",
    "s3:GetEncryptionConfiguration",
    "s3:PutEncryptionConfiguration",
    "s3:GetReplicationConfiguration",
    "s3:PutReplicationConfiguration",
    "s3:GetBucketCors",
    "s3:PutBucketCors",
    "s3:GetBucketAcl",
    "s3:PutBucketAcl",
];

pub const ADMIN_ACTIONS: &[&str] = &[
    "admin:Heal",
    "admin:ServerInfo",
    "admin:StorageInfo",
    "admin:DataUsageInfo",
    "admin:TopLocksInfo",
    "admin:Profiling",
    "admin:Prometheus",
    "admin:ServerTrace",
    "admin:ConsoleLog",
    "admin:KMSCreateKey",
    "admin:KMSKeyStatus",
    "admin:ServerUpdate",
    "admin:ServiceRestart",
    "admin:ServiceStop",
    "admin:ServiceFreeze",
    "admin:ConfigUpdate",
    "admin:CreateUser",
    "admin:DeleteUser",
    "admin:ListUsers",
    "admin:EnableUser",
    "admin:DisableUser",
    "admin:GetUser",
    "admin:AddUserToGroup",
    "admin:RemoveUserFromGroup",
    "admin:GetGroup",
    "admin:ListGroups",
    "admin:EnableGroup",
    "admin:DisableGroup",
    "admin:CreatePolicy",
    "admin:DeletePolicy",
    "admin:GetPolicy",
    "admin:AttachUserOrGroupPolicy",
    "admin:ListUserPolicies",
    "admin:CreateServiceAccount",
    "admin:UpdateServiceAccount",
    "admin:RemoveServiceAccount",
    "admin:ListServiceAccounts",
    "admin:ListTemporaryAccounts",
    "admin:SetBucketQuota",
    "admin:GetBucketQuota",
    "admin:SetBucketTarget",
    "admin:GetBucketTarget",
    "admin:ReplicationDiff",
    "admin:ImportBucketMetadata",
    "admin:ExportBucketMetadata",
    "admin:SetTier",
    "admin:ListTier",
    "admin:ExportIAM",
    "admin:ImportIAM",
    "admin:BandwidthMonitor",
    "admin:InspectData",
    "admin:Decommission",
    "admin:Rebalance",
    "admin:SiteReplicationAdd",
    "admin:SiteReplicationInfo",
    "admin:SiteReplicationRemove",
    "admin:SiteReplicationResync",
    "admin:SiteReplicationOperation",
];

pub const STS_ACTIONS: &[&str] = &[
    "sts:AssumeRole",
    "sts:AssumeRoleWithWebIdentity",
    "sts:AssumeRoleWithLDAPIdentity",
    "sts:AssumeRoleWithClientGrants",
    "sts:AssumeRoleWithCertificate",
    "sts:AssumeRoleWithCustomToken",
];

pub const KMS_ACTIONS: &[&str] = &[
    "kms:Status",
    "kms:Metrics",
    "kms:API",
    "kms:Version",
    "kms:CreateKey",
    "kms:ImportKey",
    "kms:DeleteKey",
    "kms:KeyStatus",
    "kms:ListKeys",
    "kms:GenerateKey",
    "kms:Decrypt",
];

pub const S3TABLES_ACTIONS: &[&str] = &[
    "s3tables:CreateTableBucket",
    "s3tables:GetTableBucket",
    "s3tables:ListTableBuckets",
    "s3tables:DeleteTableBucket",
    "s3tables:PutTableBucketPolicy",
    "s3tables:GetTableBucketPolicy",
    "s3tables:DeleteTableBucketPolicy",
    "s3tables:CreateNamespace",
    "s3tables:GetNamespace",
    "s3tables:ListNamespaces",
    "s3tables:DeleteNamespace",
    "s3tables:CreateTable",
    "s3tables:GetTable",
    "s3tables:ListTables",
    "s3tables:DeleteTable",
    "s3tables:RenameTable",
    "s3tables:UpdateTableMetadataLocation",
    "s3tables:GetTableMetadataLocation",
    "s3tables:GetTableData",
    "s3tables:PutTableData",
    "s3tables:PutTablePolicy",
    "s3tables:GetTablePolicy",
    "s3tables:DeleteTablePolicy",
];

pub const S3VECTORS_ACTIONS: &[&str] = &[
    "s3vectors:CreateVectorBucket",
    "s3vectors:GetVectorBucket",
    "s3vectors:ListVectorBuckets",
    "s3vectors:DeleteVectorBucket",
    "s3vectors:CreateIndex",
    "s3vectors:GetIndex",
    "s3vectors:ListIndexes",
    "s3vectors:DeleteIndex",
    "s3vectors:PutVectors",
    "s3vectors:GetVectors",
    "s3vectors:ListVectors",
    "s3vectors:DeleteVectors",
    "s3vectors:QueryVectors",
];

/// Object-storage calls granted implicitly by table-data actions
pub const TABLE_DATA_IMPLIED_ACTIONS: &[(&str, &[&str])] = &[
    ("s3tables:GetTableData", &["s3:GetObject"]),
    (
        "s3tables:PutTableData",
        &[
            "s3:PutObject",
            "s3:ListMultipartUploadParts",
            "s3:AbortMultipartUpload",
        ],
    ),
];

/// Keys accepted by every action; also the substitutable policy variables
pub const COMMON_KEY_NAMES: &[&str] = &[
    "aws:Referer",
    "aws:SourceIp",
    "aws:UserAgent",
    "aws:SecureTransport",
    "aws:CurrentTime",
    "aws:EpochTime",
    "aws:principaltype",
    "aws:userid",
    "aws:username",
    "aws:groups",
    "jwt:sub",
    "jwt:iss",
    "jwt:aud",
    "jwt:jti",
    "jwt:upn",
    "jwt:name",
    "jwt:groups",
    "jwt:email",
    "jwt:preferred_username",
    "jwt:scope",
    "jwt:client_id",
    "ldap:user",
    "ldap:username",
    "ldap:groups",
    "s3:signatureversion",
    "s3:authType",
    "s3:signatureAge",
];

const VERSION_ID: &str = "s3:versionid";
const EXISTING_TAG: &str = "s3:ExistingObjectTag";
const REQUEST_TAG: &str = "s3:RequestObjectTag";
const REQUEST_TAG_KEYS: &str = "s3:RequestObjectTagKeys";
const LOCK_MODE: &str = "s3:object-lock-mode";
const LOCK_RETAIN_UNTIL: &str = "s3:object-lock-retain-until-date";
const LOCK_REMAINING_DAYS: &str = "s3:object-lock-remaining-retention-days";
const LOCK_LEGAL_HOLD: &str = "s3:object-lock-legal-hold";
const LIST_KEYS: &[&str] = &["s3:prefix", "s3:delimiter", "s3:max-keys"];
const TABLE_NAMESPACE: &str = "s3tables:namespace";
const TABLE_NAME: &str = "s3tables:tableName";

/// Action-specific condition keys, on top of the common keys
const ACTION_EXTRA_KEYS: &[(&str, &[&str])] = &[
    ("s3:ListBucket", LIST_KEYS),
    ("s3:ListBucketVersions", LIST_KEYS),
    (
        "s3:PutObject",
        &[
            "s3:x-amz-copy-source",
            "s3:x-amz-server-side-encryption",
            "s3:x-amz-server-side-encryption-customer-algorithm",
            "s3:x-amz-server-side-encryption-aws-kms-key-id",
            "s3:x-amz-metadata-directive",
            "s3:x-amz-storage-class",
            "s3:x-amz-content-sha256",
            "s3:x-amz-acl",
            LOCK_MODE,
            LOCK_RETAIN_UNTIL,
            LOCK_REMAINING_DAYS,
            LOCK_LEGAL_HOLD,
            REQUEST_TAG,
            REQUEST_TAG_KEYS,
        ],
    ),
    (
        "s3:GetObject",
        &[
            VERSION_ID,
            EXISTING_TAG,
            "s3:x-amz-server-side-encryption",
            "s3:x-amz-server-side-encryption-customer-algorithm",
        ],
    ),
    ("s3:DeleteObject", &[VERSION_ID, EXISTING_TAG]),
    ("s3:GetObjectVersion", &[VERSION_ID, EXISTING_TAG]),
    ("s3:DeleteObjectVersion", &[VERSION_ID, EXISTING_TAG]),
    ("s3:GetObjectAttributes", &[VERSION_ID, EXISTING_TAG]),
    ("s3:GetObjectVersionAttributes", &[VERSION_ID, EXISTING_TAG]),
    ("s3:GetObjectTagging", &[VERSION_ID, EXISTING_TAG]),
    ("s3:DeleteObjectTagging", &[VERSION_ID, EXISTING_TAG]),
    ("s3:GetObjectVersionTagging", &[VERSION_ID, EXISTING_TAG]),
    ("s3:DeleteObjectVersionTagging", &[VERSION_ID, EXISTING_TAG]),
    (
        "s3:PutObjectTagging",
        &[VERSION_ID, EXISTING_TAG, REQUEST_TAG, REQUEST_TAG_KEYS],
    ),
    (
        "s3:PutObjectVersionTagging",
        &[VERSION_ID, EXISTING_TAG, REQUEST_TAG, REQUEST_TAG_KEYS],
    ),
    ("s3:GetObjectRetention", &[VERSION_ID]),
    (
        "s3:PutObjectRetention",
        &[VERSION_ID, LOCK_MODE, LOCK_RETAIN_UNTIL, LOCK_REMAINING_DAYS],
    ),
    ("s3:GetObjectLegalHold", &[VERSION_ID]),
    ("s3:PutObjectLegalHold", &[VERSION_ID, LOCK_LEGAL_HOLD]),
    (
        "s3:BypassGovernanceRetention",
        &[
            VERSION_ID,
            LOCK_MODE,
            LOCK_RETAIN_UNTIL,
            LOCK_REMAINING_DAYS,
            LOCK_LEGAL_HOLD,
        ],
    ),
    ("s3:GetObjectAcl", &[VERSION_ID]),
    ("s3:PutObjectAcl", &[VERSION_ID, "s3:x-amz-acl"]),
    ("s3:CreateBucket", &["s3:LocationConstraint"]),
    ("sts:AssumeRole", &["sts:DurationSeconds"]),
    ("sts:AssumeRoleWithWebIdentity", &["sts:DurationSeconds"]),
    ("sts:AssumeRoleWithLDAPIdentity", &["sts:DurationSeconds"]),
    ("sts:AssumeRoleWithClientGrants", &["sts:DurationSeconds"]),
    ("sts:AssumeRoleWithCertificate", &["sts:DurationSeconds"]),
    ("sts:AssumeRoleWithCustomToken", &["sts:DurationSeconds"]),
    ("s3tables:CreateNamespace", &[TABLE_NAMESPACE]),
    ("s3tables:GetNamespace", &[TABLE_NAMESPACE]),
    ("s3tables:DeleteNamespace", &[TABLE_NAMESPACE]),
    ("s3tables:CreateTable", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:ListTables", &[TABLE_NAMESPACE]),
    ("s3tables:GetTable", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:DeleteTable", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:RenameTable", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:UpdateTableMetadataLocation", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:GetTableMetadataLocation", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:GetTableData", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:PutTableData", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:PutTablePolicy", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:GetTablePolicy", &[TABLE_NAMESPACE, TABLE_NAME]),
    ("s3tables:DeleteTablePolicy", &[TABLE_NAMESPACE, TABLE_NAME]),
];

static S3_ACTIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    S3_OBJECT_ACTIONS
        .iter()
        .chain(S3_BUCKET_ACTIONS)
        .copied()
        .collect()
});

static COMMON_KEYS: Lazy<Vec<ConditionKey>> = Lazy::new(|| {
    COMMON_KEY_NAMES
        .iter()
        .filter_map(|name| ConditionKey::parse(name).ok())
        .collect()
});

/// Catalog action -> accepted condition key names
static ACTION_CONDITION_KEYS: Lazy<HashMap<&'static str, BTreeSet<&'static str>>> =
    Lazy::new(|| {
        let extras: HashMap<&str, &[&str]> = ACTION_EXTRA_KEYS.iter().copied().collect();
        ActionType::ALL
            .iter()
            .flat_map(|kind| actions_of(*kind).iter().copied())
            .map(|action| {
                let mut keys: BTreeSet<&'static str> = COMMON_KEY_NAMES.iter().copied().collect();
                if let Some(extra) = extras.get(action) {
                    keys.extend(extra.iter().copied());
                }
                (action, keys)
            })
            .collect()
    });

/// Every catalog action, parsed once for allowed-action probing
static ALL_ACTIONS: Lazy<Vec<Action>> = Lazy::new(|| {
    ActionType::ALL
        .iter()
        .flat_map(|kind| actions_of(*kind).iter())
        .filter_map(|literal| Action::parse(literal).ok())
        .collect()
});

/// Known actions of a namespace
pub fn actions_of(kind: ActionType) -> &'static [&'static str] {
    match kind {
        ActionType::S3 => S3_ACTIONS.as_slice(),
        ActionType::Admin => ADMIN_ACTIONS,
        ActionType::Sts => STS_ACTIONS,
        ActionType::Kms => KMS_ACTIONS,
        ActionType::S3Tables => S3TABLES_ACTIONS,
        ActionType::S3Vectors => S3VECTORS_ACTIONS,
    }
}

/// Every known action across all namespaces
pub fn all_actions() -> &'static [Action] {
    ALL_ACTIONS.as_slice()
}

/// True if the S3 action addresses an object rather than a bucket
pub fn is_object_action(action: &str) -> bool {
    S3_OBJECT_ACTIONS.contains(&action)
}

/// Catalog actions a (possibly wildcard) action expands to
pub fn expand(action: &Action) -> impl Iterator<Item = &'static str> + '_ {
    actions_of(action.action_type())
        .iter()
        .copied()
        .filter(move |known| PatternMatcher::matches(action.as_str(), known))
}

/// Condition keys accepted by an action; the union over every catalog
/// action the pattern matches
pub fn condition_keys_for(action: &Action) -> BTreeSet<&'static str> {
    expand(action)
        .filter_map(|known| ACTION_CONDITION_KEYS.get(known))
        .flat_map(|keys| keys.iter().copied())
        .collect()
}

/// Condition keys accepted by any action of a namespace
pub fn condition_keys_of(kind: ActionType) -> BTreeSet<&'static str> {
    actions_of(kind)
        .iter()
        .filter_map(|known| ACTION_CONDITION_KEYS.get(known))
        .flat_map(|keys| keys.iter().copied())
        .collect()
}

/// Replace `${key}` policy variables with the first request value
///
/// Only common keys are substituted, and only when the request supplies a
/// non-empty value; an empty substitution could widen a pattern.
pub fn substitute_variables<'a>(pattern: &'a str, values: &ConditionValues) -> Cow<'a, str> {
    if values.is_empty() || !pattern.contains("${") {
        return Cow::Borrowed(pattern);
    }

    let mut result = Cow::Borrowed(pattern);
    for key in COMMON_KEYS.iter() {
        let Some(value) = values.get(key.name()).and_then(|v| v.first()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let var = key.var_name();
        if result.contains(&var) {
            result = Cow::Owned(result.replace(&var, value));
        }
    }
    result
}
