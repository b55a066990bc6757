//! ARN-shaped resource patterns
//!
//! A resource is a typed glob pattern. The ARN prefix picks the type and is
//! stripped; matching happens on the remainder:
//! - `arn:aws:s3:::bucket/*` - S3, pattern `bucket/*`
//! - `arn:aws:s3tables:::bucket/wh/table/t` - S3 Tables
//! - `arn:aws:s3vectors:::bucket/vb/index/i` - S3 Vectors
//! - `arn:minio:kms:::key*` - KMS keys
//! - `*` - everything

use super::action::StringOrArray;
use super::catalog::substitute_variables;
use super::condition::ConditionValues;
use super::pattern::PatternMatcher;
use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Resource space a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    S3,
    S3Tables,
    S3Vectors,
    Kms,
    /// The bare `*` resource
    All,
}

impl ResourceType {
    const PREFIXED: [ResourceType; 4] = [
        ResourceType::S3,
        ResourceType::S3Tables,
        ResourceType::S3Vectors,
        ResourceType::Kms,
    ];

    /// ARN prefix for this resource space
    pub fn arn_prefix(&self) -> &'static str {
        match self {
            ResourceType::S3 => "arn:aws:s3:::",
            ResourceType::S3Tables => "arn:aws:s3tables:::",
            ResourceType::S3Vectors => "arn:aws:s3vectors:::",
            ResourceType::Kms => "arn:minio:kms:::",
            ResourceType::All => "",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ResourceType::S3 => "s3",
            ResourceType::S3Tables => "s3tables",
            ResourceType::S3Vectors => "s3vectors",
            ResourceType::Kms => "kms",
            ResourceType::All => "*",
        }
    }
}

/// A typed resource pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    kind: ResourceType,
    pattern: String,
}

impl Resource {
    /// Create a resource from its type and bare pattern (no ARN prefix)
    pub fn new(kind: ResourceType, pattern: impl Into<String>) -> Self {
        Resource {
            kind,
            pattern: pattern.into(),
        }
    }

    /// The `*` resource
    pub fn all() -> Self {
        Resource::new(ResourceType::All, "*")
    }

    /// Parse an ARN (or `*`) into a resource
    pub fn parse(arn: &str) -> Result<Self> {
        if arn == "*" {
            return Ok(Resource::all());
        }
        ResourceType::PREFIXED
            .iter()
            .find_map(|kind| {
                arn.strip_prefix(kind.arn_prefix())
                    .map(|rest| Resource::new(*kind, rest))
            })
            .ok_or_else(|| Error::InvalidResource("unknown".to_string(), arn.to_string()))
    }

    pub fn resource_type(&self) -> ResourceType {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Structural validity, independent of the statement it sits in
    ///
    /// Patterns must be non-empty; S3-style patterns must not start with
    /// `/`; KMS key patterns must not contain `/`, `\` or `.`.
    pub fn is_valid(&self) -> bool {
        if self.pattern.is_empty() {
            return false;
        }
        match self.kind {
            ResourceType::S3 | ResourceType::S3Tables | ResourceType::S3Vectors => {
                !self.pattern.starts_with('/')
            }
            ResourceType::Kms => !self.pattern.contains(['/', '\\', '.']),
            ResourceType::All => self.pattern == "*",
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    pub(crate) fn invalid(&self) -> Error {
        Error::InvalidResource(self.kind.name().to_string(), self.pattern.clone())
    }

    /// True if the pattern can address a bucket
    pub fn is_bucket_pattern(&self) -> bool {
        !self.pattern.contains('/') || self.pattern == "*"
    }

    /// True if the pattern can address an object inside a bucket
    pub fn is_object_pattern(&self) -> bool {
        self.pattern.contains('/') || self.pattern.contains('*')
    }

    /// True if this resource can address something inside `bucket`
    pub fn matches_bucket(&self, bucket: &str) -> bool {
        let bucket_part = self.pattern.split('/').next().unwrap_or_default();
        PatternMatcher::matches(bucket_part, bucket)
            || PatternMatcher::matches_simple(&self.pattern, &format!("{}/*", bucket))
    }

    /// Match a request resource string against this pattern
    ///
    /// Policy variables in the pattern are substituted from the request
    /// values first. A path-cleaned exact comparison handles trailing
    /// slashes cheaply before falling back to glob matching.
    pub fn matches(&self, resource: &str, values: &ConditionValues) -> bool {
        let pattern = substitute_variables(&self.pattern, values);

        let cleaned = PatternMatcher::clean_path(resource);
        if &*cleaned != "." && *cleaned == *pattern {
            return true;
        }
        PatternMatcher::matches(&pattern, resource)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.arn_prefix(), self.pattern)
    }
}

/// Set of resources from a statement's `Resource` or `NotResource`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceSet(BTreeSet<Resource>);

impl ResourceSet {
    pub fn new() -> Self {
        ResourceSet(BTreeSet::new())
    }

    /// Build from ARN strings, rejecting unknown and duplicate entries
    pub fn parse<'a>(arns: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut set = BTreeSet::new();
        for arn in arns {
            if !set.insert(Resource::parse(arn)?) {
                return Err(Error::DuplicateResource(arn.to_string()));
            }
        }
        Ok(ResourceSet(set))
    }

    pub fn insert(&mut self, resource: Resource) -> bool {
        self.0.insert(resource)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.0.iter()
    }

    /// True if any resource matches the request resource string
    pub fn matches(&self, resource: &str, values: &ConditionValues) -> bool {
        self.0.iter().any(|r| r.matches(resource, values))
    }

    pub fn bucket_resource_exists(&self) -> bool {
        self.0.iter().any(Resource::is_bucket_pattern)
    }

    pub fn object_resource_exists(&self) -> bool {
        self.0.iter().any(Resource::is_object_pattern)
    }

    /// Validate every resource and check it belongs to one of `allowed` types
    pub fn validate_types(&self, allowed: &[ResourceType]) -> Result<()> {
        for resource in &self.0 {
            let fits = resource.kind == ResourceType::All || allowed.contains(&resource.kind);
            if !fits {
                return Err(resource.invalid());
            }
            resource.validate()?;
        }
        Ok(())
    }

    /// Check every resource can address `bucket`
    pub fn validate_bucket(&self, bucket: &str) -> Result<()> {
        self.validate_types(&[ResourceType::S3])?;
        match self.0.iter().find(|r| !r.matches_bucket(bucket)) {
            Some(resource) => Err(Error::ResourceBucketMismatch(
                resource.to_string(),
                bucket.to_string(),
            )),
            None => Ok(()),
        }
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        ResourceSet(iter.into_iter().collect())
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arns: Vec<String> = self.0.iter().map(Resource::to_string).collect();
        write!(f, "[{}]", arns.join(", "))
    }
}

impl Serialize for ResourceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for resource in &self.0 {
            seq.serialize_element(&resource.to_string())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ResourceSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = StringOrArray::deserialize(deserializer)?;
        ResourceSet::parse(raw.iter()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(arn: &str) -> Resource {
        Resource::parse(arn).unwrap()
    }

    fn no_values() -> ConditionValues {
        ConditionValues::new()
    }

    #[test]
    fn test_parse_types() {
        assert_eq!(resource("arn:aws:s3:::mybucket/*").resource_type(), ResourceType::S3);
        assert_eq!(resource("arn:aws:s3:::mybucket/*").pattern(), "mybucket/*");
        assert_eq!(
            resource("arn:aws:s3tables:::bucket/wh/table/t").resource_type(),
            ResourceType::S3Tables
        );
        assert_eq!(
            resource("arn:aws:s3vectors:::bucket/vb").resource_type(),
            ResourceType::S3Vectors
        );
        assert_eq!(resource("arn:minio:kms:::key*").resource_type(), ResourceType::Kms);
        assert_eq!(resource("*").resource_type(), ResourceType::All);
        assert!(Resource::parse("arn:aws:ec2:::instance").is_err());
        assert!(Resource::parse("mybucket/*").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for arn in ["arn:aws:s3:::b/*", "arn:minio:kms:::k1", "*", "arn:aws:s3tables:::bucket/w"] {
            assert_eq!(resource(arn).to_string(), arn);
        }
    }

    #[test]
    fn test_validity() {
        assert!(resource("arn:aws:s3:::mybucket").is_valid());
        assert!(!resource("arn:aws:s3:::/mybucket").is_valid());
        assert!(!resource("arn:aws:s3:::").is_valid());
        assert!(resource("arn:minio:kms:::my-key*").is_valid());
        assert!(!resource("arn:minio:kms:::my/key").is_valid());
        assert!(!resource("arn:minio:kms:::my\\key").is_valid());
        assert!(!resource("arn:minio:kms:::my.key").is_valid());
    }

    #[test]
    fn test_match_glob_and_clean() {
        let r = resource("arn:aws:s3:::mybucket/myobject*");
        assert!(r.matches("mybucket/myobject", &no_values()));
        assert!(r.matches("mybucket/myobject/nested", &no_values()));
        assert!(!r.matches("mybucket/otherobject", &no_values()));

        // Bucket-only resource string carries a trailing slash
        let bucket = resource("arn:aws:s3:::mybucket");
        assert!(bucket.matches("mybucket/", &no_values()));
        assert!(!bucket.matches("mybucket/obj", &no_values()));
    }

    #[test]
    fn test_match_policy_variable() {
        let r = resource("arn:aws:s3:::home/${aws:username}/*");
        let mut values = ConditionValues::new();
        values.insert("username".to_string(), vec!["alice".to_string()]);

        assert!(r.matches("home/alice/notes.txt", &values));
        assert!(!r.matches("home/bob/notes.txt", &values));
    }

    #[test]
    fn test_empty_variable_never_substituted() {
        let r = resource("arn:aws:s3:::home/${aws:username}*");
        let mut values = ConditionValues::new();
        values.insert("username".to_string(), vec![String::new()]);

        // Substituting "" would turn the pattern into home/*
        assert!(!r.matches("home/bob/notes.txt", &values));
    }

    #[test]
    fn test_bucket_and_object_patterns() {
        assert!(resource("arn:aws:s3:::mybucket").is_bucket_pattern());
        assert!(!resource("arn:aws:s3:::mybucket").is_object_pattern());
        assert!(resource("arn:aws:s3:::mybucket/*").is_object_pattern());
        assert!(!resource("arn:aws:s3:::mybucket/*").is_bucket_pattern());
        assert!(resource("arn:aws:s3:::my*").is_bucket_pattern());
        assert!(resource("arn:aws:s3:::my*").is_object_pattern());
    }

    #[test]
    fn test_matches_bucket() {
        assert!(resource("arn:aws:s3:::mybucket/*").matches_bucket("mybucket"));
        assert!(resource("arn:aws:s3:::mybucket").matches_bucket("mybucket"));
        assert!(resource("arn:aws:s3:::my*").matches_bucket("mybucket"));
        assert!(resource("*").matches_bucket("mybucket"));
        assert!(!resource("arn:aws:s3:::other/*").matches_bucket("mybucket"));
    }

    #[test]
    fn test_resource_set_json() {
        let set: ResourceSet =
            serde_json::from_str(r#"["arn:aws:s3:::b/*", "arn:aws:s3:::a"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["arn:aws:s3:::a","arn:aws:s3:::b/*"]"#
        );

        let single: ResourceSet = serde_json::from_str(r#""*""#).unwrap();
        assert!(single.matches("anything/at/all", &no_values()));

        assert!(serde_json::from_str::<ResourceSet>(r#"["arn:aws:s3:::a", "arn:aws:s3:::a"]"#)
            .is_err());
    }

    #[test]
    fn test_validate_types() {
        let set = ResourceSet::parse(["arn:aws:s3:::a/*", "*"]).unwrap();
        assert!(set.validate_types(&[ResourceType::S3]).is_ok());
        assert!(set.validate_types(&[ResourceType::Kms]).is_err());

        let bad = ResourceSet::parse(["arn:aws:s3:::/a"]).unwrap();
        assert!(bad.validate_types(&[ResourceType::S3]).is_err());
    }
}
