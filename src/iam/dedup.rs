//! Structural statement deduplication
//!
//! Small statement lists are compared pairwise. Larger ones are bucketed by
//! an order-independent 128-bit fingerprint: the effect is hashed, then the
//! hash of every set element is XOR-folded in. Each field hashes with its own
//! seed offset so equal strings in different fields cannot cancel out.

use super::statement::Statement;
use ahash::AHashSet;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_128_with_seed;

/// At or below this many statements, compare pairwise
pub const PAIRWISE_LIMIT: usize = 10;

/// Seed offsets keeping fields apart in the combined fingerprint
pub(crate) const SEED_ACTIONS: u64 = 1;
pub(crate) const SEED_NOT_ACTIONS: u64 = 2;
pub(crate) const SEED_RESOURCES: u64 = 3;
pub(crate) const SEED_NOT_RESOURCES: u64 = 4;
pub(crate) const SEED_CONDITIONS: u64 = 5;
pub(crate) const SEED_PRINCIPALS: u64 = 6;

/// Statements that can be deduplicated structurally
pub trait Fingerprint: PartialEq {
    /// Order-independent hash of the statement's structure under `seed`
    fn fingerprint(&self, seed: u64) -> u128;
}

/// Incremental order-independent fingerprint builder
pub(crate) struct FingerprintBuilder {
    seed: u64,
    acc: u128,
}

impl FingerprintBuilder {
    pub(crate) fn new(seed: u64, head: &str) -> Self {
        FingerprintBuilder {
            seed,
            acc: xxh3_128_with_seed(head.as_bytes(), seed),
        }
    }

    /// Fold every element of one field into the accumulator
    pub(crate) fn field<'a>(mut self, offset: u64, elems: impl IntoIterator<Item = &'a str>) -> Self {
        let seed = self.seed.wrapping_add(offset);
        for elem in elems {
            self.acc ^= xxh3_128_with_seed(elem.as_bytes(), seed);
        }
        self
    }

    pub(crate) fn finish(self) -> u128 {
        self.acc
    }
}

impl Fingerprint for Statement {
    fn fingerprint(&self, seed: u64) -> u128 {
        let conditions: Vec<String> = self.conditions.iter().map(|f| f.canonical()).collect();
        let resources: Vec<String> = self.resources.iter().map(|r| r.to_string()).collect();
        let not_resources: Vec<String> = self.not_resources.iter().map(|r| r.to_string()).collect();

        FingerprintBuilder::new(seed, self.effect.as_str())
            .field(SEED_ACTIONS, self.actions.iter().map(|a| a.as_str()))
            .field(SEED_NOT_ACTIONS, self.not_actions.iter().map(|a| a.as_str()))
            .field(SEED_RESOURCES, resources.iter().map(String::as_str))
            .field(SEED_NOT_RESOURCES, not_resources.iter().map(String::as_str))
            .field(SEED_CONDITIONS, conditions.iter().map(String::as_str))
            .finish()
    }
}

/// Fresh secure seed for one dedup or merge call
pub fn random_seed() -> u64 {
    OsRng.next_u64()
}

/// Drop structurally duplicate statements, keeping first occurrences in order
///
/// Chooses pairwise comparison or fingerprinting by length.
pub fn dedup_statements<S: Fingerprint + Clone>(statements: &[S]) -> Vec<S> {
    if statements.len() <= PAIRWISE_LIMIT {
        dedup_pairwise(statements)
    } else {
        dedup_hashed(statements, random_seed())
    }
}

/// O(n²) structural comparison
pub fn dedup_pairwise<S: PartialEq + Clone>(statements: &[S]) -> Vec<S> {
    let mut kept: Vec<S> = Vec::with_capacity(statements.len());
    for stmt in statements {
        if !kept.contains(stmt) {
            kept.push(stmt.clone());
        }
    }
    kept
}

/// Fingerprint-based dedup under a caller-provided seed
pub fn dedup_hashed<S: Fingerprint + Clone>(statements: &[S], seed: u64) -> Vec<S> {
    let mut seen = AHashSet::with_capacity(statements.len());
    let kept: Vec<S> = statements
        .iter()
        .filter(|stmt| seen.insert(stmt.fingerprint(seed)))
        .cloned()
        .collect();

    if kept.len() != statements.len() {
        debug!(
            before = statements.len(),
            after = kept.len(),
            "dropped duplicate statements"
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(json: &str) -> Statement {
        serde_json::from_str(json).unwrap()
    }

    fn numbered(n: usize) -> Vec<Statement> {
        (0..n)
            .map(|i| {
                stmt(&format!(
                    r#"{{"Effect": "Allow", "Action": "s3:GetObject",
                        "Resource": "arn:aws:s3:::bucket-{}/*"}}"#,
                    i
                ))
            })
            .collect()
    }

    #[test]
    fn test_fingerprint_order_independent() {
        let a = stmt(
            r#"{"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"],
                "Resource": ["arn:aws:s3:::a/*", "arn:aws:s3:::b/*"]}"#,
        );
        let b = stmt(
            r#"{"Effect": "Allow", "Action": ["s3:PutObject", "s3:GetObject"],
                "Resource": ["arn:aws:s3:::b/*", "arn:aws:s3:::a/*"]}"#,
        );
        assert_eq!(a.fingerprint(42), b.fingerprint(42));
    }

    #[test]
    fn test_fingerprint_separates_fields() {
        let allow = stmt(r#"{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"}"#);
        let deny = stmt(r#"{"Effect": "Deny", "Action": "s3:GetObject", "Resource": "*"}"#);
        let not_action = stmt(r#"{"Effect": "Allow", "NotAction": "s3:GetObject", "Resource": "*"}"#);
        let not_resource =
            stmt(r#"{"Effect": "Allow", "Action": "s3:GetObject", "NotResource": "*"}"#);

        let seed = random_seed();
        let prints = [
            allow.fingerprint(seed),
            deny.fingerprint(seed),
            not_action.fingerprint(seed),
            not_resource.fingerprint(seed),
        ];
        for i in 0..prints.len() {
            for j in (i + 1)..prints.len() {
                assert_ne!(prints[i], prints[j]);
            }
        }
    }

    #[test]
    fn test_fingerprint_includes_conditions() {
        let plain = stmt(r#"{"Effect": "Allow", "Action": "s3:ListBucket", "Resource": "arn:aws:s3:::b"}"#);
        let gated = stmt(
            r#"{"Effect": "Allow", "Action": "s3:ListBucket", "Resource": "arn:aws:s3:::b",
                "Condition": {"StringEquals": {"s3:prefix": "x"}}}"#,
        );
        assert_ne!(plain.fingerprint(7), gated.fingerprint(7));
    }

    #[test]
    fn test_pairwise_keeps_first_occurrence() {
        let mut statements = numbered(3);
        statements.push(statements[1].clone().with_sid("copy"));
        statements.push(statements[0].clone());

        let kept = dedup_statements(&statements);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept, numbered(3));
        assert!(kept.iter().all(|s| s.sid.is_empty()));
    }

    #[test]
    fn test_hashed_keeps_first_occurrence() {
        let base = numbered(20);
        let mut statements = base.clone();
        statements.extend(base.iter().rev().cloned());

        let kept = dedup_statements(&statements);
        assert_eq!(kept, base);
    }

    #[test]
    fn test_dedup_idempotent() {
        let mut statements = numbered(15);
        statements.extend(numbered(8));
        let once = dedup_statements(&statements);
        let twice = dedup_statements(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_strategies_agree() {
        let mut statements = numbered(6);
        statements.extend(numbered(4));
        assert_eq!(dedup_pairwise(&statements), dedup_hashed(&statements, 99));
    }
}
