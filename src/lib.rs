//! # Gatekeep - IAM Policy Decision Engine
//!
//! `gatekeep` decides whether a request against an object store is allowed
//! by a set of IAM-style JSON policy documents. It is evaluated on every API
//! call, so policies are parsed, validated, deduplicated and indexed once and
//! then shared read-only between any number of threads.
//!
//! - **Actions** across the `s3`, `admin`, `sts`, `kms`, `s3tables` and
//!   `s3vectors` namespaces, with wildcard patterns
//! - **Resources** as ARN glob patterns with `${aws:username}`-style variables
//! - **Deny overrides**: any matching Deny beats every Allow
//! - **Conditions** on request attributes (string, numeric, date, IP, ...)
//! - **Merging** many attached policies into one, with structural dedup
//! - **Parallel evaluation** for principals with hundreds of policies
//! - **Bucket policies** with principals
//!
//! ## Quick Start
//!
//! ```rust
//! use gatekeep::iam::{Action, Args, Policy};
//!
//! # fn main() -> gatekeep::Result<()> {
//! let policy = Policy::from_json(r#"{
//!     "Version": "2012-10-17",
//!     "Statement": [
//!         {"Effect": "Deny",  "Action": "s3:PutObject", "Resource": "arn:aws:s3:::mybucket/*"},
//!         {"Effect": "Allow", "Action": "s3:*",         "Resource": "arn:aws:s3:::mybucket/*"}
//!     ]
//! }"#)?;
//!
//! let read = Args::new(Action::parse("s3:GetObject")?, "mybucket", "photo.png");
//! let write = Args::new(Action::parse("s3:PutObject")?, "mybucket", "photo.png");
//!
//! assert!(policy.is_allowed(&read));
//! assert!(!policy.is_allowed(&write));
//! # Ok(())
//! # }
//! ```
//!
//! ## Many Policies
//!
//! ```rust
//! use gatekeep::iam::{Action, Args, Evaluator, Policy};
//! use gatekeep::EvaluatorConfig;
//!
//! # fn main() -> gatekeep::Result<()> {
//! let policies: Vec<Policy> = (0..200)
//!     .map(|i| Policy::from_json(&format!(
//!         r#"{{"Statement": [{{"Effect": "Allow", "Action": "s3:GetObject",
//!              "Resource": "arn:aws:s3:::team-{}/*"}}]}}"#, i)))
//!     .collect::<gatekeep::Result<_>>()?;
//!
//! // More than `parallel_threshold` policies are split across worker threads
//! let evaluator = Evaluator::new(EvaluatorConfig::default())?;
//! let args = Args::new(Action::parse("s3:GetObject")?, "team-150", "report.csv");
//! assert!(evaluator.is_allowed(&policies, &args));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod iam;

pub use config::EvaluatorConfig;
pub use error::{Error, Result};
pub use iam::{Action, Args, Decision, Effect, Evaluator, Policy, Statement};
