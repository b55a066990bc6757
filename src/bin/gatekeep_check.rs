//! gatekeep-check
//!
//! Evaluate one request against a set of policy documents and print the
//! decision. Exits 0 when allowed and 1 when denied.

use anyhow::{bail, Context};
use clap::Parser;
use gatekeep::iam::{merge_policies, Action, Args, ConditionValues, Evaluator, Policy};
use gatekeep::EvaluatorConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "gatekeep-check")]
#[command(about = "Check a request against IAM policy documents")]
struct Cli {
    /// Policy document (JSON); repeat for several policies
    #[arg(short = 'p', long = "policy", required = true)]
    policies: Vec<PathBuf>,

    /// Requested action, e.g. s3:GetObject
    #[arg(short = 'a', long, required_unless_present = "list_actions")]
    action: Option<String>,

    /// Bucket name (or KMS key name)
    #[arg(short = 'b', long, default_value = "")]
    bucket: String,

    /// Object name
    #[arg(short = 'o', long, default_value = "")]
    object: String,

    /// Requesting account
    #[arg(long, default_value = "")]
    account: String,

    /// Treat the requester as the bucket owner
    #[arg(long)]
    owner: bool,

    /// Request attribute as key=value; repeat to add values
    #[arg(short = 'c', long = "condition", value_parser = parse_condition)]
    conditions: Vec<(String, String)>,

    /// Evaluator configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every action the policies allow on the bucket/object instead
    #[arg(long)]
    list_actions: bool,
}

/// Parse a `key=value` request attribute
fn parse_condition(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid condition '{}'. Expected key=value", s)),
    }
}

fn load_policy(path: &Path) -> anyhow::Result<Policy> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Policy::parse_config(BufReader::new(file))
        .with_context(|| format!("parsing policy {}", path.display()))
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EvaluatorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EvaluatorConfig::default(),
    };
    let evaluator = Evaluator::new(config)?;

    let policies = cli
        .policies
        .iter()
        .map(|path| load_policy(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!("Loaded {} policies", policies.len());

    let mut values = ConditionValues::new();
    for (key, value) in &cli.conditions {
        values.entry(key.clone()).or_default().push(value.clone());
    }

    if cli.list_actions {
        let merged = merge_policies(&policies);
        for action in merged.is_allowed_actions(&cli.bucket, &cli.object, &values).iter() {
            println!("{}", action);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(action) = cli.action.as_deref() else {
        bail!("--action is required");
    };
    let action = Action::parse(action)?;

    let args = Args::new(action, cli.bucket.clone(), cli.object.clone())
        .with_account(cli.account.clone())
        .with_owner(cli.owner)
        .with_condition_values(values);
    debug!(resource = %args.resource_path(), "evaluating request");

    if evaluator.is_allowed(&policies, &args) {
        println!("allow");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("deny");
        Ok(ExitCode::from(1))
    }
}
