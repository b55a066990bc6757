//! Multi-policy evaluation
//!
//! Deny overrides across policies: one Deny anywhere makes the request
//! denied, otherwise any Allow grants it.
//!
//! The parallel evaluator splits the policy list into fixed-size chunks and
//! runs them on a bounded pool of scoped threads. Jobs come from a closed,
//! pre-filled channel and results go to a channel sized to the chunk count,
//! so no send ever blocks. The first Deny cancels the pool cooperatively.

use super::args::Args;
use super::policy::{Decision, Policy};
use crate::config::{default_workers, EvaluatorConfig, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use crossbeam::channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, trace};

/// Shared cancellation flag checked at every job pull and result send
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Evaluate policies in order, stopping at the first Deny
pub fn is_allowed_serial(policies: &[Policy], args: &Args) -> bool {
    decide_chunk(policies, args) == Decision::Allow
}

/// Parallel evaluation with default chunking and worker count
pub fn is_allowed_par(policies: &[Policy], args: &Args) -> bool {
    is_allowed_par_with(policies, args, DEFAULT_CHUNK_SIZE, default_workers())
}

/// Parallel evaluation with explicit chunk size and worker bound
pub fn is_allowed_par_with(
    policies: &[Policy],
    args: &Args,
    chunk_size: usize,
    max_workers: usize,
) -> bool {
    if policies.is_empty() {
        return false;
    }

    let chunk_size = chunk_size.max(1);
    let chunks = policies.len().div_ceil(chunk_size);
    let workers = max_workers.max(1).min(chunks);
    debug!(
        policies = policies.len(),
        chunks,
        workers,
        "parallel policy evaluation"
    );

    let (job_tx, job_rx) = bounded::<usize>(chunks);
    for start in (0..policies.len()).step_by(chunk_size) {
        if job_tx.send(start).is_err() {
            break;
        }
    }
    drop(job_tx);

    let (result_tx, result_rx) = bounded::<Decision>(chunks);
    let cancel = CancelToken::new();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = &cancel;
            scope.spawn(move || {
                for start in job_rx.iter() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let end = (start + chunk_size).min(policies.len());
                    let decision = decide_chunk(&policies[start..end], args);
                    trace!(start, end, ?decision, "chunk evaluated");

                    if cancel.is_cancelled() || result_tx.send(decision).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut allowed = false;
        for decision in result_rx.iter() {
            match decision {
                Decision::Deny => {
                    cancel.cancel();
                    debug!("explicit deny, cancelling remaining chunks");
                    return false;
                }
                Decision::Allow => allowed = true,
                Decision::Undecided => {}
            }
        }
        allowed
    })
}

/// Combined decision for a run of policies: Deny wins, then Allow
fn decide_chunk(policies: &[Policy], args: &Args) -> Decision {
    let mut combined = Decision::Undecided;
    for policy in policies {
        match policy.decide(args) {
            Decision::Deny => return Decision::Deny,
            Decision::Allow => combined = Decision::Allow,
            Decision::Undecided => {}
        }
    }
    combined
}

/// Picks serial or parallel evaluation by policy count
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        config.check()?;
        Ok(Evaluator { config })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// True if the policies together allow the request
    pub fn is_allowed(&self, policies: &[Policy], args: &Args) -> bool {
        if policies.len() > self.config.parallel_threshold {
            is_allowed_par_with(
                policies,
                args,
                self.config.chunk_size,
                self.config.max_workers,
            )
        } else {
            is_allowed_serial(policies, args)
        }
    }
}
