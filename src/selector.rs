//! The outcome selector: run up to two pipelines, pick the smallest safe
//! candidate.
//!
//! This is the only designed logic in the crate; everything else marshals
//! bytes to and from the external tools. The selector is written against
//! the [`TransformStage`] trait so tests drive it with fake stages that
//! write canned bytes or return canned errors — no process is spawned to
//! verify the decision table.
//!
//! ## Decision table
//!
//! ```text
//! pipeline 1:  primary gs ──(fail)──▶ alternate gs ──(fail)──▶ no candidate
//!                   │                      │
//!                   └──────────┬───────────┘
//!                              ▼
//!                            qpdf ──(fail, non-fatal)──▶ keep gs output
//!
//! evaluate:    candidate < original AND gain ≥ threshold?  accept
//!              otherwise ──▶ pipeline 2: simple gs on the original input
//!
//! select:      smallest of {p1, p2} not larger than the original;
//!              exact-size ties prefer pipeline 1; nothing qualifies ──▶
//!              return the original unchanged (0% reduction)
//! ```
//!
//! The flow is strictly linear — no loops, no retries beyond the single
//! alternate-parameter attempt — and pipeline 2 runs only when pipeline 1
//! underperformed, preserving the cost-conscious sequential behaviour.

use crate::error::{SqueezeError, StageError};
use crate::outcome::CandidateSource;
use crate::pipeline::workspace::Workspace;
use crate::pipeline::TransformStage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The four stage slots the selector orchestrates.
///
/// Stage parameters are baked into each instance; the selector knows only
/// the roles.
pub struct StageSet<'a> {
    /// Stage A, full parameter set (pipeline 1, first attempt).
    pub primary: &'a dyn TransformStage,
    /// Stage A, alternate parameter set (pipeline 1, retry).
    pub alternate: &'a dyn TransformStage,
    /// Stage B, run on stage A's output (pipeline 1).
    pub optimizer: &'a dyn TransformStage,
    /// Stage A, simple parameter set against the input (pipeline 2).
    pub fallback: &'a dyn TransformStage,
}

/// What the selector decided.
#[derive(Debug)]
pub struct Selection {
    /// Provenance of the winner.
    pub source: CandidateSource,
    /// Path of the winning candidate; `None` when the original won.
    pub path: Option<PathBuf>,
    /// Byte length of the winner (equals the original size when `path` is
    /// `None`).
    pub final_size: u64,
    /// Size pipeline 1 produced, if it produced anything.
    pub pipeline1_size: Option<u64>,
    /// Size pipeline 2 produced, if it ran and produced anything.
    pub pipeline2_size: Option<u64>,
}

/// A produced candidate, request-scoped.
struct Candidate {
    path: PathBuf,
    size: u64,
    source: CandidateSource,
}

/// Run the decision table against `ws` and pick a winner.
///
/// Stage failures are recovered locally; the only `Err` cases are "every
/// pipeline failed", classified as [`SqueezeError::InvalidDocument`] when
/// any stage blamed the input and [`SqueezeError::CompressionUnavailable`]
/// otherwise.
pub fn select(
    ws: &Workspace,
    stages: &StageSet<'_>,
    min_gain_percent: u8,
) -> Result<Selection, SqueezeError> {
    let original = ws.original_size();
    let input = ws.input_path();
    let mut failures: Vec<StageError> = Vec::new();

    // ── Pipeline 1: stage A (with one alternate-parameter retry) ─────────
    let a_out = ws.candidate_path("stage-a.pdf");
    let a_size = match attempt(stages.primary, input, &a_out) {
        Ok(size) => Some(size),
        Err(e) => {
            warn!(stage = stages.primary.id(), error = %e, "stage A failed, retrying with alternate parameters");
            failures.push(e);
            match attempt(stages.alternate, input, &a_out) {
                Ok(size) => Some(size),
                Err(e2) => {
                    // Both attempts down: pipeline 1 contributes nothing.
                    warn!(stage = stages.alternate.id(), error = %e2, "primary transform failed on both attempts");
                    failures.push(e2);
                    None
                }
            }
        }
    };

    // ── Pipeline 1: stage B, non-fatal ───────────────────────────────────
    let pipeline1 = a_size.map(|a_size| {
        let b_out = ws.candidate_path("stage-b.pdf");
        match attempt(stages.optimizer, &a_out, &b_out) {
            Ok(b_size) => Candidate {
                path: b_out,
                size: b_size,
                source: CandidateSource::Primary,
            },
            Err(e) => {
                // Stage B failure costs only its own contribution.
                warn!(stage = stages.optimizer.id(), error = %e, "stage B failed; keeping stage A output as pipeline-1 candidate");
                Candidate {
                    path: a_out.clone(),
                    size: a_size,
                    source: CandidateSource::Primary,
                }
            }
        }
    });

    // ── Evaluate pipeline 1 against the improvement threshold ────────────
    let p1_accepted = pipeline1
        .as_ref()
        .is_some_and(|c| c.size < original && meets_gain(original, c.size, min_gain_percent));

    // ── Pipeline 2: simple fallback, only when p1 underperformed ─────────
    let pipeline2 = if p1_accepted {
        debug!("pipeline 1 met the improvement threshold; skipping fallback");
        None
    } else {
        let f_out = ws.candidate_path("fallback.pdf");
        match attempt(stages.fallback, input, &f_out) {
            Ok(size) => Some(Candidate {
                path: f_out,
                size,
                source: CandidateSource::Fallback,
            }),
            Err(e) => {
                warn!(stage = stages.fallback.id(), error = %e, "fallback pipeline failed");
                failures.push(e);
                None
            }
        }
    };

    // ── Select the winner ────────────────────────────────────────────────
    // Strict `<` against the incumbent keeps the earlier-run pipeline on
    // exact-size ties.
    let mut best: Option<&Candidate> = None;
    for candidate in [pipeline1.as_ref(), pipeline2.as_ref()].into_iter().flatten() {
        if candidate.size <= original && best.is_none_or(|b| candidate.size < b.size) {
            best = Some(candidate);
        }
    }

    let p1_size = pipeline1.as_ref().map(|c| c.size);
    let p2_size = pipeline2.as_ref().map(|c| c.size);

    match best {
        Some(winner) => {
            info!(
                source = ?winner.source,
                original, final_size = winner.size,
                "selected candidate"
            );
            Ok(Selection {
                source: winner.source,
                path: Some(winner.path.clone()),
                final_size: winner.size,
                pipeline1_size: p1_size,
                pipeline2_size: p2_size,
            })
        }
        None if pipeline1.is_none() && pipeline2.is_none() => {
            Err(classify_total_failure(failures))
        }
        None => {
            // Candidates exist but all are larger than the original: not a
            // failure, the input is simply already minimal.
            info!(original, "no candidate beat the original; returning input unchanged");
            Ok(Selection {
                source: CandidateSource::Original,
                path: None,
                final_size: original,
                pipeline1_size: p1_size,
                pipeline2_size: p2_size,
            })
        }
    }
}

/// Run one stage and report the size of what it wrote.
fn attempt(stage: &dyn TransformStage, input: &Path, output: &Path) -> Result<u64, StageError> {
    stage.apply(input, output)?;
    let size = std::fs::metadata(output)
        .map_err(|e| StageError::Io {
            tool: stage.id().to_string(),
            source: e,
        })?
        .len();
    debug!(stage = stage.id(), size, "stage produced candidate");
    Ok(size)
}

/// Exact threshold check without rounding: `(original - fin) / original >=
/// min_gain_percent / 100`.
fn meets_gain(original: u64, fin: u64, min_gain_percent: u8) -> bool {
    if fin >= original {
        return false;
    }
    (original - fin) as u128 * 100 >= min_gain_percent as u128 * original as u128
}

/// Collapse the collected stage failures into one fatal error.
///
/// Input-shaped failures win: if any tool blamed the document, the caller
/// should fix the document, not retry.
fn classify_total_failure(failures: Vec<StageError>) -> SqueezeError {
    if let Some(input_err) = failures.iter().find(|e| e.is_input_error()) {
        return SqueezeError::InvalidDocument {
            detail: input_err.to_string(),
        };
    }
    let detail = failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    SqueezeError::CompressionUnavailable {
        detail: if detail.is_empty() {
            "no pipeline produced a candidate".to_string()
        } else {
            detail
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_threshold_is_exact_not_rounded() {
        // 4.9% must not pass a 5% threshold even though it rounds to 5.
        assert!(!meets_gain(1000, 951, 5));
        assert!(meets_gain(1000, 950, 5));
        assert!(meets_gain(1000, 949, 5));
    }

    #[test]
    fn zero_threshold_requires_strict_shrink() {
        assert!(meets_gain(1000, 999, 0));
        assert!(!meets_gain(1000, 1000, 0));
        assert!(!meets_gain(1000, 1001, 0));
    }

    #[test]
    fn total_failure_prefers_input_classification() {
        let err = classify_total_failure(vec![
            StageError::ToolMissing { tool: "gs".into() },
            StageError::PasswordProtected { tool: "gs".into() },
        ]);
        assert!(matches!(err, SqueezeError::InvalidDocument { .. }));
    }

    #[test]
    fn total_failure_without_input_errors_is_unavailable() {
        let err = classify_total_failure(vec![
            StageError::ToolMissing { tool: "gs".into() },
            StageError::ToolMissing { tool: "gs".into() },
        ]);
        match err {
            SqueezeError::CompressionUnavailable { detail } => {
                assert!(detail.contains("command not found"));
            }
            other => panic!("expected CompressionUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn empty_failure_list_still_reads_sensibly() {
        let err = classify_total_failure(Vec::new());
        assert!(err.to_string().contains("no pipeline produced a candidate"));
    }
}
