//! Transform stages for PDF size reduction.
//!
//! Each submodule wraps exactly one external tool invocation.
//! Keeping stages separate makes each independently testable and lets the
//! selector be exercised with fake stages that never spawn a process.
//!
//! ## Data Flow
//!
//! ```text
//! input.pdf ──▶ ghostscript ──▶ qpdf ──▶ candidate
//!   │            (stage A)     (stage B)
//!   └──────────▶ ghostscript ───────────▶ fallback candidate
//!                (simple parameter set)
//! ```
//!
//! 1. [`workspace`]   — request-scoped temp directory holding the input and
//!    every intermediate; deleted on drop, on every exit path
//! 2. [`ghostscript`] — stage A: `gs -sDEVICE=pdfwrite` rewrite with
//!    profile-driven downsampling
//! 3. [`qpdf`]        — stage B: structural optimisation and linearisation
//!    of stage A's output
//!
//! Every stage implements [`TransformStage`]: an opaque
//! `(input path, output path) → Result` contract with parameters fixed at
//! construction. The selector composes stages without knowing any tool's
//! flag semantics.

pub mod ghostscript;
pub mod qpdf;
pub mod workspace;

use crate::error::StageError;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// One opaque document transformation: read `input`, write `output`.
///
/// Implementations must be pure from the caller's perspective: no state
/// survives between `apply` calls, and all parameters (tool binary, quality
/// profile) are fixed at construction. This is the seam that lets unit
/// tests substitute canned-size fakes for real process spawns.
pub trait TransformStage: Send + Sync {
    /// Short identifier for logs, e.g. `"gs-primary"`.
    fn id(&self) -> &'static str;

    /// Run the transform. On success `output` exists and is non-empty.
    fn apply(&self, input: &Path, output: &Path) -> Result<(), StageError>;
}

/// Cap on how much tool stderr is kept in errors (and therefore logs).
/// Ghostscript can emit tens of kilobytes of repair chatter for one bad file.
const STDERR_KEEP_BYTES: usize = 2048;

/// Spawn `binary` with `args`, classify failures, and verify `output` was
/// written.
///
/// Shared by both tool wrappers so spawn-error mapping (`ToolMissing`),
/// stderr classification, and the empty-output check stay consistent.
/// `classify` lets each tool translate its own stderr vocabulary into
/// input-shaped [`StageError`] variants; anything unclassified becomes
/// [`StageError::Failed`].
pub(crate) fn run_tool(
    binary: &str,
    args: &[String],
    output: &Path,
    classify: impl Fn(&str) -> Option<StageError>,
) -> Result<(), StageError> {
    debug!(tool = binary, ?args, "spawning external transform");

    let result = Command::new(binary).args(args).output();

    let out = match result {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StageError::ToolMissing {
                tool: binary.to_string(),
            });
        }
        Err(e) => {
            return Err(StageError::Io {
                tool: binary.to_string(),
                source: e,
            });
        }
    };

    // Ghostscript reports errors on stdout; qpdf uses stderr. Classify
    // whichever stream carries the diagnostics.
    let diagnostics = if out.stderr.is_empty() {
        &out.stdout
    } else {
        &out.stderr
    };
    let stderr = truncate_stderr(diagnostics);

    if !out.status.success() {
        if let Some(classified) = classify(&stderr) {
            return Err(classified);
        }
        return Err(StageError::Failed {
            tool: binary.to_string(),
            status: out.status.code(),
            stderr,
        });
    }

    // Some tools exit zero after printing errors and writing nothing;
    // an absent or empty output file is a failure regardless of status.
    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) | Err(_) => {
            if !stderr.is_empty() {
                warn!(tool = binary, %stderr, "tool exited zero but wrote no output");
            }
            Err(StageError::EmptyOutput {
                tool: binary.to_string(),
            })
        }
    }
}

/// Lossy-decode stderr and keep only the head.
fn truncate_stderr(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    let s = s.trim();
    if s.len() <= STDERR_KEEP_BYTES {
        return s.to_string();
    }
    let mut end = STDERR_KEEP_BYTES;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
