//! Stage B: qpdf structural optimisation.
//!
//! qpdf does not re-encode page content; it rewrites the document's object
//! structure — image optimisation, stream compression, linearisation — on
//! top of whatever Ghostscript produced. Its wins are smaller than stage
//! A's but nearly free, which is why a stage-B failure is non-fatal: the
//! selector falls back to stage A's output rather than losing the pipeline.
//!
//! One qpdf quirk handled here: exit code 3 means "completed with
//! warnings", and the output file is valid. Treating that as failure would
//! discard good candidates for cosmetic complaints about the input.

use super::{run_tool, TransformStage};
use crate::config::QualityProfile;
use crate::error::StageError;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// qpdf exit status for "succeeded with warnings".
const QPDF_EXIT_WARNINGS: i32 = 3;

/// One qpdf invocation with flags fixed by the quality profile.
pub struct QpdfStage {
    binary: String,
    profile: QualityProfile,
}

impl QpdfStage {
    pub fn new(binary: impl Into<String>, profile: QualityProfile) -> Self {
        Self {
            binary: binary.into(),
            profile,
        }
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = self
            .profile
            .qpdf_flags()
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(input.display().to_string());
        args.push(output.display().to_string());
        args
    }
}

impl TransformStage for QpdfStage {
    fn id(&self) -> &'static str {
        "qpdf-optimize"
    }

    fn apply(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        let args = self.build_args(input, output);
        debug!(stage = self.id(), profile = %self.profile, "running qpdf");

        match run_tool(&self.binary, &args, output, |stderr| {
            classify_stderr(&self.binary, stderr)
        }) {
            // Warnings still produce a usable output file; accept it.
            Err(StageError::Failed {
                status: Some(QPDF_EXIT_WARNINGS),
                stderr,
                ..
            }) if output_nonempty(output) => {
                warn!(stage = self.id(), %stderr, "qpdf finished with warnings");
                Ok(())
            }
            other => other,
        }
    }
}

fn output_nonempty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Map qpdf stderr onto input-shaped errors.
fn classify_stderr(tool: &str, stderr: &str) -> Option<StageError> {
    let lower = stderr.to_ascii_lowercase();

    if lower.contains("invalid password") || lower.contains("password") {
        return Some(StageError::PasswordProtected {
            tool: tool.to_string(),
        });
    }

    const MALFORMED_MARKERS: [&str; 4] = [
        "not a pdf file",
        "unable to find trailer",
        "damaged",
        "xref",
    ];
    if MALFORMED_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(StageError::MalformedInput {
            tool: tool.to_string(),
            detail: stderr.lines().next().unwrap_or("unknown error").trim().to_string(),
        });
    }

    None
}

// ── Document probing ─────────────────────────────────────────────────────
//
// `inspect` reuses qpdf as a cheap structure probe; no compression runs.

/// Page count via `qpdf --show-npages`.
pub fn count_pages(binary: &str, path: &Path) -> Result<u32, StageError> {
    let out = spawn_probe(binary, &["--show-npages"], path)?;
    let stderr = String::from_utf8_lossy(&out.stderr);

    if !out.status.success() && out.status.code() != Some(QPDF_EXIT_WARNINGS) {
        if let Some(classified) = classify_stderr(binary, &stderr) {
            return Err(classified);
        }
        return Err(StageError::Failed {
            tool: binary.to_string(),
            status: out.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&out.stdout);
    stdout
        .trim()
        .parse::<u32>()
        .map_err(|_| StageError::Failed {
            tool: binary.to_string(),
            status: out.status.code(),
            stderr: format!("unparseable page count: {:?}", stdout.trim()),
        })
}

/// Encryption flag via `qpdf --is-encrypted` (exit 0 = encrypted, 2 = not).
pub fn is_encrypted(binary: &str, path: &Path) -> Result<bool, StageError> {
    let out = spawn_probe(binary, &["--is-encrypted"], path)?;
    match out.status.code() {
        Some(0) => Ok(true),
        Some(2) => Ok(false),
        code => Err(StageError::Failed {
            tool: binary.to_string(),
            status: code,
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        }),
    }
}

fn spawn_probe(
    binary: &str,
    flags: &[&str],
    path: &Path,
) -> Result<std::process::Output, StageError> {
    Command::new(binary)
        .args(flags)
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StageError::ToolMissing {
                    tool: binary.to_string(),
                }
            } else {
                StageError::Io {
                    tool: binary.to_string(),
                    source: e,
                }
            }
        })
}
