//! Error types for the pdfsqueeze library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SqueezeError`] — **Fatal**: no output document can be produced at all
//!   (input is not a PDF, every pipeline failed, deadline hit). Returned as
//!   `Err(SqueezeError)` from the top-level `squeeze*` functions.
//!
//! * [`StageError`] — **Recoverable**: a single external transform invocation
//!   failed. The selector treats it as "no candidate from this stage" and
//!   carries on with the remaining pipelines; it only escalates to a fatal
//!   [`SqueezeError`] when every pipeline has failed.
//!
//! The separation keeps expected failure modes (qpdf not installed, a gs
//! tier choking on an odd document) out of the fatal path: a compression run
//! where one stage dies can still return a perfectly valid, smaller PDF.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfsqueeze library.
///
/// Per-stage failures use [`StageError`] and are recovered inside the
/// selector rather than propagated here.
#[derive(Debug, Error)]
pub enum SqueezeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The uploaded bytes do not start with the PDF magic marker.
    #[error("Input is not a valid PDF (first bytes: {magic:?})\nEnsure the file is a PDF and not renamed from another format.")]
    NotAPdf { magic: [u8; 4] },

    /// The external tools rejected the document as malformed or
    /// access-protected.
    #[error("Invalid PDF document: {detail}\nEnsure the document is not corrupted or password protected.")]
    InvalidDocument { detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Every compression pipeline failed; typically a missing or crashed
    /// external tool rather than a bad document.
    #[error("Compression is unavailable: {detail}\nCheck that Ghostscript (gs) and qpdf are installed and on PATH, then retry.")]
    CompressionUnavailable { detail: String },

    /// The overall deadline elapsed before a winner was selected.
    #[error("Compression did not finish within {secs}s\nRaise the timeout or try a lighter profile.")]
    DeadlineExceeded { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown quality profile name.
    #[error("Unknown quality profile '{0}'\nValid profiles: low, medium, high, maximum.")]
    UnknownProfile(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqueezeError {
    /// Coarse category used by API payloads and exit-code mapping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SqueezeError::NotAPdf { .. } | SqueezeError::InvalidDocument { .. } => {
                ErrorCategory::InvalidInputDocument
            }
            SqueezeError::CompressionUnavailable { .. } => ErrorCategory::CompressionUnavailable,
            SqueezeError::DeadlineExceeded { .. } => ErrorCategory::DeadlineExceeded,
            SqueezeError::FileNotFound { .. }
            | SqueezeError::InvalidConfig(_)
            | SqueezeError::UnknownProfile(_) => ErrorCategory::InvalidRequest,
            SqueezeError::OutputWriteFailed { .. } | SqueezeError::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Error category surfaced to API callers.
///
/// Serialises in SCREAMING_SNAKE_CASE so clients can switch on a stable
/// string rather than parsing human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    InvalidInputDocument,
    CompressionUnavailable,
    DeadlineExceeded,
    InvalidRequest,
    Internal,
}

/// A recoverable failure of one external transform invocation.
///
/// The selector logs these and continues; a pipeline whose stages all fail
/// simply contributes no candidate. Classification matters: input-shaped
/// failures (malformed, password) must surface as `InvalidDocument` when
/// every pipeline fails, while environment-shaped failures (tool missing,
/// crash) surface as `CompressionUnavailable`.
#[derive(Debug, Error)]
pub enum StageError {
    /// The tool binary could not be spawned (not installed / not on PATH).
    #[error("{tool}: command not found")]
    ToolMissing { tool: String },

    /// The tool parsed the document and rejected it as malformed.
    #[error("{tool}: input rejected: {detail}")]
    MalformedInput { tool: String, detail: String },

    /// The tool reported the document as encrypted / password protected.
    #[error("{tool}: document is password protected")]
    PasswordProtected { tool: String },

    /// The tool exited non-zero for a reason other than bad input.
    #[error("{tool} failed (exit code {code}): {stderr}", code = .status.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Failed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The tool exited zero but wrote no output file (or an empty one).
    #[error("{tool}: produced no output file")]
    EmptyOutput { tool: String },

    /// I/O error around the invocation (reading the candidate, etc.).
    #[error("{tool}: I/O error: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// True when the failure is the *document's* fault rather than the
    /// environment's. Drives the `InvalidDocument` vs
    /// `CompressionUnavailable` split on total pipeline failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StageError::MalformedInput { .. } | StageError::PasswordProtected { .. }
        )
    }
}
