//! Compression entry points.
//!
//! ## Async vs sync
//!
//! The core flow is synchronous: it spawns external processes and blocks on
//! them. [`squeeze_sync`] is that flow; [`squeeze`] moves it onto the
//! blocking thread pool via `tokio::task::spawn_blocking` so the async
//! runtime's workers are never stalled by a slow Ghostscript run, and wraps
//! it in the configured deadline. The HTTP handler and CLI both go through
//! the async path.
//!
//! On deadline expiry the spawned tool keeps running until it finishes on
//! its own — external processes cannot be cancelled from here. The
//! workspace still cleans itself up when the orphaned task completes.

use crate::config::SqueezeConfig;
use crate::error::SqueezeError;
use crate::outcome::{reduction_percent, DocumentInfo, SqueezeOutcome, SqueezeReport};
use crate::pipeline::ghostscript::GhostscriptStage;
use crate::pipeline::qpdf::{self, QpdfStage};
use crate::pipeline::workspace::Workspace;
use crate::selector::{self, StageSet};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Compress a PDF held in memory.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `bytes`  — Raw PDF bytes (ownership needed to move onto the blocking
///   pool; on the no-improvement path they come back unchanged as the
///   output)
/// * `config` — Compression configuration
///
/// # Errors
/// Returns `Err(SqueezeError)` only when no output can be produced at all:
/// input is not a PDF, every pipeline failed, or the deadline elapsed.
/// "Nothing got smaller" is *not* an error — the original bytes are
/// returned with 0% reduction.
pub async fn squeeze(bytes: Vec<u8>, config: &SqueezeConfig) -> Result<SqueezeOutcome, SqueezeError> {
    let secs = config.deadline_secs;
    let config = config.clone();
    let task = tokio::task::spawn_blocking(move || squeeze_sync(&bytes, &config));

    let joined = if secs == 0 {
        task.await
    } else {
        match tokio::time::timeout(Duration::from_secs(secs), task).await {
            Ok(joined) => joined,
            Err(_) => return Err(SqueezeError::DeadlineExceeded { secs }),
        }
    };

    joined.map_err(|e| SqueezeError::Internal(format!("compression task panicked: {e}")))?
}

/// Blocking implementation of [`squeeze`].
///
/// Safe to call from non-async contexts; spawns external processes and
/// blocks on them. No deadline is applied here.
pub fn squeeze_sync(bytes: &[u8], config: &SqueezeConfig) -> Result<SqueezeOutcome, SqueezeError> {
    let start = Instant::now();
    let profile = config.profile;
    info!(profile = %profile, size = bytes.len(), "starting compression");

    let ws = Workspace::for_document(bytes)?;

    let primary = GhostscriptStage::primary(&config.gs_binary, profile);
    let alternate = GhostscriptStage::alternate(&config.gs_binary, profile);
    let optimizer = QpdfStage::new(&config.qpdf_binary, profile);
    let fallback = GhostscriptStage::simple(&config.gs_binary, profile);
    let stages = StageSet {
        primary: &primary,
        alternate: &alternate,
        optimizer: &optimizer,
        fallback: &fallback,
    };

    let selection = selector::select(&ws, &stages, config.min_gain_percent)?;

    debug!(
        pipeline1 = ?selection.pipeline1_size,
        pipeline2 = ?selection.pipeline2_size,
        "pipeline sizes"
    );

    let data = match &selection.path {
        Some(path) => std::fs::read(path)
            .map_err(|e| SqueezeError::Internal(format!("read candidate: {e}")))?,
        None => bytes.to_vec(),
    };

    let original_size = ws.original_size();
    let final_size = data.len() as u64;
    debug_assert!(final_size <= original_size, "selector returned a grown document");

    let report = SqueezeReport {
        original_size,
        final_size,
        reduction_percent: reduction_percent(original_size, final_size),
        profile,
        source: selection.source,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        original = report.original_size,
        final_size = report.final_size,
        reduction = report.reduction_percent,
        source = ?report.source,
        duration_ms = report.duration_ms,
        "compression complete"
    );

    Ok(SqueezeOutcome { data, report })
}

/// Compress a PDF file and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn squeeze_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &SqueezeConfig,
) -> Result<SqueezeReport, SqueezeError> {
    let input_path = input_path.as_ref();
    let bytes = tokio::fs::read(input_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SqueezeError::FileNotFound {
                path: input_path.to_path_buf(),
            }
        } else {
            SqueezeError::Internal(format!("read '{}': {e}", input_path.display()))
        }
    })?;

    let outcome = squeeze(bytes, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SqueezeError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &outcome.data)
        .await
        .map_err(|e| SqueezeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| SqueezeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(outcome.report)
}

/// Probe a PDF's structure without compressing it.
///
/// Uses qpdf for the page count and encryption flag; the version string
/// comes straight from the `%PDF-x.y` header.
pub async fn inspect(bytes: Vec<u8>, config: &SqueezeConfig) -> Result<DocumentInfo, SqueezeError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || inspect_sync(&bytes, &config))
        .await
        .map_err(|e| SqueezeError::Internal(format!("inspect task panicked: {e}")))?
}

/// Blocking implementation of [`inspect`].
pub fn inspect_sync(bytes: &[u8], config: &SqueezeConfig) -> Result<DocumentInfo, SqueezeError> {
    let ws = Workspace::for_document(bytes)?;

    let encrypted =
        qpdf::is_encrypted(&config.qpdf_binary, ws.input_path()).map_err(escalate_probe_error)?;

    // Page count is unavailable for encrypted documents without a password;
    // report 0 rather than failing the whole probe.
    let page_count = if encrypted {
        0
    } else {
        qpdf::count_pages(&config.qpdf_binary, ws.input_path()).map_err(escalate_probe_error)?
    };

    Ok(DocumentInfo {
        size: bytes.len() as u64,
        page_count,
        encrypted,
        pdf_version: parse_header_version(bytes),
    })
}

/// A probe failure is fatal: map it onto the public taxonomy.
fn escalate_probe_error(e: crate::error::StageError) -> SqueezeError {
    if e.is_input_error() {
        SqueezeError::InvalidDocument {
            detail: e.to_string(),
        }
    } else {
        SqueezeError::CompressionUnavailable {
            detail: e.to_string(),
        }
    }
}

/// Extract "1.4" from a `%PDF-1.4` header.
fn parse_header_version(bytes: &[u8]) -> Option<String> {
    let head = bytes.get(..16.min(bytes.len()))?;
    let head = std::str::from_utf8(head).ok()?;
    let rest = head.strip_prefix("%PDF-")?;
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    (!version.is_empty()).then_some(version)
}
