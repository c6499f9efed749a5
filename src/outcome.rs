//! Output types: the compressed document plus its run report.

use crate::config::QualityProfile;
use serde::Serialize;

/// Result of one compression run: the winning document and its report.
///
/// `data` is the document to hand back to the caller — either a transformed
/// candidate or, on the no-improvement path, the original bytes unchanged.
#[derive(Debug)]
pub struct SqueezeOutcome {
    /// The selected document bytes.
    pub data: Vec<u8>,
    /// Sizes, reduction, and provenance of the winner.
    pub report: SqueezeReport,
}

/// Serialisable summary of a compression run.
///
/// The invariant `final_size <= original_size` holds on every path;
/// `reduction_percent` is 0 exactly when the original was returned or when
/// the winner tied it byte-for-byte in size.
#[derive(Debug, Clone, Serialize)]
pub struct SqueezeReport {
    /// Byte length of the uploaded document.
    pub original_size: u64,
    /// Byte length of the returned document.
    pub final_size: u64,
    /// Rounded percentage reduction; 0 when nothing was gained.
    pub reduction_percent: u8,
    /// The profile the run was executed with.
    pub profile: QualityProfile,
    /// Which pipeline produced the winner.
    pub source: CandidateSource,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

/// Provenance of the returned document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    /// Pipeline 1: Ghostscript followed by qpdf (or Ghostscript alone when
    /// qpdf failed non-fatally).
    Primary,
    /// Pipeline 2: the simple Ghostscript-only fallback.
    Fallback,
    /// No candidate beat the original; input returned unchanged.
    Original,
}

/// Structure probe result; no compression performed.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    /// Byte length of the document.
    pub size: u64,
    /// Page count as reported by qpdf.
    pub page_count: u32,
    /// Whether the document is encrypted.
    pub encrypted: bool,
    /// Version string from the `%PDF-x.y` header, if parseable.
    pub pdf_version: Option<String>,
}

/// Rounded percentage reduction from `original` to `fin`.
///
/// Clamps to 0 when `fin >= original`; the selector never returns a grown
/// document, so a negative ratio cannot reach callers.
pub fn reduction_percent(original: u64, fin: u64) -> u8 {
    if fin >= original || original == 0 {
        return 0;
    }
    let diff = (original - fin) as u128;
    // Round-half-up integer division.
    ((diff * 100 + original as u128 / 2) / original as u128) as u8
}
