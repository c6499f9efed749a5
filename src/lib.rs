//! # pdfsqueeze
//!
//! Shrink PDF files by composing two external tools — Ghostscript and qpdf
//! — and always keeping the smallest safe result.
//!
//! ## Why this crate?
//!
//! Blind one-shot compression regularly *grows* PDFs: qpdf's linearisation
//! adds overhead, aggressive Ghostscript tiers can balloon documents with
//! unusual image streams, and already-minimal files have nothing to give.
//! pdfsqueeze treats the tools as opaque candidates in a selection problem
//! instead: run a full pipeline, measure, fall back to a simpler one when
//! the result underperforms, and return the original untouched when nothing
//! beats it. The returned document is **never larger than the input**.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Workspace   materialise the upload in a scoped temp dir
//!  ├─ 2. Pipeline 1  gs (profile parameters, one alternate-set retry)
//!  │                 └─ qpdf optimise (failure non-fatal)
//!  ├─ 3. Evaluate    accepted only with ≥ min-gain reduction
//!  ├─ 4. Pipeline 2  plain gs fallback (only when 1 underperformed)
//!  └─ 5. Select      smallest candidate ≤ original, else the original
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsqueeze::{squeeze, QualityProfile, SqueezeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("document.pdf")?;
//!     let config = SqueezeConfig::builder()
//!         .profile(QualityProfile::High)
//!         .build()?;
//!     let outcome = squeeze(bytes, &config).await?;
//!     println!(
//!         "{} → {} bytes ({}% smaller)",
//!         outcome.report.original_size,
//!         outcome.report.final_size,
//!         outcome.report.reduction_percent
//!     );
//!     std::fs::write("document.small.pdf", &outcome.data)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdfsqueeze` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Enables the axum HTTP API ([`server`]) |
//!
//! Disable both when using only the library:
//! ```toml
//! pdfsqueeze = { version = "0.3", default-features = false }
//! ```
//!
//! ## Requirements
//!
//! Ghostscript (`gs`) and `qpdf` must be installed and on `PATH` (both
//! names are configurable). They are consumed strictly as black boxes:
//! arguments in, exit code and an output file out.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod selector;
#[cfg(feature = "server")]
pub mod server;
pub mod squeeze;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{QualityProfile, SqueezeConfig, SqueezeConfigBuilder};
pub use error::{ErrorCategory, SqueezeError, StageError};
pub use outcome::{CandidateSource, DocumentInfo, SqueezeOutcome, SqueezeReport};
pub use squeeze::{inspect, inspect_sync, squeeze, squeeze_file, squeeze_sync};
