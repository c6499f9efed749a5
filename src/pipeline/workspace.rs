//! Request-scoped scratch space for one compression run.
//!
//! ## Why a temp directory per request?
//!
//! Both external tools require file-system paths — neither streams from a
//! byte buffer. Materialising the upload into a `TempDir` gives every stage
//! a path to read and write while guaranteeing cleanup when [`Workspace`]
//! is dropped, on every exit path including panic. Nothing is shared across
//! concurrent requests: each run owns its directory, so there is no global
//! counter or naming scheme to coordinate.
//!
//! We validate the PDF magic bytes (`%PDF`) before writing anything so
//! callers get a meaningful error instead of tool-specific repair chatter.

use crate::error::SqueezeError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Scratch directory holding the input document and all candidates.
///
/// The directory and its contents are removed when the workspace drops.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    input: PathBuf,
    original_size: u64,
}

impl Workspace {
    /// Validate `bytes` as a PDF and materialise it as `input.pdf`.
    pub fn for_document(bytes: &[u8]) -> Result<Self, SqueezeError> {
        if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(SqueezeError::NotAPdf { magic });
        }

        let dir = TempDir::with_prefix("pdfsqueeze-")
            .map_err(|e| SqueezeError::Internal(format!("tempdir: {e}")))?;
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, bytes)
            .map_err(|e| SqueezeError::Internal(format!("write input: {e}")))?;

        debug!(path = %input.display(), size = bytes.len(), "workspace ready");

        Ok(Self {
            dir,
            input,
            original_size: bytes.len() as u64,
        })
    }

    /// Path of the materialised input document.
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    /// Byte length of the original upload.
    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// Path for a named candidate inside the workspace.
    pub fn candidate_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
