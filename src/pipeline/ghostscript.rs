//! Stage A: Ghostscript `pdfwrite` rewrite.
//!
//! Ghostscript re-interprets the whole document and writes a fresh PDF,
//! which is where the bulk of any size win comes from: image downsampling,
//! font subsetting, and stream re-encoding are all driven by the
//! `-dPDFSETTINGS` tier plus explicit resolution overrides.
//!
//! Three invocation shapes exist:
//!
//! * **primary** — full parameter set with per-image-class DPI overrides and
//!   font stripping; first attempt of pipeline 1.
//! * **alternate** — same quality tier without the resolution and font
//!   overrides. Retried when the primary invocation fails: the extra flags
//!   are exactly what trips gs up on documents with unusual image streams.
//! * **simple** — identical arguments to alternate but run as its own
//!   pipeline (the fallback), directly against the original input.
//!
//! stderr classification maps gs's repair chatter onto input-shaped errors
//! so a corrupt upload surfaces as "invalid document" rather than a crash.

use super::{run_tool, TransformStage};
use crate::config::QualityProfile;
use crate::error::StageError;
use std::path::Path;
use tracing::debug;

/// Which argument set a [`GhostscriptStage`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GsMode {
    /// Full downsampling and font-stripping flags.
    Full,
    /// Quality tier only; no resolution or font overrides.
    Plain,
}

/// One Ghostscript invocation with parameters fixed at construction.
pub struct GhostscriptStage {
    binary: String,
    profile: QualityProfile,
    mode: GsMode,
    id: &'static str,
}

impl GhostscriptStage {
    /// Pipeline 1, first attempt: full parameter set.
    pub fn primary(binary: impl Into<String>, profile: QualityProfile) -> Self {
        Self {
            binary: binary.into(),
            profile,
            mode: GsMode::Full,
            id: "gs-primary",
        }
    }

    /// Pipeline 1, retry attempt: alternate (plain) parameter set.
    pub fn alternate(binary: impl Into<String>, profile: QualityProfile) -> Self {
        Self {
            binary: binary.into(),
            profile,
            mode: GsMode::Plain,
            id: "gs-alternate",
        }
    }

    /// Pipeline 2: plain parameter set run directly against the input.
    pub fn simple(binary: impl Into<String>, profile: QualityProfile) -> Self {
        Self {
            binary: binary.into(),
            profile,
            mode: GsMode::Plain,
            id: "gs-simple",
        }
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.4".into(),
            format!("-dPDFSETTINGS={}", self.profile.gs_settings()),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
        ];

        if self.mode == GsMode::Full {
            let dpi = self.profile.image_dpi();
            args.push(format!("-dColorImageResolution={dpi}"));
            args.push(format!("-dGrayImageResolution={dpi}"));
            args.push(format!("-dMonoImageResolution={dpi}"));
        }

        args.push("-dOptimize=true".into());

        if self.mode == GsMode::Full {
            args.push("-dCompressFonts=true".into());
            args.push("-dSubsetFonts=true".into());
            args.push("-dEmbedAllFonts=false".into());
        }

        args.push(format!("-sOutputFile={}", output.display()));
        args.push(input.display().to_string());
        args
    }
}

impl TransformStage for GhostscriptStage {
    fn id(&self) -> &'static str {
        self.id
    }

    fn apply(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        let args = self.build_args(input, output);
        debug!(stage = self.id, profile = %self.profile, "running ghostscript");
        run_tool(&self.binary, &args, output, |stderr| {
            classify_stderr(&self.binary, stderr)
        })
    }
}

/// Map Ghostscript stderr onto input-shaped errors.
///
/// gs reports corrupt documents through a recognisable vocabulary while
/// attempting repair; anything matching it is the document's fault, not the
/// environment's. Returns `None` for unrecognised output.
fn classify_stderr(tool: &str, stderr: &str) -> Option<StageError> {
    let lower = stderr.to_ascii_lowercase();

    if lower.contains("password") || lower.contains("encrypted") {
        return Some(StageError::PasswordProtected {
            tool: tool.to_string(),
        });
    }

    const MALFORMED_MARKERS: [&str; 6] = [
        "couldn't find trailer",
        "no objects were found",
        "xref",
        "syntaxerror",
        "file has unbalanced q/q",
        "not found as a pdf",
    ];
    if MALFORMED_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(StageError::MalformedInput {
            tool: tool.to_string(),
            detail: first_error_line(stderr),
        });
    }

    None
}

/// First line of stderr that looks like an error, for compact diagnostics.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| l.to_ascii_lowercase().contains("error"))
        .or_else(|| stderr.lines().next())
        .unwrap_or("unknown error")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_for(stage: &GhostscriptStage) -> Vec<String> {
        stage.build_args(&PathBuf::from("/w/input.pdf"), &PathBuf::from("/w/out.pdf"))
    }

    #[test]
    fn primary_args_carry_profile_settings() {
        let args = args_for(&GhostscriptStage::primary("gs", QualityProfile::Medium));
        assert!(args.contains(&"-dPDFSETTINGS=/ebook".to_string()));
        assert!(args.contains(&"-dColorImageResolution=200".to_string()));
        assert!(args.contains(&"-dEmbedAllFonts=false".to_string()));
        assert_eq!(args.last().unwrap(), "/w/input.pdf");
        assert!(args.contains(&"-sOutputFile=/w/out.pdf".to_string()));
    }

    #[test]
    fn maximum_profile_uses_screen_tier() {
        let args = args_for(&GhostscriptStage::primary("gs", QualityProfile::Maximum));
        assert!(args.contains(&"-dPDFSETTINGS=/screen".to_string()));
        assert!(args.contains(&"-dColorImageResolution=150".to_string()));
    }

    #[test]
    fn plain_modes_drop_resolution_and_font_overrides() {
        for stage in [
            GhostscriptStage::alternate("gs", QualityProfile::High),
            GhostscriptStage::simple("gs", QualityProfile::High),
        ] {
            let args = args_for(&stage);
            assert!(args.contains(&"-dPDFSETTINGS=/ebook".to_string()));
            assert!(!args.iter().any(|a| a.contains("ImageResolution")));
            assert!(!args.iter().any(|a| a.contains("Fonts")));
            assert!(args.contains(&"-dOptimize=true".to_string()));
        }
    }

    #[test]
    fn stage_ids_are_distinct() {
        assert_eq!(GhostscriptStage::primary("gs", QualityProfile::Low).id(), "gs-primary");
        assert_eq!(
            GhostscriptStage::alternate("gs", QualityProfile::Low).id(),
            "gs-alternate"
        );
        assert_eq!(GhostscriptStage::simple("gs", QualityProfile::Low).id(), "gs-simple");
    }

    #[test]
    fn classify_password_markers() {
        let err = classify_stderr("gs", "This file requires a password for access.").unwrap();
        assert!(matches!(err, StageError::PasswordProtected { .. }));
    }

    #[test]
    fn classify_trailer_repair_chatter_as_malformed() {
        let stderr = "   **** Error:  Couldn't find trailer dictionary.\n   **** The file was not repaired.";
        let err = classify_stderr("gs", stderr).unwrap();
        match err {
            StageError::MalformedInput { detail, .. } => {
                assert!(detail.contains("trailer"), "detail: {detail}");
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn unrecognised_stderr_is_not_classified() {
        assert!(classify_stderr("gs", "Segmentation fault").is_none());
    }
}
