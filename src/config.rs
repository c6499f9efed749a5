//! Configuration types for PDF size reduction.
//!
//! All behaviour is controlled through [`SqueezeConfig`], built via its
//! [`SqueezeConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across requests, serialise them for logging,
//! and diff two runs to understand why their outputs differ.
//!
//! # Design choice: fixed profiles over free-form parameters
//! The four [`QualityProfile`] constants bundle a Ghostscript
//! `-dPDFSETTINGS` tier, an image-DPI target, and a qpdf flag set. Exposing
//! the raw tool flags instead would couple callers to two external CLIs and
//! make the "higher profile ⇒ smaller output" ordering impossible to reason
//! about.

use crate::error::SqueezeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default minimum reduction (percent of the original size) pipeline 1 must
/// achieve before the fallback pipeline is skipped.
///
/// Empirically chosen; treat it as tunable, not load-bearing. A candidate
/// below this gain is still *eligible* for selection, it just no longer
/// suppresses the cheaper fallback attempt.
pub const DEFAULT_MIN_GAIN_PERCENT: u8 = 5;

/// Default overall deadline for one compression run, in seconds.
pub const DEFAULT_DEADLINE_SECS: u64 = 120;

/// Configuration for a compression run.
///
/// Built via [`SqueezeConfig::builder()`] or using
/// [`SqueezeConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfsqueeze::{QualityProfile, SqueezeConfig};
///
/// let config = SqueezeConfig::builder()
///     .profile(QualityProfile::High)
///     .min_gain_percent(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SqueezeConfig {
    /// Quality profile driving both transform stages. Default: [`QualityProfile::Medium`].
    pub profile: QualityProfile,

    /// Minimum reduction (percent) pipeline 1 must achieve to suppress the
    /// fallback pipeline. Default: 5.
    ///
    /// Pipeline 2 exists as a cheaper second opinion: when the full
    /// gs→qpdf chain barely moved the needle, a plain gs pass sometimes
    /// does better (qpdf's linearisation overhead can eat small wins).
    /// Setting this to 0 runs the fallback only when pipeline 1 failed to
    /// shrink the file at all.
    pub min_gain_percent: u8,

    /// Overall deadline in seconds for the async entry points. 0 disables
    /// the deadline. Default: 120.
    ///
    /// External processes have no inherent timeout; a pathological PDF can
    /// keep Ghostscript busy for minutes. The deadline bounds the whole
    /// run (both pipelines), not individual stage invocations.
    pub deadline_secs: u64,

    /// Ghostscript binary name or path. Default: "gs".
    pub gs_binary: String,

    /// qpdf binary name or path. Default: "qpdf".
    pub qpdf_binary: String,
}

impl Default for SqueezeConfig {
    fn default() -> Self {
        Self {
            profile: QualityProfile::default(),
            min_gain_percent: DEFAULT_MIN_GAIN_PERCENT,
            deadline_secs: DEFAULT_DEADLINE_SECS,
            gs_binary: "gs".to_string(),
            qpdf_binary: "qpdf".to_string(),
        }
    }
}

impl SqueezeConfig {
    /// Create a new builder for `SqueezeConfig`.
    pub fn builder() -> SqueezeConfigBuilder {
        SqueezeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Copy of this config with a different profile; the per-request
    /// override used by the HTTP handler.
    pub fn with_profile(&self, profile: QualityProfile) -> Self {
        Self {
            profile,
            ..self.clone()
        }
    }
}

/// Builder for [`SqueezeConfig`].
#[derive(Debug)]
pub struct SqueezeConfigBuilder {
    config: SqueezeConfig,
}

impl SqueezeConfigBuilder {
    pub fn profile(mut self, profile: QualityProfile) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn min_gain_percent(mut self, pct: u8) -> Self {
        self.config.min_gain_percent = pct;
        self
    }

    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.config.deadline_secs = secs;
        self
    }

    pub fn gs_binary(mut self, bin: impl Into<String>) -> Self {
        self.config.gs_binary = bin.into();
        self
    }

    pub fn qpdf_binary(mut self, bin: impl Into<String>) -> Self {
        self.config.qpdf_binary = bin.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SqueezeConfig, SqueezeError> {
        let c = &self.config;
        if c.min_gain_percent > 100 {
            return Err(SqueezeError::InvalidConfig(format!(
                "min_gain_percent must be 0–100, got {}",
                c.min_gain_percent
            )));
        }
        if c.gs_binary.is_empty() || c.qpdf_binary.is_empty() {
            return Err(SqueezeError::InvalidConfig(
                "Tool binary names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Profiles ─────────────────────────────────────────────────────────────

/// Named compression level bundling the parameters of both transform stages.
///
/// Four fixed constants; none is derived at runtime. The contract callers
/// may rely on is only "higher profile ⇒ smaller output, lower fidelity" —
/// the exact tool flags behind each level are an implementation detail.
///
/// | Profile | Use case |
/// |---------|----------|
/// | Low     | Print-quality output, minimal size change |
/// | Medium  | General sharing and e-mail (default) |
/// | High    | Web upload limits, noticeable image downsampling |
/// | Maximum | Smallest possible file, screen-only fidelity |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    /// Conservative: printer-grade images at 300 DPI.
    Low,
    /// Balanced: ebook-grade images at 200 DPI. (default)
    #[default]
    Medium,
    /// Aggressive: ebook-grade images downsampled to 150 DPI.
    High,
    /// Most aggressive: screen-grade images at 150 DPI.
    Maximum,
}

impl QualityProfile {
    /// All profiles in ascending compression order.
    pub const ALL: [QualityProfile; 4] = [
        QualityProfile::Low,
        QualityProfile::Medium,
        QualityProfile::High,
        QualityProfile::Maximum,
    ];

    /// The wire name used in API requests and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityProfile::Low => "low",
            QualityProfile::Medium => "medium",
            QualityProfile::High => "high",
            QualityProfile::Maximum => "maximum",
        }
    }

    /// Ghostscript `-dPDFSETTINGS` tier for this profile.
    pub fn gs_settings(&self) -> &'static str {
        match self {
            QualityProfile::Low => "/printer",
            QualityProfile::Medium | QualityProfile::High => "/ebook",
            QualityProfile::Maximum => "/screen",
        }
    }

    /// Image downsampling target in DPI, applied to colour, grayscale and
    /// monochrome images alike.
    pub fn image_dpi(&self) -> u32 {
        match self {
            QualityProfile::Low => 300,
            QualityProfile::Medium => 200,
            QualityProfile::High | QualityProfile::Maximum => 150,
        }
    }

    /// qpdf optimizer flags for this profile.
    pub fn qpdf_flags(&self) -> &'static [&'static str] {
        match self {
            QualityProfile::Low => &["--optimize-images", "--linearize"],
            _ => &["--optimize-images", "--compress-streams=y", "--linearize"],
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityProfile {
    type Err = SqueezeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityProfile::Low),
            "medium" => Ok(QualityProfile::Medium),
            "high" => Ok(QualityProfile::High),
            "maximum" | "max" => Ok(QualityProfile::Maximum),
            other => Err(SqueezeError::UnknownProfile(other.to_string())),
        }
    }
}
