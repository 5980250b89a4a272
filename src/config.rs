//! Configuration for pdfmark processing.
//!
//! Mirrors the device parameters a pdfmark processor consults: resolution
//! for coordinate normalization, the page window, the output compatibility
//! level and the PDF/A and PDF/X annotation policies.

use serde::{Deserialize, Serialize};

/// What to do with an annotation that violates the active PDF/A or PDF/X
/// profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityPolicy {
    /// Log a warning, keep the annotation and drop the profile
    #[default]
    Warn,
    /// Discard the annotation with a warning
    Drop,
    /// Fail the document
    Abort,
}

/// Pdfmark processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfmarkConfig {
    /// Device resolution in dots per inch (x, y).
    pub resolution: [f64; 2],

    /// First page to include, 1-based; 0 means no lower bound.
    pub first_page: i64,

    /// Last page to include, 1-based; 0 means no upper bound.
    pub last_page: i64,

    /// Output PDF version as a number (1.4, 1.7, ...).
    pub compatibility_level: f32,

    /// PDF/A conformance level; 0 disables PDF/A checks.
    pub pdfa: u8,

    /// Produce PDF/X.
    pub pdfx: bool,

    /// Reaction to annotations that break the PDF/A or PDF/X profile.
    pub compatibility_policy: CompatibilityPolicy,

    /// TrimBox offsets from the MediaBox (left, right, top, bottom).
    pub trimbox_to_mediabox_offset: Option<[f64; 4]>,

    /// BleedBox offsets from the TrimBox (left, right, top, bottom).
    pub bleedbox_to_trimbox_offset: Option<[f64; 4]>,

    /// Default page size in points.
    pub media_size: [f64; 2],

    /// Flate-compress streams created with `/OBJ` and page contents.
    pub compress_streams: bool,

    /// Producer string written to the document information dictionary.
    pub producer: String,
}

impl Default for PdfmarkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfmarkConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            resolution: [720.0, 720.0],
            first_page: 0,
            last_page: 0,
            compatibility_level: 1.7,
            pdfa: 0,
            pdfx: false,
            compatibility_policy: CompatibilityPolicy::Warn,
            trimbox_to_mediabox_offset: None,
            bleedbox_to_trimbox_offset: None,
            media_size: [612.0, 792.0],
            compress_streams: true,
            producer: format!("{} {}", crate::NAME, crate::VERSION),
        }
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the device resolution.
    pub fn with_resolution(mut self, x: f64, y: f64) -> Self {
        self.resolution = [x, y];
        self
    }

    /// Restrict output to a page window (0 = unbounded).
    pub fn with_page_window(mut self, first: i64, last: i64) -> Self {
        self.first_page = first;
        self.last_page = last;
        self
    }

    /// Set the output compatibility level.
    pub fn with_compatibility_level(mut self, level: f32) -> Self {
        self.compatibility_level = level;
        self
    }

    /// Enable PDF/A checks at the given conformance level.
    pub fn with_pdfa(mut self, level: u8) -> Self {
        self.pdfa = level;
        self
    }

    /// Enable PDF/X checks.
    pub fn with_pdfx(mut self, enable: bool) -> Self {
        self.pdfx = enable;
        self
    }

    /// Set the compliance violation policy.
    pub fn with_policy(mut self, policy: CompatibilityPolicy) -> Self {
        self.compatibility_policy = policy;
        self
    }

    /// Set the TrimBox offset fallback.
    pub fn with_trimbox_offset(mut self, offset: [f64; 4]) -> Self {
        self.trimbox_to_mediabox_offset = Some(offset);
        self
    }

    /// Set the BleedBox offset fallback.
    pub fn with_bleedbox_offset(mut self, offset: [f64; 4]) -> Self {
        self.bleedbox_to_trimbox_offset = Some(offset);
        self
    }

    /// Set the default page size.
    pub fn with_media_size(mut self, width: f64, height: f64) -> Self {
        self.media_size = [width, height];
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress_streams(mut self, enable: bool) -> Self {
        self.compress_streams = enable;
        self
    }

    /// Set the producer string.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }

    /// Scale factors mapping device space onto 72 units per inch.
    pub(crate) fn user_space_scale(&self) -> (f64, f64) {
        (72.0 / self.resolution[0], 72.0 / self.resolution[1])
    }
}
