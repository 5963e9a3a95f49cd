//! Settings types for the assembly, preview, and export pipelines.
//!
//! Each pipeline takes one immutable settings struct, built via its builder
//! and re-read by the caller for every invocation. Keeping every knob in one
//! struct makes it trivial to share settings across threads, serialise them
//! for logging, and diff two runs to understand why their outputs differ.

use crate::error::PagebindError;
use serde::{Deserialize, Serialize};

/// JPEG quality used everywhere a lossy re-encode happens: rotation
/// re-rasterisation, non-JPEG normalisation, and JPEG page export.
pub const JPEG_QUALITY: u8 = 90;

/// Conversion factor from image pixels to PDF points for `Custom` page
/// sizing: 96 px/inch source resolution against 72 pt/inch page space.
pub const PX_TO_PT: f32 = 0.75;

// ── Enums ────────────────────────────────────────────────────────────────

/// Target page size for assembled PDFs.
///
/// Preset dimensions are in PDF points, portrait orientation. `Custom`
/// derives the page box from the image's own pixel dimensions instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSizePreset {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    /// Page box follows the image: pixel dimensions × [`PX_TO_PT`].
    Custom,
}

impl PageSizePreset {
    /// Portrait (width, height) in points, or `None` for `Custom`.
    pub fn dimensions(self) -> Option<(f32, f32)> {
        match self {
            PageSizePreset::A4 => Some((595.28, 841.89)),
            PageSizePreset::A3 => Some((841.89, 1190.55)),
            PageSizePreset::A5 => Some((419.53, 595.28)),
            PageSizePreset::Letter => Some((612.0, 792.0)),
            PageSizePreset::Legal => Some((612.0, 1008.0)),
            PageSizePreset::Custom => None,
        }
    }
}

/// Page orientation rule for preset page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Always tall.
    Portrait,
    /// Always wide.
    Landscape,
    /// Tall when the (rotation-adjusted) image is taller than wide, else wide.
    #[default]
    Auto,
}

/// Output raster format for exported pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────

/// Settings for one image-to-PDF assembly run.
///
/// # Example
/// ```rust
/// use pagebind::{AssemblySettings, PageSizePreset, Orientation};
///
/// let settings = AssemblySettings::builder()
///     .page_size(PageSizePreset::A4)
///     .orientation(Orientation::Auto)
///     .margin_pt(36.0)
///     .output_name("scans.pdf")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySettings {
    /// Target page size. Default: A4.
    pub page_size: PageSizePreset,

    /// Orientation rule for preset sizes; ignored for `Custom`. Default: Auto.
    pub orientation: Orientation,

    /// Margin in points, applied on the constrained axis on both sides.
    /// Default: 0.
    pub margin_pt: f32,

    /// Output file name for [`crate::merge_to_file`]. Default: "merged.pdf".
    pub output_name: String,

    /// Document title written into the PDF metadata. Default: output name
    /// without its extension.
    pub title: Option<String>,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            page_size: PageSizePreset::default(),
            orientation: Orientation::default(),
            margin_pt: 0.0,
            output_name: "merged.pdf".to_string(),
            title: None,
        }
    }
}

impl AssemblySettings {
    pub fn builder() -> AssemblySettingsBuilder {
        AssemblySettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Document title for the PDF metadata.
    pub fn document_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            self.output_name
                .rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .unwrap_or_else(|| self.output_name.clone())
        })
    }
}

/// Builder for [`AssemblySettings`].
#[derive(Debug)]
pub struct AssemblySettingsBuilder {
    settings: AssemblySettings,
}

impl AssemblySettingsBuilder {
    pub fn page_size(mut self, size: PageSizePreset) -> Self {
        self.settings.page_size = size;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.settings.orientation = orientation;
        self
    }

    pub fn margin_pt(mut self, margin: f32) -> Self {
        self.settings.margin_pt = margin.max(0.0);
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.settings.output_name = name;
        }
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.settings.title = Some(title.into());
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<AssemblySettings, PagebindError> {
        let s = &self.settings;
        if !s.margin_pt.is_finite() || s.margin_pt < 0.0 {
            return Err(PagebindError::InvalidConfig(format!(
                "Margin must be a non-negative number of points, got {}",
                s.margin_pt
            )));
        }
        if let Some((w, h)) = s.page_size.dimensions() {
            if s.margin_pt * 2.0 >= w.min(h) {
                return Err(PagebindError::InvalidConfig(format!(
                    "Margin {}pt leaves no room on a {:?} page",
                    s.margin_pt, s.page_size
                )));
            }
        }
        Ok(self.settings)
    }
}

// ── Export ───────────────────────────────────────────────────────────────

/// Settings for one PDF-to-images export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Target resolution in dots per inch. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Output image format. Default: PNG.
    pub format: OutputFormat,

    /// Base name for output files. Default: the source file's stem.
    pub base_name: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dpi: 300,
            format: OutputFormat::default(),
            base_name: None,
            password: None,
            download_timeout_secs: 120,
        }
    }
}

impl ExportSettings {
    pub fn builder() -> ExportSettingsBuilder {
        ExportSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Render scale applied to the PDF's native page size.
    ///
    /// PDF user space is 72 points per inch, so a 300 DPI export renders at
    /// 300 / 72 ≈ 4.17× the page's point dimensions.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ExportSettings`].
#[derive(Debug)]
pub struct ExportSettingsBuilder {
    settings: ExportSettings,
}

impl ExportSettingsBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.settings.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.settings.format = format;
        self
    }

    pub fn base_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.settings.base_name = Some(name);
        }
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.settings.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.settings.download_timeout_secs = secs;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ExportSettings, PagebindError> {
        let s = &self.settings;
        if s.dpi < 72 || s.dpi > 600 {
            return Err(PagebindError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                s.dpi
            )));
        }
        Ok(self.settings)
    }
}

// ── Preview ──────────────────────────────────────────────────────────────

/// Settings for the incremental preview pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Render scale applied to the page's point dimensions. Default: 1.5.
    pub scale: f32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            scale: 1.5,
            password: None,
            download_timeout_secs: 120,
        }
    }
}

impl PreviewSettings {
    pub fn builder() -> PreviewSettingsBuilder {
        PreviewSettingsBuilder {
            settings: Self::default(),
        }
    }
}

/// Builder for [`PreviewSettings`].
#[derive(Debug)]
pub struct PreviewSettingsBuilder {
    settings: PreviewSettings,
}

impl PreviewSettingsBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.settings.scale = scale.clamp(0.1, 8.0);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.settings.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.settings.download_timeout_secs = secs;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<PreviewSettings, PagebindError> {
        let s = &self.settings;
        if !s.scale.is_finite() || s.scale <= 0.0 {
            return Err(PagebindError::InvalidConfig(format!(
                "Preview scale must be positive, got {}",
                s.scale
            )));
        }
        Ok(self.settings)
    }
}
