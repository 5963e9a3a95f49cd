//! # pagebind
//!
//! Merge images into a single PDF, and rasterise a PDF's pages back into
//! downloadable images. Everything runs locally; the only network access is
//! fetching a PDF when the input is a URL.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Images                                  PDF
//!  │                                       │
//!  ├─ 1. Collect  ordered list with        ├─ 1. Input    resolve file/URL,
//!  │              rotation, reorder, sort  │              byte-load progress
//!  ├─ 2. Encode   normalise to JPEG q90    ├─ 2. Preview  incremental pdfium
//!  ├─ 3. Layout   page box + margin fit    │              render, pausable
//!  ├─ 4. Draw     one page per image       ├─ 3. Export   render at DPI/72,
//!  │              (DCT embed)              │              encode PNG/JPEG
//!  └─ 5. Output   merged.pdf               └─ 4. Deliver  ≤2 loose files,
//!                                                         >2 one ZIP archive
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagebind::{merge_to_file, AssemblySettings, ImageCollection, SortKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut collection = ImageCollection::new();
//!     collection.add_images(["scan-2.jpg", "scan-1.jpg"]);
//!     collection.sort(SortKey::Name);
//!
//!     let settings = AssemblySettings::builder()
//!         .margin_pt(36.0)
//!         .output_name("scans.pdf")
//!         .build()?;
//!     let report = merge_to_file(&collection, &settings, ".", None).await?;
//!     println!("{} pages → {}", report.page_count, report.path.display());
//!     Ok(())
//! }
//! ```
//!
//! Exporting the other way:
//!
//! ```rust,no_run
//! use pagebind::{export, ExportSettings, ExportSource};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ExportSettings::builder().dpi(300).build()?;
//! let outcome = export(ExportSource::Input("scans.pdf"), &settings, "out", None).await?;
//! println!("{} pages exported", outcome.page_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagebind` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagebind = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod locale;
pub mod merge;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancelToken;
pub use collection::{
    CollectionObserver, GalleryEntry, ImageCollection, ImageId, Rotation, SortKey, SourceImage,
};
pub use config::{
    AssemblySettings, AssemblySettingsBuilder, ExportSettings, ExportSettingsBuilder,
    Orientation, OutputFormat, PageSizePreset, PreviewSettings, PreviewSettingsBuilder,
    JPEG_QUALITY, PX_TO_PT,
};
pub use error::{PageError, PagebindError};
pub use export::{export, ExportOutcome, ExportSource};
pub use locale::{swap_locale_segment, Catalog, Locale};
pub use merge::{merge, merge_to_file, MergeOutput, MergeReport};
pub use pipeline::render::DocumentMetadata;
pub use preview::{inspect, preview, preview_pages, PageStream};
pub use progress::{NoopProgress, ProgressHandle, ProgressObserver};
pub use session::{PageSurface, PreviewSession, PreviewState, Previewer};
