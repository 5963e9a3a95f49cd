//! Image-to-PDF assembly: the eager entry points of the merge pipeline.
//!
//! [`merge`] consumes a snapshot of the collection so the caller may keep
//! mutating the live collection while a run is in flight; the run sees only
//! the order and rotations that existed when it started. Images are
//! processed strictly in collection order, one at a time, and any per-image
//! failure aborts the whole assembly — no partial PDF is ever returned.

use crate::collection::{ImageCollection, SourceImage};
use crate::config::AssemblySettings;
use crate::error::PagebindError;
use crate::pipeline::{encode, layout};
use crate::progress::ProgressHandle;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject, Mm,
    PdfDocument, PdfLayerReference, Pt, Px,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Result of an in-memory assembly.
#[derive(Debug)]
pub struct MergeOutput {
    /// The serialised PDF document.
    pub pdf: Vec<u8>,
    /// Pages produced — one per image in the snapshot.
    pub page_count: usize,
    pub duration_ms: u64,
}

/// Result of [`merge_to_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub path: PathBuf,
    pub page_count: usize,
    pub bytes_written: usize,
    pub duration_ms: u64,
}

/// Assemble the collection into a single PDF, one page per image.
///
/// # Errors
/// - [`PagebindError::EmptyCollection`] when the collection has no images
/// - [`PagebindError::ImageDecodeFailed`] / [`PagebindError::EncodeFailed`]
///   when any image cannot be read or normalised
/// - [`PagebindError::PdfBuildFailed`] when document serialisation fails
pub async fn merge(
    collection: &ImageCollection,
    settings: &AssemblySettings,
    progress: Option<ProgressHandle>,
) -> Result<MergeOutput, PagebindError> {
    let start = Instant::now();
    if collection.is_empty() {
        return Err(PagebindError::EmptyCollection);
    }

    let images = collection.snapshot();
    let total = images.len();
    info!("Assembling {} images into a PDF", total);
    if let Some(p) = &progress {
        p.on_job_start(total);
    }

    // printpdf and the image decode round-trips are CPU-bound; keep them off
    // the async executor.
    let worker_settings = settings.clone();
    let worker_progress = progress.clone();
    let pdf = tokio::task::spawn_blocking(move || {
        build_pdf(&images, &worker_settings, worker_progress)
    })
    .await
    .map_err(|e| PagebindError::Internal(format!("Assembly task panicked: {}", e)))??;

    if let Some(p) = &progress {
        p.on_job_complete(total, total);
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Assembled {} pages, {} bytes, {}ms",
        total,
        pdf.len(),
        duration_ms
    );

    Ok(MergeOutput {
        pdf,
        page_count: total,
        duration_ms,
    })
}

/// Assemble the collection and write the PDF under the configured output
/// name inside `out_dir`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial PDF at the destination.
pub async fn merge_to_file(
    collection: &ImageCollection,
    settings: &AssemblySettings,
    out_dir: impl AsRef<Path>,
    progress: Option<ProgressHandle>,
) -> Result<MergeReport, PagebindError> {
    let output = merge(collection, settings, progress).await?;
    let path = out_dir.as_ref().join(&settings.output_name);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PagebindError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf)
        .await
        .map_err(|e| PagebindError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| PagebindError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    Ok(MergeReport {
        path,
        page_count: output.page_count,
        bytes_written: output.pdf.len(),
        duration_ms: output.duration_ms,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// One image resolved to everything needed to draw its page.
struct PlacedImage {
    jpeg: Vec<u8>,
    px_width: u32,
    px_height: u32,
    page_width: f32,
    page_height: f32,
    placement: layout::Placement,
}

/// Blocking implementation of the assembly loop.
fn build_pdf(
    images: &[SourceImage],
    settings: &AssemblySettings,
    progress: Option<ProgressHandle>,
) -> Result<Vec<u8>, PagebindError> {
    let total = images.len();
    let (first, rest) = images.split_first().ok_or(PagebindError::EmptyCollection)?;

    let placed = match place_image(first, settings) {
        Ok(placed) => placed,
        Err(e) => {
            if let Some(p) = &progress {
                p.on_unit_error(1, total, &e.to_string());
            }
            return Err(e);
        }
    };
    let (doc, page, layer) = PdfDocument::new(
        settings.document_title(),
        Mm::from(Pt(placed.page_width)),
        Mm::from(Pt(placed.page_height)),
        "Layer 1",
    );
    draw_image(doc.get_page(page).get_layer(layer), placed);
    if let Some(p) = &progress {
        p.on_unit_complete(1, total);
    }

    for (i, source) in rest.iter().enumerate() {
        let unit = i + 2;
        let placed = match place_image(source, settings) {
            Ok(placed) => placed,
            Err(e) => {
                if let Some(p) = &progress {
                    p.on_unit_error(unit, total, &e.to_string());
                }
                return Err(e);
            }
        };
        let (page, layer) = doc.add_page(
            Mm::from(Pt(placed.page_width)),
            Mm::from(Pt(placed.page_height)),
            "Layer 1",
        );
        draw_image(doc.get_page(page).get_layer(layer), placed);
        if let Some(p) = &progress {
            p.on_unit_complete(unit, total);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| PagebindError::PdfBuildFailed {
            detail: e.to_string(),
        })
}

/// Normalise one image and compute its page box and placement.
fn place_image(
    source: &SourceImage,
    settings: &AssemblySettings,
) -> Result<PlacedImage, PagebindError> {
    // Layout math runs on rotation-adjusted dimensions; `prepare_for_embedding`
    // applies the same rotation to the raster, so both agree.
    let (eff_width, eff_height) = source.effective_dimensions();
    let (page_width, page_height) = layout::page_box(settings, eff_width, eff_height);

    let prepared = encode::prepare_for_embedding(source)?;
    let placement = layout::fit_within(
        prepared.width as f32,
        prepared.height as f32,
        page_width,
        page_height,
        settings.margin_pt,
    );
    debug!(
        "'{}': page {:.1}x{:.1}pt, image at ({:.1},{:.1}) {:.1}x{:.1}pt",
        source.file_name,
        page_width,
        page_height,
        placement.x,
        placement.y,
        placement.width,
        placement.height
    );

    Ok(PlacedImage {
        jpeg: prepared.jpeg,
        px_width: prepared.width,
        px_height: prepared.height,
        page_width,
        page_height,
        placement,
    })
}

/// Draw a prepared JPEG onto a page layer at its computed placement.
fn draw_image(layer: PdfLayerReference, placed: PlacedImage) {
    let image = Image::from(ImageXObject {
        width: Px(placed.px_width as usize),
        height: Px(placed.px_height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: placed.jpeg,
        image_filter: Some(ImageFilter::DCT),
        clipping_bbox: None,
        smask: None,
    });

    // At 72 DPI one pixel spans one point, so the scale factors below map the
    // raster exactly onto the placement rectangle.
    let transform = ImageTransform {
        translate_x: Some(Mm::from(Pt(placed.placement.x))),
        translate_y: Some(Mm::from(Pt(placed.placement.y))),
        scale_x: Some(placed.placement.width / placed.px_width as f32),
        scale_y: Some(placed.placement.height / placed.px_height as f32),
        dpi: Some(72.0),
        ..Default::default()
    };

    image.add_to_layer(layer, transform);
}
