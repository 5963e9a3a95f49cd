//! PDF rasterisation: render pages to [`PageSurface`]s via pdfium.
//!
//! ## Why a blocking loop with a channel?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! The whole document lifetime therefore stays inside one
//! `tokio::task::spawn_blocking` closure; rendered surfaces flow out through
//! an `mpsc` channel one page at a time, preserving strict page order.
//!
//! The cancellation token is checked before every page render and before
//! every send — the suspension boundaries of the decode loop. A dropped
//! receiver counts as cancellation too, so abandoning the stream stops the
//! renderer at the next page boundary.

use crate::cancel::CancelToken;
use crate::error::{PageError, PagebindError};
use crate::session::PageSurface;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the rasterise loop, in order: one `Total`, then `Page`
/// per rendered page, with `PageFailed` terminating a broken run.
pub(crate) enum RenderEvent {
    Total(usize),
    Page(PageSurface),
    PageFailed(PageError),
}

/// How the rasterise loop ended.
pub(crate) enum RasterOutcome {
    Completed { total: usize },
    Cancelled { rendered: usize },
    Failed { rendered: usize },
}

/// Rasterise every page of `path` at `scale`, sending events through `tx`.
///
/// Runs on the calling (blocking) thread. Page-level render failures emit
/// `PageFailed` and end the loop; document-level failures (unreadable or
/// encrypted PDF) return an error before any page is produced.
pub(crate) fn rasterise_blocking(
    path: &Path,
    scale: f32,
    password: Option<&str>,
    cancel: Option<&CancelToken>,
    tx: mpsc::Sender<RenderEvent>,
) -> Result<RasterOutcome, PagebindError> {
    let is_cancelled = || cancel.map(CancelToken::is_cancelled).unwrap_or(false);

    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, path, password)?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);

    if is_cancelled() || tx.blocking_send(RenderEvent::Total(total)).is_err() {
        return Ok(RasterOutcome::Cancelled { rendered: 0 });
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let mut rendered = 0;

    for idx in 0..total {
        if is_cancelled() {
            debug!("Rasterisation cancelled before page {}", idx + 1);
            return Ok(RasterOutcome::Cancelled { rendered });
        }

        let page = match pages.get(idx as u16) {
            Ok(p) => p,
            Err(e) => {
                let err = PageError::RenderFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                };
                warn!("{err}");
                let _ = tx.blocking_send(RenderEvent::PageFailed(err));
                return Ok(RasterOutcome::Failed { rendered });
            }
        };

        let bitmap = match page.render_with_config(&render_config) {
            Ok(b) => b,
            Err(e) => {
                let err = PageError::RenderFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                };
                warn!("{err}");
                let _ = tx.blocking_send(RenderEvent::PageFailed(err));
                return Ok(RasterOutcome::Failed { rendered });
            }
        };

        let image = bitmap.as_image();
        let surface = PageSurface {
            page_num: idx + 1,
            width: image.width(),
            height: image.height(),
            image,
            scale,
        };
        debug!(
            "Rendered page {} → {}x{} px",
            surface.page_num, surface.width, surface.height
        );

        if is_cancelled() || tx.blocking_send(RenderEvent::Page(surface)).is_err() {
            return Ok(RasterOutcome::Cancelled { rendered });
        }
        rendered += 1;
    }

    Ok(RasterOutcome::Completed { total })
}

/// Open a document, mapping pdfium failures onto the crate error taxonomy.
fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PagebindError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PagebindError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                PagebindError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            PagebindError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

// ── Metadata ─────────────────────────────────────────────────────────────

/// Document-level PDF metadata, readable without rendering any page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, PagebindError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| PagebindError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, PagebindError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
