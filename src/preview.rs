//! Incremental PDF preview: decode pages one at a time with cooperative
//! cancellation.
//!
//! ## Why every continuation checks the token
//!
//! The decode loop runs on a blocking thread and the collector runs on the
//! async side, connected by a bounded channel. Both sides check the
//! [`CancelToken`] at every step — the renderer before each page render and
//! each send, the collector before each append and each progress update — so
//! pages that were already in flight when the token flipped are dropped
//! rather than appended. Cancelling after page N therefore leaves exactly N
//! pages in the session, regardless of scheduling.

use crate::cancel::CancelToken;
use crate::config::PreviewSettings;
use crate::error::{PageError, PagebindError};
use crate::pipeline::render::{self, DocumentMetadata, RasterOutcome, RenderEvent};
use crate::pipeline::input;
use crate::progress::ProgressHandle;
use crate::session::{PageSurface, PreviewSession, PreviewState};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};

/// A boxed stream of rendered page surfaces.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageSurface, PageError>> + Send>>;

/// Preview a PDF: render every page at the preview scale, appending pages to
/// the returned session until completion, failure, or cancellation.
///
/// The session ends in [`PreviewState::Completed`], [`PreviewState::Paused`]
/// (token cancelled — not an error), or [`PreviewState::Failed`] (a page
/// failed to render while the preview was still active).
///
/// # Errors
/// Returns `Err` only for fatal input problems: missing file, not a PDF,
/// corrupt or password-protected document.
pub async fn preview(
    input_str: impl AsRef<str>,
    settings: &PreviewSettings,
    cancel: CancelToken,
    progress: Option<ProgressHandle>,
) -> Result<PreviewSession, PagebindError> {
    let input_str = input_str.as_ref();
    info!("Starting preview: {}", input_str);

    // ── Loading phase: resolve the source with byte progress ─────────────
    let resolved =
        input::resolve_pdf(input_str, settings.download_timeout_secs, progress.as_ref()).await?;

    if cancel.is_cancelled() {
        if let Some(p) = &progress {
            p.on_cancelled(0);
        }
        return Ok(PreviewSession {
            source: resolved,
            scale: settings.scale,
            password: settings.password.clone(),
            state: PreviewState::Paused { rendered: 0 },
            pages: Vec::new(),
            total_pages: 0,
            cancel,
        });
    }

    // ── Rendering phase ──────────────────────────────────────────────────
    let (tx, mut rx) = mpsc::channel(8);
    let path = resolved.path().to_path_buf();
    let scale = settings.scale;
    let password = settings.password.clone();
    let worker_token = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || {
        render::rasterise_blocking(&path, scale, password.as_deref(), Some(&worker_token), tx)
    });

    let mut pages: Vec<PageSurface> = Vec::new();
    let mut total_pages = 0;
    let mut failure: Option<PageError> = None;

    while let Some(event) = rx.recv().await {
        match event {
            RenderEvent::Total(total) => {
                if cancel.is_cancelled() {
                    continue;
                }
                total_pages = total;
                if let Some(p) = &progress {
                    p.on_job_start(total);
                }
            }
            RenderEvent::Page(surface) => {
                if cancel.is_cancelled() {
                    continue;
                }
                pages.push(surface);
                if let Some(p) = &progress {
                    p.on_unit_complete(pages.len(), total_pages);
                }
            }
            RenderEvent::PageFailed(e) => {
                error!("Preview page failure: {e}");
                if let Some(p) = &progress {
                    p.on_unit_error(e.page(), total_pages, &e.to_string());
                }
                failure = Some(e);
            }
        }
    }

    let outcome = handle
        .await
        .map_err(|e| PagebindError::Internal(format!("Render task panicked: {}", e)))??;

    let state = if cancel.is_cancelled() {
        PreviewState::Paused {
            rendered: pages.len(),
        }
    } else {
        match outcome {
            RasterOutcome::Completed { .. } => PreviewState::Completed,
            RasterOutcome::Cancelled { .. } => PreviewState::Paused {
                rendered: pages.len(),
            },
            RasterOutcome::Failed { .. } => PreviewState::Failed {
                detail: failure
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "page rendering failed".to_string()),
            },
        }
    };

    match &state {
        PreviewState::Completed => {
            if let Some(p) = &progress {
                p.on_job_complete(total_pages, pages.len());
            }
            info!("Preview complete: {} pages", pages.len());
        }
        PreviewState::Paused { rendered } => {
            if let Some(p) = &progress {
                p.on_cancelled(*rendered);
            }
            info!("Preview paused after {} pages", rendered);
        }
        PreviewState::Failed { .. } => {
            if let Some(p) = &progress {
                p.on_job_complete(total_pages, pages.len());
            }
        }
        _ => {}
    }

    Ok(PreviewSession {
        source: resolved,
        scale: settings.scale,
        password: settings.password.clone(),
        state,
        pages,
        total_pages,
        cancel,
    })
}

/// Preview a PDF, yielding each page surface as it is rendered.
///
/// The streaming equivalent of [`preview`]: pages arrive strictly in page
/// order; a page-level failure is yielded as `Err(PageError)` and ends the
/// stream. Dropping the stream cancels the renderer at its next page
/// boundary, as does cancelling `cancel`.
pub async fn preview_pages(
    input_str: impl AsRef<str>,
    settings: &PreviewSettings,
    cancel: CancelToken,
) -> Result<PageStream, PagebindError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming preview: {}", input_str);

    let resolved = input::resolve_pdf(input_str, settings.download_timeout_secs, None).await?;

    // Open the document once up front so corrupt or password-protected
    // inputs fail here instead of as a silently empty stream.
    render::extract_metadata(resolved.path(), settings.password.as_deref()).await?;

    let (tx, rx) = mpsc::channel(8);
    let scale = settings.scale;
    let password = settings.password.clone();
    let worker_token = cancel.clone();
    tokio::task::spawn_blocking(move || {
        let result = render::rasterise_blocking(
            resolved.path(),
            scale,
            password.as_deref(),
            Some(&worker_token),
            tx,
        );
        // `resolved` pins a downloaded tempfile until rendering ends.
        drop(resolved);
        result
    });

    let stream = ReceiverStream::new(rx).filter_map(|event| match event {
        RenderEvent::Page(surface) => Some(Ok(surface)),
        RenderEvent::PageFailed(e) => Some(Err(e)),
        RenderEvent::Total(_) => None,
    });

    Ok(Box::pin(stream))
}

/// Read a PDF's document metadata without rendering any page.
pub async fn inspect(
    input_str: impl AsRef<str>,
    password: Option<&str>,
) -> Result<DocumentMetadata, PagebindError> {
    let resolved = input::resolve_pdf(input_str.as_ref(), 120, None).await?;
    render::extract_metadata(resolved.path(), password).await
}
