//! PDF-to-image export: rasterise every page at the configured DPI and
//! deliver the results as loose files or a single ZIP archive.
//!
//! Delivery policy follows page count: one or two pages download as
//! individual files, anything more is bundled into one archive — never a
//! mix. All artefacts are staged in a temporary directory inside the
//! destination and renamed into place only when every page succeeded, so a
//! failed export leaves nothing behind.
//!
//! Export is not cancellable once started; it runs to completion or failure.

use crate::config::ExportSettings;
use crate::error::{PageError, PagebindError};
use crate::pipeline::render::{self, RasterOutcome, RenderEvent};
use crate::pipeline::{archive, encode, input};
use crate::progress::ProgressHandle;
use crate::session::{PageSurface, PreviewSession};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Page count at or below which pages are delivered as individual files
/// instead of one archive.
const LOOSE_FILE_LIMIT: usize = 2;

/// What to export from.
pub enum ExportSource<'a> {
    /// A finished preview session. Its rendered surfaces are reused when the
    /// session is complete and was rendered at the export scale; otherwise
    /// every page is re-derived from the session's source bytes.
    Session(&'a PreviewSession),
    /// A PDF path or URL, rasterised from scratch.
    Input(&'a str),
}

/// Result of a successful export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutcome {
    /// Individual output files (empty when an archive was produced).
    pub files: Vec<PathBuf>,
    /// The single archive (set only when page count exceeds the loose-file
    /// limit).
    pub archive: Option<PathBuf>,
    pub page_count: usize,
    pub duration_ms: u64,
}

/// Export every page of the source as an image into `out_dir`.
///
/// # Errors
/// Any page render or encode failure aborts the whole export; nothing is
/// written to `out_dir` in that case.
pub async fn export(
    source: ExportSource<'_>,
    settings: &ExportSettings,
    out_dir: impl AsRef<Path>,
    progress: Option<ProgressHandle>,
) -> Result<ExportOutcome, PagebindError> {
    let start = Instant::now();
    let out_dir = out_dir.as_ref();
    let scale = settings.scale();

    // ── Gather surfaces ──────────────────────────────────────────────────
    let (surfaces, source_stem) = match source {
        ExportSource::Session(session) if session.is_reusable_at(scale) => {
            debug!(
                "Reusing {} preview surfaces at scale {:.2}",
                session.pages.len(),
                scale
            );
            (session.pages.clone(), session_stem(session))
        }
        ExportSource::Session(session) => {
            debug!("Preview not reusable; re-deriving all pages from source");
            let password = settings
                .password
                .as_deref()
                .or(session.password.as_deref());
            let surfaces = render_all(session.source_path(), scale, password).await?;
            (surfaces, session_stem(session))
        }
        ExportSource::Input(input_str) => {
            let resolved = input::resolve_pdf(
                input_str,
                settings.download_timeout_secs,
                progress.as_ref(),
            )
            .await?;
            let stem = resolved.stem();
            let surfaces =
                render_all(resolved.path(), scale, settings.password.as_deref()).await?;
            (surfaces, stem)
        }
    };

    let page_count = surfaces.len();
    let base = settings.base_name.clone().unwrap_or(source_stem);
    let ext = settings.format.extension();
    info!(
        "Exporting {} pages as {} at {} DPI",
        page_count, ext, settings.dpi
    );

    // ── Encode pages in order ────────────────────────────────────────────
    if let Some(p) = &progress {
        p.on_job_start(page_count);
    }
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(page_count);
    for (i, surface) in surfaces.iter().enumerate() {
        let bytes = match encode::encode_surface(&surface.image, settings.format) {
            Ok(b) => b,
            Err(e) => {
                if let Some(p) = &progress {
                    p.on_unit_error(i + 1, page_count, &e.to_string());
                }
                return Err(e);
            }
        };
        entries.push((page_file_name(&base, surface.page_num, ext), bytes));
        if let Some(p) = &progress {
            p.on_unit_complete(i + 1, page_count);
        }
    }

    // ── Stage and persist ────────────────────────────────────────────────
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| PagebindError::OutputWriteFailed {
            path: out_dir.to_path_buf(),
            source: e,
        })?;
    let staging = tempfile::Builder::new()
        .prefix(".pagebind-export")
        .tempdir_in(out_dir)
        .map_err(|e| PagebindError::Internal(format!("staging dir: {e}")))?;

    let outcome = if page_count <= LOOSE_FILE_LIMIT {
        let mut files = Vec::with_capacity(entries.len());
        for (name, bytes) in &entries {
            let staged = staging.path().join(name);
            let dest = out_dir.join(name);
            tokio::fs::write(&staged, bytes).await.map_err(|e| {
                PagebindError::OutputWriteFailed {
                    path: staged.clone(),
                    source: e,
                }
            })?;
            files.push(dest);
        }
        // Every page encoded and staged; move them into place.
        for (file, (name, _)) in files.iter().zip(&entries) {
            tokio::fs::rename(staging.path().join(name), file)
                .await
                .map_err(|e| PagebindError::OutputWriteFailed {
                    path: file.clone(),
                    source: e,
                })?;
        }
        ExportOutcome {
            files,
            archive: None,
            page_count,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    } else {
        let archive_name = format!("{base}.zip");
        let staged = staging.path().join(&archive_name);
        let dest = out_dir.join(&archive_name);

        let staged_clone = staged.clone();
        let bundle_entries = entries;
        tokio::task::spawn_blocking(move || archive::bundle(&bundle_entries, &staged_clone))
            .await
            .map_err(|e| PagebindError::Internal(format!("Archive task panicked: {}", e)))??;

        tokio::fs::rename(&staged, &dest)
            .await
            .map_err(|e| PagebindError::OutputWriteFailed {
                path: dest.clone(),
                source: e,
            })?;
        ExportOutcome {
            files: Vec::new(),
            archive: Some(dest),
            page_count,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    };

    if let Some(p) = &progress {
        p.on_job_complete(page_count, page_count);
    }
    info!(
        "Export finished: {} pages in {}ms",
        page_count, outcome.duration_ms
    );

    Ok(outcome)
}

/// Canonical output file name: `{base}-{page:03}.{ext}`.
fn page_file_name(base: &str, page_num: usize, ext: &str) -> String {
    format!("{base}-{page_num:03}.{ext}")
}

/// Default base name for a session export.
fn session_stem(session: &PreviewSession) -> String {
    session
        .source_path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Rasterise every page of `path` at `scale`, failing on the first broken
/// page. Unlike the preview loop this is not cancellable.
async fn render_all(
    path: &Path,
    scale: f32,
    password: Option<&str>,
) -> Result<Vec<PageSurface>, PagebindError> {
    let (tx, mut rx) = mpsc::channel(8);
    let path = path.to_path_buf();
    let password = password.map(|s| s.to_string());
    let handle = tokio::task::spawn_blocking(move || {
        render::rasterise_blocking(&path, scale, password.as_deref(), None, tx)
    });

    let mut pages = Vec::new();
    let mut failure: Option<PageError> = None;
    while let Some(event) = rx.recv().await {
        match event {
            RenderEvent::Total(total) => pages.reserve(total),
            RenderEvent::Page(surface) => pages.push(surface),
            RenderEvent::PageFailed(e) => failure = Some(e),
        }
    }

    let outcome = handle
        .await
        .map_err(|e| PagebindError::Internal(format!("Render task panicked: {}", e)))??;

    match outcome {
        RasterOutcome::Completed { .. } => Ok(pages),
        RasterOutcome::Failed { rendered } => Err(match failure {
            Some(PageError::RenderFailed { page, detail }) => {
                PagebindError::RasterisationFailed { page, detail }
            }
            Some(PageError::EncodeFailed { page, detail }) => PagebindError::EncodeFailed {
                detail: format!("page {page}: {detail}"),
            },
            None => PagebindError::RasterisationFailed {
                page: rendered + 1,
                detail: "unknown render failure".to_string(),
            },
        }),
        // No token is passed in, so this can only mean the receiver vanished.
        RasterOutcome::Cancelled { rendered } => Err(PagebindError::Internal(format!(
            "render channel closed after {rendered} pages"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(page_file_name("report", 1, "png"), "report-001.png");
        assert_eq!(page_file_name("report", 42, "jpg"), "report-042.jpg");
        assert_eq!(page_file_name("report", 123, "png"), "report-123.png");
    }
}
