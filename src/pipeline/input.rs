//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! pdfium requires a file-system path — it cannot stream from a byte buffer —
//! so URL inputs are downloaded to a `TempDir` whose lifetime is tied to the
//! returned [`ResolvedInput`]. Both paths validate the `%PDF` magic bytes
//! before returning, and both report byte-loading progress to the observer
//! (the first of the two progress phases a caller sees).

use crate::error::PagebindError;
use crate::progress::ProgressHandle;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing
    /// (including any later export re-derive) completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// File stem of the source, used as the default export base name.
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
///
/// URL inputs are downloaded; local inputs are read once to validate the
/// magic bytes and drive the byte-loading progress phase.
pub async fn resolve_pdf(
    input: &str,
    timeout_secs: u64,
    progress: Option<&ProgressHandle>,
) -> Result<ResolvedInput, PagebindError> {
    if input.is_empty() {
        return Err(PagebindError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs, progress).await
    } else {
        resolve_local(input, progress).await
    }
}

/// Resolve a local file, streaming it once for progress and magic validation.
async fn resolve_local(
    path_str: &str,
    progress: Option<&ProgressHandle>,
) -> Result<ResolvedInput, PagebindError> {
    let path = PathBuf::from(path_str);

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PagebindError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PagebindError::FileNotFound { path });
        }
    };

    let total = file
        .metadata()
        .await
        .map(|m| m.len())
        .map_err(|e| PagebindError::Internal(format!("stat '{}': {e}", path.display())))?;

    let mut magic = [0u8; 4];
    let mut loaded: u64 = 0;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| PagebindError::Internal(format!("read '{}': {e}", path.display())))?;
        if n == 0 {
            break;
        }
        if loaded < 4 {
            let take = (4 - loaded as usize).min(n);
            magic[loaded as usize..loaded as usize + take].copy_from_slice(&buf[..take]);
        }
        loaded += n as u64;
        if let Some(p) = progress {
            p.on_load_progress(loaded, Some(total));
        }
    }

    if loaded < 4 || &magic != PDF_MAGIC {
        return Err(PagebindError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {} ({} bytes)", path.display(), loaded);
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(
    url: &str,
    timeout_secs: u64,
    progress: Option<&ProgressHandle>,
) -> Result<ResolvedInput, PagebindError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PagebindError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PagebindError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PagebindError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PagebindError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let total = response.content_length();
    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| PagebindError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    let mut out = tokio::fs::File::create(&file_path)
        .await
        .map_err(|e| PagebindError::OutputWriteFailed {
            path: file_path.clone(),
            source: e,
        })?;

    let mut magic = [0u8; 4];
    let mut loaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                PagebindError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                PagebindError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        if loaded < 4 {
            let take = (4 - loaded as usize).min(chunk.len());
            magic[loaded as usize..loaded as usize + take].copy_from_slice(&chunk[..take]);
        }
        out.write_all(&chunk)
            .await
            .map_err(|e| PagebindError::OutputWriteFailed {
                path: file_path.clone(),
                source: e,
            })?;
        loaded += chunk.len() as u64;
        if let Some(p) = progress {
            p.on_load_progress(loaded, total);
        }
    }
    out.flush()
        .await
        .map_err(|e| PagebindError::OutputWriteFailed {
            path: file_path.clone(),
            source: e,
        })?;

    if loaded < 4 || &magic != PDF_MAGIC {
        return Err(PagebindError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    info!("Downloaded to: {} ({} bytes)", file_path.display(), loaded);

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Some(path) = url.splitn(4, '/').nth(3) {
        let path = path.split(['?', '#']).next().unwrap_or("");
        if let Some(last) = path.rsplit('/').next() {
            if !last.is_empty() && last.contains('.') {
                return last.to_string();
            }
        }
    }
    "downloaded.pdf".to_string()
}
