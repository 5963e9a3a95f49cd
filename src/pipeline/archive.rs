//! ZIP bundling for multi-page exports.

use crate::error::PagebindError;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `entries` into a single ZIP archive at `dest`.
///
/// Entry order is preserved; names must already be unique.
pub fn bundle(entries: &[(String, Vec<u8>)], dest: &Path) -> Result<(), PagebindError> {
    let file = File::create(dest).map_err(|e| PagebindError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| PagebindError::ArchiveFailed {
                detail: format!("'{name}': {e}"),
            })?;
        zip.write_all(bytes)
            .map_err(|e| PagebindError::ArchiveFailed {
                detail: format!("'{name}': {e}"),
            })?;
    }

    zip.finish().map_err(|e| PagebindError::ArchiveFailed {
        detail: e.to_string(),
    })?;

    debug!("Bundled {} entries into {}", entries.len(), dest.display());
    Ok(())
}
