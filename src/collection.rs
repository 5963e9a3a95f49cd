//! The ordered image collection behind the assembly pipeline.
//!
//! [`ImageCollection`] owns every [`SourceImage`] exclusively: images enter
//! through [`ImageCollection::add_images`], are mutated only by the rotate /
//! reorder / sort operations, and leave through remove or clear. Collection
//! order is meaningful — it is the page order of the assembled PDF.
//!
//! Every mutating operation notifies the optional [`CollectionObserver`] with
//! a full snapshot of the gallery. There is no partial-diff protocol; for the
//! collection sizes this tool handles, re-rendering the whole gallery is the
//! simpler contract.

use crate::error::PagebindError;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Quarter-turn rotation applied to an image before layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Advance by a quarter turn clockwise, wrapping at a full turn.
    pub fn advanced(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Rotation angle in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when the rotation swaps an image's width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Unique identity of a collection entry, stable across reordering.
///
/// Encodes the upload timestamp (milliseconds) in the high bits and a
/// process-wide counter in the low 16 bits, so images added within the same
/// millisecond still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(u64);

static ID_SALT: AtomicU64 = AtomicU64::new(0);

impl ImageId {
    fn next() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let salt = ID_SALT.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
        ImageId((millis << 16) | salt)
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One image in the collection.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub id: ImageId,
    pub path: PathBuf,
    pub file_name: String,
    /// Decoded pixel width before rotation.
    pub width: u32,
    /// Decoded pixel height before rotation.
    pub height: u32,
    pub rotation: Rotation,
    /// Detected source format; JPEG sources pass through assembly unchanged
    /// when no rotation is applied.
    pub format: ImageFormat,
    pub added_at: SystemTime,
}

impl SourceImage {
    /// Pixel dimensions after the current rotation is applied.
    pub fn effective_dimensions(&self) -> (u32, u32) {
        if self.rotation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// One row of the gallery view handed to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
}

/// Receives a full gallery snapshot after every mutating operation.
pub trait CollectionObserver: Send + Sync {
    fn gallery_changed(&self, gallery: &[GalleryEntry]) {
        let _ = gallery;
    }
}

/// Sort key for [`ImageCollection::sort`]. Both sorts are stable, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// File name, case-insensitive with code-point tiebreak.
    Name,
    /// Upload time.
    Time,
}

/// Ordered collection of images destined for one PDF.
#[derive(Default)]
pub struct ImageCollection {
    images: Vec<SourceImage>,
    observer: Option<Arc<dyn CollectionObserver>>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer that is notified after every mutation.
    pub fn with_observer(observer: Arc<dyn CollectionObserver>) -> Self {
        Self {
            images: Vec::new(),
            observer: Some(observer),
        }
    }

    /// Add image files to the end of the collection, in the given order.
    ///
    /// Inputs that cannot be identified or probed as raster images are
    /// skipped with a warning; the count of images actually added is
    /// returned. Each added image starts with rotation 0 and a fresh id.
    pub fn add_images<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut added = 0;
        for path in paths {
            let path = path.as_ref();
            match probe_image(path) {
                Ok((format, width, height)) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    debug!(
                        "Added image {} ({}x{}, {:?})",
                        file_name, width, height, format
                    );
                    self.images.push(SourceImage {
                        id: ImageId::next(),
                        path: path.to_path_buf(),
                        file_name,
                        width,
                        height,
                        rotation: Rotation::Deg0,
                        format,
                        added_at: SystemTime::now(),
                    });
                    added += 1;
                }
                Err(e) => {
                    warn!("Skipping '{}': {}", path.display(), e);
                }
            }
        }
        if added > 0 {
            self.notify();
        }
        added
    }

    /// Remove the image at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Result<SourceImage, PagebindError> {
        if index >= self.images.len() {
            return Err(PagebindError::IndexOutOfRange {
                index,
                len: self.images.len(),
            });
        }
        let removed = self.images.remove(index);
        self.notify();
        Ok(removed)
    }

    /// Remove every image.
    pub fn clear(&mut self) {
        self.images.clear();
        self.notify();
    }

    /// Advance the rotation of the image at `index` by 90°.
    pub fn rotate(&mut self, index: usize) -> Result<(), PagebindError> {
        let len = self.images.len();
        let image = self
            .images
            .get_mut(index)
            .ok_or(PagebindError::IndexOutOfRange { index, len })?;
        image.rotation = image.rotation.advanced();
        self.notify();
        Ok(())
    }

    /// Move the image at `from` so it ends up at `to`, preserving the
    /// relative order of all other images.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), PagebindError> {
        let len = self.images.len();
        if from >= len {
            return Err(PagebindError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(PagebindError::IndexOutOfRange { index: to, len });
        }
        if from != to {
            let image = self.images.remove(from);
            self.images.insert(to, image);
        }
        self.notify();
        Ok(())
    }

    /// Stable ascending sort by the given key.
    pub fn sort(&mut self, key: SortKey) {
        match key {
            SortKey::Name => self.images.sort_by(|a, b| {
                a.file_name
                    .to_lowercase()
                    .cmp(&b.file_name.to_lowercase())
                    .then_with(|| a.file_name.cmp(&b.file_name))
            }),
            SortKey::Time => self.images.sort_by_key(|img| img.added_at),
        }
        self.notify();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SourceImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceImage> {
        self.images.iter()
    }

    /// Current gallery view, in collection order.
    pub fn gallery(&self) -> Vec<GalleryEntry> {
        self.images
            .iter()
            .map(|img| GalleryEntry {
                id: img.id,
                file_name: img.file_name.clone(),
                width: img.width,
                height: img.height,
                rotation: img.rotation,
            })
            .collect()
    }

    /// Clone the collection contents for an assembly run. Mutations made
    /// after the snapshot do not affect an in-flight assembly.
    pub fn snapshot(&self) -> Vec<SourceImage> {
        self.images.clone()
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer.gallery_changed(&self.gallery());
        }
    }
}

/// Identify the format and pixel dimensions of an image file without
/// decoding its pixel data.
fn probe_image(path: &Path) -> Result<(ImageFormat, u32, u32), PagebindError> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PagebindError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => PagebindError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => PagebindError::ImageDecodeFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?
        .with_guessed_format()
        .map_err(|e| PagebindError::ImageDecodeFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let format = reader.format().ok_or_else(|| PagebindError::NotAnImage {
        path: path.to_path_buf(),
    })?;

    let (width, height) =
        reader
            .into_dimensions()
            .map_err(|e| PagebindError::ImageDecodeFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

    Ok((format, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_pixel(w, h, image::Rgb([128, 64, 32]))
            .save(&path)
            .expect("write test image");
        path
    }

    fn collection_with(dir: &TempDir, names: &[&str]) -> ImageCollection {
        let mut collection = ImageCollection::new();
        let paths: Vec<_> = names.iter().map(|n| write_png(dir, n, 8, 6)).collect();
        assert_eq!(collection.add_images(&paths), names.len());
        collection
    }

    #[test]
    fn add_filters_non_images() {
        let dir = TempDir::new().unwrap();
        let img = write_png(&dir, "a.png", 4, 4);
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "not an image").unwrap();

        let mut collection = ImageCollection::new();
        let added = collection.add_images([img, txt]);
        assert_eq!(added, 1);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn length_tracks_adds_and_removes() {
        let dir = TempDir::new().unwrap();
        let mut collection = collection_with(&dir, &["a.png", "b.png", "c.png"]);
        collection.remove(1).unwrap();
        assert_eq!(collection.len(), 2);
        collection.clear();
        assert!(collection.is_empty());
    }

    #[test]
    fn identity_preserved_across_reorder() {
        let dir = TempDir::new().unwrap();
        let mut collection = collection_with(&dir, &["a.png", "b.png", "c.png", "d.png"]);
        let ids_before: Vec<_> = collection.iter().map(|i| i.id).collect();

        collection.reorder(0, 3).unwrap();
        collection.reorder(2, 0).unwrap();

        let mut ids_after: Vec<_> = collection.iter().map(|i| i.id).collect();
        ids_after.sort_by_key(|id| format!("{id}"));
        let mut ids_sorted = ids_before.clone();
        ids_sorted.sort_by_key(|id| format!("{id}"));
        assert_eq!(ids_after, ids_sorted);
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn reorder_moves_and_preserves_relative_order() {
        let dir = TempDir::new().unwrap();
        let mut collection = collection_with(&dir, &["a.png", "b.png", "c.png", "d.png"]);
        collection.reorder(0, 2).unwrap();
        let names: Vec<_> = collection.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, ["b.png", "c.png", "a.png", "d.png"]);
    }

    #[test]
    fn rotation_is_cyclic_of_order_four() {
        let dir = TempDir::new().unwrap();
        let mut collection = collection_with(&dir, &["a.png"]);
        let original = collection.get(0).unwrap().rotation;
        for _ in 0..4 {
            collection.rotate(0).unwrap();
        }
        assert_eq!(collection.get(0).unwrap().rotation, original);
    }

    #[test]
    fn rotation_swaps_effective_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "wide.png", 10, 4);
        let mut collection = ImageCollection::new();
        collection.add_images([path]);

        assert_eq!(collection.get(0).unwrap().effective_dimensions(), (10, 4));
        collection.rotate(0).unwrap();
        assert_eq!(collection.get(0).unwrap().effective_dimensions(), (4, 10));
        collection.rotate(0).unwrap();
        assert_eq!(collection.get(0).unwrap().effective_dimensions(), (10, 4));
    }

    #[test]
    fn name_sort_is_idempotent_across_interleaved_sorts() {
        let dir = TempDir::new().unwrap();
        let mut collection = collection_with(&dir, &["c.png", "a.png", "b.png"]);

        collection.sort(SortKey::Name);
        let by_name: Vec<_> = collection
            .iter()
            .map(|i| i.file_name.clone())
            .collect();
        assert_eq!(by_name, ["a.png", "b.png", "c.png"]);

        collection.sort(SortKey::Time);
        collection.sort(SortKey::Name);
        let again: Vec<_> = collection.iter().map(|i| i.file_name.clone()).collect();
        assert_eq!(again, by_name);
    }

    #[test]
    fn time_sort_restores_upload_order() {
        let dir = TempDir::new().unwrap();
        let mut collection = ImageCollection::new();
        for name in ["z.png", "m.png", "a.png"] {
            let path = write_png(&dir, name, 4, 4);
            collection.add_images([path]);
        }
        collection.sort(SortKey::Name);
        collection.sort(SortKey::Time);
        let names: Vec<_> = collection.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, ["z.png", "m.png", "a.png"]);
    }

    #[test]
    fn ids_are_unique_within_a_burst() {
        let dir = TempDir::new().unwrap();
        let collection = collection_with(&dir, &["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let ids: std::collections::HashSet<_> = collection.iter().map(|i| i.id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn observer_sees_every_mutation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counter(AtomicUsize);
        impl CollectionObserver for Counter {
            fn gallery_changed(&self, _gallery: &[GalleryEntry]) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dir = TempDir::new().unwrap();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let mut collection = ImageCollection::with_observer(counter.clone());

        let a = write_png(&dir, "a.png", 4, 4);
        let b = write_png(&dir, "b.png", 4, 4);
        collection.add_images([a, b]); // 1 notification for the batch
        collection.rotate(0).unwrap(); // 2
        collection.reorder(0, 1).unwrap(); // 3
        collection.sort(SortKey::Name); // 4
        collection.remove(0).unwrap(); // 5
        collection.clear(); // 6

        assert_eq!(counter.0.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn out_of_range_operations_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut collection = collection_with(&dir, &["a.png"]);
        assert!(matches!(
            collection.remove(5),
            Err(PagebindError::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(collection.rotate(1).is_err());
        assert!(collection.reorder(0, 9).is_err());
    }
}
