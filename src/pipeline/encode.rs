//! Image encoding: normalise collection images for PDF embedding and encode
//! rendered page surfaces for export.
//!
//! The embedded form is always baseline JPEG. Source JPEGs with no rotation
//! pass through byte-for-byte; everything else — rotated JPEGs, PNGs, and any
//! other decodable raster — is decoded, rotated about its centre into the
//! rotated bounding box, and re-encoded at quality 90. PNG transparency is
//! flattened away by the RGB conversion; that loss is part of the contract.

use crate::collection::{Rotation, SourceImage};
use crate::config::{OutputFormat, JPEG_QUALITY};
use crate::error::PagebindError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// A collection image made ready for embedding: baseline JPEG bytes plus the
/// pixel dimensions of the (rotation-applied) raster they encode.
pub struct PreparedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Normalise one collection image to embeddable JPEG form.
pub fn prepare_for_embedding(source: &SourceImage) -> Result<PreparedImage, PagebindError> {
    // Fast path: an unrotated JPEG embeds without a decode round-trip.
    if source.format == ImageFormat::Jpeg && source.rotation == Rotation::Deg0 {
        let jpeg =
            std::fs::read(&source.path).map_err(|e| PagebindError::ImageDecodeFailed {
                path: source.path.clone(),
                detail: e.to_string(),
            })?;
        debug!(
            "Pass-through JPEG '{}' ({} bytes)",
            source.file_name,
            jpeg.len()
        );
        return Ok(PreparedImage {
            jpeg,
            width: source.width,
            height: source.height,
        });
    }

    let decoded = image::open(&source.path).map_err(|e| PagebindError::ImageDecodeFailed {
        path: source.path.clone(),
        detail: e.to_string(),
    })?;

    let rotated = match source.rotation {
        Rotation::Deg0 => decoded,
        Rotation::Deg90 => decoded.rotate90(),
        Rotation::Deg180 => decoded.rotate180(),
        Rotation::Deg270 => decoded.rotate270(),
    };

    let (width, height) = rotated.dimensions();
    let jpeg = encode_jpeg(&rotated)?;
    debug!(
        "Normalised '{}' → {}x{} JPEG ({} bytes)",
        source.file_name,
        width,
        height,
        jpeg.len()
    );

    Ok(PreparedImage {
        jpeg,
        width,
        height,
    })
}

/// Encode a raster as baseline JPEG at the shared quality setting.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, PagebindError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| PagebindError::EncodeFailed {
            detail: e.to_string(),
        })?;
    Ok(buf)
}

/// Encode a rendered page surface in the export output format.
pub fn encode_surface(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, PagebindError> {
    match format {
        OutputFormat::Png => {
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| PagebindError::EncodeFailed {
                    detail: e.to_string(),
                })?;
            Ok(buf)
        }
        OutputFormat::Jpeg => encode_jpeg(img),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ImageCollection;
    use image::RgbaImage;
    use tempfile::TempDir;

    fn add_one(collection: &mut ImageCollection, path: &std::path::Path) -> SourceImage {
        assert_eq!(collection.add_images([path]), 1);
        collection.get(collection.len() - 1).unwrap().clone()
    }

    #[test]
    fn unrotated_jpeg_passes_through_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        image::RgbImage::from_pixel(12, 8, image::Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();
        let raw = std::fs::read(&path).unwrap();

        let mut collection = ImageCollection::new();
        let source = add_one(&mut collection, &path);
        let prepared = prepare_for_embedding(&source).unwrap();

        assert_eq!(prepared.jpeg, raw);
        assert_eq!((prepared.width, prepared.height), (12, 8));
    }

    #[test]
    fn png_is_reencoded_to_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shot.png");
        RgbaImage::from_pixel(10, 10, image::Rgba([0, 255, 0, 128]))
            .save(&path)
            .unwrap();

        let mut collection = ImageCollection::new();
        let source = add_one(&mut collection, &path);
        let prepared = prepare_for_embedding(&source).unwrap();

        // JPEG SOI marker; transparency flattened away by the RGB conversion.
        assert_eq!(&prepared.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!((prepared.width, prepared.height), (10, 10));
    }

    #[test]
    fn rotation_swaps_prepared_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.jpg");
        image::RgbImage::from_pixel(20, 10, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let mut collection = ImageCollection::new();
        collection.add_images([&path]);
        collection.rotate(0).unwrap();
        let source = collection.get(0).unwrap().clone();

        let prepared = prepare_for_embedding(&source).unwrap();
        assert_eq!((prepared.width, prepared.height), (10, 20));
        // Rotated JPEGs lose the pass-through fast path.
        assert_eq!(&prepared.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn half_turn_keeps_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.png");
        image::RgbImage::from_pixel(20, 10, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        let mut collection = ImageCollection::new();
        collection.add_images([&path]);
        collection.rotate(0).unwrap();
        collection.rotate(0).unwrap();
        let source = collection.get(0).unwrap().clone();

        let prepared = prepare_for_embedding(&source).unwrap();
        assert_eq!((prepared.width, prepared.height), (20, 10));
    }

    #[test]
    fn surface_encoding_round_trips_dimensions() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            6,
            4,
            image::Rgb([9, 9, 9]),
        ));

        let png = encode_surface(&img, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (6, 4));

        let jpeg = encode_surface(&img, OutputFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
