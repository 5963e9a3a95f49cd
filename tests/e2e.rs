//! End-to-end tests covering the preview and export pipelines.
//!
//! These need a pdfium shared library on the host, so they are gated behind
//! the `PAGEBIND_E2E` environment variable and skip silently otherwise.
//!
//! Run with:
//!   PAGEBIND_E2E=1 cargo test --test e2e -- --nocapture
//!
//! The test PDFs are assembled on the fly from synthesised images, so no
//! fixture files are needed.

use pagebind::{
    export, inspect, merge, preview, AssemblySettings, CancelToken, ExportSettings,
    ExportSource, ImageCollection, Orientation, OutputFormat, PageSizePreset, PreviewSettings,
    PreviewState, ProgressHandle, ProgressObserver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless PAGEBIND_E2E is set.
macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("PAGEBIND_E2E").is_err() {
            println!("SKIP — set PAGEBIND_E2E=1 to run e2e tests");
            return;
        }
    };
}

/// Assemble an `n`-page PDF from synthesised images and write it to `dir`.
async fn make_pdf(dir: &TempDir, n: usize) -> PathBuf {
    let img_dir = TempDir::new().unwrap();
    let mut collection = ImageCollection::new();
    for i in 0..n {
        let path = img_dir.path().join(format!("page-{i}.png"));
        image::RgbImage::from_pixel(400, 300, image::Rgb([(i * 40) as u8, 80, 160]))
            .save(&path)
            .unwrap();
        collection.add_images([path]);
    }

    let settings = AssemblySettings::builder()
        .page_size(PageSizePreset::A4)
        .orientation(Orientation::Portrait)
        .build()
        .unwrap();
    let output = merge(&collection, &settings, None).await.unwrap();

    let path = dir.path().join(format!("fixture-{n}p.pdf"));
    std::fs::write(&path, &output.pdf).unwrap();
    path
}

/// Observer that cancels a token after a given unit completes.
struct CancelAfter {
    token: CancelToken,
    after: usize,
}

impl ProgressObserver for CancelAfter {
    fn on_unit_complete(&self, unit: usize, _total: usize) {
        if unit >= self.after {
            self.token.cancel();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inspect_reads_page_count() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 5).await;

    let meta = inspect(pdf.to_str().unwrap(), None).await.unwrap();
    assert_eq!(meta.page_count, 5);
}

#[tokio::test]
async fn preview_completes_and_retains_all_pages() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 3).await;

    let settings = PreviewSettings::default();
    let session = preview(pdf.to_str().unwrap(), &settings, CancelToken::new(), None)
        .await
        .unwrap();

    assert_eq!(session.state, PreviewState::Completed);
    assert_eq!(session.rendered_pages(), 3);
    assert_eq!(session.total_pages, 3);
    // Pages arrive strictly in order, 1-based.
    let nums: Vec<_> = session.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(nums, vec![1, 2, 3]);
}

#[tokio::test]
async fn cancelling_after_two_pages_leaves_exactly_two() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 5).await;

    let token = CancelToken::new();
    let observer: ProgressHandle = Arc::new(CancelAfter {
        token: token.clone(),
        after: 2,
    });

    let settings = PreviewSettings::default();
    let session = preview(pdf.to_str().unwrap(), &settings, token, Some(observer))
        .await
        .unwrap();

    assert_eq!(session.state, PreviewState::Paused { rendered: 2 });
    assert_eq!(session.rendered_pages(), 2);

    // A paused session must never be exported as-is: the export re-derives
    // every page from source rather than omitting pages 3–5.
    let out_dir = TempDir::new().unwrap();
    let export_settings = ExportSettings::builder().dpi(96).build().unwrap();
    let outcome = export(
        ExportSource::Session(&session),
        &export_settings,
        out_dir.path(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.page_count, 5);
    let archive = outcome.archive.expect("5 pages should bundle into a ZIP");
    let file = std::fs::File::open(archive).unwrap();
    let zip = zip::ZipArchive::new(file).unwrap();
    assert_eq!(zip.len(), 5);
}

#[tokio::test]
async fn export_three_pages_bundles_into_one_archive() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 3).await;

    let out_dir = TempDir::new().unwrap();
    let settings = ExportSettings::builder().dpi(96).build().unwrap();
    let outcome = export(
        ExportSource::Input(pdf.to_str().unwrap()),
        &settings,
        out_dir.path(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.page_count, 3);
    assert!(outcome.files.is_empty(), "no loose files alongside a ZIP");
    let archive = outcome.archive.unwrap();
    assert_eq!(
        archive.file_name().unwrap().to_string_lossy(),
        "fixture-3p.zip"
    );

    let file = std::fs::File::open(&archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    assert_eq!(zip.len(), 3);
    for (i, expected) in ["fixture-3p-001.png", "fixture-3p-002.png", "fixture-3p-003.png"]
        .into_iter()
        .enumerate()
    {
        assert_eq!(zip.by_index(i).unwrap().name(), expected);
    }
}

#[tokio::test]
async fn export_two_pages_downloads_individually() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 2).await;

    let out_dir = TempDir::new().unwrap();
    let settings = ExportSettings::builder()
        .dpi(96)
        .format(OutputFormat::Jpeg)
        .build()
        .unwrap();
    let outcome = export(
        ExportSource::Input(pdf.to_str().unwrap()),
        &settings,
        out_dir.path(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.page_count, 2);
    assert!(outcome.archive.is_none(), "2 pages must not be archived");
    assert_eq!(outcome.files.len(), 2);
    for (file, expected) in outcome
        .files
        .iter()
        .zip(["fixture-2p-001.jpg", "fixture-2p-002.jpg"])
    {
        assert_eq!(file.file_name().unwrap().to_string_lossy(), expected);
        let bytes = std::fs::read(file).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG magic");
    }
}

#[tokio::test]
async fn export_dpi_scales_pixel_dimensions() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 1).await;

    let out_dir = TempDir::new().unwrap();
    let settings = ExportSettings::builder().dpi(144).build().unwrap();
    let outcome = export(
        ExportSource::Input(pdf.to_str().unwrap()),
        &settings,
        out_dir.path(),
        None,
    )
    .await
    .unwrap();

    // A4 portrait at 144 DPI: 595.28 pt × 144/72 ≈ 1191 px wide.
    let decoded = image::open(&outcome.files[0]).unwrap();
    let width = decoded.width() as f32;
    assert!(
        (width - 595.28 * 2.0).abs() < 4.0,
        "expected ≈1190 px, got {width}"
    );
}

#[tokio::test]
async fn completed_preview_at_export_scale_is_reused() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 2).await;

    // Preview at exactly the export scale (96 / 72).
    let settings = PreviewSettings::builder()
        .scale(96.0 / 72.0)
        .build()
        .unwrap();
    let session = preview(pdf.to_str().unwrap(), &settings, CancelToken::new(), None)
        .await
        .unwrap();
    assert!(session.is_complete());

    let out_dir = TempDir::new().unwrap();
    let export_settings = ExportSettings::builder().dpi(96).build().unwrap();
    let outcome = export(
        ExportSource::Session(&session),
        &export_settings,
        out_dir.path(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.page_count, 2);
    assert_eq!(outcome.files.len(), 2);
}

#[tokio::test]
async fn streaming_preview_yields_pages_in_order() {
    e2e_skip_unless_enabled!();
    use tokio_stream::StreamExt;

    let dir = TempDir::new().unwrap();
    let pdf = make_pdf(&dir, 3).await;

    let settings = PreviewSettings::default();
    let mut stream = pagebind::preview_pages(pdf.to_str().unwrap(), &settings, CancelToken::new())
        .await
        .unwrap();

    let mut nums = Vec::new();
    while let Some(page) = stream.next().await {
        nums.push(page.unwrap().page_num);
    }
    assert_eq!(nums, vec![1, 2, 3]);
}

#[tokio::test]
async fn corrupt_pdf_fails_before_any_page() {
    e2e_skip_unless_enabled!();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"%PDF-1.4\ngarbage garbage garbage").unwrap();

    let settings = PreviewSettings::default();
    let result = preview(path.to_str().unwrap(), &settings, CancelToken::new(), None).await;
    assert!(result.is_err());
}
