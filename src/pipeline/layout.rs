//! Page-box selection and margin-fit placement math for the assembly
//! pipeline. Everything here operates in PDF points with a bottom-left
//! origin; callers pass rotation-adjusted pixel dimensions.

use crate::config::{AssemblySettings, Orientation, PX_TO_PT};

/// Where and how large an image is drawn on its page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resolve the page box for one image.
///
/// `Custom` sizes the page to the image itself ([`PX_TO_PT`] per pixel);
/// presets are oriented tall or wide by the orientation rule, with `Auto`
/// following the image's own aspect.
pub fn page_box(settings: &AssemblySettings, eff_width: u32, eff_height: u32) -> (f32, f32) {
    match settings.page_size.dimensions() {
        None => (eff_width as f32 * PX_TO_PT, eff_height as f32 * PX_TO_PT),
        Some((w, h)) => {
            let tall = match settings.orientation {
                Orientation::Portrait => true,
                Orientation::Landscape => false,
                Orientation::Auto => eff_height > eff_width,
            };
            if tall {
                (w, h)
            } else {
                (h, w)
            }
        }
    }
}

/// Fit an image into a page, inside the margin.
///
/// The constrained axis gets the margin subtracted on both sides; the other
/// axis only centres the image. Relatively-wider images are constrained by
/// width, everything else by height (equal ratios fall to the height branch).
pub fn fit_within(
    img_width: f32,
    img_height: f32,
    page_width: f32,
    page_height: f32,
    margin: f32,
) -> Placement {
    let img_ratio = img_width / img_height;
    let page_ratio = page_width / page_height;

    if img_ratio > page_ratio {
        let width = page_width - margin * 2.0;
        let height = width / img_ratio;
        Placement {
            x: margin,
            y: (page_height - height) / 2.0,
            width,
            height,
        }
    } else {
        let height = page_height - margin * 2.0;
        let width = height * img_ratio;
        Placement {
            x: (page_width - width) / 2.0,
            y: margin,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSizePreset;

    fn settings(size: PageSizePreset, orientation: Orientation, margin: f32) -> AssemblySettings {
        AssemblySettings::builder()
            .page_size(size)
            .orientation(orientation)
            .margin_pt(margin)
            .build()
            .unwrap()
    }

    const EPS: f32 = 1e-2;

    #[test]
    fn auto_a4_landscape_image_gets_wide_page() {
        let s = settings(PageSizePreset::A4, Orientation::Auto, 0.0);
        let (w, h) = page_box(&s, 800, 600);
        assert!((w - 841.89).abs() < EPS, "got {w}");
        assert!((h - 595.28).abs() < EPS, "got {h}");
    }

    #[test]
    fn auto_a4_portrait_image_gets_tall_page() {
        let s = settings(PageSizePreset::A4, Orientation::Auto, 0.0);
        let (w, h) = page_box(&s, 600, 800);
        assert!((w - 595.28).abs() < EPS);
        assert!((h - 841.89).abs() < EPS);
    }

    #[test]
    fn auto_square_image_gets_wide_page() {
        let s = settings(PageSizePreset::A4, Orientation::Auto, 0.0);
        let (w, h) = page_box(&s, 500, 500);
        assert!(w > h);
    }

    #[test]
    fn forced_orientation_ignores_image_aspect() {
        let portrait = settings(PageSizePreset::Letter, Orientation::Portrait, 0.0);
        let (w, h) = page_box(&portrait, 800, 600);
        assert!((w - 612.0).abs() < EPS);
        assert!((h - 792.0).abs() < EPS);

        let landscape = settings(PageSizePreset::Letter, Orientation::Landscape, 0.0);
        let (w, h) = page_box(&landscape, 600, 800);
        assert!((w - 792.0).abs() < EPS);
        assert!((h - 612.0).abs() < EPS);
    }

    #[test]
    fn custom_size_follows_image_pixels() {
        let s = settings(PageSizePreset::Custom, Orientation::Auto, 0.0);
        let (w, h) = page_box(&s, 1000, 400);
        assert!((w - 750.0).abs() < EPS);
        assert!((h - 300.0).abs() < EPS);
    }

    #[test]
    fn wide_image_is_width_constrained_and_vertically_centred() {
        // Image wider than the page: width = page - 2 * margin, centred
        // vertically with equal gaps.
        let page_w = 595.28;
        let page_h = 841.89;
        let p = fit_within(2000.0, 500.0, page_w, page_h, 50.0);

        assert!((p.width - (page_w - 100.0)).abs() < EPS);
        assert!((p.x - 50.0).abs() < EPS);
        let top_gap = page_h - (p.y + p.height);
        let bottom_gap = p.y;
        assert!((top_gap - bottom_gap).abs() < EPS, "gaps {top_gap} vs {bottom_gap}");
        // Aspect ratio preserved.
        assert!((p.width / p.height - 4.0).abs() < EPS);
    }

    #[test]
    fn tall_image_is_height_constrained_and_horizontally_centred() {
        let page_w = 595.28;
        let page_h = 841.89;
        let p = fit_within(500.0, 2000.0, page_w, page_h, 30.0);

        assert!((p.height - (page_h - 60.0)).abs() < EPS);
        assert!((p.y - 30.0).abs() < EPS);
        let left_gap = p.x;
        let right_gap = page_w - (p.x + p.width);
        assert!((left_gap - right_gap).abs() < EPS);
    }

    #[test]
    fn equal_ratios_fall_to_height_branch() {
        let p = fit_within(100.0, 100.0, 200.0, 200.0, 10.0);
        assert!((p.height - 180.0).abs() < EPS);
        assert!((p.width - 180.0).abs() < EPS);
        assert!((p.y - 10.0).abs() < EPS);
    }

    #[test]
    fn zero_margin_fills_constrained_axis() {
        let p = fit_within(800.0, 600.0, 841.89, 595.28, 0.0);
        // Image ratio 1.333 < page ratio 1.414: height-constrained.
        assert!((p.height - 595.28).abs() < EPS);
        assert!((p.y - 0.0).abs() < EPS);
    }
}
