//! Deterministic preprocessing variants
//!
//! One input image becomes a fixed ordered set of grayscale/binary
//! variants; feeding every variant to the engines independently is what
//! buys robustness across skins, fonts, sizes and backgrounds. Variant
//! names are stable and show up in tracing output and vote metadata.

use image::imageops::FilterType;
use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, equalize_histogram, otsu_level, threshold, ThresholdType};
use tracing::trace;

use crate::config::OcrConfig;

/// Produce the fixed variant set for one image. Empty input yields an empty
/// set. With the default three fixed thresholds this is 8 variants:
/// gray, otsu, adaptive, equalized-otsu, otsu-inverted, thresh-130/150/170.
pub fn preprocess_variants(img: &GrayImage, config: &OcrConfig) -> Vec<(String, GrayImage)> {
    if img.width() == 0 || img.height() == 0 {
        return Vec::new();
    }

    let base = upscale_if_small(img, config);
    let mut variants = Vec::with_capacity(5 + config.fixed_thresholds.len());

    variants.push(("gray".to_string(), base.clone()));

    let otsu = otsu_level(&base);
    variants.push(("otsu".to_string(), threshold(&base, otsu, ThresholdType::Binary)));

    let block_radius = (base.width().min(base.height()) / 8).max(3);
    variants.push(("adaptive".to_string(), adaptive_threshold(&base, block_radius)));

    let equalized = equalize_histogram(&base);
    let equalized_otsu = otsu_level(&equalized);
    variants.push((
        "equalized-otsu".to_string(),
        threshold(&equalized, equalized_otsu, ThresholdType::Binary),
    ));

    variants.push((
        "otsu-inverted".to_string(),
        threshold(&base, otsu, ThresholdType::BinaryInverted),
    ));

    for &level in &config.fixed_thresholds {
        variants.push((
            format!("thresh-{}", level),
            threshold(&base, level, ThresholdType::Binary),
        ));
    }

    trace!(
        "Prepared {} preprocessing variants at {}x{}",
        variants.len(),
        base.width(),
        base.height()
    );
    variants
}

/// Upscale by an integer factor so the largest dimension reaches the
/// configured target whenever it starts below the trigger. Small crops need
/// this before any engine sees them.
fn upscale_if_small(img: &GrayImage, config: &OcrConfig) -> GrayImage {
    let largest = img.width().max(img.height());
    if largest >= config.upscale_trigger {
        return img.clone();
    }
    let factor = config.upscale_target.div_ceil(largest).max(2);
    image::imageops::resize(
        img,
        img.width() * factor,
        img.height() * factor,
        FilterType::CatmullRom,
    )
}
