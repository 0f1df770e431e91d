//! Numeric field recognition
//!
//! A batch-friendly façade over the OCR voting layer, specialized for
//! currency/magnitude-suffixed readouts (pot sizes, stack amounts).

use std::collections::HashMap;
use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::ocr::RobustOcr;

/// Recognizes numeric readouts through [`RobustOcr`]'s preprocessing and
/// voting machinery.
pub struct NumericRecognizer {
    ocr: Arc<RobustOcr>,
}

impl NumericRecognizer {
    pub fn new(ocr: Arc<RobustOcr>) -> Self {
        Self { ocr }
    }

    /// Recognize one numeric field. `None` means unrecognized, which
    /// callers must treat as unknown rather than zero.
    pub fn recognize(&self, img: &DynamicImage) -> Option<(f64, f32)> {
        let gray = img.to_luma8();
        self.ocr.recognize_number(&gray)
    }

    /// Recognize a set of named fields. The returned map contains only the
    /// entries that resolved; a missing key signals "unrecognized".
    pub fn recognize_batch(
        &self,
        images: &HashMap<String, DynamicImage>,
    ) -> HashMap<String, (f64, f32)> {
        let results: HashMap<String, (f64, f32)> = images
            .iter()
            .filter_map(|(name, img)| self.recognize(img).map(|value| (name.clone(), value)))
            .collect();
        debug!("Recognized {} of {} numeric fields", results.len(), images.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::FixedEngine;

    fn readout() -> DynamicImage {
        DynamicImage::ImageLuma8(image::GrayImage::from_fn(60, 24, |x, y| {
            image::Luma([if (x + y) % 4 == 0 { 20 } else { 235 }])
        }))
    }

    #[test]
    fn recognizes_currency_amount() {
        let recognizer = NumericRecognizer::new(Arc::new(RobustOcr::new(Box::new(
            FixedEngine::new("$125"),
        ))));
        let (value, confidence) = recognizer.recognize(&readout()).unwrap();
        assert!((value - 125.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn unreadable_field_is_none_not_zero() {
        let recognizer = NumericRecognizer::new(Arc::new(RobustOcr::new(Box::new(
            FixedEngine::silent(),
        ))));
        assert!(recognizer.recognize(&readout()).is_none());
    }

    #[test]
    fn batch_omits_unrecognized_entries() {
        let recognizer = NumericRecognizer::new(Arc::new(RobustOcr::new(Box::new(
            FixedEngine::new("5.2k"),
        ))));
        let mut images = HashMap::new();
        images.insert("pot".to_string(), readout());
        // Zero-size input cannot resolve and must be absent from the output.
        images.insert("stack".to_string(), DynamicImage::new_luma8(0, 0));

        let results = recognizer.recognize_batch(&images);
        assert_eq!(results.len(), 1);
        let (value, _) = results["pot"];
        assert!((value - 5200.0).abs() < 1e-9);
        assert!(!results.contains_key("stack"));
    }
}
