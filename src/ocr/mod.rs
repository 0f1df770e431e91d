//! Robust OCR voting layer
//!
//! Maximizes text-recognition robustness by running every preprocessing
//! variant through one or more engines and aggregating the outputs by
//! weighted vote. Per-variant and per-engine failures are caught here and
//! contribute nothing; the layer always returns a (possibly empty) result.

pub mod engine;
pub mod preprocess;

use std::collections::HashMap;

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::cards::{parse_number, parse_rank, Rank};
use crate::config::OcrConfig;
use crate::error::RecognitionError;
use crate::{crop_top, MatchResult, Method};

use engine::{TesseractEngine, TextEngine};
use preprocess::preprocess_variants;

/// Rank OCR alphabet (digits cover the two-glyph "10").
const RANK_WHITELIST: &str = "0123456789TJQKA";
/// Numeric OCR alphabet: digits, separators, currency, magnitude suffixes.
const NUMBER_WHITELIST: &str = "0123456789.,$kKmMbB";

/// Character-restricted primary-engine configs for rank recognition:
/// single character, single word, single line segmentation.
fn rank_engine_configs() -> [String; 3] {
    [
        format!("--psm 10 -c tessedit_char_whitelist={}", RANK_WHITELIST),
        format!("--psm 8 -c tessedit_char_whitelist={}", RANK_WHITELIST),
        format!("--psm 7 -c tessedit_char_whitelist={}", RANK_WHITELIST),
    ]
}

/// Engine configs for numeric recognition.
fn number_engine_configs() -> [String; 2] {
    [
        format!("--psm 7 -c tessedit_char_whitelist={}", NUMBER_WHITELIST),
        format!("--psm 8 -c tessedit_char_whitelist={}", NUMBER_WHITELIST),
    ]
}

/// Multi-variant, multi-engine OCR with weighted vote aggregation.
///
/// The primary engine is always present; the secondary is resolved once at
/// construction and a failed construction permanently disables it for the
/// life of the process.
pub struct RobustOcr {
    primary: Box<dyn TextEngine>,
    secondary: Option<Box<dyn TextEngine>>,
    config: OcrConfig,
}

impl RobustOcr {
    pub fn new(primary: Box<dyn TextEngine>) -> Self {
        Self::with_config(primary, OcrConfig::default())
    }

    pub fn with_config(primary: Box<dyn TextEngine>, config: OcrConfig) -> Self {
        Self {
            primary,
            secondary: None,
            config,
        }
    }

    /// Primary engine backed by the system tesseract executable.
    pub fn tesseract() -> Result<Self, RecognitionError> {
        Ok(Self::new(Box::new(TesseractEngine::new()?)))
    }

    /// Attach a secondary engine from its construction result. Construction
    /// failure logs once and leaves the pipeline primary-only; it is never
    /// retried per call.
    pub fn with_secondary(
        mut self,
        secondary: Result<Box<dyn TextEngine>, RecognitionError>,
    ) -> Self {
        match secondary {
            Ok(engine) => {
                info!("Secondary OCR engine attached: {}", engine.name());
                self.secondary = Some(engine);
            }
            Err(e) => {
                warn!("Secondary OCR engine unavailable, primary only: {}", e);
            }
        }
        self
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Vote on the rank printed in the top region of a card crop. Returns
    /// ranks sorted by vote share, empty when zero votes accumulated.
    pub fn recognize_rank(&self, card_img: &GrayImage) -> Vec<MatchResult> {
        if card_img.width() == 0 || card_img.height() == 0 {
            return Vec::new();
        }
        let region = crop_top(card_img, self.config.rank_region);
        let variants = preprocess_variants(&region, &self.config);
        let configs = rank_engine_configs();

        let mut votes: HashMap<Rank, f32> = HashMap::new();
        let mut secondary_votes: HashMap<Rank, f32> = HashMap::new();
        let mut total = 0.0f32;

        for (name, variant) in &variants {
            for config in &configs {
                match self.primary.recognize(variant, config) {
                    Ok(text) => {
                        if let Some(rank) = parse_rank(&text) {
                            *votes.entry(rank).or_default() += 1.0;
                            total += 1.0;
                        }
                    }
                    Err(e) => debug!("{} failed on variant {}: {}", self.primary.name(), name, e),
                }
            }
        }

        if let Some(secondary) = &self.secondary {
            let weight = self.config.secondary_weight;
            for (name, variant) in variants.iter().take(self.config.secondary_variants) {
                match secondary.recognize(variant, &configs[0]) {
                    Ok(text) => {
                        if let Some(rank) = parse_rank(&text) {
                            *votes.entry(rank).or_default() += weight;
                            *secondary_votes.entry(rank).or_default() += weight;
                            total += weight;
                        }
                    }
                    Err(e) => debug!("{} failed on variant {}: {}", secondary.name(), name, e),
                }
            }
        }

        if total <= 0.0 {
            return Vec::new();
        }

        let bbox = (0, 0, region.width(), region.height());
        let mut results: Vec<MatchResult> = Rank::ALL
            .iter()
            .filter_map(|&rank| {
                let rank_votes = *votes.get(&rank)?;
                let from_secondary = secondary_votes.get(&rank).copied().unwrap_or(0.0);
                let method = if from_secondary > 0.0 && rank_votes - from_secondary <= f32::EPSILON
                {
                    Method::OcrSecondary
                } else {
                    Method::OcrPrimary
                };
                Some(
                    MatchResult::new(rank.as_char().to_string(), rank_votes / total, method)
                        .with_bbox(bbox)
                        .with_metadata("votes", rank_votes)
                        .with_metadata("total_votes", total),
                )
            })
            .collect();
        // Stable sort keeps the fixed rank order on equal shares.
        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    /// Recognize a currency/magnitude-suffixed numeric readout. Candidates
    /// are bucketed by their value rounded to 2 decimals; the most frequent
    /// bucket wins and its vote fraction becomes the confidence.
    pub fn recognize_number(&self, img: &GrayImage) -> Option<(f64, f32)> {
        if img.width() == 0 || img.height() == 0 {
            return None;
        }
        let variants = preprocess_variants(img, &self.config);
        let configs = number_engine_configs();

        let mut candidates: Vec<f64> = Vec::new();
        for (name, variant) in &variants {
            for config in &configs {
                match self.primary.recognize(variant, config) {
                    Ok(text) => {
                        if let Some(value) = parse_number(&text) {
                            candidates.push(value);
                        }
                    }
                    Err(e) => debug!("{} failed on variant {}: {}", self.primary.name(), name, e),
                }
            }
        }
        if let Some(secondary) = &self.secondary {
            for (name, variant) in variants.iter().take(self.config.secondary_variants) {
                match secondary.recognize(variant, &configs[0]) {
                    Ok(text) => {
                        if let Some(value) = parse_number(&text) {
                            candidates.push(value);
                        }
                    }
                    Err(e) => debug!("{} failed on variant {}: {}", secondary.name(), name, e),
                }
            }
        }

        if candidates.is_empty() {
            return None;
        }

        // First-seen order breaks ties deterministically.
        let mut buckets: Vec<(i64, usize)> = Vec::new();
        for &value in &candidates {
            let key = (value * 100.0).round() as i64;
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, count)) => *count += 1,
                None => buckets.push((key, 1)),
            }
        }
        let mut best = buckets[0];
        for &bucket in &buckets[1..] {
            if bucket.1 > best.1 {
                best = bucket;
            }
        }

        let value = best.0 as f64 / 100.0;
        let confidence = best.1 as f32 / candidates.len() as f32;
        debug!(
            "Numeric vote: {} ({} of {} candidates)",
            value,
            best.1,
            candidates.len()
        );
        Some((value, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::FixedEngine;
    use parking_lot::Mutex;

    /// Cycles through a fixed list of responses, one per call.
    struct CyclingEngine {
        texts: Vec<String>,
        index: Mutex<usize>,
    }

    impl CyclingEngine {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: texts.iter().map(|s| s.to_string()).collect(),
                index: Mutex::new(0),
            }
        }
    }

    impl TextEngine for CyclingEngine {
        fn name(&self) -> &str {
            "cycling"
        }

        fn recognize(&self, _img: &GrayImage, _config: &str) -> Result<String, RecognitionError> {
            let mut index = self.index.lock();
            let text = self.texts[*index % self.texts.len()].clone();
            *index += 1;
            Ok(text)
        }
    }

    fn gray(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if (x + y) % 5 < 2 { 30 } else { 220 }])
        })
    }

    #[test]
    fn unanimous_primary_votes() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("K")));
        let results = ocr.recognize_rank(&gray(80, 112));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].token, "K");
        assert!((results[0].confidence - 1.0).abs() < 1e-6);
        assert_eq!(results[0].method, Method::OcrPrimary);
    }

    #[test]
    fn ten_parses_from_digit_pair() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("10")));
        let results = ocr.recognize_rank(&gray(80, 112));
        assert_eq!(results[0].token, "T");
    }

    #[test]
    fn secondary_votes_weigh_more() {
        // Primary: 8 variants x 3 configs = 24 votes for Q.
        // Secondary: 4 variants x 1 config x 1.5 = 6 votes for K.
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("Q")))
            .with_secondary(Ok(Box::new(FixedEngine::named("second", "K"))));
        assert!(ocr.has_secondary());

        let results = ocr.recognize_rank(&gray(80, 112));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].token, "Q");
        assert!((results[0].confidence - 0.8).abs() < 1e-4);
        assert_eq!(results[1].token, "K");
        assert!((results[1].confidence - 0.2).abs() < 1e-4);
        assert_eq!(results[1].method, Method::OcrSecondary);
    }

    #[test]
    fn failed_secondary_construction_degrades_silently() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("A"))).with_secondary(Err(
            RecognitionError::EngineUnavailable("not installed".to_string()),
        ));
        assert!(!ocr.has_secondary());
        let results = ocr.recognize_rank(&gray(80, 112));
        assert_eq!(results[0].token, "A");
    }

    #[test]
    fn unparsable_text_accumulates_no_votes() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("??")));
        assert!(ocr.recognize_rank(&gray(80, 112)).is_empty());
        let silent = RobustOcr::new(Box::new(FixedEngine::silent()));
        assert!(silent.recognize_rank(&gray(80, 112)).is_empty());
    }

    #[test]
    fn empty_image_yields_no_votes() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("K")));
        assert!(ocr.recognize_rank(&GrayImage::new(0, 0)).is_empty());
        assert!(ocr.recognize_number(&GrayImage::new(0, 0)).is_none());
    }

    #[test]
    fn number_vote_aggregates_rounded_values() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("$1,234.56")));
        let (value, confidence) = ocr.recognize_number(&gray(60, 24)).unwrap();
        assert!((value - 1234.56).abs() < 1e-9);
        assert!((confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn number_tie_resolves_to_first_seen() {
        // 8 variants x 2 configs = 16 calls alternating between two values.
        let ocr = RobustOcr::new(Box::new(CyclingEngine::new(&["100", "200"])));
        let (value, confidence) = ocr.recognize_number(&gray(60, 24)).unwrap();
        assert!((value - 100.0).abs() < 1e-9);
        assert!((confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn number_garbage_yields_none() {
        let ocr = RobustOcr::new(Box::new(FixedEngine::new("no digits")));
        assert!(ocr.recognize_number(&gray(60, 24)).is_none());
    }

    #[test]
    fn majority_wins_over_outlier() {
        let ocr = RobustOcr::new(Box::new(CyclingEngine::new(&["125", "125", "125", "725"])));
        let (value, confidence) = ocr.recognize_number(&gray(60, 24)).unwrap();
        assert!((value - 125.0).abs() < 1e-9);
        assert!((confidence - 0.75).abs() < 1e-6);
    }
}
