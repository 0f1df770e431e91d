//! cardvision - symbol recognition for table screen crops
//!
//! Converts a small cropped raster image (a playing-card face or a numeric
//! readout) into a confident symbolic value by fusing two individually
//! unreliable strategies:
//! - appearance-based multi-scale template matching ([`MultiTemplateMatcher`]
//!   over the generated [`TemplateBank`]), and
//! - multi-variant OCR voting ([`RobustOcr`] over pluggable [`TextEngine`]
//!   backends),
//! resolved into one result by [`CardRecognizer`]'s consensus policy.
//!
//! The pipeline is total: malformed input produces an empty result, never a
//! panic or an error, because it runs inside a tight per-frame polling loop.

pub mod cards;
pub mod config;
pub mod error;
pub mod matcher;
pub mod numeric;
pub mod ocr;
pub mod pipeline;
pub mod recognizer;
pub mod templates;

use std::collections::HashMap;

use image::GrayImage;
use serde::{Deserialize, Serialize};

pub use cards::{parse_number, parse_rank, parse_token, token, Rank, Suit};
pub use config::{ConsensusConfig, MatcherConfig, OcrConfig, RecognitionConfig};
pub use error::RecognitionError;
pub use matcher::MultiTemplateMatcher;
pub use numeric::NumericRecognizer;
pub use ocr::engine::{FixedEngine, TesseractEngine, TextEngine};
pub use ocr::RobustOcr;
pub use pipeline::{frame_slot, FrameConsumer, FramePublisher};
pub use recognizer::{CardRecognizer, Resolution};
pub use templates::{render_card_sample, TemplateBank};

/// Which strategy produced a match candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Multi-scale template matching
    Template,
    /// Primary OCR engine vote
    OcrPrimary,
    /// Secondary OCR engine vote
    OcrSecondary,
    /// Template and OCR agreed
    Consensus,
}

/// One candidate produced during a match attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Symbol token: a 2-char card token, or a single rank/suit char for
    /// partial evidence
    pub token: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Strategy that produced this candidate
    pub method: Method,
    /// Location evidence as (x, y, width, height)
    pub bbox: (u32, u32, u32, u32),
    /// Free-form diagnostic detail (template index, vote counts, ...)
    pub metadata: HashMap<String, String>,
}

impl MatchResult {
    pub fn new(token: impl Into<String>, confidence: f32, method: Method) -> Self {
        Self {
            token: token.into(),
            confidence,
            method,
            bbox: (0, 0, 0, 0),
            metadata: HashMap::new(),
        }
    }

    pub fn with_bbox(mut self, bbox: (u32, u32, u32, u32)) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// The outcome of one [`CardRecognizer::recognize`] call.
///
/// Never mutated after return; `all_matches` is ordered by descending
/// confidence and may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Best identification, `None` when nothing was recognized
    pub best_token: Option<String>,
    /// Confidence of the best identification, 0.0 when none
    pub best_confidence: f32,
    /// Every candidate collected during the attempt
    pub all_matches: Vec<MatchResult>,
    /// Wall-clock time spent in the call
    pub elapsed_ms: f64,
}

impl RecognitionResult {
    /// Empty result for unrecognizable or malformed input.
    pub fn empty(elapsed_ms: f64) -> Self {
        Self {
            best_token: None,
            best_confidence: 0.0,
            all_matches: Vec::new(),
            elapsed_ms,
        }
    }

    /// Rank character of the best token. Only complete 2-char tokens carry
    /// a rank here; partial identifications yield `None`.
    pub fn rank(&self) -> Option<char> {
        self.best_token
            .as_deref()
            .filter(|t| t.chars().count() >= 2)
            .and_then(|t| t.chars().next())
    }

    /// Suit character of the best token, `None` for partial identifications.
    pub fn suit(&self) -> Option<char> {
        self.best_token
            .as_deref()
            .filter(|t| t.chars().count() >= 2)
            .and_then(|t| t.chars().nth(1))
    }
}

/// Crop the top `fraction` of an image, used for the rank/suit search
/// regions. Always yields at least one row when the input has any.
pub(crate) fn crop_top(img: &GrayImage, fraction: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }
    let crop_height = ((height as f32 * fraction).round() as u32).clamp(1, height);
    image::imageops::crop_imm(img, 0, 0, width, crop_height).to_image()
}
