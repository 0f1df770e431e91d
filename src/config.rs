//! Engine configuration
//!
//! Tunables for template matching, OCR voting and consensus resolution,
//! stored in TOML format. Every field has a default matching the documented
//! behavior, so `RecognitionConfig::default()` is the production setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the recognition engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Template matcher settings
    pub matcher: MatcherConfig,
    /// OCR preprocessing/voting settings
    pub ocr: OcrConfig,
    /// Consensus resolution settings
    pub consensus: ConsensusConfig,
    /// Directory of full-card custom templates named `<rank><suit>.<ext>`
    pub template_dir: Option<PathBuf>,
}

impl RecognitionConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }
}

/// Template matcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum correlation for accepting a full-token or combined match
    pub match_threshold: f32,
    /// Template scale factors tried per match
    pub scales: Vec<f32>,
    /// Fraction of the image height searched for rank glyphs
    pub rank_region: f32,
    /// Fraction of the image height searched for suit glyphs
    pub suit_region: f32,
    /// Confidence multiplier applied to single-symbol partial evidence
    pub partial_attenuation: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.55,
            scales: vec![0.7, 0.85, 1.0, 1.15, 1.3, 1.5],
            rank_region: 0.45,
            suit_region: 0.55,
            partial_attenuation: 0.5,
        }
    }
}

/// OCR preprocessing and voting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Images whose largest dimension is below this get upscaled first
    pub upscale_trigger: u32,
    /// Upscaling targets at least this largest dimension
    pub upscale_target: u32,
    /// Fixed binarization thresholds (0-255 scale)
    pub fixed_thresholds: Vec<u8>,
    /// Fraction of the image height cropped for rank OCR
    pub rank_region: f32,
    /// Vote weight of the secondary engine relative to the primary's 1.0
    pub secondary_weight: f32,
    /// How many preprocessing variants the secondary engine sees
    pub secondary_variants: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            upscale_trigger: 60,
            upscale_target: 80,
            fixed_thresholds: vec![130, 150, 170],
            rank_region: 0.45,
            secondary_weight: 1.5,
            secondary_variants: 4,
        }
    }
}

/// Consensus resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Minimum template confidence for a complete token to stand on its own
    pub template_accept: f32,
    /// Confidence boost when template and OCR agree on the rank
    pub consensus_boost: f32,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            template_accept: 0.6,
            consensus_boost: 0.15,
        }
    }
}
