//! Reference template bank
//!
//! Owns a reproducible, size/style-diverse library of rank and suit glyph
//! images, plus optional user-supplied full-card templates loaded from disk.
//! Generation runs once, lazily, under a mutex, and the resulting sets are
//! shared read-only for the life of the process.

mod glyphs;

pub use glyphs::render_card_sample;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::GrayImage;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cards::{parse_token, Rank, Suit};
use crate::error::RecognitionError;
use glyphs::Face;

/// Glyph heights (px) in the generation grid.
const GLYPH_HEIGHTS: [u32; 5] = [16, 20, 24, 28, 32];
/// Stroke thickness variants.
const STROKE_THICKNESSES: [u32; 2] = [1, 2];
/// Suit silhouette weight variants.
const SUIT_WEIGHTS: [f32; 2] = [0.85, 1.0];

/// Per-class template counts, used to verify idempotent generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateCounts {
    pub ranks: usize,
    pub suits: usize,
    pub cards: usize,
}

/// The generated, immutable template sets.
pub struct TemplateSets {
    ranks: HashMap<Rank, Arc<Vec<GrayImage>>>,
    suits: HashMap<Suit, Arc<Vec<GrayImage>>>,
    cards: HashMap<String, Arc<Vec<GrayImage>>>,
    /// Custom tokens in deterministic (sorted) order.
    custom_tokens: Vec<String>,
}

impl TemplateSets {
    /// Templates for one rank; never empty.
    pub fn rank(&self, rank: Rank) -> &Arc<Vec<GrayImage>> {
        &self.ranks[&rank]
    }

    /// Templates for one suit; never empty.
    pub fn suit(&self, suit: Suit) -> &Arc<Vec<GrayImage>> {
        &self.suits[&suit]
    }

    /// Custom full-card templates for a token, if any were loaded.
    pub fn card(&self, token: &str) -> Option<&Arc<Vec<GrayImage>>> {
        self.cards.get(token)
    }

    /// Tokens with at least one custom template, sorted.
    pub fn custom_tokens(&self) -> &[String] {
        &self.custom_tokens
    }

    pub fn counts(&self) -> TemplateCounts {
        TemplateCounts {
            ranks: self.ranks.values().map(|v| v.len()).sum(),
            suits: self.suits.values().map(|v| v.len()).sum(),
            cards: self.cards.values().map(|v| v.len()).sum(),
        }
    }
}

/// Lazily generated, mutex-memoized bank of reference templates.
pub struct TemplateBank {
    template_dir: Option<PathBuf>,
    generated: Mutex<Option<Arc<TemplateSets>>>,
}

impl TemplateBank {
    /// Bank with generated templates only.
    pub fn new() -> Self {
        Self {
            template_dir: None,
            generated: Mutex::new(None),
        }
    }

    /// Bank that additionally loads full-card templates named
    /// `<rank><suit>.<ext>` from the given directory.
    pub fn with_template_dir(dir: impl Into<PathBuf>) -> Result<Self, RecognitionError> {
        let dir = dir.into();
        std::fs::read_dir(&dir).map_err(|source| RecognitionError::TemplateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            template_dir: Some(dir),
            generated: Mutex::new(None),
        })
    }

    /// Generate the template sets if they do not exist yet. Idempotent:
    /// repeated calls leave counts and bytes unchanged.
    pub fn ensure_generated(&self) {
        let _ = self.sets();
    }

    /// The generated sets, building them on first access. Concurrent first
    /// callers serialize on the mutex; afterwards this is an Arc clone.
    pub fn sets(&self) -> Arc<TemplateSets> {
        let mut guard = self.generated.lock();
        if let Some(sets) = guard.as_ref() {
            return Arc::clone(sets);
        }
        let sets = Arc::new(self.generate());
        *guard = Some(Arc::clone(&sets));
        sets
    }

    /// Templates for one rank; lazily triggers generation. Never empty.
    pub fn rank_templates(&self, rank: Rank) -> Arc<Vec<GrayImage>> {
        Arc::clone(self.sets().rank(rank))
    }

    /// Templates for one suit; lazily triggers generation. Never empty.
    pub fn suit_templates(&self, suit: Suit) -> Arc<Vec<GrayImage>> {
        Arc::clone(self.sets().suit(suit))
    }

    /// Custom full-card templates for a token; empty when none were loaded.
    pub fn card_templates(&self, token: &str) -> Arc<Vec<GrayImage>> {
        self.sets()
            .card(token)
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::new(Vec::new()))
    }

    /// Per-class template counts; lazily triggers generation.
    pub fn template_counts(&self) -> TemplateCounts {
        self.sets().counts()
    }

    fn generate(&self) -> TemplateSets {
        let mut ranks: HashMap<Rank, Arc<Vec<GrayImage>>> = HashMap::new();
        for rank in Rank::ALL {
            let mut templates = Vec::new();
            for &height in &GLYPH_HEIGHTS {
                for face in Face::ALL {
                    for &thickness in &STROKE_THICKNESSES {
                        for inverted in [false, true] {
                            let img = glyphs::render_glyph_text(
                                rank.glyph_text(),
                                height,
                                face,
                                thickness,
                                inverted,
                            );
                            if img.width() > 0 && img.height() > 0 {
                                templates.push(img);
                            }
                        }
                    }
                }
            }
            ranks.insert(rank, Arc::new(templates));
        }

        let mut suits: HashMap<Suit, Arc<Vec<GrayImage>>> = HashMap::new();
        for suit in Suit::ALL {
            let mut templates = Vec::new();
            for &height in &GLYPH_HEIGHTS {
                for &color in glyphs::suit_palette(suit) {
                    for &weight in &SUIT_WEIGHTS {
                        let img = glyphs::render_suit_glyph(suit, height, color, weight);
                        if img.width() > 0 && img.height() > 0 {
                            templates.push(img);
                        }
                    }
                }
            }
            suits.insert(suit, Arc::new(templates));
        }

        let (cards, custom_tokens) = match &self.template_dir {
            Some(dir) => load_custom_templates(dir),
            None => (HashMap::new(), Vec::new()),
        };

        let sets = TemplateSets {
            ranks,
            suits,
            cards,
            custom_tokens,
        };
        let counts = sets.counts();
        info!(
            "Generated template bank: {} rank, {} suit, {} custom card templates",
            counts.ranks, counts.suits, counts.cards
        );
        sets
    }
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Load every decodable `<rank><suit>.<ext>` image in the directory,
/// grayscale, keyed by token. Unreadable entries are skipped with a warning.
fn load_custom_templates(
    dir: &Path,
) -> (HashMap<String, Arc<Vec<GrayImage>>>, Vec<String>) {
    let mut by_token: HashMap<String, Vec<GrayImage>> = HashMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read template directory {:?}: {}", dir, e);
            return (HashMap::new(), Vec::new());
        }
    };

    // Sorted traversal keeps template indices reproducible across runs.
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some((rank, suit)) = parse_token(stem) else {
            debug!("Skipping non-token template file {:?}", path);
            continue;
        };
        match image::open(&path) {
            Ok(img) => {
                let gray = img.to_luma8();
                if gray.width() == 0 || gray.height() == 0 {
                    warn!("Skipping empty template image {:?}", path);
                    continue;
                }
                let token = crate::cards::token(rank, suit);
                debug!(
                    "Loaded custom template {:?} for '{}' ({}x{})",
                    path,
                    token,
                    gray.width(),
                    gray.height()
                );
                by_token.entry(token).or_default().push(gray);
            }
            Err(e) => warn!("Failed to decode template image {:?}: {}", path, e),
        }
    }

    let mut tokens: Vec<String> = by_token.keys().cloned().collect();
    tokens.sort();
    let cards = by_token
        .into_iter()
        .map(|(token, templates)| (token, Arc::new(templates)))
        .collect();
    (cards, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_idempotent() {
        let bank = TemplateBank::new();
        bank.ensure_generated();
        let first = bank.template_counts();
        bank.ensure_generated();
        let second = bank.template_counts();
        assert_eq!(first, second);
    }

    #[test]
    fn every_rank_and_suit_has_templates() {
        let bank = TemplateBank::new();
        for rank in Rank::ALL {
            let templates = bank.rank_templates(rank);
            // 5 heights x 3 faces x 2 thicknesses x 2 polarities
            assert_eq!(templates.len(), 60, "{:?}", rank);
        }
        for suit in Suit::ALL {
            let templates = bank.suit_templates(suit);
            assert!(!templates.is_empty(), "{:?}", suit);
        }
    }

    #[test]
    fn every_template_has_positive_dimensions() {
        let bank = TemplateBank::new();
        let sets = bank.sets();
        for rank in Rank::ALL {
            for t in sets.rank(rank).iter() {
                assert!(t.width() > 0 && t.height() > 0);
            }
        }
        for suit in Suit::ALL {
            for t in sets.suit(suit).iter() {
                assert!(t.width() > 0 && t.height() > 0);
            }
        }
    }

    #[test]
    fn generation_is_byte_identical_across_banks() {
        let a = TemplateBank::new();
        let b = TemplateBank::new();
        let (sa, sb) = (a.sets(), b.sets());
        for rank in Rank::ALL {
            let (ta, tb) = (sa.rank(rank), sb.rank(rank));
            assert_eq!(ta.len(), tb.len());
            for (x, y) in ta.iter().zip(tb.iter()) {
                assert_eq!(x.as_raw(), y.as_raw());
            }
        }
    }

    #[test]
    fn card_templates_empty_without_custom_dir() {
        let bank = TemplateBank::new();
        assert!(bank.card_templates("As").is_empty());
        assert_eq!(bank.template_counts().cards, 0);
    }

    #[test]
    fn custom_templates_load_by_token() {
        let dir = tempfile::tempdir().unwrap();
        let card = render_card_sample(Rank::Ace, Suit::Spades, 40, 56, 255);
        card.save(dir.path().join("As.png")).unwrap();
        // Non-token names and undecodable files are skipped.
        std::fs::write(dir.path().join("notes.txt"), b"junk").unwrap();
        std::fs::write(dir.path().join("Qd.png"), b"not an image").unwrap();

        let bank = TemplateBank::with_template_dir(dir.path()).unwrap();
        assert_eq!(bank.card_templates("As").len(), 1);
        assert!(bank.card_templates("Kh").is_empty());
        assert_eq!(bank.sets().custom_tokens(), ["As".to_string()]);
    }

    #[test]
    fn missing_template_dir_is_an_error() {
        let err = TemplateBank::with_template_dir("/nonexistent/templates");
        assert!(matches!(err, Err(RecognitionError::TemplateDir { .. })));
    }
}
