//! Multi-scale template classification
//!
//! Scores a cropped symbol region against the template bank using zero-mean
//! normalized cross-correlation, per symbol class. The matcher classifies a
//! single pre-cropped symbol; it does not localize or count occurrences in
//! a larger scene.

use std::sync::Arc;

use image::imageops::FilterType;
use image::GrayImage;
use rayon::prelude::*;
use tracing::debug;

use crate::cards::{Rank, Suit};
use crate::config::MatcherConfig;
use crate::templates::TemplateBank;
use crate::{crop_top, MatchResult, Method};

/// Templates scaled below this (either dimension) are skipped.
const MIN_TEMPLATE_DIM: u32 = 8;

/// Best correlation peak for one symbol class.
#[derive(Debug, Clone, Copy)]
struct Peak {
    score: f32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    template_index: usize,
    scale_index: usize,
}

/// Fixed, reproducible tie-break: higher score wins; on equal scores the
/// lower template index wins, then the earlier scale in the list.
fn better(a: &Peak, b: &Peak) -> bool {
    if a.score != b.score {
        return a.score > b.score;
    }
    (a.template_index, a.scale_index) < (b.template_index, b.scale_index)
}

/// Precomputed template statistics shared by every scan position.
struct TemplateStats {
    mean: f64,
    /// sum(t^2) - n * mean^2
    var_term: f64,
    count: f64,
}

impl TemplateStats {
    /// `None` for flat templates, which cannot be normalized.
    fn new(template: &GrayImage) -> Option<Self> {
        let data = template.as_raw();
        let count = data.len() as f64;
        if count == 0.0 {
            return None;
        }
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for &value in data {
            let v = value as f64;
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / count;
        let var_term = sum_sq - count * mean * mean;
        if var_term < 1e-10 {
            return None;
        }
        Some(Self {
            mean,
            var_term,
            count,
        })
    }
}

/// Zero-mean normalized cross-correlation of the template against the
/// region window at (x, y), clamped into [0, 1].
fn zncc_at(region: &GrayImage, template: &GrayImage, stats: &TemplateStats, x: u32, y: u32) -> f32 {
    let (region_width, _) = region.dimensions();
    let (tw, th) = template.dimensions();
    let rdata = region.as_raw();
    let tdata = template.as_raw();

    let mut sum_i = 0.0f64;
    let mut sum_i2 = 0.0f64;
    let mut sum_it = 0.0f64;

    for ty in 0..th {
        let row = ((y + ty) * region_width + x) as usize;
        let trow = (ty * tw) as usize;
        for tx in 0..tw as usize {
            let iv = rdata[row + tx] as f64;
            let tv = tdata[trow + tx] as f64;
            sum_i += iv;
            sum_i2 += iv * iv;
            sum_it += iv * tv;
        }
    }

    let mean_i = sum_i / stats.count;
    let numerator = sum_it - sum_i * stats.mean;
    let denom_i = sum_i2 - stats.count * mean_i * mean_i;
    let denominator = (denom_i * stats.var_term).sqrt();
    if denominator < 1e-10 {
        return 0.0;
    }
    ((numerator / denominator) as f32).clamp(0.0, 1.0)
}

/// Slide the template over the region keeping the single best peak: a
/// stride-2 coarse pass, then a +/-1 px refinement around the coarse best.
fn scan_max(region: &GrayImage, template: &GrayImage, stats: &TemplateStats) -> (f32, u32, u32) {
    let (rw, rh) = region.dimensions();
    let (tw, th) = template.dimensions();
    let max_x = rw - tw;
    let max_y = rh - th;

    let mut best = (f32::MIN, 0u32, 0u32);
    let mut y = 0;
    while y <= max_y {
        let mut x = 0;
        while x <= max_x {
            let score = zncc_at(region, template, stats, x, y);
            if score > best.0 {
                best = (score, x, y);
            }
            x += 2;
        }
        y += 2;
    }

    let (_, bx, by) = best;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let x = bx as i64 + dx;
            let y = by as i64 + dy;
            if x < 0 || y < 0 || x > max_x as i64 || y > max_y as i64 {
                continue;
            }
            let score = zncc_at(region, template, stats, x as u32, y as u32);
            if score > best.0 {
                best = (score, x as u32, y as u32);
            }
        }
    }
    best
}

/// Classifies a cropped symbol region against the template bank at multiple
/// scales.
pub struct MultiTemplateMatcher {
    bank: Arc<TemplateBank>,
    config: MatcherConfig,
}

impl MultiTemplateMatcher {
    /// Matcher with default configuration.
    pub fn new(bank: Arc<TemplateBank>) -> Self {
        Self::with_config(bank, MatcherConfig::default())
    }

    pub fn with_config(bank: Arc<TemplateBank>, config: MatcherConfig) -> Self {
        Self { bank, config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score all 13 ranks against the top rank region of the image,
    /// descending by confidence. Empty when nothing fits the region.
    pub fn match_rank(&self, card_img: &GrayImage) -> Vec<MatchResult> {
        let region = crop_top(card_img, self.config.rank_region);
        let sets = self.bank.sets();
        let mut results: Vec<MatchResult> = Rank::ALL
            .iter()
            .filter_map(|&rank| {
                let peak = self.best_in_class(&region, sets.rank(rank))?;
                Some(self.peak_result(rank.as_char().to_string(), &peak))
            })
            .collect();
        sort_by_confidence(&mut results);
        results
    }

    /// Score all 4 suits against the top suit region of the image,
    /// descending by confidence.
    pub fn match_suit(&self, card_img: &GrayImage) -> Vec<MatchResult> {
        let region = crop_top(card_img, self.config.suit_region);
        let sets = self.bank.sets();
        let mut results: Vec<MatchResult> = Suit::ALL
            .iter()
            .filter_map(|&suit| {
                let peak = self.best_in_class(&region, sets.suit(suit))?;
                Some(self.peak_result(suit.as_char().to_string(), &peak))
            })
            .collect();
        sort_by_confidence(&mut results);
        results
    }

    /// Two-tier card classification.
    ///
    /// Tier A: if custom full-token templates exist and the best one clears
    /// the match threshold, it wins outright. Tier B: combine the best rank
    /// and best suit (confidence = min of the two). Below threshold, the
    /// best single-symbol evidence is returned with attenuated confidence,
    /// or `None` when there is no evidence at all.
    pub fn match_card(&self, card_img: &GrayImage) -> Option<MatchResult> {
        if card_img.width() == 0 || card_img.height() == 0 {
            return None;
        }
        let sets = self.bank.sets();

        let mut best_custom: Option<(String, Peak)> = None;
        for token in sets.custom_tokens() {
            let Some(templates) = sets.card(token) else {
                continue;
            };
            let Some(peak) = self.best_in_class(card_img, templates) else {
                continue;
            };
            let replace = match &best_custom {
                Some((_, current)) => better(&peak, current),
                None => true,
            };
            if replace {
                best_custom = Some((token.clone(), peak));
            }
        }
        if let Some((token, peak)) = best_custom {
            if peak.score >= self.config.match_threshold {
                debug!("Custom template match '{}' at {:.3}", token, peak.score);
                return Some(self.peak_result(token, &peak).with_metadata("stage", "custom"));
            }
        }

        let ranks = self.match_rank(card_img);
        let suits = self.match_suit(card_img);
        let best_rank = ranks.first();
        let best_suit = suits.first();

        if let (Some(rank), Some(suit)) = (best_rank, best_suit) {
            let combined = rank.confidence.min(suit.confidence);
            if combined >= self.config.match_threshold {
                let token = format!("{}{}", rank.token, suit.token);
                return Some(
                    MatchResult::new(token, combined, Method::Template)
                        .with_bbox(rank.bbox)
                        .with_metadata("stage", "combined")
                        .with_metadata("rank_confidence", rank.confidence)
                        .with_metadata("suit_confidence", suit.confidence),
                );
            }
        }

        // Incomplete evidence: surface the stronger symbol, attenuated so
        // downstream consumers can tell it apart from a full match.
        let (partial, stage) = match (best_rank, best_suit) {
            (Some(rank), Some(suit)) => {
                if rank.confidence >= suit.confidence {
                    (rank, "partial-rank")
                } else {
                    (suit, "partial-suit")
                }
            }
            (Some(rank), None) => (rank, "partial-rank"),
            (None, Some(suit)) => (suit, "partial-suit"),
            (None, None) => return None,
        };
        Some(
            MatchResult::new(
                partial.token.clone(),
                partial.confidence * self.config.partial_attenuation,
                Method::Template,
            )
            .with_bbox(partial.bbox)
            .with_metadata("stage", stage),
        )
    }

    /// Best peak for one symbol class across all of its templates and all
    /// configured scales. Combinations that do not fit the region (or fall
    /// below the minimum size) are skipped.
    fn best_in_class(&self, region: &GrayImage, templates: &[GrayImage]) -> Option<Peak> {
        let (rw, rh) = region.dimensions();
        if rw == 0 || rh == 0 {
            return None;
        }
        let scales = &self.config.scales;
        let jobs: Vec<(usize, usize)> = (0..templates.len())
            .flat_map(|ti| (0..scales.len()).map(move |si| (ti, si)))
            .collect();

        jobs.par_iter()
            .filter_map(|&(template_index, scale_index)| {
                let template = &templates[template_index];
                let scale = scales[scale_index];
                let width = (template.width() as f32 * scale).round() as u32;
                let height = (template.height() as f32 * scale).round() as u32;
                if width < MIN_TEMPLATE_DIM
                    || height < MIN_TEMPLATE_DIM
                    || width > rw
                    || height > rh
                {
                    return None;
                }
                let scaled = if (scale - 1.0).abs() < 0.01 {
                    template.clone()
                } else {
                    image::imageops::resize(template, width, height, FilterType::Triangle)
                };
                let stats = TemplateStats::new(&scaled)?;
                let (score, x, y) = scan_max(region, &scaled, &stats);
                Some(Peak {
                    score,
                    x,
                    y,
                    width: scaled.width(),
                    height: scaled.height(),
                    template_index,
                    scale_index,
                })
            })
            .reduce_with(|a, b| if better(&b, &a) { b } else { a })
    }

    fn peak_result(&self, token: String, peak: &Peak) -> MatchResult {
        MatchResult::new(token, peak.score, Method::Template)
            .with_bbox((peak.x, peak.y, peak.width, peak.height))
            .with_metadata("template_index", peak.template_index)
            .with_metadata("scale_index", peak.scale_index)
    }
}

fn sort_by_confidence(results: &mut [MatchResult]) {
    // Stable sort: equal scores keep the fixed class iteration order.
    results.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
