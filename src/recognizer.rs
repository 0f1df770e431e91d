//! Card identification orchestrator
//!
//! Reconciles the template matcher and the OCR voting layer into one
//! authoritative identification per call, with an explicit, ordered
//! resolution policy. The entry point is total: malformed input produces an
//! empty result, never a panic, because the caller is a per-frame polling
//! loop that must not die.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::debug;

use crate::config::ConsensusConfig;
use crate::matcher::MultiTemplateMatcher;
use crate::ocr::RobustOcr;
use crate::{MatchResult, Method, RecognitionResult};

/// Outcome of the ordered consensus policy, in precedence order.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Complete template token above the acceptance threshold and the top
    /// OCR rank vote agrees with its rank character; confidence boosted.
    Consensus { token: String, confidence: f32 },
    /// Complete template token above the acceptance threshold, without OCR
    /// agreement.
    TemplateOnly { token: String, confidence: f32 },
    /// Best remaining evidence: an attenuated template partial, a
    /// sub-threshold template token, or an OCR-only rank. An OCR-only
    /// winner stays a rank-only partial; no suit is ever fabricated.
    Fallback {
        token: String,
        confidence: f32,
        method: Method,
    },
    /// No evidence at all.
    NoMatch,
}

/// Ordered resolution of template and OCR evidence.
pub fn resolve(
    template: Option<&MatchResult>,
    ocr_ranks: &[MatchResult],
    config: &ConsensusConfig,
) -> Resolution {
    if let Some(t) = template {
        if t.token.chars().count() == 2 && t.confidence >= config.template_accept {
            if let Some(rank_char) = t.token.chars().next() {
                let agrees = ocr_ranks
                    .first()
                    .map(|m| m.token.chars().next() == Some(rank_char))
                    .unwrap_or(false);
                if agrees {
                    return Resolution::Consensus {
                        token: t.token.clone(),
                        confidence: (t.confidence + config.consensus_boost).min(1.0),
                    };
                }
            }
            return Resolution::TemplateOnly {
                token: t.token.clone(),
                confidence: t.confidence,
            };
        }
    }

    let template_candidate = template.map(|t| (t.token.clone(), t.confidence, t.method));
    let ocr_candidate = ocr_ranks
        .first()
        .map(|m| (m.token.clone(), m.confidence, m.method));
    let best = match (template_candidate, ocr_candidate) {
        (Some(t), Some(o)) => Some(if t.1 >= o.1 { t } else { o }),
        (t, o) => t.or(o),
    };
    match best {
        // Zero-confidence evidence is no evidence: a flat or empty crop
        // must come back unidentified, not as a meaningless guess.
        Some((token, confidence, method)) if confidence > 0.0 => Resolution::Fallback {
            token,
            confidence,
            method,
        },
        _ => Resolution::NoMatch,
    }
}

/// Produces one card identification per call from both strategies.
pub struct CardRecognizer {
    matcher: MultiTemplateMatcher,
    ocr: Arc<RobustOcr>,
    config: ConsensusConfig,
}

impl CardRecognizer {
    pub fn new(matcher: MultiTemplateMatcher, ocr: Arc<RobustOcr>) -> Self {
        Self::with_config(matcher, ocr, ConsensusConfig::default())
    }

    pub fn with_config(
        matcher: MultiTemplateMatcher,
        ocr: Arc<RobustOcr>,
        config: ConsensusConfig,
    ) -> Self {
        Self {
            matcher,
            ocr,
            config,
        }
    }

    /// Identify the card in a cropped image.
    ///
    /// Never panics or errors: zero-size, all-black, all-white or
    /// grayscale-only input produces a result with `best_token = None`.
    /// `elapsed_ms` and `all_matches` are always populated.
    pub fn recognize(&self, card_img: &DynamicImage) -> RecognitionResult {
        let start = Instant::now();
        let gray = card_img.to_luma8();
        if gray.width() == 0 || gray.height() == 0 {
            return RecognitionResult::empty(elapsed_ms(start));
        }

        let template = self.matcher.match_card(&gray);
        let ocr_ranks = self.ocr.recognize_rank(&gray);
        let resolution = resolve(template.as_ref(), &ocr_ranks, &self.config);

        let mut all_matches: Vec<MatchResult> = Vec::with_capacity(ocr_ranks.len() + 2);
        if let Resolution::Consensus { token, confidence } = &resolution {
            all_matches.push(
                MatchResult::new(token.clone(), *confidence, Method::Consensus)
                    .with_metadata("boost", self.config.consensus_boost),
            );
        }
        all_matches.extend(template);
        all_matches.extend(ocr_ranks);
        all_matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let (best_token, best_confidence) = match &resolution {
            Resolution::Consensus { token, confidence } => (Some(token.clone()), *confidence),
            Resolution::TemplateOnly { token, confidence } => (Some(token.clone()), *confidence),
            Resolution::Fallback {
                token, confidence, ..
            } => (Some(token.clone()), *confidence),
            Resolution::NoMatch => (None, 0.0),
        };

        let result = RecognitionResult {
            best_token,
            best_confidence,
            all_matches,
            elapsed_ms: elapsed_ms(start),
        };
        debug!(
            "Recognized {:?} at {:.3} in {:.1}ms ({:?})",
            result.best_token,
            result.best_confidence,
            result.elapsed_ms,
            std::mem::discriminant(&resolution)
        );
        result
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(token: &str, confidence: f32) -> MatchResult {
        MatchResult::new(token, confidence, Method::Template)
    }

    fn ocr(token: &str, confidence: f32) -> MatchResult {
        MatchResult::new(token, confidence, Method::OcrPrimary)
    }

    #[test]
    fn consensus_when_ocr_agrees_with_template() {
        let t = template("Kh", 0.8);
        let votes = [ocr("K", 0.9), ocr("Q", 0.1)];
        let resolution = resolve(Some(&t), &votes, &ConsensusConfig::default());
        assert_eq!(
            resolution,
            Resolution::Consensus {
                token: "Kh".to_string(),
                confidence: 0.95,
            }
        );
    }

    #[test]
    fn consensus_confidence_caps_at_one() {
        let t = template("As", 0.95);
        let votes = [ocr("A", 1.0)];
        match resolve(Some(&t), &votes, &ConsensusConfig::default()) {
            Resolution::Consensus { confidence, .. } => assert_eq!(confidence, 1.0),
            other => panic!("expected consensus, got {:?}", other),
        }
    }

    #[test]
    fn template_stands_alone_without_agreement() {
        let t = template("Kh", 0.8);
        let votes = [ocr("Q", 0.9)];
        let resolution = resolve(Some(&t), &votes, &ConsensusConfig::default());
        assert_eq!(
            resolution,
            Resolution::TemplateOnly {
                token: "Kh".to_string(),
                confidence: 0.8,
            }
        );
        // Same without any OCR votes at all.
        let resolution = resolve(Some(&t), &[], &ConsensusConfig::default());
        assert!(matches!(resolution, Resolution::TemplateOnly { .. }));
    }

    #[test]
    fn weak_template_loses_fallback_to_stronger_ocr() {
        let t = template("Kh", 0.58);
        let votes = [ocr("Q", 0.7)];
        let resolution = resolve(Some(&t), &votes, &ConsensusConfig::default());
        assert_eq!(
            resolution,
            Resolution::Fallback {
                token: "Q".to_string(),
                confidence: 0.7,
                method: Method::OcrPrimary,
            }
        );
    }

    #[test]
    fn ocr_only_fallback_is_rank_only() {
        let votes = [ocr("A", 0.6)];
        let resolution = resolve(None, &votes, &ConsensusConfig::default());
        match resolution {
            Resolution::Fallback { token, .. } => {
                // One character: the suit stays unknown rather than guessed.
                assert_eq!(token, "A");
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn partial_template_beats_weaker_ocr() {
        let t = template("h", 0.45);
        let votes = [ocr("K", 0.3)];
        let resolution = resolve(Some(&t), &votes, &ConsensusConfig::default());
        assert_eq!(
            resolution,
            Resolution::Fallback {
                token: "h".to_string(),
                confidence: 0.45,
                method: Method::Template,
            }
        );
    }

    #[test]
    fn no_evidence_is_no_match() {
        assert_eq!(
            resolve(None, &[], &ConsensusConfig::default()),
            Resolution::NoMatch
        );
    }

    #[test]
    fn zero_confidence_evidence_is_no_match() {
        let t = template("2", 0.0);
        let resolution = resolve(Some(&t), &[], &ConsensusConfig::default());
        assert_eq!(resolution, Resolution::NoMatch);
    }
}
