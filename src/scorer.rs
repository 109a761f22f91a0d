//! Severity scoring
//!
//! Maps an utterance (plus optional prior assessments) to an [`Assessment`]:
//!
//! 1. Per-dimension phrase matching (mean of matched weights, noise floor otherwise)
//! 2. Recency-weighted history blend
//! 3. Weighted severity scalar
//! 4. Category binning
//! 5. Confidence jitter
//!
//! Outputs are rounded to two decimals only when the assessment is built.

use crate::error::AssessError;
use crate::random::{Randomness, RngSource};
use crate::rules::RuleSet;
use crate::types::{round2, Assessment, DimensionScores, SeverityCategory};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Share of the current utterance in the history blend
pub const CURRENT_BLEND: f64 = 0.7;

/// Share of the recency-weighted history average in the history blend
pub const HISTORY_BLEND: f64 = 0.3;

/// Lowest confidence reported
pub const CONFIDENCE_BASE: f64 = 0.5;

/// Width of the uniform confidence jitter
pub const CONFIDENCE_JITTER: f64 = 0.4;

/// Rule-based severity scorer
#[derive(Debug, Clone)]
pub struct SeverityScorer {
    rules: Arc<RuleSet>,
}

impl Default for SeverityScorer {
    fn default() -> Self {
        Self {
            rules: Arc::new(RuleSet::default()),
        }
    }
}

impl SeverityScorer {
    /// Create a scorer over validated rule tables
    pub fn new(rules: Arc<RuleSet>) -> Result<Self, AssessError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Score text using the thread-local random source for confidence
    pub fn score(&self, text: &str, history: Option<&[Assessment]>) -> Assessment {
        self.score_with(text, history, &mut RngSource::thread())
    }

    /// Score text with an explicit random source
    pub fn score_with(
        &self,
        text: &str,
        history: Option<&[Assessment]>,
        rng: &mut dyn Randomness,
    ) -> Assessment {
        let mut scores = self.raw_dimension_scores(text);

        if let Some(history) = history.filter(|h| !h.is_empty()) {
            scores = self.adjust_with_history(&scores, history);
        }

        let severity_score = self.severity_scalar(&scores);
        let severity_category = self.categorize(severity_score);
        let confidence = CONFIDENCE_BASE + rng.uniform(0.0, CONFIDENCE_JITTER);

        debug!(
            severity_score,
            category = severity_category.as_str(),
            history_len = history.map_or(0, |h| h.len()),
            "scored utterance"
        );

        Assessment {
            severity_score: round2(severity_score),
            severity_category,
            confidence: round2(confidence),
            dimension_scores: scores.rounded(),
            timestamp: Utc::now(),
        }
    }

    /// Mean weight of the matched phrases per dimension, or the noise floor
    /// when nothing matched. Matching is case-insensitive substring containment.
    pub fn raw_dimension_scores(&self, text: &str) -> DimensionScores {
        let text = text.to_lowercase();

        self.rules
            .dimensions
            .iter()
            .map(|rule| {
                let matched: Vec<f64> = rule
                    .phrases
                    .iter()
                    .filter(|p| text.contains(&p.pattern.to_lowercase()))
                    .map(|p| p.score)
                    .collect();

                let score = if matched.is_empty() {
                    self.rules.noise_floor
                } else {
                    matched.iter().sum::<f64>() / matched.len() as f64
                };
                (rule.dimension, score)
            })
            .collect()
    }

    /// Blend current scores with a recency-weighted average of prior scores.
    ///
    /// Entries lacking a dimension are skipped for that dimension; weights run
    /// 1..=n over the remaining entries, oldest first. Dimensions absent from
    /// every entry keep their current score.
    pub fn adjust_with_history(
        &self,
        current: &DimensionScores,
        history: &[Assessment],
    ) -> DimensionScores {
        let mut adjusted = current.clone();

        for (dimension, score) in current.iter() {
            let values: Vec<f64> = history
                .iter()
                .filter_map(|a| a.dimension_scores.get(dimension))
                .collect();

            if values.is_empty() {
                continue;
            }

            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for (i, value) in values.iter().enumerate() {
                let weight = (i + 1) as f64;
                weighted_sum += value * weight;
                weight_total += weight;
            }
            let weighted_avg = weighted_sum / weight_total;

            adjusted.insert(dimension, CURRENT_BLEND * score + HISTORY_BLEND * weighted_avg);
        }

        adjusted
    }

    /// Weighted sum of dimension scores. Missing dimensions count at the noise floor.
    pub fn severity_scalar(&self, scores: &DimensionScores) -> f64 {
        self.rules
            .dimensions
            .iter()
            .map(|rule| scores.get(rule.dimension).unwrap_or(self.rules.noise_floor) * rule.weight)
            .sum()
    }

    /// First bin containing the scalar, in table order; `Normal` if none does
    pub fn categorize(&self, severity_score: f64) -> SeverityCategory {
        match self
            .rules
            .severity_bins
            .iter()
            .find(|bin| bin.contains(severity_score))
        {
            Some(bin) => bin.category,
            None => {
                warn!(severity_score, "severity score outside every bin, using normal");
                SeverityCategory::Normal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FirstChoice;
    use crate::rules::SeverityBin;
    use crate::types::Dimension;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn past(scores: DimensionScores) -> Assessment {
        Assessment {
            severity_score: 0.3,
            severity_category: SeverityCategory::Mild,
            confidence: 0.7,
            dimension_scores: scores,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_no_trigger_phrases_gives_floor() {
        let scorer = SeverityScorer::default();

        for text in ["", "今天天气很好，我去公园散步了。", "hello there"] {
            let assessment = scorer.score_with(text, None, &mut FirstChoice);
            for dimension in Dimension::ALL {
                assert_eq!(assessment.dimension_scores.get(dimension), Some(0.1));
            }
            // 0.1 * (sum of weights)
            assert_eq!(assessment.severity_score, 0.1);
            assert_eq!(assessment.severity_category, SeverityCategory::Normal);
        }
    }

    #[test]
    fn test_memory_and_orientation_phrases() {
        let scorer = SeverityScorer::default();
        let assessment =
            scorer.score_with("我忘了刚才做什么，也不知道现在是几点", None, &mut FirstChoice);

        assert_eq!(assessment.dimension_scores.get(Dimension::Memory), Some(0.5));
        assert_eq!(assessment.dimension_scores.get(Dimension::Orientation), Some(0.5));
        assert_eq!(assessment.dimension_scores.get(Dimension::Language), Some(0.1));
        // 0.5*0.30 + 0.5*0.25 + 0.1*(0.20 + 0.15 + 0.10)
        assert_eq!(assessment.severity_score, 0.32);
        assert_ne!(assessment.severity_category, SeverityCategory::Normal);
        assert_eq!(assessment.severity_category, SeverityCategory::Mild);
    }

    #[test]
    fn test_matched_weights_are_averaged() {
        let scorer = SeverityScorer::default();
        // 忘记 0.6, 记不起来 0.7
        let scores = scorer.raw_dimension_scores("我总是忘记事情，名字也记不起来");
        assert!((scores.get(Dimension::Memory).unwrap() - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let mut rules = RuleSet::default();
        rules.dimensions[2].phrases[0].pattern = "Word Finding".to_string();
        let scorer = SeverityScorer::new(Arc::new(rules)).unwrap();

        let scores = scorer.raw_dimension_scores("she has WORD FINDING trouble");
        assert_eq!(scores.get(Dimension::Language), Some(0.4));
    }

    #[test]
    fn test_category_boundaries() {
        let scorer = SeverityScorer::default();
        let cases = [
            (0.0, SeverityCategory::Normal),
            (0.19, SeverityCategory::Normal),
            (0.2, SeverityCategory::Mild),
            (0.5, SeverityCategory::Moderate),
            (0.75, SeverityCategory::Severe),
            (1.0, SeverityCategory::Severe),
        ];
        for (scalar, expected) in cases {
            assert_eq!(scorer.categorize(scalar), expected, "scalar {scalar}");
        }
    }

    #[test]
    fn test_category_fallback_is_normal() {
        let scorer = SeverityScorer::default();
        assert_eq!(scorer.categorize(f64::NAN), SeverityCategory::Normal);
        assert_eq!(scorer.categorize(1.5), SeverityCategory::Normal);

        let mut rules = RuleSet::default();
        rules.severity_bins = vec![SeverityBin {
            category: SeverityCategory::Mild,
            lower: 0.0,
            upper: 0.5,
            inclusive_upper: false,
        }];
        let scorer = SeverityScorer::new(Arc::new(rules)).unwrap();
        assert_eq!(scorer.categorize(0.3), SeverityCategory::Mild);
        assert_eq!(scorer.categorize(0.9), SeverityCategory::Normal);
    }

    #[test]
    fn test_empty_history_same_as_none() {
        let scorer = SeverityScorer::default();
        let text = "我想不起来这是哪里，很迷惑";

        let a = scorer.score_with(text, None, &mut RngSource::seeded(3));
        let b = scorer.score_with(text, Some(&[][..]), &mut RngSource::seeded(3));

        assert_eq!(a.dimension_scores, b.dimension_scores);
        assert_eq!(a.severity_score, b.severity_score);
        assert_eq!(a.severity_category, b.severity_category);
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn test_history_blend() {
        let scorer = SeverityScorer::default();

        let mut older = DimensionScores::new();
        older.insert(Dimension::Memory, 0.5);
        let mut newer = DimensionScores::new();
        newer.insert(Dimension::Memory, 0.8);
        let history = vec![past(older), past(newer)];

        let current = scorer.raw_dimension_scores("");
        let adjusted = scorer.adjust_with_history(&current, &history);

        // weighted history (0.5*1 + 0.8*2) / 3 = 0.7; 0.7*0.1 + 0.3*0.7 = 0.28
        assert!((adjusted.get(Dimension::Memory).unwrap() - 0.28).abs() < 1e-9);
        // absent from every history entry
        assert_eq!(adjusted.get(Dimension::Orientation), Some(0.1));
    }

    #[test]
    fn test_history_skips_entries_missing_dimension() {
        let scorer = SeverityScorer::default();

        let mut first = DimensionScores::new();
        first.insert(Dimension::Attention, 0.9);
        let second = DimensionScores::new();
        let mut third = DimensionScores::new();
        third.insert(Dimension::Attention, 0.3);
        let history = vec![past(first), past(second), past(third)];

        let current = scorer.raw_dimension_scores("");
        let adjusted = scorer.adjust_with_history(&current, &history);

        // weights 1 and 2 over the two entries that have attention: (0.9 + 0.6) / 3 = 0.5
        let expected = 0.7 * 0.1 + 0.3 * 0.5;
        assert!((adjusted.get(Dimension::Attention).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_history_flows_into_assessment() {
        let scorer = SeverityScorer::default();
        let history = vec![past(DimensionScores::uniform(0.9))];

        let assessment = scorer.score_with("", Some(history.as_slice()), &mut FirstChoice);
        // 0.7*0.1 + 0.3*0.9 = 0.34 everywhere
        assert_eq!(assessment.dimension_scores.get(Dimension::Memory), Some(0.34));
        assert_eq!(assessment.severity_score, 0.34);
        assert_eq!(assessment.severity_category, SeverityCategory::Mild);
    }

    #[test]
    fn test_confidence_range() {
        let scorer = SeverityScorer::default();
        assert_eq!(scorer.score_with("", None, &mut FirstChoice).confidence, 0.5);

        let mut rng = RngSource::seeded(11);
        for _ in 0..200 {
            let c = scorer.score_with("", None, &mut rng).confidence;
            assert!((0.5..=0.9).contains(&c), "confidence {c}");
        }
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let mut rules = RuleSet::default();
        rules.dimensions.pop();
        assert!(SeverityScorer::new(Arc::new(rules)).is_err());
    }
}
