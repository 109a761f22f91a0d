//! Trend estimation
//!
//! Linear trends over time-ordered utterances and assessments. A positive
//! slope means the metric increases over time; whether that is a decline
//! depends on the metric (more repetition is worse, less lexical diversity is
//! worse).

use crate::features::FeatureExtractor;
use crate::types::{
    Assessment, DeclineSlopes, Dimension, FeatureVector, ProgressSummary, TrendResult,
};
use std::collections::BTreeMap;

/// Minimum number of samples needed for a trend
pub const MIN_TREND_SAMPLES: usize = 2;

/// Trend analyzer for language decline and assessment progress
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    extractor: FeatureExtractor,
}

impl TrendAnalyzer {
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self { extractor }
    }

    /// Ordinary least-squares slope of `values` against their index.
    ///
    /// Returns 0 for fewer than two values.
    pub fn compute_trend(values: &[f64]) -> f64 {
        let n = values.len();
        if n < MIN_TREND_SAMPLES {
            return 0.0;
        }

        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = values.iter().sum::<f64>() / n as f64;

        let mut covariance = 0.0;
        let mut variance = 0.0;
        for (i, y) in values.iter().enumerate() {
            let dx = i as f64 - x_mean;
            covariance += dx * (y - y_mean);
            variance += dx * dx;
        }

        // n >= 2 keeps the variance positive
        covariance / variance
    }

    /// Language decline indicators across time-ordered text samples.
    ///
    /// Fewer than two samples yields [`TrendResult::insufficient`].
    pub fn compute_decline_indicators<S: AsRef<str>>(&self, samples: &[S]) -> TrendResult {
        if samples.len() < MIN_TREND_SAMPLES {
            return TrendResult::insufficient();
        }

        let features: Vec<_> = samples
            .iter()
            .map(|s| self.extractor.extract(s.as_ref()))
            .collect();

        let series = |f: fn(&FeatureVector) -> f64| -> Vec<f64> {
            features.iter().map(f).collect()
        };

        let lexical_diversity_change = Self::compute_trend(&series(|f| f.lexical_diversity));
        let sentence_length_change = Self::compute_trend(&series(|f| f.avg_words_per_sentence));
        let repetition_change = Self::compute_trend(&series(|f| f.repetition_count as f64));
        let confusion_change = Self::compute_trend(&series(|f| f.confused_reference_count as f64));

        let overall_decline_score = overall_decline(
            lexical_diversity_change,
            sentence_length_change,
            repetition_change,
            confusion_change,
        );

        TrendResult {
            sufficient_data: true,
            slopes: Some(DeclineSlopes {
                lexical_diversity_change,
                sentence_length_change,
                repetition_change,
                confusion_change,
                overall_decline_score,
            }),
        }
    }

    /// Severity and per-dimension trends over an assessment history
    /// (ascending time). A dimension missing from an entry counts as 0.
    pub fn progress(history: &[Assessment]) -> ProgressSummary {
        let timestamps = history.iter().map(|a| a.timestamp).collect();
        let severity_scores: Vec<f64> = history.iter().map(|a| a.severity_score).collect();
        let severity_slope = Self::compute_trend(&severity_scores);

        let mut dimension_series = BTreeMap::new();
        let mut dimension_slopes = BTreeMap::new();
        for dimension in Dimension::ALL {
            let values: Vec<f64> = history
                .iter()
                .map(|a| a.dimension_scores.get(dimension).unwrap_or(0.0))
                .collect();
            dimension_slopes.insert(dimension, Self::compute_trend(&values));
            dimension_series.insert(dimension, values);
        }

        ProgressSummary {
            sufficient_data: history.len() >= MIN_TREND_SAMPLES,
            timestamps,
            severity_scores,
            severity_slope,
            dimension_series,
            dimension_slopes,
        }
    }
}

/// Mean of the slopes that point towards decline.
///
/// Repetition and confusion decline when rising; lexical diversity and
/// sentence length decline when falling. With no qualifying slope the score
/// is 0, which does not distinguish "stable" from "mixed signals".
fn overall_decline(
    lexical_diversity_change: f64,
    sentence_length_change: f64,
    repetition_change: f64,
    confusion_change: f64,
) -> f64 {
    let candidates = [
        (lexical_diversity_change, lexical_diversity_change < 0.0),
        (sentence_length_change, sentence_length_change < 0.0),
        (repetition_change, repetition_change > 0.0),
        (confusion_change, confusion_change > 0.0),
    ];

    let negative: Vec<f64> = candidates
        .iter()
        .filter(|(_, declining)| *declining)
        .map(|(slope, _)| *slope)
        .collect();

    if negative.is_empty() {
        return 0.0;
    }
    negative.iter().sum::<f64>() / negative.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DimensionScores, SeverityCategory};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const RICH: &str = "我 今天 去 公园 散步 看到 很多 花";
    const POOR: &str = "我 我 去 去 那个人";

    #[test]
    fn test_trend_of_short_series_is_zero() {
        assert_eq!(TrendAnalyzer::compute_trend(&[]), 0.0);
        assert_eq!(TrendAnalyzer::compute_trend(&[3.5]), 0.0);
    }

    #[test]
    fn test_trend_slope() {
        assert!((TrendAnalyzer::compute_trend(&[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
        assert!((TrendAnalyzer::compute_trend(&[3.0, 1.0]) + 2.0).abs() < 1e-12);
        assert_eq!(TrendAnalyzer::compute_trend(&[0.4, 0.4, 0.4]), 0.0);
        let slope = TrendAnalyzer::compute_trend(&[1.0, 3.5, 5.0, 7.5]);
        assert!((slope - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_decline_needs_two_samples() {
        let analyzer = TrendAnalyzer::default();

        let empty: [&str; 0] = [];
        assert_eq!(analyzer.compute_decline_indicators(&empty), TrendResult::insufficient());
        assert_eq!(analyzer.compute_decline_indicators(&[RICH]), TrendResult::insufficient());
    }

    #[test]
    fn test_decline_indicators() {
        let analyzer = TrendAnalyzer::default();
        let result = analyzer.compute_decline_indicators(&[RICH, POOR]);

        assert!(result.sufficient_data);
        let slopes = result.slopes.unwrap();
        assert!((slopes.lexical_diversity_change + 0.4).abs() < 1e-9);
        assert!((slopes.sentence_length_change + 3.0).abs() < 1e-9);
        assert!((slopes.repetition_change - 2.0).abs() < 1e-9);
        assert!((slopes.confusion_change - 1.0).abs() < 1e-9);
        // (-0.4 - 3.0 + 2.0 + 1.0) / 4
        assert!((slopes.overall_decline_score + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_improvement_scores_zero() {
        let analyzer = TrendAnalyzer::default();
        let result = analyzer.compute_decline_indicators(&[POOR, RICH]);

        let slopes = result.slopes.unwrap();
        assert_eq!(slopes.overall_decline_score, 0.0);
    }

    #[test]
    fn test_decline_serialization_is_flat() {
        let analyzer = TrendAnalyzer::default();
        let json =
            serde_json::to_value(analyzer.compute_decline_indicators(&[RICH, POOR])).unwrap();

        assert_eq!(json["sufficient_data"], true);
        assert!(json["overall_decline_score"].is_number());
        assert!(json["confusion_change"].is_number());
    }

    fn assessment(day: i64, memory: Option<f64>, severity: f64) -> Assessment {
        let mut scores = DimensionScores::uniform(0.1);
        if let Some(m) = memory {
            scores.insert(Dimension::Memory, m);
        } else {
            scores = Dimension::ALL
                .iter()
                .filter(|d| **d != Dimension::Memory)
                .map(|d| (*d, 0.1))
                .collect();
        }
        Assessment {
            severity_score: severity,
            severity_category: SeverityCategory::Mild,
            confidence: 0.7,
            dimension_scores: scores,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(day),
        }
    }

    #[test]
    fn test_progress_summary() {
        let history = vec![
            assessment(0, Some(0.2), 0.2),
            assessment(1, None, 0.3),
            assessment(2, Some(0.6), 0.4),
        ];
        let summary = TrendAnalyzer::progress(&history);

        assert!(summary.sufficient_data);
        assert_eq!(summary.timestamps.len(), 3);
        assert!((summary.severity_slope - 0.1).abs() < 1e-9);
        assert_eq!(summary.dimension_series[&Dimension::Memory], vec![0.2, 0.0, 0.6]);
        assert_eq!(summary.dimension_slopes[&Dimension::Attention], 0.0);
    }

    #[test]
    fn test_progress_single_entry() {
        let summary = TrendAnalyzer::progress(&[assessment(0, Some(0.5), 0.3)]);
        assert!(!summary.sufficient_data);
        assert_eq!(summary.severity_slope, 0.0);
    }
}
