//! Core types for the cogwatch engine
//!
//! This module defines the value objects that flow between the stages of the
//! engine: text features, dimension scores, assessments, trend results and
//! dialogue turns. All of them are created fresh per call and are safe to
//! serialize for storage by the caller.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Cognitive domain scored independently for every utterance.
///
/// Declaration order is the iteration order used everywhere (scoring, report
/// observations, export columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Memory,
    Orientation,
    Language,
    Attention,
    ProblemSolving,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Memory,
        Dimension::Orientation,
        Dimension::Language,
        Dimension::Attention,
        Dimension::ProblemSolving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Memory => "memory",
            Dimension::Orientation => "orientation",
            Dimension::Language => "language",
            Dimension::Attention => "attention",
            Dimension::ProblemSolving => "problem_solving",
        }
    }
}

/// Coarse severity bucket derived from the weighted severity scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityCategory {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl SeverityCategory {
    pub const ALL: [SeverityCategory; 4] = [
        SeverityCategory::Normal,
        SeverityCategory::Mild,
        SeverityCategory::Moderate,
        SeverityCategory::Severe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityCategory::Normal => "normal",
            SeverityCategory::Mild => "mild",
            SeverityCategory::Moderate => "moderate",
            SeverityCategory::Severe => "severe",
        }
    }

    /// Moderate and severe patients get the simplified dialogue register
    pub fn needs_simplified_language(&self) -> bool {
        matches!(self, SeverityCategory::Moderate | SeverityCategory::Severe)
    }
}

/// Per-dimension scores in [0, 1].
///
/// Entries produced by the scorer are total over the weight table. Entries
/// loaded from storage may be partial, which is why this is a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionScores(BTreeMap<Dimension, f64>);

impl DimensionScores {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Every dimension set to the same value
    pub fn uniform(value: f64) -> Self {
        Self(Dimension::ALL.iter().map(|d| (*d, value)).collect())
    }

    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        self.0.get(&dimension).copied()
    }

    pub fn insert(&mut self, dimension: Dimension, score: f64) {
        self.0.insert(dimension, score);
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.0.contains_key(&dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        self.0.iter().map(|(d, s)| (*d, *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy with every score rounded to two decimals
    pub fn rounded(&self) -> Self {
        Self(self.0.iter().map(|(d, s)| (*d, round2(*s))).collect())
    }
}

impl FromIterator<(Dimension, f64)> for DimensionScores {
    fn from_iter<I: IntoIterator<Item = (Dimension, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Structured, confidence-scored severity assessment of one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Weighted severity scalar (0-1)
    pub severity_score: f64,
    /// Bucket derived from the unrounded scalar
    pub severity_category: SeverityCategory,
    /// Placeholder uncertainty in [0.5, 0.9]; not a calibrated probability
    pub confidence: f64,
    /// Per-dimension scores (0-1)
    pub dimension_scores: DimensionScores,
    /// When the assessment was computed (offset-less input is taken as UTC)
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Flat text features extracted from one utterance.
///
/// The key set is fixed; see [`FEATURE_KEYS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub word_count: u32,
    pub char_count: u32,
    /// Terminal punctuation count, floored at 1
    pub sentence_count: u32,
    pub avg_words_per_sentence: f64,
    pub repetition_count: u32,
    pub incomplete_sentence_count: u32,
    pub filler_words_count: u32,
    pub hesitation_count: u32,
    pub confused_reference_count: u32,
    pub time_disorientation_score: u32,
    pub place_disorientation_score: u32,
    pub memory_issue_score: u32,
    /// Distinct tokens / total tokens (0 without tokens)
    pub lexical_diversity: f64,
    /// Pronoun tokens / max(1, word_count)
    pub pronoun_ratio: f64,
}

/// Names of every feature produced by the extractor, in output order
pub const FEATURE_KEYS: [&str; 14] = [
    "word_count",
    "char_count",
    "sentence_count",
    "avg_words_per_sentence",
    "repetition_count",
    "incomplete_sentence_count",
    "filler_words_count",
    "hesitation_count",
    "confused_reference_count",
    "time_disorientation_score",
    "place_disorientation_score",
    "memory_issue_score",
    "lexical_diversity",
    "pronoun_ratio",
];

impl FeatureVector {
    /// Look up a feature by name
    pub fn get(&self, key: &str) -> Option<f64> {
        let value = match key {
            "word_count" => self.word_count as f64,
            "char_count" => self.char_count as f64,
            "sentence_count" => self.sentence_count as f64,
            "avg_words_per_sentence" => self.avg_words_per_sentence,
            "repetition_count" => self.repetition_count as f64,
            "incomplete_sentence_count" => self.incomplete_sentence_count as f64,
            "filler_words_count" => self.filler_words_count as f64,
            "hesitation_count" => self.hesitation_count as f64,
            "confused_reference_count" => self.confused_reference_count as f64,
            "time_disorientation_score" => self.time_disorientation_score as f64,
            "place_disorientation_score" => self.place_disorientation_score as f64,
            "memory_issue_score" => self.memory_issue_score as f64,
            "lexical_diversity" => self.lexical_diversity,
            "pronoun_ratio" => self.pronoun_ratio,
            _ => return None,
        };
        Some(value)
    }

    /// Name → value mapping over the full key set
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        FEATURE_KEYS
            .iter()
            .filter_map(|k| self.get(k).map(|v| (*k, v)))
            .collect()
    }
}

/// Per-metric slopes over a time-ordered series of utterances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclineSlopes {
    pub lexical_diversity_change: f64,
    pub sentence_length_change: f64,
    pub repetition_change: f64,
    pub confusion_change: f64,
    /// Mean of the slopes pointing towards decline, 0 when none do
    pub overall_decline_score: f64,
}

/// Language decline indicators.
///
/// With fewer than two samples this serializes to exactly
/// `{"sufficient_data": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub sufficient_data: bool,
    #[serde(flatten)]
    pub slopes: Option<DeclineSlopes>,
}

impl TrendResult {
    pub fn insufficient() -> Self {
        Self {
            sufficient_data: false,
            slopes: None,
        }
    }
}

/// Overlap between a prompt and the patient's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coherence {
    /// Shared tokens / max(1, prompt tokens)
    pub overlap_ratio: f64,
    /// False when the answer only contains non-answers ("不知道", ...)
    pub substantive_response: bool,
    /// Distinct answer tokens
    pub response_length: usize,
}

/// Severity and per-dimension series over a patient's assessment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub sufficient_data: bool,
    pub timestamps: Vec<DateTime<Utc>>,
    pub severity_scores: Vec<f64>,
    pub severity_slope: f64,
    pub dimension_series: BTreeMap<Dimension, Vec<f64>>,
    pub dimension_slopes: BTreeMap<Dimension, f64>,
}

/// One dialogue turn as produced by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub reply: String,
    pub assessment: Assessment,
}

/// Turn envelope handed to the request layer for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub conversation_id: Uuid,
    pub response: String,
    pub assessment: Assessment,
}

/// Round to two decimals at the response boundary.
///
/// Rounds on the exact decimal value with ties to even, so 0.625 becomes 0.62.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Accept RFC 3339 timestamps, and offset-less ISO timestamps read as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
}
