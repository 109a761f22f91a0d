//! Rule tables
//!
//! Immutable lookup tables shared by the scorer and the feature extractor:
//! - Per-dimension phrase rules and dimension weights
//! - Severity category bins
//! - Feature lexicon (regex patterns, keyword lists, pronouns)
//!
//! Tables are built once (built-in defaults or a config file), validated, and
//! then shared read-only behind an `Arc`.

use crate::error::AssessError;
use crate::types::{Dimension, SeverityCategory};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Score given to a dimension when none of its phrases matched
pub const DEFAULT_NOISE_FLOOR: f64 = 0.1;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A trigger phrase and the severity it signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRule {
    pub pattern: String,
    pub score: f64,
}

/// Phrase rules and aggregate weight for one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionRule {
    pub dimension: Dimension,
    pub weight: f64,
    pub phrases: Vec<PhraseRule>,
}

/// Half-open `[lower, upper)` interval mapped to a category.
/// `inclusive_upper` closes the interval on the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityBin {
    pub category: SeverityCategory,
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub inclusive_upper: bool,
}

impl SeverityBin {
    pub fn contains(&self, score: f64) -> bool {
        self.lower <= score && (score < self.upper || (self.inclusive_upper && score <= self.upper))
    }
}

/// Scoring rules: phrase tables, dimension weights and category bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,
    pub dimensions: Vec<DimensionRule>,
    pub severity_bins: Vec<SeverityBin>,
}

fn default_noise_floor() -> f64 {
    DEFAULT_NOISE_FLOOR
}

fn phrases(pairs: &[(&str, f64)]) -> Vec<PhraseRule> {
    pairs
        .iter()
        .map(|(pattern, score)| PhraseRule {
            pattern: pattern.to_string(),
            score: *score,
        })
        .collect()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            noise_floor: DEFAULT_NOISE_FLOOR,
            dimensions: vec![
                DimensionRule {
                    dimension: Dimension::Memory,
                    weight: 0.30,
                    phrases: phrases(&[
                        ("忘记", 0.6),
                        ("记不起来", 0.7),
                        ("想不起来", 0.65),
                        ("不记得", 0.55),
                        ("忘了", 0.5),
                    ]),
                },
                DimensionRule {
                    dimension: Dimension::Orientation,
                    weight: 0.25,
                    phrases: phrases(&[
                        ("不知道现在是几点", 0.5),
                        ("不清楚今天日期", 0.6),
                        ("不知道这是哪里", 0.75),
                        ("迷失", 0.8),
                        ("迷惑", 0.7),
                    ]),
                },
                DimensionRule {
                    dimension: Dimension::Language,
                    weight: 0.20,
                    phrases: phrases(&[
                        ("词不达意", 0.4),
                        ("表达困难", 0.5),
                        ("说不出来", 0.6),
                        ("词汇重复", 0.45),
                        ("句子不完整", 0.55),
                    ]),
                },
                DimensionRule {
                    dimension: Dimension::Attention,
                    weight: 0.15,
                    phrases: phrases(&[
                        ("注意力不集中", 0.5),
                        ("容易分心", 0.4),
                        ("无法专注", 0.65),
                        ("思绪混乱", 0.7),
                    ]),
                },
                DimensionRule {
                    dimension: Dimension::ProblemSolving,
                    weight: 0.10,
                    phrases: phrases(&[
                        ("解决问题困难", 0.55),
                        ("逻辑混乱", 0.6),
                        ("无法理解简单问题", 0.8),
                        ("决策困难", 0.5),
                    ]),
                },
            ],
            severity_bins: vec![
                SeverityBin {
                    category: SeverityCategory::Normal,
                    lower: 0.0,
                    upper: 0.2,
                    inclusive_upper: false,
                },
                SeverityBin {
                    category: SeverityCategory::Mild,
                    lower: 0.2,
                    upper: 0.5,
                    inclusive_upper: false,
                },
                SeverityBin {
                    category: SeverityCategory::Moderate,
                    lower: 0.5,
                    upper: 0.75,
                    inclusive_upper: false,
                },
                SeverityBin {
                    category: SeverityCategory::Severe,
                    lower: 0.75,
                    upper: 1.0,
                    inclusive_upper: true,
                },
            ],
        }
    }
}

impl RuleSet {
    /// Check the table invariants. Weights must sum to 1.0.
    pub fn validate(&self) -> Result<(), AssessError> {
        if self.dimensions.is_empty() {
            return Err(AssessError::InvalidRules("no dimension rules".to_string()));
        }
        if !unit_interval(self.noise_floor) {
            return Err(AssessError::InvalidRules(format!(
                "noise floor {} outside [0, 1]",
                self.noise_floor
            )));
        }

        let mut seen = HashSet::new();
        for rule in &self.dimensions {
            if !seen.insert(rule.dimension) {
                return Err(AssessError::InvalidRules(format!(
                    "dimension {} listed twice",
                    rule.dimension.as_str()
                )));
            }
            if !unit_interval(rule.weight) {
                return Err(AssessError::InvalidRules(format!(
                    "weight {} for {} outside [0, 1]",
                    rule.weight,
                    rule.dimension.as_str()
                )));
            }
            if let Some(bad) = rule.phrases.iter().find(|p| !unit_interval(p.score)) {
                return Err(AssessError::InvalidRules(format!(
                    "phrase '{}' score {} outside [0, 1]",
                    bad.pattern, bad.score
                )));
            }
            if rule.phrases.iter().any(|p| p.pattern.is_empty()) {
                return Err(AssessError::InvalidRules(format!(
                    "empty phrase in {} rules",
                    rule.dimension.as_str()
                )));
            }
        }

        let weight_sum = self.weight_sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AssessError::InvalidRules(format!(
                "dimension weights sum to {weight_sum}, expected 1.0"
            )));
        }

        if self.severity_bins.is_empty() {
            return Err(AssessError::InvalidRules("no severity bins".to_string()));
        }
        if let Some(bad) = self.severity_bins.iter().find(|b| b.lower >= b.upper) {
            return Err(AssessError::InvalidRules(format!(
                "severity bin {} has lower {} >= upper {}",
                bad.category.as_str(),
                bad.lower,
                bad.upper
            )));
        }

        Ok(())
    }

    pub fn weight_sum(&self) -> f64 {
        self.dimensions.iter().map(|r| r.weight).sum()
    }

    pub fn weight(&self, dimension: Dimension) -> Option<f64> {
        self.dimensions
            .iter()
            .find(|r| r.dimension == dimension)
            .map(|r| r.weight)
    }
}

/// Patterns and word lists used by the feature extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub incomplete_sentence_pattern: String,
    pub filler_words_pattern: String,
    pub hesitation_pattern: String,
    pub confused_reference_pattern: String,
    pub time_disorientation_keywords: Vec<String>,
    pub place_disorientation_keywords: Vec<String>,
    pub memory_issue_keywords: Vec<String>,
    pub pronouns: Vec<String>,
    /// Answers that carry no content ("I don't know")
    pub non_answers: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            incomplete_sentence_pattern: r"[^.!?]+[.!?]*$".to_string(),
            filler_words_pattern: r"\b(嗯|呃|那个|这个|就是|然后)\b".to_string(),
            hesitation_pattern: r"\.{3,}".to_string(),
            confused_reference_pattern: r"\b(那個|那个东西|那个人|那件事)\b".to_string(),
            time_disorientation_keywords: words(&[
                "昨天", "今天", "明天", "上周", "下周", "几点", "什么时候", "日期",
            ]),
            place_disorientation_keywords: words(&[
                "这里", "那里", "在哪里", "这是哪里", "回家", "医院",
            ]),
            memory_issue_keywords: words(&[
                "忘了", "记不起来", "想不起来", "不记得", "记得", "前几天",
            ]),
            pronouns: words(&[
                "我", "你", "他", "她", "它", "我們", "你們", "他們", "她們", "它們", "这个",
                "那个", "这些", "那些",
            ]),
            non_answers: words(&["不知道", "忘了", "记不起来", "不记得"]),
        }
    }
}

impl Lexicon {
    /// Reject blank patterns and blank list entries, naming the offending field
    pub fn validate(&self) -> Result<(), AssessError> {
        let patterns = [
            ("incomplete_sentence_pattern", &self.incomplete_sentence_pattern),
            ("filler_words_pattern", &self.filler_words_pattern),
            ("hesitation_pattern", &self.hesitation_pattern),
            ("confused_reference_pattern", &self.confused_reference_pattern),
        ];
        if let Some((name, _)) = patterns.iter().find(|(_, p)| p.trim().is_empty()) {
            return Err(AssessError::InvalidRules(format!("lexicon {name} is empty")));
        }

        let lists = [
            ("time_disorientation_keywords", &self.time_disorientation_keywords),
            ("place_disorientation_keywords", &self.place_disorientation_keywords),
            ("memory_issue_keywords", &self.memory_issue_keywords),
            ("pronouns", &self.pronouns),
            ("non_answers", &self.non_answers),
        ];
        for (name, list) in lists {
            if let Some(index) = list.iter().position(|w| w.trim().is_empty()) {
                return Err(AssessError::InvalidRules(format!(
                    "empty entry at index {index} in lexicon {name}"
                )));
            }
        }

        Ok(())
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
