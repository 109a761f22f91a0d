//! Text feature extraction
//!
//! This module turns a raw utterance into a flat [`FeatureVector`]:
//! - Basic counts (words, characters, sentences)
//! - Language error pattern counts (repetition, fillers, hesitation, ...)
//! - Semantic indicator keyword hits
//! - Lexical diversity and pronoun ratio
//!
//! All features are computed on a normalized copy of the text: lowercased,
//! whitespace collapsed, and everything except word characters, whitespace and
//! (ASCII or full-width) punctuation stripped.

use crate::error::AssessError;
use crate::rules::Lexicon;
use crate::types::{Coherence, FeatureVector};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s,.!?;:，。！？；：]").unwrap());

static SENTENCE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?。！？]").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Lowercase, collapse whitespace, strip non-word non-punctuation characters
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = WHITESPACE_RE.replace_all(&lowered, " ");
    STRIP_RE.replace_all(collapsed.trim(), "").into_owned()
}

/// Feature extractor for patient utterances
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    lexicon: Arc<Lexicon>,
    incomplete_sentence: Regex,
    filler_words: Regex,
    hesitation: Regex,
    confused_reference: Regex,
    pronouns: HashSet<String>,
    non_answers: HashSet<String>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Arc::new(Lexicon::default())).expect("built-in lexicon patterns compile")
    }
}

impl FeatureExtractor {
    /// Compile the lexicon patterns
    pub fn new(lexicon: Arc<Lexicon>) -> Result<Self, AssessError> {
        Ok(Self {
            incomplete_sentence: Regex::new(&lexicon.incomplete_sentence_pattern)?,
            filler_words: Regex::new(&lexicon.filler_words_pattern)?,
            hesitation: Regex::new(&lexicon.hesitation_pattern)?,
            confused_reference: Regex::new(&lexicon.confused_reference_pattern)?,
            pronouns: lexicon.pronouns.iter().cloned().collect(),
            non_answers: lexicon.non_answers.iter().cloned().collect(),
            lexicon,
        })
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Extract the full feature vector from raw text
    pub fn extract(&self, text: &str) -> FeatureVector {
        let text = normalize_text(text);
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let word_count = tokens.len() as u32;
        let char_count = text.chars().count() as u32;
        let sentence_count = count_sentences(&text);

        FeatureVector {
            word_count,
            char_count,
            sentence_count,
            avg_words_per_sentence: word_count as f64 / sentence_count as f64,
            repetition_count: count_repetitions(&text),
            incomplete_sentence_count: count_matches(&self.incomplete_sentence, &text),
            filler_words_count: count_matches(&self.filler_words, &text),
            hesitation_count: count_matches(&self.hesitation, &text),
            confused_reference_count: count_matches(&self.confused_reference, &text),
            time_disorientation_score: count_keywords(
                &self.lexicon.time_disorientation_keywords,
                &text,
            ),
            place_disorientation_score: count_keywords(
                &self.lexicon.place_disorientation_keywords,
                &text,
            ),
            memory_issue_score: count_keywords(&self.lexicon.memory_issue_keywords, &text),
            lexical_diversity: lexical_diversity(&tokens),
            pronoun_ratio: self.pronoun_ratio(&tokens, word_count),
        }
    }

    /// Compare a prompt with the patient's answer
    pub fn analyze_response_coherence(&self, question: &str, answer: &str) -> Coherence {
        let question = normalize_text(question);
        let answer = normalize_text(answer);
        let question_tokens: HashSet<&str> = question.split_whitespace().collect();
        let answer_tokens: HashSet<&str> = answer.split_whitespace().collect();

        let overlap = question_tokens.intersection(&answer_tokens).count();
        let overlap_ratio = overlap as f64 / question_tokens.len().max(1) as f64;

        // An empty answer counts as a non-answer
        let substantive_response = !answer_tokens
            .iter()
            .all(|token| self.non_answers.contains(*token));

        Coherence {
            overlap_ratio,
            substantive_response,
            response_length: answer_tokens.len(),
        }
    }

    fn pronoun_ratio(&self, tokens: &[&str], word_count: u32) -> f64 {
        let pronoun_count = tokens
            .iter()
            .filter(|token| self.pronouns.contains(**token))
            .count();
        pronoun_count as f64 / word_count.max(1) as f64
    }
}

/// Count terminal punctuation marks, floored at 1
fn count_sentences(text: &str) -> u32 {
    let pieces = SENTENCE_SPLIT_RE.split(text).count() as u32;
    pieces.saturating_sub(1).max(1)
}

/// Count runs of the same word repeated back to back (`"好 好 好"` is one run).
/// Words separated by anything other than whitespace do not form a run.
fn count_repetitions(text: &str) -> u32 {
    let mut runs = 0;
    let mut in_run = false;
    let mut previous: Option<regex::Match> = None;

    for word in WORD_RE.find_iter(text) {
        let repeated = previous.is_some_and(|prev| {
            prev.as_str() == word.as_str()
                && text[prev.end()..word.start()]
                    .chars()
                    .all(char::is_whitespace)
        });

        if repeated && !in_run {
            runs += 1;
        }
        in_run = repeated;
        previous = Some(word);
    }

    runs
}

fn count_matches(pattern: &Regex, text: &str) -> u32 {
    pattern.find_iter(text).count() as u32
}

/// Number of keywords contained in the text (substring match, each keyword counted once)
fn count_keywords(keywords: &[String], text: &str) -> u32 {
    keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .count() as u32
}

/// Distinct tokens over total tokens, 0 for no tokens
fn lexical_diversity(tokens: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&&str> = tokens.iter().collect();
    distinct.len() as f64 / tokens.len() as f64
}
