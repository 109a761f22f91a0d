//! Pipeline orchestration
//!
//! This module provides the public API for cogwatch.
//! It wires the scorer, dialogue agent, report generator and trend analyzer
//! into a one-shot call and a stateful per-conversation processor.

use crate::config::EngineConfig;
use crate::dialogue::DialogueAgent;
use crate::error::AssessError;
use crate::features::FeatureExtractor;
use crate::history::HistoryStore;
use crate::random::RngSource;
use crate::report::ReportGenerator;
use crate::scorer::SeverityScorer;
use crate::trend::TrendAnalyzer;
use crate::types::{Assessment, ProgressSummary, TrendResult, TurnResponse};
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Score one utterance with the built-in tables and no history.
///
/// # Returns
/// Pretty-printed JSON of the [`Assessment`]
///
/// # Example
/// ```ignore
/// let json = assess_to_json("我最近总是忘记东西".to_string())?;
/// ```
pub fn assess_to_json(text: String) -> Result<String, AssessError> {
    let scorer = SeverityScorer::default();
    let assessment = scorer.score(&text, None);
    Ok(serde_json::to_string_pretty(&assessment)?)
}

/// Stateful processor for one patient conversation.
///
/// Keeps the assessment history and utterance transcript across turns so
/// every turn is scored against what came before.
pub struct CareProcessor {
    conversation_id: Uuid,
    agent: DialogueAgent,
    reporter: ReportGenerator,
    trend: TrendAnalyzer,
    history: HistoryStore,
    transcript: Vec<String>,
    rng: RngSource<StdRng>,
}

impl Default for CareProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CareProcessor {
    /// Create a new processor with the built-in tables
    pub fn new() -> Self {
        Self {
            conversation_id: Uuid::new_v4(),
            agent: DialogueAgent::default(),
            reporter: ReportGenerator::default(),
            trend: TrendAnalyzer::default(),
            history: HistoryStore::default(),
            transcript: Vec::new(),
            rng: RngSource::from_entropy(),
        }
    }

    /// Create a processor from a configuration, validating every table
    pub fn from_config(config: &EngineConfig) -> Result<Self, AssessError> {
        config.validate()?;

        let scorer = SeverityScorer::new(Arc::new(config.rules.clone()))?;
        let agent = DialogueAgent::new(scorer, Arc::new(config.dialogue.clone()))?;
        let reporter = ReportGenerator::new(Arc::new(config.report.clone()))?;
        let extractor = FeatureExtractor::new(Arc::new(config.lexicon.clone()))?;

        let rng = match config.engine.seed {
            Some(seed) => RngSource::seeded(seed),
            None => RngSource::from_entropy(),
        };

        Ok(Self {
            conversation_id: Uuid::new_v4(),
            agent,
            reporter,
            trend: TrendAnalyzer::new(extractor),
            history: HistoryStore::new(config.engine.history_window),
            transcript: Vec::new(),
            rng,
        })
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Patient utterances in the order they were received
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Score an utterance against the stored history and compose a reply.
    ///
    /// The new assessment and utterance are recorded for later turns.
    pub fn take_turn(&mut self, text: &str) -> Result<TurnResponse, AssessError> {
        require_text(text)?;

        let prior = self.history.entries();
        let turn = self.agent.take_turn_with(text, Some(prior.as_slice()), &mut self.rng);

        self.history.push(turn.assessment.clone());
        self.transcript.push(text.to_string());

        debug!(
            conversation_id = %self.conversation_id,
            turns = self.transcript.len(),
            "turn recorded"
        );

        Ok(TurnResponse {
            conversation_id: self.conversation_id,
            response: turn.reply,
            assessment: turn.assessment,
        })
    }

    /// Same as [`take_turn`](Self::take_turn), returned as JSON
    pub fn take_turn_json(&mut self, text: &str) -> Result<String, AssessError> {
        let response = self.take_turn(text)?;
        Ok(serde_json::to_string(&response)?)
    }

    /// Language decline indicators over the transcript
    pub fn decline_indicators(&self) -> TrendResult {
        self.trend.compute_decline_indicators(self.transcript.as_slice())
    }

    /// Narrative report for the latest assessment, if any
    pub fn report(&mut self) -> Option<String> {
        let latest = self.history.latest()?.clone();
        Some(self.report_for(&latest))
    }

    /// Narrative report for an arbitrary assessment
    pub fn report_for(&mut self, assessment: &Assessment) -> String {
        self.reporter.generate_with(assessment, &mut self.rng)
    }

    /// Severity and dimension trends over the stored history
    pub fn progress(&self) -> ProgressSummary {
        TrendAnalyzer::progress(&self.history.entries())
    }

    /// Score against the stored history without recording anything
    pub fn assess(&mut self, text: &str) -> Result<Assessment, AssessError> {
        require_text(text)?;

        let prior = self.history.entries();
        Ok(self
            .agent
            .scorer()
            .score_with(text, Some(prior.as_slice()), &mut self.rng))
    }

    /// Load history state from JSON, keeping this processor's window size
    pub fn load_history(&mut self, json: &str) -> Result<(), AssessError> {
        let loaded = HistoryStore::from_json(json)?;
        self.history = HistoryStore::from_assessments(loaded.entries(), self.history.window_size());
        info!(entries = self.history.len(), "history loaded");
        Ok(())
    }

    /// Save history state to JSON
    pub fn save_history(&self) -> Result<String, AssessError> {
        Ok(self.history.to_json()?)
    }
}

fn require_text(text: &str) -> Result<(), AssessError> {
    if text.trim().is_empty() {
        return Err(AssessError::EmptyInput("patient utterance is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dimension, SeverityCategory};
    use pretty_assertions::assert_eq;

    const FORGETFUL: &str = "我最近总是忘记东西，想不起来昨天做了什么";
    const CALM: &str = "今天天气很好，我去公园散步了";

    fn seeded(seed: u64) -> CareProcessor {
        let mut config = EngineConfig::default();
        config.engine.seed = Some(seed);
        CareProcessor::from_config(&config).unwrap()
    }

    #[test]
    fn test_assess_to_json() {
        let json = assess_to_json(FORGETFUL.to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["severity_category"], "mild");
        // mean of 忘记 (0.6) and 想不起来 (0.65) is exactly 0.625
        assert_eq!(payload["dimension_scores"]["memory"], 0.62);
        let confidence = payload["confidence"].as_f64().unwrap();
        assert!((0.5..=0.9).contains(&confidence));
    }

    #[test]
    fn test_processor_records_turns() {
        let mut processor = CareProcessor::new();

        let first = processor.take_turn(CALM).unwrap();
        let second = processor.take_turn(FORGETFUL).unwrap();

        assert_eq!(first.conversation_id, processor.conversation_id());
        assert_eq!(second.conversation_id, processor.conversation_id());
        assert_eq!(processor.history().len(), 2);
        assert_eq!(processor.transcript(), &[CALM.to_string(), FORGETFUL.to_string()]);
        assert!(!second.response.is_empty());
    }

    #[test]
    fn test_turns_blend_history() {
        let mut processor = CareProcessor::new();
        processor.take_turn(CALM).unwrap();
        let second = processor.take_turn(FORGETFUL).unwrap();

        // 0.7 * 0.625 + 0.3 * 0.1
        let memory = second.assessment.dimension_scores.get(Dimension::Memory);
        assert_eq!(memory, Some(0.47));
    }

    #[test]
    fn test_empty_utterance_rejected() {
        let mut processor = CareProcessor::new();
        let result = processor.take_turn("   ");

        assert!(matches!(result, Err(AssessError::EmptyInput(_))));
        assert!(processor.history().is_empty());
        assert!(processor.transcript().is_empty());
    }

    #[test]
    fn test_seeded_processors_agree() {
        let mut a = seeded(7);
        let mut b = seeded(7);

        let turn_a = a.take_turn(FORGETFUL).unwrap();
        let turn_b = b.take_turn(FORGETFUL).unwrap();

        assert_eq!(turn_a.response, turn_b.response);
        assert_eq!(turn_a.assessment.confidence, turn_b.assessment.confidence);
        assert_eq!(a.report(), b.report());
    }

    #[test]
    fn test_decline_needs_two_turns() {
        let mut processor = CareProcessor::new();
        processor.take_turn(CALM).unwrap();
        assert!(!processor.decline_indicators().sufficient_data);

        processor.take_turn(FORGETFUL).unwrap();
        let trend = processor.decline_indicators();
        assert!(trend.sufficient_data);
        assert!(trend.slopes.is_some());
    }

    #[test]
    fn test_report_follows_latest() {
        let mut processor = CareProcessor::new();
        assert!(processor.report().is_none());

        processor.take_turn(CALM).unwrap();
        let report = processor.report().unwrap();
        assert!(report.contains("建议："));
    }

    #[test]
    fn test_progress() {
        let mut processor = CareProcessor::new();
        processor.take_turn(CALM).unwrap();
        processor.take_turn(CALM).unwrap();

        let progress = processor.progress();
        assert!(progress.sufficient_data);
        assert_eq!(progress.severity_scores.len(), 2);
    }

    #[test]
    fn test_history_serialization() {
        let mut processor = CareProcessor::new();
        processor.take_turn(FORGETFUL).unwrap();

        let saved = processor.save_history().unwrap();

        let mut restored = CareProcessor::new();
        restored.load_history(&saved).unwrap();
        assert_eq!(restored.history().entries(), processor.history().entries());

        restored.take_turn(CALM).unwrap();
        assert_eq!(restored.history().len(), 2);
    }

    #[test]
    fn test_invalid_history_json() {
        let mut processor = CareProcessor::new();
        let result = processor.load_history("not valid json");
        assert!(matches!(result, Err(AssessError::JsonError(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.rules.dimensions.pop();
        assert!(CareProcessor::from_config(&config).is_err());
    }

    #[test]
    fn test_assess_does_not_record() {
        let mut processor = CareProcessor::new();
        let assessment = processor.assess(CALM).unwrap();

        assert_eq!(assessment.severity_category, SeverityCategory::Normal);
        assert!(processor.history().is_empty());
        assert!(processor.assess("").is_err());
    }
}
