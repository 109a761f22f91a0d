//! Dialogue orchestration
//!
//! One conversational turn: score the utterance, then compose a reply whose
//! register depends on the severity category.

use crate::error::AssessError;
use crate::random::{choose, Randomness, RngSource};
use crate::scorer::SeverityScorer;
use crate::templates::DialogueTemplates;
use crate::types::{Assessment, Turn};
use std::sync::Arc;

/// Scripted conversational agent
#[derive(Debug, Clone)]
pub struct DialogueAgent {
    scorer: SeverityScorer,
    templates: Arc<DialogueTemplates>,
}

impl Default for DialogueAgent {
    fn default() -> Self {
        Self {
            scorer: SeverityScorer::default(),
            templates: Arc::new(DialogueTemplates::default()),
        }
    }
}

impl DialogueAgent {
    pub fn new(
        scorer: SeverityScorer,
        templates: Arc<DialogueTemplates>,
    ) -> Result<Self, AssessError> {
        templates.validate()?;
        Ok(Self { scorer, templates })
    }

    pub fn scorer(&self) -> &SeverityScorer {
        &self.scorer
    }

    /// Take one turn without history, using the thread-local random source
    pub fn take_turn(&self, patient_text: &str) -> Turn {
        self.take_turn_with(patient_text, None, &mut RngSource::thread())
    }

    /// Take one turn with optional prior assessments and an explicit random source
    pub fn take_turn_with(
        &self,
        patient_text: &str,
        history: Option<&[Assessment]>,
        rng: &mut dyn Randomness,
    ) -> Turn {
        let assessment = self.scorer.score_with(patient_text, history, rng);

        let acknowledgment = pick(rng, &self.templates.acknowledgments);

        let (encouragement, follow_up) = if assessment.severity_category.needs_simplified_language()
        {
            (
                pick(rng, &self.templates.simple_encouragements),
                pick(rng, &self.templates.simple_questions),
            )
        } else {
            (
                pick(rng, &self.templates.encouragements),
                self.generate_question(rng),
            )
        };

        Turn {
            reply: format!("{acknowledgment} {encouragement}\n\n{follow_up}"),
            assessment,
        }
    }

    /// Open-ended question from the prompt bank
    pub fn generate_question(&self, rng: &mut dyn Randomness) -> String {
        pick(rng, &self.templates.question_bank)
    }
}

fn pick(rng: &mut dyn Randomness, pool: &[String]) -> String {
    choose(rng, pool).cloned().unwrap_or_default()
}
