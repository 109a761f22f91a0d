//! Narrative report generation
//!
//! Renders an [`Assessment`] as text: a randomly picked opening sentence for
//! the category, one observation per elevated dimension, and the category's
//! fixed recommendation.

use crate::error::AssessError;
use crate::random::{choose, Randomness, RngSource};
use crate::templates::ReportTemplates;
use crate::types::Assessment;
use std::sync::Arc;

/// Dimension scores strictly above this get an observation line
pub const OBSERVATION_THRESHOLD: f64 = 0.5;

/// Report generator over shared templates
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    templates: Arc<ReportTemplates>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            templates: Arc::new(ReportTemplates::default()),
        }
    }
}

impl ReportGenerator {
    pub fn new(templates: Arc<ReportTemplates>) -> Result<Self, AssessError> {
        templates.validate()?;
        Ok(Self { templates })
    }

    pub fn templates(&self) -> &ReportTemplates {
        &self.templates
    }

    /// Generate a report using the thread-local random source
    pub fn generate(&self, assessment: &Assessment) -> String {
        self.generate_with(assessment, &mut RngSource::thread())
    }

    /// Generate a report with an explicit random source
    pub fn generate_with(&self, assessment: &Assessment, rng: &mut dyn Randomness) -> String {
        let category = assessment.severity_category;
        let mut report = choose(rng, self.templates.narratives.get(category))
            .cloned()
            .unwrap_or_default();

        let observations: Vec<&str> = assessment
            .dimension_scores
            .iter()
            .filter(|(_, score)| *score > OBSERVATION_THRESHOLD)
            .map(|(dimension, _)| self.templates.observations.get(dimension).as_str())
            .collect();

        if !observations.is_empty() {
            report.push_str("\n\n");
            report.push_str(&self.templates.observations_heading);
            report.push('\n');
            report.push_str(&observations.join("\n"));
        }

        report.push_str("\n\n");
        report.push_str(&self.templates.recommendation_heading);
        report.push_str(self.templates.recommendations.get(category));

        report
    }
}
