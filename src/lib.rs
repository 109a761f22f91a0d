//! cogwatch - Text-feature extraction and cognitive severity scoring engine
//!
//! cogwatch turns free-text patient utterances into structured cognitive
//! assessments through a deterministic pipeline: phrase matching per
//! dimension → history blend → weighted severity scalar → category binning.
//! Around that core it extracts linguistic features, tracks language decline
//! across utterances, renders narrative reports and composes dialogue replies.
//!
//! ## Modules
//!
//! - **Scoring**: [`scorer`], [`rules`] and [`history`] turn text into [`Assessment`]s
//! - **Language**: [`features`] and [`trend`] measure linguistic decline over time
//! - **Output**: [`report`], [`dialogue`] and [`export`] render assessments for people
//! - **Orchestration**: [`pipeline`] and [`config`] wire it all together

pub mod config;
pub mod dialogue;
pub mod error;
pub mod export;
pub mod features;
pub mod history;
pub mod pipeline;
pub mod random;
pub mod report;
pub mod rules;
pub mod scorer;
pub mod templates;
pub mod trend;
pub mod types;

pub use config::EngineConfig;
pub use dialogue::DialogueAgent;
pub use error::AssessError;
pub use features::FeatureExtractor;
pub use history::HistoryStore;
pub use pipeline::{assess_to_json, CareProcessor};
pub use report::ReportGenerator;
pub use scorer::SeverityScorer;
pub use trend::TrendAnalyzer;

// Core data types
pub use types::{
    Assessment, Coherence, DeclineSlopes, Dimension, DimensionScores, FeatureVector,
    ProgressSummary, SeverityCategory, TrendResult, TurnResponse,
};

/// cogwatch version reported by the CLI
pub const COGWATCH_VERSION: &str = env!("CARGO_PKG_VERSION");
