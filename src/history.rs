//! Assessment history
//!
//! This module keeps a patient's prior assessments in a bounded, time-ordered
//! window. The window feeds the scorer's history blend and the progress
//! summary, and round-trips through JSON so the caller can persist it.

use crate::types::{Assessment, Dimension};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

/// Default history window in assessments
pub const DEFAULT_HISTORY_WINDOW: usize = 50;

/// Rolling store of prior assessments, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStore {
    entries: VecDeque<Assessment>,
    window_size: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl HistoryStore {
    /// Create a new store with the given window size
    pub fn new(window_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Build a store from stored assessments, sorting them by time
    pub fn from_assessments(mut assessments: Vec<Assessment>, window_size: usize) -> Self {
        assessments.sort_by_key(|a| a.timestamp);
        let mut store = Self::new(window_size);
        for assessment in assessments {
            store.push(assessment);
        }
        store
    }

    /// Append an assessment, evicting the oldest beyond the window
    pub fn push(&mut self, assessment: Assessment) {
        if let Some(last) = self.entries.back() {
            if assessment.timestamp < last.timestamp {
                warn!(
                    timestamp = %assessment.timestamp,
                    latest = %last.timestamp,
                    "assessment older than latest history entry"
                );
            }
        }

        self.entries.push_back(assessment);
        while self.entries.len() > self.window_size {
            self.entries.pop_front();
        }
    }

    /// Contiguous copy of the window, oldest first
    pub fn entries(&self) -> Vec<Assessment> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Assessment> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Scores for one dimension, skipping entries that lack it
    pub fn dimension_series(&self, dimension: Dimension) -> Vec<f64> {
        self.entries
            .iter()
            .filter_map(|a| a.dimension_scores.get(dimension))
            .collect()
    }

    pub fn severity_series(&self) -> Vec<f64> {
        self.entries.iter().map(|a| a.severity_score).collect()
    }

    /// Load history store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize history store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DimensionScores, SeverityCategory};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn make_assessment(day: i64, severity: f64) -> Assessment {
        Assessment {
            severity_score: severity,
            severity_category: SeverityCategory::Mild,
            confidence: 0.7,
            dimension_scores: DimensionScores::uniform(severity),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap() + Duration::days(day),
        }
    }

    #[test]
    fn test_history_accumulation() {
        let mut store = HistoryStore::new(7);
        for i in 0..5 {
            store.push(make_assessment(i, 0.1 * (i + 1) as f64));
        }

        assert_eq!(store.len(), 5);
        assert_eq!(store.latest().unwrap().severity_score, 0.5);
        assert_eq!(store.dimension_series(Dimension::Memory).len(), 5);
    }

    #[test]
    fn test_history_window_rolling() {
        let mut store = HistoryStore::new(3);

        // Add 5 assessments - only last 3 should be kept
        for i in 0..5 {
            store.push(make_assessment(i, i as f64 / 10.0));
        }

        assert_eq!(store.severity_series(), vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_from_assessments_sorts_by_time() {
        let store = HistoryStore::from_assessments(
            vec![make_assessment(2, 0.3), make_assessment(0, 0.1), make_assessment(1, 0.2)],
            10,
        );
        assert_eq!(store.severity_series(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_dimension_series_skips_missing() {
        let mut store = HistoryStore::default();
        store.push(make_assessment(0, 0.4));

        let mut partial = make_assessment(1, 0.2);
        partial.dimension_scores = DimensionScores::new();
        store.push(partial);

        assert_eq!(store.dimension_series(Dimension::Language), vec![0.4]);
    }

    #[test]
    fn test_serialization() {
        let mut store = HistoryStore::new(7);
        store.push(make_assessment(0, 0.35));

        let json = store.to_json().unwrap();
        let loaded = HistoryStore::from_json(&json).unwrap();

        assert_eq!(loaded.entries(), store.entries());
        assert_eq!(loaded.window_size(), 7);
    }

    #[test]
    fn test_from_json_accepts_naive_timestamps() {
        let json = r#"{
            "entries": [
                {
                    "severity_score": 0.2,
                    "severity_category": "normal",
                    "confidence": 0.6,
                    "dimension_scores": {"memory": 0.2},
                    "timestamp": "2024-01-16T08:00:00"
                },
                {
                    "severity_score": 0.4,
                    "severity_category": "mild",
                    "confidence": 0.7,
                    "dimension_scores": {"memory": 0.4},
                    "timestamp": "2024-01-15 08:00:00.5"
                }
            ],
            "window_size": 5
        }"#;

        let loaded = HistoryStore::from_json(json).unwrap();
        let store = HistoryStore::from_assessments(loaded.entries(), loaded.window_size());

        assert_eq!(store.severity_series(), vec![0.4, 0.2]);
        assert_eq!(
            store.latest().unwrap().timestamp,
            Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap()
        );
    }
}
