//! Delimited-text export of assessment history

use crate::error::AssessError;
use crate::types::{Assessment, Dimension};
use std::io::Write;

/// Column names, in row order
pub const EXPORT_HEADER: [&str; 8] = [
    "date",
    "severity",
    "confidence",
    "memory",
    "orientation",
    "language",
    "attention",
    "problem_solving",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
const MISSING: &str = "N/A";

/// Write one CSV row per assessment (ascending time expected).
/// Dimensions absent from an assessment are written as `N/A`.
pub fn write_csv<W: Write>(history: &[Assessment], writer: W) -> Result<(), AssessError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(EXPORT_HEADER).map_err(export_error)?;

    for assessment in history {
        let mut row = vec![
            assessment.timestamp.format(DATE_FORMAT).to_string(),
            assessment.severity_category.as_str().to_string(),
            assessment.confidence.to_string(),
        ];
        row.extend(Dimension::ALL.iter().map(|d| {
            assessment
                .dimension_scores
                .get(*d)
                .map_or_else(|| MISSING.to_string(), |s| s.to_string())
        }));
        csv.write_record(&row).map_err(export_error)?;
    }

    csv.flush()?;
    Ok(())
}

/// Render the export as a string
pub fn to_csv_string(history: &[Assessment]) -> Result<String, AssessError> {
    let mut buffer = Vec::new();
    write_csv(history, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| AssessError::ExportError(e.to_string()))
}

fn export_error(e: csv::Error) -> AssessError {
    AssessError::ExportError(e.to_string())
}
