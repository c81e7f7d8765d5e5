use crate::models::*;
use crate::processing::*;
use crate::utils::{CheckInError, Result};
use crate::validation::FormatValidator;
use log::info;
use std::path::Path;

/// Result of one ID capture: the lines the engine produced, the fields read
/// from them and the advisory report.
#[derive(Debug, Clone)]
pub struct IdCapture {
    pub lines: Vec<String>,
    pub fields: ExtractedFields,
    pub report: ValidationReport,
}

pub struct IdDocumentReader;

impl IdDocumentReader {
    // Main entry point that runs the engine and the whole text pipeline
    pub fn read(engine: &dyn OcrEngine, image_path: &Path) -> Result<IdCapture> {
        // Step 1: Recognize text
        let raw = engine.recognize(image_path)?;

        // Step 2: Extract, parse and classify
        Self::read_raw(&raw)
    }

    pub fn read_raw(raw: &RawOcrResult) -> Result<IdCapture> {
        let lines = DocumentTextExtractor::extract_lines(raw);
        if lines.is_empty() {
            return Err(CheckInError::OcrFailure("No text found on the document".to_string()));
        }

        let fields = FieldParser::parse(&lines);
        let report = FormatValidator::review(&fields);

        info!(
            "ID capture: {} lines, status {}, {} advisory issues",
            lines.len(),
            report.status,
            report.issues.len()
        );

        Ok(IdCapture {
            lines,
            fields,
            report,
        })
    }
}
