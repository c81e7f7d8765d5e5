use std::fs;
use std::path::Path;

use log::{debug, warn};
#[cfg(feature = "tesseract")]
use tesseract::Tesseract;

use crate::models::RawOcrResult;
use crate::utils::{CheckInError, Result};

/// Boundary to whatever engine turns a document photo into text.
pub trait OcrEngine {
    fn recognize(&self, image_path: &Path) -> Result<RawOcrResult>;
}

/// DocumentTextExtractor: turns any OCR result shape into ordered, trimmed,
/// non-empty lines. Nothing downstream looks at the raw shape.
pub struct DocumentTextExtractor;

impl DocumentTextExtractor {
    pub fn extract_lines(raw: &RawOcrResult) -> Vec<String> {
        let text = match raw {
            RawOcrResult::Text { text } => text.clone(),
            // Blocks are kept in engine order, one block per line run
            RawOcrResult::Blocks { blocks } => blocks
                .iter()
                .map(|block| block.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            RawOcrResult::Plain(text) => text.clone(),
        };

        let lines: Vec<String> = text
            .split(|c| c == '\n' || c == '\r')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!("Extracted {} OCR lines", lines.len());
        lines
    }

    /// Reads an engine result delivered as JSON: `{"text": ..}`,
    /// `{"blocks": [{"text": ..}]}` or a bare string.
    pub fn from_json(value: &serde_json::Value) -> Result<RawOcrResult> {
        serde_json::from_value(value.clone()).map_err(|e| {
            warn!("Unrecognized OCR result shape: {}", e);
            CheckInError::OcrFailure(format!("Unrecognized OCR result shape: {}", e))
        })
    }
}

/// Engine for OCR output that was already produced elsewhere and saved next
/// to the kiosk: a `.json` file in one of the engine shapes, or plain text.
pub struct FileOcrEngine;

impl OcrEngine for FileOcrEngine {
    fn recognize(&self, path: &Path) -> Result<RawOcrResult> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CheckInError::OcrFailure(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
                CheckInError::OcrFailure(format!("Invalid OCR JSON in {}: {}", path.display(), e))
            })?;
            DocumentTextExtractor::from_json(&value)
        } else {
            Ok(RawOcrResult::Plain(contents))
        }
    }
}

#[cfg(feature = "tesseract")]
pub struct TesseractEngine {
    language: String,
}

#[cfg(feature = "tesseract")]
impl TesseractEngine {
    pub fn new(language: &str) -> Self {
        TesseractEngine {
            language: language.to_string(),
        }
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractEngine {
    fn recognize(&self, image_path: &Path) -> Result<RawOcrResult> {
        let path_str = image_path
            .to_str()
            .ok_or_else(|| CheckInError::OcrFailure("Failed to convert path to string".to_string()))?;

        let text = Tesseract::new(None, Some(&self.language))
            .map_err(|e| CheckInError::OcrFailure(format!("Tesseract init error: {}", e)))?
            .set_image(path_str)
            .map_err(|e| CheckInError::OcrFailure(format!("Tesseract set image error: {}", e)))?
            .get_text()
            .map_err(|e| CheckInError::OcrFailure(format!("Tesseract error: {}", e)))?;

        Ok(RawOcrResult::Text { text })
    }
}
