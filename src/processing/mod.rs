pub mod extractors;
pub mod field_correction;
pub mod ocr;

pub use extractors::FieldParser;
pub use field_correction::FieldCorrection;
pub use ocr::{DocumentTextExtractor, FileOcrEngine, OcrEngine};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractEngine;
