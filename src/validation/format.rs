use log::warn;

use crate::models::{ExtractedFields, ValidationIssue, ValidationReport, ValidationStatus};

/// FormatValidator: a weak quality signal on extracted ID
/// fields. Only the name decides the status; `Bad` is advisory.
pub struct FormatValidator;

impl FormatValidator {
    pub fn classify(fields: &ExtractedFields) -> ValidationStatus {
        if fields.full_name.trim().is_empty() {
            ValidationStatus::Bad
        } else {
            ValidationStatus::Good
        }
    }

    /// The status plus a warning for every field the document did not yield.
    pub fn review(fields: &ExtractedFields) -> ValidationReport {
        let mut issues = Vec::new();

        if fields.full_name.is_empty() {
            issues.push(ValidationIssue {
                field: "full_name".to_string(),
                message: "Name could not be read from the document".to_string(),
            });
        }

        if fields.date_of_birth.is_empty() {
            issues.push(ValidationIssue {
                field: "date_of_birth".to_string(),
                message: "Date of birth is missing".to_string(),
            });
        }

        if fields.gender.is_empty() {
            issues.push(ValidationIssue {
                field: "gender".to_string(),
                message: "Gender is missing".to_string(),
            });
        }

        if fields.identification_number.is_empty() {
            issues.push(ValidationIssue {
                field: "identification_number".to_string(),
                message: "Identification number is missing".to_string(),
            });
        }

        let status = Self::classify(fields);
        if status == ValidationStatus::Bad {
            warn!("ID capture classified as bad; visitor may edit or continue");
        }

        ValidationReport { status, issues }
    }
}
