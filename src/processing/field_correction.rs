use log::info;
use std::collections::BTreeMap;

use crate::models::{ExtractedFields, VisitorRecord};

/// FieldCorrection folds the ID fields the visitor confirmed into the
/// visitor profile. Confirmed document values replace what was typed on the
/// details screen; blank document values leave the typed ones alone.
pub struct FieldCorrection;

impl FieldCorrection {
    /// Builds the partial update to send for the confirmed ID fields.
    pub fn visitor_update(confirmed: &ExtractedFields, visitor: &VisitorRecord) -> VisitorRecord {
        let mut corrections = BTreeMap::new();

        let update = VisitorRecord {
            full_name: Self::pick("full_name", &confirmed.full_name, &visitor.full_name, &mut corrections),
            date_of_birth: Self::pick(
                "date_of_birth",
                &confirmed.date_of_birth,
                &visitor.date_of_birth,
                &mut corrections,
            ),
            gender: Self::pick("gender", &confirmed.gender, &visitor.gender, &mut corrections),
            identification_number: Self::pick(
                "identification_number",
                &confirmed.identification_number,
                &visitor.identification_number,
                &mut corrections,
            ),
            ..Default::default()
        };

        if !corrections.is_empty() {
            info!("ID field corrections applied:");
            for (field, correction) in &corrections {
                info!("  {}: {}", field, correction);
            }
        }

        update
    }

    fn pick(
        field: &'static str,
        document: &str,
        typed: &Option<String>,
        corrections: &mut BTreeMap<&'static str, String>,
    ) -> Option<String> {
        let document = document.trim();
        if document.is_empty() {
            return None;
        }

        match typed.as_deref() {
            Some(existing) if Self::fields_match_case_insensitive(existing, document) => {}
            Some(existing) => {
                corrections.insert(field, format!("Typed: {} -> Document: {}", existing, document));
            }
            None => {
                corrections.insert(field, format!("Empty -> Document: {}", document));
            }
        }

        Some(document.to_string())
    }

    fn fields_match_case_insensitive(field1: &str, field2: &str) -> bool {
        let clean1 = field1
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_uppercase();

        let clean2 = field2
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_uppercase();

        clean1 == clean2
    }
}
