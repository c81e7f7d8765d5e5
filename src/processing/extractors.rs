// Keyed line heuristics for ID document fields
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::models::ExtractedFields;

lazy_static! {
    // Label markers are anchored at the start of the line so that
    // "First Name:" is never read as "Name:".
    static ref FULL_NAME_MARKER: Regex = Regex::new(r"(?i)^name\s*:").unwrap();
    static ref FIRST_NAME_MARKER: Regex = Regex::new(r"(?i)^first\s*name\s*:").unwrap();
    static ref LAST_NAME_MARKER: Regex = Regex::new(r"(?i)^(?:surname|last\s*name)\s*:").unwrap();
    static ref DOB_MARKER: Regex = Regex::new(r"(?i)^(?:dob|date\s+of\s+birth)\s*:").unwrap();
    static ref GENDER_MARKER: Regex = Regex::new(r"(?i)^gender\s*:").unwrap();
    // The identification number line is found by keyword containment, so
    // "ID Number:" and "Identification No.:" both qualify.
    static ref ID_KEYWORD: Regex = Regex::new(r"(?i)id|identification").unwrap();
    static ref NUMBER_KEYWORD: Regex = Regex::new(r"(?i)no").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKey {
    FullName,
    FirstName,
    LastName,
    DateOfBirth,
    Gender,
    IdentificationNumber,
}

/// FieldParser: scans OCR lines top to bottom. For each key the last line
/// carrying a value wins.
pub struct FieldParser;

impl FieldParser {
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> ExtractedFields {
        let mut fields = ExtractedFields::default();
        let mut first_name = String::new();
        let mut last_name = String::new();

        for line in lines {
            let line = line.as_ref().trim();
            let key = match Self::classify_line(line) {
                Some(key) => key,
                None => continue,
            };
            let value = match Self::value_after_colon(line) {
                Some(value) => value,
                None => {
                    debug!("Marker without value ignored: {:?}", key);
                    continue;
                }
            };

            match key {
                FieldKey::FullName => fields.full_name = value,
                FieldKey::FirstName => first_name = value,
                FieldKey::LastName => last_name = value,
                FieldKey::DateOfBirth => fields.date_of_birth = value,
                FieldKey::Gender => fields.gender = value,
                FieldKey::IdentificationNumber => fields.identification_number = value,
            }
        }

        if fields.full_name.is_empty() && (!first_name.is_empty() || !last_name.is_empty()) {
            fields.full_name = format!("{} {}", first_name, last_name).trim().to_string();
        }

        fields
    }

    // Markers are tried in precedence order; the first hit decides the line
    fn classify_line(line: &str) -> Option<FieldKey> {
        if FULL_NAME_MARKER.is_match(line) {
            Some(FieldKey::FullName)
        } else if FIRST_NAME_MARKER.is_match(line) {
            Some(FieldKey::FirstName)
        } else if LAST_NAME_MARKER.is_match(line) {
            Some(FieldKey::LastName)
        } else if DOB_MARKER.is_match(line) {
            Some(FieldKey::DateOfBirth)
        } else if GENDER_MARKER.is_match(line) {
            Some(FieldKey::Gender)
        } else if ID_KEYWORD.is_match(line) && NUMBER_KEYWORD.is_match(line) {
            Some(FieldKey::IdentificationNumber)
        } else {
            None
        }
    }

    /// Everything after the first `:`, trimmed. `None` when there is no colon
    /// or nothing follows it, so an earlier value is kept.
    fn value_after_colon(line: &str) -> Option<String> {
        let (_, value) = line.split_once(':')?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}
