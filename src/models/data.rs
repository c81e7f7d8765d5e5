use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::CheckInError;

/// One step of the check-in wizard. Exactly one is active per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenState {
    Welcome,
    CheckIn,
    VisitorDetails,
    SelectRole,
    SelectPurpose,
    CaptureImage,
    CaptureId,
    EmergencyContact,
    Agreement,
    Success,
}

impl ScreenState {
    pub const ALL: [ScreenState; 10] = [
        ScreenState::Welcome,
        ScreenState::CheckIn,
        ScreenState::VisitorDetails,
        ScreenState::SelectRole,
        ScreenState::SelectPurpose,
        ScreenState::CaptureImage,
        ScreenState::CaptureId,
        ScreenState::EmergencyContact,
        ScreenState::Agreement,
        ScreenState::Success,
    ];

    /// Stage token used by the backend in capability sets and hints.
    pub fn token(&self) -> &'static str {
        match self {
            ScreenState::Welcome => "welcome",
            ScreenState::CheckIn => "check_in",
            ScreenState::VisitorDetails => "visitor_details",
            ScreenState::SelectRole => "select_role",
            ScreenState::SelectPurpose => "select_purpose",
            ScreenState::CaptureImage => "capture_image",
            ScreenState::CaptureId => "capture_id",
            ScreenState::EmergencyContact => "emergency_contact",
            ScreenState::Agreement => "agreement",
            ScreenState::Success => "success",
        }
    }

    // Route names the kiosk app registered with its navigator
    fn route_alias(&self) -> Option<&'static str> {
        match self {
            ScreenState::Welcome => Some("firstscreen"),
            ScreenState::Success => Some("checkinsuccessscreen"),
            _ => None,
        }
    }

    /// Whether the visitor has left the welcome screen.
    pub fn is_past_welcome(&self) -> bool {
        *self != ScreenState::Welcome
    }
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for ScreenState {
    type Err = CheckInError;

    /// Accepts stage tokens (`select_role`) and route names (`SelectRole`,
    /// `CheckInSuccessScreen`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        ScreenState::ALL
            .iter()
            .find(|state| {
                state.token().replace('_', "") == folded
                    || state.route_alias().map_or(false, |alias| alias == folded)
            })
            .copied()
            .ok_or_else(|| CheckInError::UnknownStage(s.to_string()))
    }
}

/// Stage tokens the backend says still apply to the visitor. Order carries no
/// meaning; an empty set means "go straight to the agreement".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CapabilitySet {
    tokens: BTreeSet<String>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(&normalize_token(token))
    }

    pub fn contains_stage(&self, stage: ScreenState) -> bool {
        self.tokens.contains(stage.token())
    }

    pub fn insert(&mut self, token: &str) -> bool {
        let token = normalize_token(token);
        if token.is_empty() {
            return false;
        }
        self.tokens.insert(token)
    }

    /// Drops a stage once the visitor has completed it.
    pub fn remove_stage(&mut self, stage: ScreenState) -> bool {
        self.tokens.remove(stage.token())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

fn normalize_token(token: &str) -> String {
    token.trim().to_lowercase()
}

impl<S: AsRef<str>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CapabilitySet::new();
        for token in iter {
            set.insert(token.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for CapabilitySet {
    fn from(tokens: Vec<String>) -> Self {
        tokens.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<String> {
    fn from(set: CapabilitySet) -> Self {
        set.tokens.into_iter().collect()
    }
}

/// What a step response says about the next screen, decided once at the
/// HTTP boundary so the router never inspects raw response shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowDecision {
    /// Explicit `next_screen` returned by the endpoint.
    Hint(String),
    /// `visibleFields` returned by the endpoint.
    Capabilities(CapabilitySet),
    /// The endpoint said nothing about routing.
    None,
}

impl FlowDecision {
    pub fn from_parts(hint: Option<&str>, capabilities: Option<CapabilitySet>) -> Self {
        match (hint.map(str::trim).filter(|h| !h.is_empty()), capabilities) {
            (Some(hint), _) => FlowDecision::Hint(hint.to_string()),
            (None, Some(set)) => FlowDecision::Capabilities(set),
            (None, None) => FlowDecision::None,
        }
    }
}

/// Output of the OCR engine in any of the shapes it is known to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOcrResult {
    Text { text: String },
    Blocks { blocks: Vec<OcrBlock> },
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrBlock {
    pub text: String,
}

/// Fields read off an ID document. Absent values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub identification_number: String,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_empty()
            && self.date_of_birth.is_empty()
            && self.gender.is_empty()
            && self.identification_number.is_empty()
    }
}

/// Advisory quality signal on extracted ID fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Good,
    Bad,
    #[default]
    Unknown,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationStatus::Good => write!(f, "GOOD"),
            ValidationStatus::Bad => write!(f, "BAD"),
            ValidationStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Client,
    Interviewer,
}

impl Role {
    pub fn token(&self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::Client => "client",
            Role::Interviewer => "interviewer",
        }
    }
}

impl FromStr for Role {
    type Err = CheckInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visitor" => Ok(Role::Visitor),
            "client" => Ok(Role::Client),
            "interviewer" => Ok(Role::Interviewer),
            other => Err(CheckInError::InvalidValue(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBy {
    Id,
    Name,
}

impl SearchBy {
    pub fn as_query(&self) -> &'static str {
        match self {
            SearchBy::Id => "id",
            SearchBy::Name => "name",
        }
    }
}

/// An employee a visitor can come to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.position.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(position) => write!(f, "{} ({})", self.name, position),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// The visitor as known to the backend. Every field except `id` doubles as a
/// partial update: `None` or empty values never clear what is already set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub id_type: Option<String>,
    pub identification_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub role: Option<String>,
    pub purpose: Option<String>,
    pub employee_id: Option<u64>,
    pub emergency_name: Option<String>,
    pub emergency_phone: Option<String>,
    pub emergency_relation: Option<String>,
    #[serde(deserialize_with = "bool_or_flag")]
    pub privacy_policy_agreement: Option<bool>,
    pub photo_url: Option<String>,
    pub id_photo_url: Option<String>,
}

impl VisitorRecord {
    /// Looks up a text field by its wire name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "full_name" => &self.full_name,
            "company" => &self.company,
            "email" => &self.email,
            "phone" => &self.phone,
            "id_type" => &self.id_type,
            "identification_number" => &self.identification_number,
            "date_of_birth" => &self.date_of_birth,
            "gender" => &self.gender,
            "role" => &self.role,
            "purpose" => &self.purpose,
            "emergency_name" => &self.emergency_name,
            "emergency_phone" => &self.emergency_phone,
            "emergency_relation" => &self.emergency_relation,
            "photo_url" => &self.photo_url,
            "id_photo_url" => &self.id_photo_url,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Folds a partial record into this one. Set values win, unset or blank
    /// values leave the existing ones alone, and an id never changes once
    /// assigned.
    pub fn merge(&mut self, partial: &VisitorRecord) -> Result<(), CheckInError> {
        match (self.id, partial.id) {
            (Some(existing), Some(received)) if existing != received => {
                return Err(CheckInError::VisitorIdConflict { existing, received });
            }
            (None, Some(received)) => self.id = Some(received),
            _ => {}
        }

        keep_or_replace(&mut self.full_name, &partial.full_name);
        keep_or_replace(&mut self.company, &partial.company);
        keep_or_replace(&mut self.email, &partial.email);
        keep_or_replace(&mut self.phone, &partial.phone);
        keep_or_replace(&mut self.id_type, &partial.id_type);
        keep_or_replace(&mut self.identification_number, &partial.identification_number);
        keep_or_replace(&mut self.date_of_birth, &partial.date_of_birth);
        keep_or_replace(&mut self.gender, &partial.gender);
        keep_or_replace(&mut self.role, &partial.role);
        keep_or_replace(&mut self.purpose, &partial.purpose);
        keep_or_replace(&mut self.emergency_name, &partial.emergency_name);
        keep_or_replace(&mut self.emergency_phone, &partial.emergency_phone);
        keep_or_replace(&mut self.emergency_relation, &partial.emergency_relation);
        keep_or_replace(&mut self.photo_url, &partial.photo_url);
        keep_or_replace(&mut self.id_photo_url, &partial.id_photo_url);

        if partial.employee_id.is_some() {
            self.employee_id = partial.employee_id;
        }
        if partial.privacy_policy_agreement.is_some() {
            self.privacy_policy_agreement = partial.privacy_policy_agreement;
        }

        Ok(())
    }
}

fn keep_or_replace(target: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value {
        let v = v.trim();
        if !v.is_empty() {
            *target = Some(v.to_string());
        }
    }
}

// The backend stores the agreement as 0/1; older payloads send a boolean.
fn bool_or_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|n| n != 0),
        Some(serde_json::Value::String(s)) => match s.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
