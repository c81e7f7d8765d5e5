pub mod timers;

pub use timers::{SessionTimers, TimerEvent, TimerKind};

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::flow::FlowRouter;
use crate::id_document::IdCapture;
use crate::models::{
    CapabilitySet, ExtractedFields, FlowDecision, ScreenState, ValidationStatus, VisitorRecord,
};
use crate::utils::{CheckInError, Result};

/// An editable field of the ID confirmation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    FullName,
    DateOfBirth,
    Gender,
    IdentificationNumber,
}

impl FromStr for IdField {
    type Err = CheckInError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full_name" | "name" => Ok(IdField::FullName),
            "date_of_birth" | "dob" => Ok(IdField::DateOfBirth),
            "gender" => Ok(IdField::Gender),
            "identification_number" | "id_number" => Ok(IdField::IdentificationNumber),
            other => Err(CheckInError::InvalidValue(format!("unknown ID field '{}'", other))),
        }
    }
}

/// Holds the upload lock. Dropping it releases the lock, including when the
/// step future that owns it is abandoned mid-request.
#[derive(Debug)]
pub struct UploadGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Everything the kiosk knows about the visitor currently at the screen.
#[derive(Debug)]
pub struct VisitorSession {
    state: ScreenState,
    visitor: VisitorRecord,
    capabilities: CapabilitySet,
    completed: Vec<ScreenState>,
    visible_fields: CapabilitySet,
    extracted: ExtractedFields,
    validation: ValidationStatus,
    uploading: Arc<AtomicBool>,
    started_at: DateTime<Utc>,
}

impl Default for VisitorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitorSession {
    pub fn new() -> Self {
        VisitorSession {
            state: ScreenState::Welcome,
            visitor: VisitorRecord::default(),
            capabilities: CapabilitySet::new(),
            completed: Vec::new(),
            visible_fields: CapabilitySet::new(),
            extracted: ExtractedFields::default(),
            validation: ValidationStatus::Unknown,
            uploading: Arc::new(AtomicBool::new(false)),
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> ScreenState {
        self.state
    }

    pub fn visitor(&self) -> &VisitorRecord {
        &self.visitor
    }

    pub fn visitor_id(&self) -> Result<u64> {
        self.visitor.id.ok_or(CheckInError::NoVisitor)
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn visible_fields(&self) -> &CapabilitySet {
        &self.visible_fields
    }

    pub fn extracted(&self) -> &ExtractedFields {
        &self.extracted
    }

    pub fn validation_status(&self) -> ValidationStatus {
        self.validation
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Fixed transitions that do not consult the router: welcome to check-in,
    /// check-in to details, agreement to success.
    pub(crate) fn move_to(&mut self, state: ScreenState) {
        info!("Screen {} -> {}", self.state, state);
        self.state = state;
    }

    pub fn set_visible_fields(&mut self, fields: CapabilitySet) {
        self.visible_fields = fields;
    }

    pub fn update_visitor(&mut self, partial: &VisitorRecord) -> Result<()> {
        self.visitor.merge(partial)
    }

    pub fn assign_id(&mut self, id: u64) -> Result<()> {
        self.visitor.merge(&VisitorRecord {
            id: Some(id),
            ..Default::default()
        })
    }

    /// Keeps the latest capability set the backend sent, minus the stages
    /// this visitor already went through.
    pub fn record_decision(&mut self, decision: &FlowDecision) {
        if let FlowDecision::Capabilities(set) = decision {
            let mut remaining = set.clone();
            for stage in &self.completed {
                remaining.remove_stage(*stage);
            }
            self.capabilities = remaining;
        }
    }

    pub fn complete_stage(&mut self, stage: ScreenState) {
        if !self.completed.contains(&stage) {
            self.completed.push(stage);
        }
        self.capabilities.remove_stage(stage);
    }

    /// Routes out of the current stage. Capability sets never send the
    /// visitor back to a finished stage, and a response that says nothing
    /// about routing falls back to what is left of the last set.
    pub fn advance(&mut self, decision: &FlowDecision) -> ScreenState {
        let current = self.state;
        self.complete_stage(current);
        self.record_decision(decision);

        let effective = match decision {
            FlowDecision::Hint(_) => decision.clone(),
            FlowDecision::Capabilities(_) | FlowDecision::None => {
                FlowDecision::Capabilities(self.capabilities.clone())
            }
        };
        let next = FlowRouter::route(current, &effective);

        self.move_to(next);
        next
    }

    /// Explicit navigation home: the session starts over.
    pub fn go_home(&mut self) -> ScreenState {
        if self.is_uploading() {
            warn!("Returning home with an upload still in flight");
        }
        *self = VisitorSession::new();
        self.state
    }

    /// Takes the upload lock; no capture or second upload may start until the
    /// returned guard is dropped.
    pub fn begin_upload(&self) -> Result<UploadGuard> {
        if self.uploading.swap(true, Ordering::SeqCst) {
            return Err(CheckInError::CaptureInProgress);
        }
        Ok(UploadGuard {
            flag: Arc::clone(&self.uploading),
        })
    }

    pub fn ensure_can_capture(&self) -> Result<()> {
        if self.is_uploading() {
            Err(CheckInError::CaptureInProgress)
        } else {
            Ok(())
        }
    }

    /// A new capture replaces the previous extraction and any hand edits.
    pub fn apply_capture(&mut self, capture: &IdCapture) {
        self.extracted = capture.fields.clone();
        self.validation = capture.report.status;
    }

    /// A failed capture leaves the fields and status as they were.
    pub fn fail_capture(&mut self, err: &CheckInError) {
        warn!("ID capture failed ({}); status stays {}", err, self.validation);
    }

    pub fn edit_extracted(&mut self, field: IdField, value: &str) {
        let value = value.trim().to_string();
        match field {
            IdField::FullName => self.extracted.full_name = value,
            IdField::DateOfBirth => self.extracted.date_of_birth = value,
            IdField::Gender => self.extracted.gender = value,
            IdField::IdentificationNumber => self.extracted.identification_number = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_document::IdDocumentReader;
    use crate::models::RawOcrResult;

    fn caps(tokens: &[&str]) -> CapabilitySet {
        tokens.iter().collect()
    }

    fn session_at(state: ScreenState) -> VisitorSession {
        let mut session = VisitorSession::new();
        session.move_to(state);
        session
    }

    #[test]
    fn test_new_session_starts_at_welcome() {
        let session = VisitorSession::new();
        assert_eq!(session.state(), ScreenState::Welcome);
        assert_eq!(session.validation_status(), ValidationStatus::Unknown);
        assert!(matches!(session.visitor_id(), Err(CheckInError::NoVisitor)));
    }

    #[test]
    fn test_advance_uses_fresh_capabilities() {
        let mut session = session_at(ScreenState::VisitorDetails);
        let next = session.advance(&FlowDecision::Capabilities(caps(&["select_purpose", "capture_id"])));

        assert_eq!(next, ScreenState::SelectPurpose);
        assert_eq!(session.state(), ScreenState::SelectPurpose);
        assert!(session.capabilities().contains("capture_id"));
    }

    #[test]
    fn test_finished_stages_are_not_revisited() {
        let mut session = session_at(ScreenState::CaptureImage);
        let next = session.advance(&FlowDecision::Capabilities(caps(&["capture_image", "capture_id"])));
        assert_eq!(next, ScreenState::CaptureId);

        // The ID upload response carries no routing signal
        let next = session.advance(&FlowDecision::None);
        assert_eq!(next, ScreenState::Agreement);
        assert!(session.capabilities().is_empty());
    }

    #[test]
    fn test_hint_is_followed_as_given() {
        let mut session = session_at(ScreenState::VisitorDetails);
        let next = session.advance(&FlowDecision::Hint("select_role".to_string()));
        assert_eq!(next, ScreenState::SelectRole);
    }

    #[test]
    fn test_id_is_immutable() {
        let mut session = VisitorSession::new();
        session.assign_id(12).unwrap();
        session.assign_id(12).unwrap();
        assert!(session.assign_id(13).is_err());
        assert_eq!(session.visitor_id().unwrap(), 12);
    }

    #[test]
    fn test_upload_lock_gates_capture() {
        let mut session = session_at(ScreenState::CaptureId);
        let upload = session.begin_upload().unwrap();
        assert!(matches!(session.ensure_can_capture(), Err(CheckInError::CaptureInProgress)));
        assert!(session.begin_upload().is_err());

        drop(upload);
        assert!(!session.is_uploading());
        assert!(session.ensure_can_capture().is_ok());
    }

    #[test]
    fn test_go_home_gets_a_fresh_upload_lock() {
        let mut session = session_at(ScreenState::CaptureImage);
        let upload = session.begin_upload().unwrap();

        session.go_home();
        assert!(!session.is_uploading());

        // The abandoned request releasing its guard later touches nothing
        drop(upload);
        assert!(session.begin_upload().is_ok());
    }

    #[test]
    fn test_edits_survive_until_next_capture() {
        let mut session = session_at(ScreenState::CaptureId);
        let first = IdDocumentReader::read_raw(&RawOcrResult::Plain("Name: Jon Smith\nGender: M".to_string())).unwrap();
        session.apply_capture(&first);
        session.edit_extracted(IdField::FullName, "John Smith");
        assert_eq!(session.extracted().full_name, "John Smith");
        assert_eq!(session.extracted().gender, "M");

        let second = IdDocumentReader::read_raw(&RawOcrResult::Plain("DOB: 1990-01-01".to_string())).unwrap();
        session.apply_capture(&second);
        assert_eq!(session.extracted().full_name, "");
        assert_eq!(session.extracted().gender, "");
        assert_eq!(session.validation_status(), ValidationStatus::Bad);
    }

    #[test]
    fn test_failed_capture_keeps_status() {
        let mut session = session_at(ScreenState::CaptureId);
        let capture = IdDocumentReader::read_raw(&RawOcrResult::Plain("Name: Ana".to_string())).unwrap();
        session.apply_capture(&capture);

        session.fail_capture(&CheckInError::OcrFailure("blurred".to_string()));
        assert_eq!(session.validation_status(), ValidationStatus::Good);
        assert_eq!(session.extracted().full_name, "Ana");
    }

    #[test]
    fn test_go_home_resets_session() {
        let mut session = session_at(ScreenState::SelectRole);
        session.assign_id(5).unwrap();
        assert_eq!(session.go_home(), ScreenState::Welcome);
        assert_eq!(session.visitor().id, None);
    }

    #[test]
    fn test_id_field_names() {
        assert_eq!("dob".parse::<IdField>().unwrap(), IdField::DateOfBirth);
        assert_eq!("Identification_Number".parse::<IdField>().unwrap(), IdField::IdentificationNumber);
        assert!(matches!(
            "nationality".parse::<IdField>(),
            Err(CheckInError::InvalidValue(_))
        ));
    }
}
