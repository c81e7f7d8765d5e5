use std::path::Path;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::CheckInClient;
use crate::config::KioskConfig;
use crate::id_document::IdDocumentReader;
use crate::models::{
    EmergencyContact, Employee, Role, ScreenState, ValidationReport, ValidationStatus, VisitorRecord,
};
use crate::processing::{FieldCorrection, OcrEngine};
use crate::session::{IdField, SessionTimers, TimerEvent, VisitorSession};
use crate::utils::{CheckInError, Result};
use crate::validation::RequiredFieldValidator;

/// Visible-field token that turns on the employee picker.
pub const EMPLOYEE_TO_VISIT: &str = "employee_to_visit";

/// Drives one kiosk through the check-in steps. Each handler validates
/// locally, awaits its backend call, and only then touches the session, so a
/// failed call leaves everything as it was.
pub struct CheckInWizard {
    client: CheckInClient,
    session: VisitorSession,
    timers: SessionTimers,
    timer_events: UnboundedReceiver<TimerEvent>,
}

impl CheckInWizard {
    pub fn new(config: &KioskConfig) -> Result<Self> {
        let client = CheckInClient::new(config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: CheckInClient, config: &KioskConfig) -> Self {
        let (timers, timer_events) = SessionTimers::new(config.idle_timeout(), config.success_display());
        CheckInWizard {
            client,
            session: VisitorSession::new(),
            timers,
            timer_events,
        }
    }

    pub fn session(&self) -> &VisitorSession {
        &self.session
    }

    pub fn state(&self) -> ScreenState {
        self.session.state()
    }

    pub fn client(&self) -> &CheckInClient {
        &self.client
    }

    /// Records a user interaction; restarts the idle countdown.
    pub fn touch(&mut self) {
        self.timers.record_interaction(self.session.state());
    }

    /// The visitor taps through the welcome screen.
    pub fn enter(&mut self) -> Result<ScreenState> {
        self.ensure_at(ScreenState::Welcome)?;
        Ok(self.move_to(ScreenState::CheckIn))
    }

    /// Looks the visitor up by email and loads the form configuration.
    pub async fn check_in(&mut self, email: &str) -> Result<ScreenState> {
        self.ensure_at(ScreenState::CheckIn)?;
        self.touch();

        let candidate = VisitorRecord {
            email: Some(email.trim().to_string()),
            ..Default::default()
        };
        RequiredFieldValidator::validate(ScreenState::CheckIn, &candidate)?;

        let email = email.trim();
        let lookup = self.client.check_pre_registered(email).await?;
        let fields = self.client.visible_fields().await?;

        match lookup.visitor.filter(|_| lookup.success) {
            Some(visitor) => {
                info!("Pre-registered visitor found for {}", email);
                self.session.update_visitor(&visitor)?;
            }
            None => info!("No pre-registration for {}; manual entry", email),
        }
        self.session.update_visitor(&candidate)?;
        self.session.set_visible_fields(fields.fields);

        Ok(self.move_to(ScreenState::VisitorDetails))
    }

    /// Stores the details form; the backend assigns the visitor id here.
    pub async fn submit_details(&mut self, details: &VisitorRecord) -> Result<ScreenState> {
        self.ensure_at(ScreenState::VisitorDetails)?;
        self.touch();

        let mut candidate = self.session.visitor().clone();
        candidate.merge(details)?;
        RequiredFieldValidator::validate(ScreenState::VisitorDetails, &candidate)?;

        let response = self.client.store_checkin(&candidate).await?;
        let id = response
            .visitor_id()
            .or(candidate.id)
            .ok_or_else(|| CheckInError::NetworkFailure("store-checkin returned no visitor id".to_string()))?;

        self.session.update_visitor(&candidate)?;
        self.session.assign_id(id)?;
        if let Some(visitor) = &response.visitor {
            self.session.update_visitor(visitor)?;
        }

        Ok(self.advance(&response.decision()))
    }

    /// Roles the tenant offers, in display order.
    pub fn offered_roles(&self) -> Vec<Role> {
        [Role::Visitor, Role::Client, Role::Interviewer]
            .into_iter()
            .filter(|role| self.session.visible_fields().contains(role.token()))
            .collect()
    }

    pub async fn select_role(&mut self, role: Role) -> Result<ScreenState> {
        self.ensure_at(ScreenState::SelectRole)?;
        self.touch();
        let visitor_id = self.session.visitor_id()?;

        let response = self.client.set_role(visitor_id, role).await?;

        self.session.update_visitor(&VisitorRecord {
            role: Some(role.token().to_string()),
            ..Default::default()
        })?;
        Ok(self.advance(&response.decision()))
    }

    /// The employee directory for the purpose step. Empty without a request
    /// when the tenant does not ask who the visitor is seeing.
    pub async fn employees_to_visit(&self) -> Result<Vec<Employee>> {
        if !self.session.visible_fields().contains(EMPLOYEE_TO_VISIT) {
            return Ok(Vec::new());
        }
        self.client.employees().await
    }

    pub async fn set_purpose(&mut self, purpose: &str, employee_id: Option<u64>) -> Result<ScreenState> {
        self.ensure_at(ScreenState::SelectPurpose)?;
        self.touch();
        let visitor_id = self.session.visitor_id()?;

        let update = VisitorRecord {
            purpose: Some(purpose.trim().to_string()),
            employee_id,
            ..Default::default()
        };
        RequiredFieldValidator::validate(ScreenState::SelectPurpose, &update)?;

        let response = self.client.set_purpose(visitor_id, purpose.trim(), employee_id).await?;

        self.session.update_visitor(&update)?;
        Ok(self.advance(&response.decision()))
    }

    /// Uploads the visitor's portrait.
    pub async fn upload_photo(&mut self, jpeg: Vec<u8>) -> Result<ScreenState> {
        self.ensure_at(ScreenState::CaptureImage)?;
        self.touch();
        let visitor_id = self.session.visitor_id()?;

        let upload = self.session.begin_upload()?;
        let result = self.client.store_captured_image(visitor_id, jpeg).await;
        drop(upload);
        let response = result?;

        self.session.update_visitor(&VisitorRecord {
            photo_url: response.photo_url.clone(),
            ..Default::default()
        })?;
        Ok(self.advance(&response.decision()))
    }

    /// Reads a captured ID photo. A `Bad` report is returned like any other;
    /// it never stops the visitor from continuing.
    pub fn capture_id(&mut self, engine: &dyn OcrEngine, image_path: &Path) -> Result<ValidationReport> {
        self.ensure_at(ScreenState::CaptureId)?;
        self.touch();
        self.session.ensure_can_capture()?;

        match IdDocumentReader::read(engine, image_path) {
            Ok(capture) => {
                self.session.apply_capture(&capture);
                Ok(capture.report)
            }
            Err(err) => {
                self.session.fail_capture(&err);
                Err(err)
            }
        }
    }

    pub fn edit_id_field(&mut self, field: IdField, value: &str) -> Result<()> {
        self.ensure_at(ScreenState::CaptureId)?;
        self.touch();
        self.session.edit_extracted(field, value);
        Ok(())
    }

    /// Uploads the ID photo with the confirmed fields and moves on.
    pub async fn confirm_id(&mut self, jpeg: Vec<u8>) -> Result<ScreenState> {
        self.ensure_at(ScreenState::CaptureId)?;
        self.touch();
        let visitor_id = self.session.visitor_id()?;

        if self.session.validation_status() == ValidationStatus::Bad {
            warn!("Continuing with an ID capture classified as bad");
        }

        let mut update = FieldCorrection::visitor_update(self.session.extracted(), self.session.visitor());
        let confirmed: Vec<(&str, String)> = [
            ("full_name", &update.full_name),
            ("date_of_birth", &update.date_of_birth),
            ("gender", &update.gender),
            ("identification_number", &update.identification_number),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect();
        let confirmed: Vec<(&str, &str)> = confirmed.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let upload = self.session.begin_upload()?;
        let result = self.client.store_id_image(visitor_id, jpeg, &confirmed).await;
        drop(upload);
        let response = result?;

        update.id_photo_url = response.photo_url.clone();
        self.session.update_visitor(&update)?;
        Ok(self.advance(&response.decision()))
    }

    /// Sends the emergency contact fields the tenant shows.
    pub async fn submit_emergency_contact(&mut self, contact: &EmergencyContact) -> Result<ScreenState> {
        self.ensure_at(ScreenState::EmergencyContact)?;
        self.touch();
        let visitor_id = self.session.visitor_id()?;

        let visible = self.session.visible_fields();
        let shown = |key: &str, value: &str| -> Option<String> {
            let value = value.trim();
            (visible.contains(key) && !value.is_empty()).then(|| value.to_string())
        };
        let update = VisitorRecord {
            emergency_name: shown("emergency_name", &contact.name),
            emergency_phone: shown("emergency_phone", &contact.phone),
            emergency_relation: shown("emergency_relation", &contact.relation),
            ..Default::default()
        };
        RequiredFieldValidator::validate(ScreenState::EmergencyContact, &update)?;

        let fields: Vec<(&str, &str)> = [
            ("emergency_name", &update.emergency_name),
            ("emergency_phone", &update.emergency_phone),
            ("emergency_relation", &update.emergency_relation),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect();

        let response = self.client.emergency_contact(visitor_id, &fields).await?;

        self.session.update_visitor(&update)?;
        Ok(self.advance(&response.decision()))
    }

    /// Final step: the visitor accepts the privacy policy and staff is
    /// notified by the backend.
    pub async fn agree(&mut self, accepted: bool) -> Result<ScreenState> {
        self.ensure_at(ScreenState::Agreement)?;
        self.touch();
        let visitor_id = self.session.visitor_id()?;

        let update = VisitorRecord {
            privacy_policy_agreement: Some(accepted),
            ..Default::default()
        };
        RequiredFieldValidator::validate(ScreenState::Agreement, &update)?;

        let response = self.client.privacy_agreement(visitor_id).await?;
        if response.success != Some(true) {
            let message = response
                .message
                .unwrap_or_else(|| "Something went wrong".to_string());
            return Err(CheckInError::NetworkFailure(format!("visitor/appPrivacyAgreement: {}", message)));
        }

        self.session.update_visitor(&update)?;
        if let Some(visitor) = &response.visitor {
            self.session.update_visitor(visitor)?;
        }
        Ok(self.move_to(ScreenState::Success))
    }

    /// Explicit navigation home from any screen.
    pub fn go_home(&mut self) -> ScreenState {
        let state = self.session.go_home();
        self.timers.on_enter(state);
        state
    }

    /// Waits for the next timer expiry. Returns `None` only if the timers
    /// have been dropped.
    pub async fn next_timer_event(&mut self) -> Option<TimerEvent> {
        self.timer_events.recv().await
    }

    /// Applies a timer expiry. Events from timers that were re-armed or
    /// cancelled since are ignored.
    pub fn handle_timer(&mut self, event: TimerEvent) -> ScreenState {
        if !self.timers.is_current(&event) {
            debug!("Ignoring stale {:?} timer #{}", event.kind, event.generation);
            return self.session.state();
        }
        info!("{:?} timer expired at {}", event.kind, self.session.state());
        self.go_home()
    }

    fn ensure_at(&self, expected: ScreenState) -> Result<()> {
        let actual = self.session.state();
        if actual == expected {
            Ok(())
        } else {
            Err(CheckInError::UnexpectedScreen { expected, actual })
        }
    }

    fn advance(&mut self, decision: &crate::models::FlowDecision) -> ScreenState {
        let next = self.session.advance(decision);
        self.timers.on_enter(next);
        next
    }

    fn move_to(&mut self, state: ScreenState) -> ScreenState {
        self.session.move_to(state);
        self.timers.on_enter(state);
        state
    }
}
