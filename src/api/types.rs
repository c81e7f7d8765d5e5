//! Request and response bodies of the visitor backend.

use serde::{Deserialize, Serialize};

use crate::models::{CapabilitySet, Employee, FlowDecision, VisitorRecord};

/// `POST /visitor/checkPreRegistered`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreRegistrationResponse {
    pub success: bool,
    pub visitor: Option<VisitorRecord>,
}

/// `GET /visitor/visibleFields`: which form fields and stages the tenant uses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisibleFieldsResponse {
    pub fields: CapabilitySet,
}

/// `GET /visitor/selctAppEmployee/`: the directory offered on the purpose step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmployeesResponse {
    pub employees: Vec<Employee>,
}

/// Body shared by every step endpoint. Each endpoint fills a different
/// subset, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StepResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub visitor: Option<VisitorRecord>,
    pub next_screen: Option<String>,
    #[serde(rename = "visibleFields")]
    pub visible_fields: Option<CapabilitySet>,
    pub photo_url: Option<String>,
}

impl StepResponse {
    /// The routing signal of this response.
    pub fn decision(&self) -> FlowDecision {
        FlowDecision::from_parts(self.next_screen.as_deref(), self.visible_fields.clone())
    }

    pub fn visitor_id(&self) -> Option<u64> {
        self.visitor.as_ref().and_then(|v| v.id)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RoleRequest<'a> {
    pub visitor_id: u64,
    pub role: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PurposeRequest<'a> {
    pub visitor_id: u64,
    pub purpose: &'a str,
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AgreementRequest {
    pub visitor_id: u64,
    pub privacy_policy_agreement: u8,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmailRequest<'a> {
    pub email: &'a str,
}
