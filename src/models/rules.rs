use crate::models::ScreenState;

/// The one ordering used to pick the next stage from a capability set.
/// Earlier entries win.
pub const STAGE_PRIORITY: [ScreenState; 5] = [
    ScreenState::SelectRole,
    ScreenState::SelectPurpose,
    ScreenState::CaptureImage,
    ScreenState::CaptureId,
    ScreenState::EmergencyContact,
];

pub const EMERGENCY_FIELDS: [&str; 3] = ["emergency_name", "emergency_phone", "emergency_relation"];

pub struct StepRules {
    pub steps: Vec<StepRule>,
}

pub struct StepRule {
    pub stage: ScreenState,
    pub validation_rules: Vec<ValidationRule>,
}

pub enum ValidationRule {
    RequiredField(&'static str),
    AnyOf(&'static [&'static str]),
    MustAccept(&'static str),
}

impl StepRules {
    pub fn new() -> Self {
        let steps = vec![
            StepRule {
                stage: ScreenState::CheckIn,
                validation_rules: vec![ValidationRule::RequiredField("email")],
            },
            StepRule {
                stage: ScreenState::VisitorDetails,
                validation_rules: vec![ValidationRule::RequiredField("full_name")],
            },
            StepRule {
                stage: ScreenState::SelectPurpose,
                validation_rules: vec![ValidationRule::RequiredField("purpose")],
            },
            StepRule {
                stage: ScreenState::EmergencyContact,
                validation_rules: vec![ValidationRule::AnyOf(&EMERGENCY_FIELDS)],
            },
            StepRule {
                stage: ScreenState::Agreement,
                validation_rules: vec![ValidationRule::MustAccept("privacy_policy_agreement")],
            },
        ];

        StepRules { steps }
    }

    pub fn get_rule(&self, stage: ScreenState) -> Option<&StepRule> {
        self.steps.iter().find(|rule| rule.stage == stage)
    }
}

impl Default for StepRules {
    fn default() -> Self {
        Self::new()
    }
}
