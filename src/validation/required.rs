use crate::models::{ScreenState, StepRules, ValidationRule, VisitorRecord};
use crate::utils::{CheckInError, Result};

/// Client-side checks run before a step's request is sent.
pub struct RequiredFieldValidator;

impl RequiredFieldValidator {
    pub fn validate(stage: ScreenState, visitor: &VisitorRecord) -> Result<()> {
        let rules = StepRules::new();
        let rule = match rules.get_rule(stage) {
            Some(rule) => rule,
            None => return Ok(()),
        };

        for validation_rule in &rule.validation_rules {
            match validation_rule {
                ValidationRule::RequiredField(field) => {
                    if visitor.field(field).is_none() {
                        return Err(CheckInError::MissingField(field.to_string()));
                    }
                }
                ValidationRule::AnyOf(fields) => {
                    if fields.iter().all(|field| visitor.field(field).is_none()) {
                        return Err(CheckInError::MissingField(fields.join(" | ")));
                    }
                }
                ValidationRule::MustAccept(field) => {
                    if visitor.privacy_policy_agreement != Some(true) {
                        return Err(CheckInError::MissingField(field.to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}
