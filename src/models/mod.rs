pub mod data;
pub mod rules;

pub use data::*;
pub use rules::{StepRule, StepRules, ValidationRule, EMERGENCY_FIELDS, STAGE_PRIORITY};
