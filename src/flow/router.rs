use log::{debug, warn};

use crate::models::{CapabilitySet, FlowDecision, ScreenState, STAGE_PRIORITY};
use crate::utils::Result;

/// FlowRouter: maps the current stage and the backend's routing signal to
/// the next screen. Pure; identical inputs always give identical output.
pub struct FlowRouter;

impl FlowRouter {
    /// A non-empty `hint` names the next screen outright and fails with
    /// `UnknownStage` when it matches none. Otherwise the first stage of
    /// [`STAGE_PRIORITY`] present in `capabilities` wins, and `Agreement` when
    /// none is.
    pub fn decide_next(
        current: ScreenState,
        capabilities: &CapabilitySet,
        hint: Option<&str>,
    ) -> Result<ScreenState> {
        if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
            let next = hint.parse::<ScreenState>()?;
            debug!("{} -> {} (hint '{}')", current, next, hint);
            return Ok(next);
        }

        let next = Self::scan(capabilities);
        debug!("{} -> {} (capabilities {:?})", current, next, capabilities);
        Ok(next)
    }

    /// Total variant used by the step handlers: an unrecognized hint sends the
    /// visitor to the agreement instead of failing the step.
    pub fn route(current: ScreenState, decision: &FlowDecision) -> ScreenState {
        let outcome = match decision {
            FlowDecision::Hint(hint) => Self::decide_next(current, &CapabilitySet::new(), Some(hint)),
            FlowDecision::Capabilities(set) => Self::decide_next(current, set, None),
            FlowDecision::None => Self::decide_next(current, &CapabilitySet::new(), None),
        };

        outcome.unwrap_or_else(|err| {
            warn!("{} from {}; falling back to {}", err, current, ScreenState::Agreement);
            ScreenState::Agreement
        })
    }

    fn scan(capabilities: &CapabilitySet) -> ScreenState {
        STAGE_PRIORITY
            .iter()
            .find(|stage| capabilities.contains_stage(**stage))
            .copied()
            .unwrap_or(ScreenState::Agreement)
    }
}
