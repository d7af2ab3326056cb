pub mod audit;
pub mod intake;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before transition from {state}: {missing_fields:?}")]
    MissingRequiredFields { state: &'static str, missing_fields: Vec<String> },
    #[error("invalid transition from {state} using event {event}")]
    InvalidTransition { state: &'static str, event: &'static str },
}

/// Context a transition is evaluated against. Guards consult the missing-field
/// vector computed from the owning form; the flow layer never inspects fields
/// directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub missing_required_fields: Vec<String>,
}
