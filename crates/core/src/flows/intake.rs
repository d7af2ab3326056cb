use serde::{Deserialize, Serialize};

use crate::flows::{FlowContext, FlowTransitionError};

/// Named steps of the order-intake wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeState {
    Identity,
    Property,
    DealAndDocuments,
    Submitted,
}

impl IntakeState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "Identity",
            Self::Property => "Property",
            Self::DealAndDocuments => "DealAndDocuments",
            Self::Submitted => "Submitted",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeEvent {
    Advance,
    Back,
    Submit,
}

impl IntakeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance => "Advance",
            Self::Back => "Back",
            Self::Submit => "Submit",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeTransition {
    pub from: IntakeState,
    pub to: IntakeState,
    pub event: IntakeEvent,
}

/// Guarded transition table for the wizard.
///
/// Backward navigation is always allowed and never consults the context, so
/// previously entered values survive untouched. Forward navigation from the
/// identity step and final submission are gated on the context's missing-field
/// vector.
pub fn transition(
    current: IntakeState,
    event: IntakeEvent,
    context: &FlowContext,
) -> Result<IntakeTransition, FlowTransitionError> {
    use IntakeEvent::{Advance, Back, Submit};
    use IntakeState::{DealAndDocuments, Identity, Property, Submitted};

    let to = match (current, event) {
        (Identity, Advance) => {
            guard(current, context)?;
            Property
        }
        (Property, Advance) => DealAndDocuments,
        (Property, Back) => Identity,
        (DealAndDocuments, Back) => Property,
        (DealAndDocuments, Submit) => {
            guard(current, context)?;
            Submitted
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.name(),
                event: event.name(),
            });
        }
    };

    Ok(IntakeTransition { from: current, to, event })
}

fn guard(state: IntakeState, context: &FlowContext) -> Result<(), FlowTransitionError> {
    if context.missing_required_fields.is_empty() {
        return Ok(());
    }
    Err(FlowTransitionError::MissingRequiredFields {
        state: state.name(),
        missing_fields: context.missing_required_fields.clone(),
    })
}
