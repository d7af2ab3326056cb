use serde::{Deserialize, Serialize};

use crate::flows::{FlowContext, FlowTransitionError};

/// Lifecycle of a single closing-audit run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditState {
    #[default]
    Idle,
    FilesSelected,
    Submitting,
    Succeeded,
    Failed,
}

impl AuditState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::FilesSelected => "FilesSelected",
            Self::Submitting => "Submitting",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }

    /// Whether the visitor may change the file selection in this state.
    pub fn accepts_selection(&self) -> bool {
        matches!(self, Self::Idle | Self::FilesSelected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEvent {
    SelectFiles,
    ClearFiles,
    Submit,
    Complete,
    Fail,
    Reset,
}

impl AuditEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectFiles => "SelectFiles",
            Self::ClearFiles => "ClearFiles",
            Self::Submit => "Submit",
            Self::Complete => "Complete",
            Self::Fail => "Fail",
            Self::Reset => "Reset",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTransition {
    pub from: AuditState,
    pub to: AuditState,
    pub event: AuditEvent,
}

/// Transition table for the audit run. Submission is gated on the selection
/// rule carried in the context; a run in flight accepts only its terminal
/// events, and both terminal states return to idle through `Reset`.
pub fn transition(
    current: AuditState,
    event: AuditEvent,
    context: &FlowContext,
) -> Result<AuditTransition, FlowTransitionError> {
    use AuditEvent::{ClearFiles, Complete, Fail, Reset, SelectFiles, Submit};
    use AuditState::{Failed, FilesSelected, Idle, Submitting, Succeeded};

    let to = match (current, event) {
        (Idle, SelectFiles) | (FilesSelected, SelectFiles) => FilesSelected,
        (FilesSelected, ClearFiles) => Idle,
        (FilesSelected, Submit) => {
            if !context.missing_required_fields.is_empty() {
                return Err(FlowTransitionError::MissingRequiredFields {
                    state: current.name(),
                    missing_fields: context.missing_required_fields.clone(),
                });
            }
            Submitting
        }
        (Submitting, Complete) => Succeeded,
        (Submitting, Fail) => Failed,
        (Succeeded, Reset) | (Failed, Reset) => Idle,
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.name(),
                event: event.name(),
            });
        }
    };

    Ok(AuditTransition { from: current, to, event })
}
