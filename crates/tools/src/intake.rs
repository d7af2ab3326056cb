use thiserror::Error;
use tracing::{info, trace};

use titledesk_core::domain::intake::{AddressBreakdown, IntakeForm};
use titledesk_core::flows::intake::{transition, IntakeEvent, IntakeState};
use titledesk_core::flows::{FlowContext, FlowTransitionError};

use crate::analysis::{AnalysisClient, AnalysisRequest};
use crate::mail::{ComposeError, MailComposer, MailDraft};

const ADDRESS_LOOKUP_INSTRUCTION: &str = "Extract a structured US property address from the text \
below. Respond with only a JSON object using the keys street, city, state, zip, county. Omit any \
key you cannot determine. Do not include commentary.\n\nAddress text:\n";

#[derive(Debug, Error)]
pub enum IntakeWorkflowError {
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl IntakeWorkflowError {
    pub fn visitor_message(&self) -> String {
        match self {
            Self::Flow(FlowTransitionError::MissingRequiredFields { missing_fields, .. }) => {
                format!("Please complete the required fields: {}", missing_fields.join(", "))
            }
            Self::Flow(FlowTransitionError::InvalidTransition { .. }) => {
                "That step is not available right now.".to_string()
            }
            Self::Compose(_) => {
                "Your mail client could not be opened. Please email us directly.".to_string()
            }
        }
    }
}

/// Drives the three-step order form. The wizard owns one mutable form for its
/// whole lifetime; moving backward never clears anything.
pub struct IntakeWizard {
    form: IntakeForm,
    state: IntakeState,
}

impl Default for IntakeWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeWizard {
    pub fn new() -> Self {
        Self { form: IntakeForm::default(), state: IntakeState::Identity }
    }

    pub fn state(&self) -> IntakeState {
        self.state
    }

    pub fn form(&self) -> &IntakeForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut IntakeForm {
        &mut self.form
    }

    pub fn advance(&mut self) -> Result<IntakeState, IntakeWorkflowError> {
        let context = match self.state {
            IntakeState::Identity => {
                FlowContext { missing_required_fields: self.form.missing_identity_fields() }
            }
            _ => FlowContext::default(),
        };
        self.state = transition(self.state, IntakeEvent::Advance, &context)?.to;
        Ok(self.state)
    }

    pub fn back(&mut self) -> Result<IntakeState, IntakeWorkflowError> {
        self.state = transition(self.state, IntakeEvent::Back, &FlowContext::default())?.to;
        Ok(self.state)
    }

    /// Optional helper on the property step: ask the analysis service to split
    /// a free-text address into fields. Degrades silently; on any failure the
    /// form is left exactly as it was and the visitor keeps typing manually.
    pub async fn smart_address_lookup(&mut self, client: &dyn AnalysisClient, query: &str) {
        if self.state != IntakeState::Property || query.trim().is_empty() {
            return;
        }

        let request =
            AnalysisRequest::text_only(format!("{ADDRESS_LOOKUP_INSTRUCTION}{query}"));
        let response = match client.analyze(request).await {
            Ok(response) => response,
            Err(error) => {
                trace!(event_name = "intake.address_lookup_failed", error = %error);
                return;
            }
        };

        match parse_breakdown(&response) {
            Some(breakdown) => self.form.address.apply_breakdown(&breakdown),
            None => {
                trace!(event_name = "intake.address_lookup_unparseable", response_len = response.len());
            }
        }
    }

    /// Final submission: validates the minimum field set, composes a pre-filled
    /// mail draft with a plain-text summary, and hands it to the mail client.
    /// File contents are never transmitted, only attachment names.
    pub fn submit(
        &mut self,
        composer: &dyn MailComposer,
        orders_email: &str,
    ) -> Result<MailDraft, IntakeWorkflowError> {
        let context =
            FlowContext { missing_required_fields: self.form.missing_submission_fields() };
        let outcome = transition(self.state, IntakeEvent::Submit, &context)?;

        let draft = MailDraft {
            to: orders_email.to_string(),
            subject: self.subject(),
            body: self.form.summary_text(),
        };
        composer.compose(&draft)?;

        self.state = outcome.to;
        info!(
            event_name = "intake.order_submitted",
            attachments = self.form.attachments.len(),
            "order intake handed off to mail client"
        );
        Ok(draft)
    }

    fn subject(&self) -> String {
        let street = self.form.address.street.trim();
        if street.is_empty() {
            "New Title Order Request".to_string()
        } else {
            format!("New Title Order: {street}")
        }
    }
}

/// Accept plain JSON or JSON wrapped in a markdown code fence.
fn parse_breakdown(response: &str) -> Option<AddressBreakdown> {
    let trimmed = response.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(inner).ok()
}
