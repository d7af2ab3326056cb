use thiserror::Error;
use tracing::{info, warn};

use titledesk_core::domain::staging::{encode_all, EncodeError, StagedFile};
use titledesk_core::flows::audit::{transition, AuditEvent, AuditState};
use titledesk_core::flows::{FlowContext, FlowTransitionError};
use titledesk_core::report::AuditReport;

use crate::analysis::{AnalysisClient, AnalysisError, AnalysisRequest};

pub const AUDIT_DIRECTIVE: &str = "You are a professional real estate title auditor.";

pub const AUDIT_INSTRUCTION: &str = "Analyze these documents: the Purchase Contract (and any \
addenda) followed by the Closing Disclosure (CD).\n\n\
Identify if they are aligned or if there are discrepancies in:\n\
- Sale Price\n\
- Earnest Money / Deposit amounts\n\
- Seller Credits\n\
- Prorated taxes (if visible)\n\
- Commissions (if visible)\n\n\
Format your response as a professional audit report with:\n\
- A summary \"Status\" (Aligned or Action Required)\n\
- A detailed breakdown of each category\n\
- Specific callouts for any differences found.\n\n\
If the documents are not clear, state what might be missing.";

#[derive(Debug, Error)]
pub enum AuditWorkflowError {
    #[error("selection incomplete: {0:?}")]
    Validation(Vec<String>),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
}

impl AuditWorkflowError {
    /// Short message suitable for the visitor. Never exposes provider detail.
    pub fn visitor_message(&self) -> String {
        match self {
            Self::Validation(_) => {
                "Please upload both the Purchase Contract and the Closing Disclosure.".to_string()
            }
            Self::Encode(EncodeError::EmptyPayload { name }) => {
                format!("The file `{name}` could not be read. Please choose it again.")
            }
            Self::Analysis(error) => error.class.visitor_message().to_string(),
            Self::Flow(_) => "That action is not available right now.".to_string(),
        }
    }
}

/// One closing-audit run: contract-and-addenda files, a single disclosure, and
/// the result of the most recent submission. Each run replaces the previous
/// result wholesale.
#[derive(Default)]
pub struct ClosingAuditSession {
    contracts: Vec<StagedFile>,
    disclosure: Option<StagedFile>,
    state: AuditState,
    narrative: Option<String>,
    last_error: Option<String>,
}

impl ClosingAuditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuditState {
        self.state
    }

    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn contract_names(&self) -> Vec<&str> {
        self.contracts.iter().map(|file| file.name.as_str()).collect()
    }

    pub fn add_contracts(
        &mut self,
        files: impl IntoIterator<Item = StagedFile>,
    ) -> Result<(), AuditWorkflowError> {
        self.ensure_selection_open()?;
        self.contracts.extend(files);
        self.mark_selection();
        Ok(())
    }

    pub fn remove_contract(&mut self, index: usize) -> Result<StagedFile, AuditWorkflowError> {
        self.ensure_selection_open()?;
        if index >= self.contracts.len() {
            return Err(AuditWorkflowError::Validation(vec![format!(
                "no contract file at position {index}"
            )]));
        }
        let removed = self.contracts.remove(index);
        self.mark_selection();
        Ok(removed)
    }

    pub fn set_disclosure(&mut self, file: StagedFile) -> Result<(), AuditWorkflowError> {
        self.ensure_selection_open()?;
        self.disclosure = Some(file);
        self.mark_selection();
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<(), AuditWorkflowError> {
        self.ensure_selection_open()?;
        self.contracts.clear();
        self.disclosure = None;
        if self.state == AuditState::FilesSelected {
            self.state = transition(self.state, AuditEvent::ClearFiles, &FlowContext::default())?.to;
        }
        Ok(())
    }

    /// What the selection still needs before a run may start.
    pub fn missing_selection(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.contracts.is_empty() {
            missing.push("purchase_contract".to_string());
        }
        if self.disclosure.is_none() {
            missing.push("closing_disclosure".to_string());
        }
        missing
    }

    /// Submit the selection for analysis. Validation and encoding both happen
    /// before any network interaction; a failed call is surfaced once with a
    /// classified message and never retried here.
    pub async fn run(
        &mut self,
        client: &dyn AnalysisClient,
        temperature: f64,
    ) -> Result<&str, AuditWorkflowError> {
        let context = FlowContext { missing_required_fields: self.missing_selection() };
        self.state = transition(self.state, AuditEvent::Submit, &context)
            .map_err(|error| match error {
                FlowTransitionError::MissingRequiredFields { missing_fields, .. } => {
                    AuditWorkflowError::Validation(missing_fields)
                }
                other => AuditWorkflowError::Flow(other),
            })?
            .to;

        self.narrative = None;
        self.last_error = None;

        let outcome = self.submit(client, temperature).await;
        match outcome {
            Ok(narrative) => {
                self.state =
                    transition(self.state, AuditEvent::Complete, &FlowContext::default())?.to;
                info!(
                    event_name = "audit.run_completed",
                    contracts = self.contracts.len(),
                    narrative_len = narrative.len(),
                    "closing audit completed"
                );
                self.narrative = Some(narrative);
                Ok(self.narrative.as_deref().unwrap_or_default())
            }
            Err(error) => {
                self.state = transition(self.state, AuditEvent::Fail, &FlowContext::default())?.to;
                warn!(event_name = "audit.run_failed", error = %error, "closing audit failed");
                self.last_error = Some(error.visitor_message());
                Err(error)
            }
        }
    }

    /// Reset a finished run so the visitor can correct input and try again.
    pub fn reset(&mut self) -> Result<(), AuditWorkflowError> {
        self.state = transition(self.state, AuditEvent::Reset, &FlowContext::default())?.to;
        self.narrative = None;
        self.last_error = None;
        self.contracts.clear();
        self.disclosure = None;
        Ok(())
    }

    /// Downloadable artifact for a successful run.
    pub fn report(&self) -> Option<AuditReport> {
        self.narrative.as_deref().map(AuditReport::new)
    }

    async fn submit(
        &self,
        client: &dyn AnalysisClient,
        temperature: f64,
    ) -> Result<String, AuditWorkflowError> {
        let mut documents = encode_all(&self.contracts)?;
        if let Some(disclosure) = &self.disclosure {
            documents.push(disclosure.encode()?);
        }

        let request = AnalysisRequest {
            documents,
            instruction: AUDIT_INSTRUCTION.to_string(),
            system_directive: Some(AUDIT_DIRECTIVE.to_string()),
            temperature: Some(temperature),
        };

        Ok(client.analyze(request).await?)
    }

    fn ensure_selection_open(&self) -> Result<(), AuditWorkflowError> {
        if self.state.accepts_selection() {
            Ok(())
        } else {
            Err(AuditWorkflowError::Flow(FlowTransitionError::InvalidTransition {
                state: self.state.name(),
                event: "SelectFiles",
            }))
        }
    }

    fn mark_selection(&mut self) {
        // SelectFiles is valid from both Idle and FilesSelected.
        if let Ok(outcome) = transition(self.state, AuditEvent::SelectFiles, &FlowContext::default())
        {
            self.state = outcome.to;
        }
    }
}
