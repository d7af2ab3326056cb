use std::sync::{Arc, Mutex};

use thiserror::Error;

/// A pre-filled message handed to the visitor's own mail client. Fire and
/// forget: the visitor still has to press send and attach any files manually.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailDraft {
    pub fn mailto_uri(&self) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            self.to,
            urlencoding::encode(&self.subject),
            urlencoding::encode(&self.body)
        )
    }
}

#[derive(Debug, Error)]
#[error("mail hand-off failed: {0}")]
pub struct ComposeError(pub String);

/// Boundary for the mail hand-off. The contract is "attempted", nothing more;
/// there is no delivery confirmation.
pub trait MailComposer: Send + Sync {
    fn compose(&self, draft: &MailDraft) -> Result<(), ComposeError>;
}

/// Test double that records every draft it was asked to compose.
#[derive(Clone, Default)]
pub struct RecordingComposer {
    drafts: Arc<Mutex<Vec<MailDraft>>>,
}

impl RecordingComposer {
    pub fn drafts(&self) -> Vec<MailDraft> {
        match self.drafts.lock() {
            Ok(drafts) => drafts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MailComposer for RecordingComposer {
    fn compose(&self, draft: &MailDraft) -> Result<(), ComposeError> {
        match self.drafts.lock() {
            Ok(mut drafts) => drafts.push(draft.clone()),
            Err(poisoned) => poisoned.into_inner().push(draft.clone()),
        }
        Ok(())
    }
}
