use async_trait::async_trait;
use thiserror::Error;

use titledesk_core::domain::staging::EncodedDocument;

/// One request to the external analysis service: ordered document payloads
/// plus a natural-language instruction and a behavioral directive. The
/// response is opaque free-form text.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub documents: Vec<EncodedDocument>,
    pub instruction: String,
    pub system_directive: Option<String>,
    pub temperature: Option<f64>,
}

impl AnalysisRequest {
    pub fn text_only(instruction: impl Into<String>) -> Self {
        Self {
            documents: Vec::new(),
            instruction: instruction.into(),
            system_directive: None,
            temperature: None,
        }
    }
}

/// How a failed analysis call is presented to the visitor. The classes map to
/// distinct short messages; nothing is retried automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisFailure {
    RateLimited,
    Unauthorized,
    UnreadableInput,
    Other,
}

impl AnalysisFailure {
    pub fn visitor_message(&self) -> &'static str {
        match self {
            Self::RateLimited => {
                "The analysis service is busy right now. Please wait a moment and try again."
            }
            Self::Unauthorized => {
                "Secure access check required. Please ensure your project key is connected."
            }
            Self::UnreadableInput => {
                "An error occurred during the audit. Please ensure you've uploaded clear images of the documents."
            }
            Self::Other => "Something went wrong while contacting the analysis service. Please try again.",
        }
    }
}

#[derive(Debug, Error)]
#[error("analysis call failed ({class:?}): {message}")]
pub struct AnalysisError {
    pub class: AnalysisFailure,
    pub message: String,
}

impl AnalysisError {
    pub fn new(class: AnalysisFailure, message: impl Into<String>) -> Self {
        Self { class, message: message.into() }
    }

    /// Classify a provider error by the shape of its message. Providers that
    /// know their own status codes should construct the class directly.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();

        let class = if lowered.contains("429")
            || lowered.contains("rate limit")
            || lowered.contains("quota")
            || lowered.contains("resource_exhausted")
        {
            AnalysisFailure::RateLimited
        } else if lowered.contains("401")
            || lowered.contains("403")
            || lowered.contains("api key")
            || lowered.contains("unauthorized")
            || lowered.contains("permission")
        {
            AnalysisFailure::Unauthorized
        } else if lowered.contains("400")
            || lowered.contains("invalid_argument")
            || lowered.contains("unsupported")
        {
            AnalysisFailure::UnreadableInput
        } else {
            AnalysisFailure::Other
        };

        Self { class, message }
    }
}

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<String, AnalysisError>;
}
