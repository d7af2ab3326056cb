use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use titledesk_core::config::AnalysisConfig;
use titledesk_tools::analysis::{AnalysisClient, AnalysisError, AnalysisFailure, AnalysisRequest};

/// Gemini `generateContent` response, reduced to the parts we read.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Client for the Gemini `generateContent` REST endpoint. Documents go in as
/// inline base64 parts followed by the instruction text; the behavioral
/// directive rides as a system instruction.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                AnalysisError::new(AnalysisFailure::Other, format!("http client: {error}"))
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(&self, request: &AnalysisRequest) -> serde_json::Value {
        let mut parts: Vec<serde_json::Value> = request
            .documents
            .iter()
            .map(|document| {
                serde_json::json!({
                    "inlineData": {
                        "data": document.data,
                        "mimeType": document.media_type,
                    }
                })
            })
            .collect();
        parts.push(serde_json::json!({ "text": request.instruction }));

        let mut body = serde_json::json!({
            "contents": [{ "parts": parts }],
        });

        if let Some(directive) = &request.system_directive {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": directive }]
            });
        }
        if let Some(temperature) = request.temperature {
            body["generationConfig"] = serde_json::json!({ "temperature": temperature });
        }

        body
    }

    fn map_http_error(&self, status: u16, body_text: &str) -> AnalysisError {
        let detail = serde_json::from_str::<ApiErrorResponse>(body_text)
            .ok()
            .and_then(|response| response.error)
            .and_then(|error| error.message)
            .unwrap_or_else(|| body_text.to_string());

        let class = match status {
            429 => AnalysisFailure::RateLimited,
            401 | 403 => AnalysisFailure::Unauthorized,
            400 => AnalysisFailure::UnreadableInput,
            _ => return AnalysisError::classify(format!("HTTP {status}: {detail}")),
        };

        AnalysisError::new(class, format!("HTTP {status}: {detail}"))
    }

    fn extract_text(response: GenerateContentResponse) -> Option<String> {
        let text: String = response
            .candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<String, AnalysisError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AnalysisError::new(AnalysisFailure::Unauthorized, "analysis API key is not configured")
        })?;

        let body = self.build_request_body(&request);
        debug!(
            event_name = "analysis.request_sent",
            model = %self.model,
            documents = request.documents.len(),
            "calling analysis service"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| AnalysisError::classify(error.to_string()))?;

        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|error| AnalysisError::classify(error.to_string()))?;

        if status != 200 {
            return Err(self.map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body_text).map_err(|error| {
            AnalysisError::new(AnalysisFailure::Other, format!("unexpected response shape: {error}"))
        })?;

        Self::extract_text(parsed).ok_or_else(|| {
            AnalysisError::new(AnalysisFailure::Other, "analysis response contained no text")
        })
    }
}

#[cfg(test)]
mod tests {
    use titledesk_core::config::AppConfig;
    use titledesk_core::domain::staging::EncodedDocument;
    use titledesk_tools::analysis::{AnalysisFailure, AnalysisRequest};

    use super::{GeminiClient, GenerateContentResponse};

    fn client() -> GeminiClient {
        let mut config = AppConfig::default().analysis;
        config.api_key = Some("test-key".to_string().into());
        GeminiClient::new(&config).expect("client builds")
    }

    #[test]
    fn endpoint_includes_model_and_strips_trailing_slash() {
        let mut config = AppConfig::default().analysis;
        config.base_url = "https://generativelanguage.googleapis.com/".to_string();
        let client = GeminiClient::new(&config).expect("client builds");
        assert_eq!(
            client.endpoint(),
            format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                config.model
            )
        );
    }

    #[test]
    fn request_body_orders_documents_before_the_instruction() {
        let request = AnalysisRequest {
            documents: vec![
                EncodedDocument { data: "YWJj".to_string(), media_type: "application/pdf".to_string() },
                EncodedDocument { data: "ZGVm".to_string(), media_type: "image/png".to_string() },
            ],
            instruction: "compare these".to_string(),
            system_directive: Some("be an auditor".to_string()),
            temperature: Some(0.2),
        };

        let body = client().build_request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().expect("parts array");

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["data"], "YWJj");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["text"], "compare these");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be an auditor");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
    }

    #[test]
    fn text_only_request_omits_optional_sections() {
        let body = client().build_request_body(&AnalysisRequest::text_only("hello"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn http_status_codes_map_to_failure_classes() {
        let client = client();
        let cases = [
            (429, AnalysisFailure::RateLimited),
            (401, AnalysisFailure::Unauthorized),
            (403, AnalysisFailure::Unauthorized),
            (400, AnalysisFailure::UnreadableInput),
            (503, AnalysisFailure::Other),
        ];
        for (status, expected) in cases {
            let error =
                client.map_http_error(status, r#"{"error":{"message":"something happened"}}"#);
            assert_eq!(error.class, expected, "status {status}");
        }
    }

    #[test]
    fn response_text_is_concatenated_from_candidate_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Status: " }, { "text": "Aligned" }] }
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).expect("valid shape");
        assert_eq!(GeminiClient::extract_text(parsed).as_deref(), Some("Status: Aligned"));
    }

    #[test]
    fn empty_candidates_yield_no_text() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": []}"#).expect("valid shape");
        assert_eq!(GeminiClient::extract_text(parsed), None);
    }
}
