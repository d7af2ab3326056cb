//! JSON and HTML routes for the visitor-facing site core.
//!
//! - `GET  /role`              — current persisted role and its display content
//! - `POST /role`              — persist a new role choice
//! - `GET  /content`           — role-tailored page content
//! - `GET  /portal`            — resolve the external portal destination
//! - `POST /audit`             — run a closing audit over uploaded documents
//! - `GET  /report`            — rendered HTML of the last successful audit
//! - `POST /intake`            — submit the order form, returns a mail draft

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tera::Tera;
use tracing::{info, warn};
use uuid::Uuid;

use titledesk_core::activity::{
    ActivityCategory, ActivityEvent, ActivityOutcome, ActivitySink, InMemoryActivitySink,
};
use titledesk_core::config::AppConfig;
use titledesk_core::domain::intake::{IntakeForm, SubmitterRole, TransactionType};
use titledesk_core::domain::role::{content_for, Role, RoleContent};
use titledesk_core::domain::staging::StagedFile;
use titledesk_core::portal::resolve_destination;
use titledesk_core::report::{AuditReport, REPORT_DISCLAIMER, REPORT_FOOTER};
use titledesk_core::session::{FileStore, RoleStore};
use titledesk_tools::analysis::AnalysisClient;
use titledesk_tools::audit::{AuditWorkflowError, ClosingAuditSession};
use titledesk_tools::intake::IntakeWizard;
use titledesk_tools::mail::{ComposeError, MailComposer, MailDraft};

use crate::bootstrap::Application;

#[derive(Clone)]
pub struct SiteState {
    pub config: Arc<AppConfig>,
    pub role_store: Arc<RoleStore<FileStore>>,
    pub analysis: Arc<dyn AnalysisClient>,
    pub last_report: Arc<Mutex<Option<AuditReport>>>,
    pub activity: Arc<InMemoryActivitySink>,
    templates: Arc<Tera>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type Rejection = (StatusCode, Json<ApiError>);

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, Json(ApiError { error: message.into(), correlation_id: Uuid::new_v4().to_string() }))
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub role: String,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct FilePayload {
    pub name: String,
    pub media_type: String,
    /// Base64 file contents.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub contracts: Vec<FilePayload>,
    pub disclosure: FilePayload,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub status: &'static str,
    pub narrative: String,
}

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub submitter_role: String,
    #[serde(default)]
    pub submitter_name: String,
    #[serde(default)]
    pub submitter_email: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub county: String,
    #[serde(default = "default_transaction_type")]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub price: String,
    pub buyer_names: Vec<String>,
    pub seller_names: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub attachment_names: Vec<String>,
}

fn default_transaction_type() -> TransactionType {
    TransactionType::Purchase
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub status: &'static str,
    pub mailto: String,
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/report/**/*") {
        Ok(tera) => tera,
        Err(error) => {
            warn!(error = %error, "report templates not found on disk, using embedded fallback");
            Tera::default()
        }
    };

    tera.register_filter("strong_markup", strong_markup_filter);
    tera.add_raw_template("audit.html", include_str!("../../../templates/report/audit.html"))
        .ok();

    Arc::new(tera)
}

/// Escape HTML, then turn `**text**` pairs into `<strong>` and newlines into
/// `<br>` so the narrative reads like a document instead of a blob.
fn strong_markup_filter(
    value: &tera::Value,
    _args: &std::collections::HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let raw = value.as_str().ok_or_else(|| tera::Error::msg("strong_markup expects a string"))?;
    let escaped = raw
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    let mut html = String::with_capacity(escaped.len());
    let mut open = false;
    let mut rest = escaped.as_str();
    while let Some(position) = rest.find("**") {
        html.push_str(&rest[..position]);
        html.push_str(if open { "</strong>" } else { "<strong>" });
        open = !open;
        rest = &rest[position + 2..];
    }
    html.push_str(rest);
    if open {
        html.push_str("</strong>");
    }

    Ok(tera::Value::String(html.replace('\n', "<br>\n")))
}

pub fn router(app: &Application) -> Router {
    let state = SiteState {
        config: Arc::new(app.config.clone()),
        role_store: app.role_store.clone(),
        analysis: app.analysis.clone(),
        last_report: app.last_report.clone(),
        activity: Arc::new(InMemoryActivitySink::default()),
        templates: init_templates(),
    };
    router_with_state(state)
}

pub fn router_with_state(state: SiteState) -> Router {
    Router::new()
        .route("/role", get(get_role).post(set_role))
        .route("/content", get(get_content))
        .route("/portal", get(get_portal))
        .route("/audit", post(run_audit))
        .route("/report", get(get_report))
        .route("/report/download", get(download_report))
        .route("/intake", post(submit_intake))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_role(State(state): State<SiteState>) -> Result<Json<RoleResponse>, Rejection> {
    let role = current_role(&state)?;
    Ok(Json(RoleResponse {
        role: role.storage_value().to_string(),
        display_name: role.display_name().to_string(),
    }))
}

async fn set_role(
    State(state): State<SiteState>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<RoleResponse>, Rejection> {
    let role = Role::from_str(&request.role).map_err(|_| {
        reject(StatusCode::BAD_REQUEST, format!("unknown role `{}`", request.role))
    })?;

    state.role_store.set_role(role).map_err(|error| {
        warn!(event_name = "site.role_persist_failed", error = %error);
        reject(StatusCode::SERVICE_UNAVAILABLE, "could not persist role preference")
    })?;

    state.activity.emit(ActivityEvent::new(
        None,
        Uuid::new_v4().to_string(),
        "navigation.role_selected",
        ActivityCategory::Navigation,
        "site",
        ActivityOutcome::Success,
    ));

    Ok(Json(RoleResponse {
        role: role.storage_value().to_string(),
        display_name: role.display_name().to_string(),
    }))
}

async fn get_content(
    State(state): State<SiteState>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<&'static RoleContent>, Rejection> {
    let role = match query.role {
        Some(raw) => Role::parse_or_default(&raw),
        None => current_role(&state)?,
    };
    Ok(Json(content_for(role)))
}

async fn get_portal(
    State(state): State<SiteState>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<PortalResponse>, Rejection> {
    let role = match query.role {
        Some(raw) => Role::parse_or_default(&raw),
        None => current_role(&state)?,
    };
    Ok(Json(PortalResponse {
        role: role.storage_value().to_string(),
        destination: resolve_destination(role, &state.config.portals),
    }))
}

async fn run_audit(
    State(state): State<SiteState>,
    Json(request): Json<AuditRequest>,
) -> Result<Json<AuditResponse>, Rejection> {
    let mut session = ClosingAuditSession::new();
    let contracts = request
        .contracts
        .into_iter()
        .map(decode_payload)
        .collect::<Result<Vec<_>, Rejection>>()?;
    session.add_contracts(contracts).map_err(audit_rejection)?;
    session.set_disclosure(decode_payload(request.disclosure)?).map_err(audit_rejection)?;

    let outcome = session
        .run(state.analysis.as_ref(), state.config.analysis.audit_temperature)
        .await
        .map(|narrative| narrative.to_string());

    state.activity.emit(ActivityEvent::new(
        None,
        Uuid::new_v4().to_string(),
        "audit.run",
        ActivityCategory::Audit,
        "site",
        if outcome.is_ok() { ActivityOutcome::Success } else { ActivityOutcome::Failed },
    ));

    let narrative = outcome.map_err(audit_rejection)?;

    if let Some(report) = session.report() {
        match state.last_report.lock() {
            Ok(mut slot) => *slot = Some(report),
            Err(poisoned) => *poisoned.into_inner() = Some(report),
        }
    }

    Ok(Json(AuditResponse { status: "succeeded", narrative }))
}

async fn get_report(State(state): State<SiteState>) -> Result<Html<String>, Rejection> {
    let report = last_report(&state)?;

    let mut context = tera::Context::new();
    context.insert("generated_at", &report.generated_at.to_rfc3339());
    context.insert("narrative", &report.narrative);
    context.insert("disclaimer", REPORT_DISCLAIMER);
    context.insert("footer", REPORT_FOOTER);

    let rendered = state.templates.render("audit.html", &context).map_err(|error| {
        warn!(event_name = "site.report_render_failed", error = %error);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "could not render the report")
    })?;

    Ok(Html(rendered))
}

async fn download_report(State(state): State<SiteState>) -> Result<Response, Rejection> {
    let report = last_report(&state)?;
    let disposition = format!("attachment; filename=\"{}\"", report.file_name());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.render(),
    )
        .into_response())
}

async fn submit_intake(
    State(state): State<SiteState>,
    Json(request): Json<IntakeRequest>,
) -> Result<Json<IntakeResponse>, Rejection> {
    let submitter_role = SubmitterRole::from_str(&request.submitter_role).map_err(|_| {
        reject(StatusCode::BAD_REQUEST, format!("unknown submitter role `{}`", request.submitter_role))
    })?;

    let mut wizard = IntakeWizard::new();
    *wizard.form_mut() = build_form(submitter_role, request);

    wizard.advance().map_err(intake_rejection)?;
    wizard.advance().map_err(intake_rejection)?;

    let composer = TracingComposer;
    let draft = wizard
        .submit(&composer, &state.config.intake.orders_email)
        .map_err(intake_rejection)?;

    state.activity.emit(ActivityEvent::new(
        None,
        Uuid::new_v4().to_string(),
        "intake.order_submitted",
        ActivityCategory::Intake,
        "site",
        ActivityOutcome::Success,
    ));

    Ok(Json(IntakeResponse {
        status: "submitted",
        mailto: draft.mailto_uri(),
        subject: draft.subject,
        body: draft.body,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The hand-off is the visitor's mailto link; the server only logs that a
/// draft was produced.
struct TracingComposer;

impl MailComposer for TracingComposer {
    fn compose(&self, draft: &MailDraft) -> Result<(), ComposeError> {
        info!(
            event_name = "intake.mail_draft_ready",
            to = %draft.to,
            subject = %draft.subject,
            "mail draft composed"
        );
        Ok(())
    }
}

fn build_form(submitter_role: SubmitterRole, request: IntakeRequest) -> IntakeForm {
    let mut form = IntakeForm {
        submitter_role: Some(submitter_role),
        submitter_name: request.submitter_name,
        submitter_email: request.submitter_email,
        transaction_type: request.transaction_type,
        price: request.price,
        buyer_names: request.buyer_names,
        seller_names: request.seller_names,
        notes: request.notes,
        ..IntakeForm::default()
    };
    form.address.street = request.street;
    form.address.city = request.city;
    form.address.state = request.state;
    form.address.zip = request.zip;
    form.address.county = request.county;
    // Attachment contents stay on the visitor's machine; only names travel.
    form.attachments.add_files(
        request
            .attachment_names
            .into_iter()
            .map(|name| StagedFile::new(name, "application/octet-stream", vec![0])),
    );
    form
}

fn current_role(state: &SiteState) -> Result<Role, Rejection> {
    state.role_store.current_role().map_err(|error| {
        warn!(event_name = "site.role_read_failed", error = %error);
        reject(StatusCode::SERVICE_UNAVAILABLE, "could not read role preference")
    })
}

fn last_report(state: &SiteState) -> Result<AuditReport, Rejection> {
    let slot = match state.last_report.lock() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.clone().ok_or_else(|| reject(StatusCode::NOT_FOUND, "no audit report available yet"))
}

fn decode_payload(payload: FilePayload) -> Result<StagedFile, Rejection> {
    let bytes = BASE64.decode(payload.data.as_bytes()).map_err(|_| {
        reject(StatusCode::BAD_REQUEST, format!("file `{}` is not valid base64", payload.name))
    })?;
    Ok(StagedFile::new(payload.name, payload.media_type, bytes))
}

fn audit_rejection(error: AuditWorkflowError) -> Rejection {
    let status = match &error {
        AuditWorkflowError::Validation(_) | AuditWorkflowError::Encode(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AuditWorkflowError::Analysis(_) => StatusCode::BAD_GATEWAY,
        AuditWorkflowError::Flow(_) => StatusCode::CONFLICT,
    };
    reject(status, error.visitor_message())
}

fn intake_rejection(error: titledesk_tools::intake::IntakeWorkflowError) -> Rejection {
    reject(StatusCode::UNPROCESSABLE_ENTITY, error.visitor_message())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::Json;
    use tempfile::TempDir;

    use titledesk_core::activity::InMemoryActivitySink;
    use titledesk_core::config::AppConfig;
    use titledesk_core::report::AuditReport;
    use titledesk_core::session::{FileStore, RoleStore};
    use titledesk_tools::analysis::{AnalysisClient, AnalysisError, AnalysisRequest};

    use super::{
        get_content, get_portal, get_report, init_templates, run_audit, set_role, AuditRequest,
        FilePayload, RoleQuery, SetRoleRequest, SiteState,
    };

    struct EchoClient;

    #[async_trait]
    impl AnalysisClient for EchoClient {
        async fn analyze(&self, _request: AnalysisRequest) -> Result<String, AnalysisError> {
            Ok("Status: **Aligned**\nAll figures match.".to_string())
        }
    }

    fn state() -> (TempDir, SiteState) {
        let dir = TempDir::new().expect("temp dir");
        let mut config = AppConfig::default();
        config.storage.session_path = dir.path().join("session.json");

        let state = SiteState {
            config: Arc::new(config.clone()),
            role_store: Arc::new(RoleStore::new(FileStore::new(&config.storage.session_path))),
            analysis: Arc::new(EchoClient),
            last_report: Arc::new(Mutex::new(None)),
            activity: Arc::new(InMemoryActivitySink::default()),
            templates: init_templates(),
        };
        (dir, state)
    }

    fn encoded(name: &str) -> FilePayload {
        FilePayload {
            name: name.to_string(),
            media_type: "application/pdf".to_string(),
            data: "Y29udGVudA==".to_string(),
        }
    }

    #[tokio::test]
    async fn set_role_rejects_unknown_values() {
        let (_dir, state) = state();
        let result = set_role(
            State(state),
            Json(SetRoleRequest { role: "landlord".to_string() }),
        )
        .await;
        let (status, _) = result.expect_err("unknown role");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn content_and_portal_default_to_the_buyer_role() {
        let (_dir, state) = state();

        let Json(content) = get_content(State(state.clone()), Query(RoleQuery { role: None }))
            .await
            .expect("content");
        assert!(!content.headline.is_empty());

        let Json(portal) = get_portal(State(state), Query(RoleQuery { role: None }))
            .await
            .expect("portal");
        assert_eq!(portal.role, "buyer");
        assert!(portal.destination.contains("buyers"));
    }

    #[tokio::test]
    async fn audit_round_trip_stores_a_renderable_report() {
        let (_dir, state) = state();

        let Json(response) = run_audit(
            State(state.clone()),
            Json(AuditRequest {
                contracts: vec![encoded("contract.pdf")],
                disclosure: encoded("cd.pdf"),
            }),
        )
        .await
        .expect("stub analysis succeeds");
        assert_eq!(response.status, "succeeded");
        assert!(response.narrative.contains("Aligned"));

        let html = get_report(State(state.clone())).await.expect("report exists").0;
        assert!(html.contains("<strong>Aligned</strong>"));
        assert!(html.contains("PROFESSIONAL REVIEW REQUIRED"));

        let stored = state.last_report.lock().expect("lock").clone().expect("stored report");
        let reparsed =
            AuditReport::parse(&stored.render()).expect("artifact round trips");
        assert_eq!(reparsed.narrative, stored.narrative);
    }

    #[tokio::test]
    async fn audit_with_bad_base64_is_rejected_before_analysis() {
        let (_dir, state) = state();

        let result = run_audit(
            State(state),
            Json(AuditRequest {
                contracts: vec![FilePayload {
                    name: "contract.pdf".to_string(),
                    media_type: "application/pdf".to_string(),
                    data: "%%% not base64 %%%".to_string(),
                }],
                disclosure: encoded("cd.pdf"),
            }),
        )
        .await;

        let (status, Json(error)) = result.expect_err("invalid payload");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.error.contains("contract.pdf"));
    }
}
