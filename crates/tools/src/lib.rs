//! Visitor-facing workflows for the titledesk site.
//!
//! This crate sits between the domain core and the interface crates. It owns:
//! - The closing-audit run (`audit`): validate the file selection, encode it,
//!   make exactly one analysis call, and hold the resulting narrative.
//! - The order-intake wizard (`intake`): drive the three-step form and hand
//!   the finished summary to the visitor's mail client.
//! - The staging, mail, and export boundaries those workflows talk through.
//!
//! # Safety Principle
//!
//! The analysis service is strictly a text generator. It never decides whether
//! a submission is valid; validation is deterministic and happens locally
//! before any network call.

pub mod analysis;
pub mod audit;
pub mod export;
pub mod intake;
pub mod mail;
pub mod staging;

pub use analysis::{AnalysisClient, AnalysisError, AnalysisFailure, AnalysisRequest};
pub use audit::{ClosingAuditSession, AuditWorkflowError, AUDIT_DIRECTIVE, AUDIT_INSTRUCTION};
pub use export::{ExportError, FileExporter, ReportExporter};
pub use intake::{IntakeWizard, IntakeWorkflowError};
pub use mail::{ComposeError, MailComposer, MailDraft, RecordingComposer};
pub use staging::{media_type_for, stage_paths, StagingError};
