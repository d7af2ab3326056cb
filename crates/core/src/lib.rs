pub mod activity;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod portal;
pub mod report;
pub mod session;
pub mod shell;

pub use activity::{
    ActivityCategory, ActivityEvent, ActivityOutcome, ActivitySink, InMemoryActivitySink,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::intake::{
    AddressBreakdown, IntakeForm, PropertyAddress, SubmitterRole, TransactionType,
};
pub use domain::role::{content_for, Role, RoleContent, ValueProp, ALL_ROLES};
pub use domain::staging::{EncodeError, EncodedDocument, FileList, StagedFile};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use portal::{resolve_destination, resolve_destination_for, PortalSide};
pub use report::{AuditReport, ReportParseError, REPORT_DISCLAIMER};
pub use session::{FileStore, InMemoryStore, KeyValueStore, RoleStore, StoreError};
pub use shell::{Overlay, ShellState, ALL_OVERLAYS};
