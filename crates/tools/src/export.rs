use std::path::{Path, PathBuf};

use thiserror::Error;

use titledesk_core::report::AuditReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not write report to `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Boundary for offering a finished report as a local file save.
pub trait ReportExporter: Send + Sync {
    fn export(&self, report: &AuditReport) -> Result<PathBuf, ExportError>;
}

/// Writes the rendered artifact into a directory using the report's own
/// timestamped file name.
#[derive(Clone, Debug)]
pub struct FileExporter {
    directory: PathBuf,
}

impl FileExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ReportExporter for FileExporter {
    fn export(&self, report: &AuditReport) -> Result<PathBuf, ExportError> {
        let path = self.directory.join(report.file_name());
        std::fs::write(&path, report.render())
            .map_err(|source| ExportError::Write { path: path.clone(), source })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use titledesk_core::report::AuditReport;

    use super::{FileExporter, ReportExporter};

    #[test]
    fn exported_artifact_round_trips_the_narrative() {
        let dir = TempDir::new().expect("temp dir");
        let exporter = FileExporter::new(dir.path());

        let report = AuditReport::new("Status: Aligned\n\nEverything matches.");
        let path = exporter.export(&report).expect("writable directory");

        assert!(path.file_name().is_some_and(|name| {
            name.to_string_lossy().starts_with("closing-audit-")
        }));

        let rendered = std::fs::read_to_string(&path).expect("read back");
        let parsed = AuditReport::parse(&rendered).expect("well-formed artifact");
        assert_eq!(parsed.narrative, report.narrative);
    }
}
