use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BODY_BEGIN: &str = "----- BEGIN AUDIT NARRATIVE -----";
const BODY_END: &str = "----- END AUDIT NARRATIVE -----";

pub const REPORT_DISCLAIMER: &str = "PROFESSIONAL REVIEW REQUIRED: This report was generated by \
the Closing Guard AI engine. While highly accurate, it is intended for preliminary review only \
and should be confirmed by a World Class Title professional prior to closing. World Class Title \
assumes no liability for errors or omissions in AI-generated analysis.";

pub const REPORT_FOOTER: &str = "World Class Title | Your Growth Partner";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportParseError {
    #[error("report body delimiters not found")]
    MissingBody,
    #[error("report timestamp line not found")]
    MissingTimestamp,
    #[error("report timestamp is not valid: `{0}`")]
    InvalidTimestamp(String),
}

/// Downloadable artifact produced after a successful audit run. The narrative
/// section round-trips byte-for-byte: whatever the analysis service returned
/// is what a re-read of the artifact yields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub narrative: String,
}

impl AuditReport {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self { generated_at: Utc::now(), narrative: narrative.into() }
    }

    /// File name for a saved copy, prefixed with the tool name and stamped so
    /// repeated downloads never collide.
    pub fn file_name(&self) -> String {
        format!("closing-audit-{}.txt", self.generated_at.format("%Y%m%d-%H%M%S"))
    }

    pub fn render(&self) -> String {
        let timestamp = self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        format!(
            "WORLD CLASS TITLE\nCLOSING AUDIT REPORT\nGenerated: {timestamp}\n\n\
             {BODY_BEGIN}\n{narrative}\n{BODY_END}\n\n\
             {REPORT_DISCLAIMER}\n\n{REPORT_FOOTER}\n",
            narrative = self.narrative,
        )
    }

    /// Re-read a rendered artifact. The narrative between the delimiters is
    /// recovered exactly as written.
    pub fn parse(rendered: &str) -> Result<Self, ReportParseError> {
        let timestamp_line = rendered
            .lines()
            .find_map(|line| line.strip_prefix("Generated: "))
            .ok_or(ReportParseError::MissingTimestamp)?;
        let generated_at = DateTime::parse_from_rfc3339(timestamp_line)
            .map_err(|_| ReportParseError::InvalidTimestamp(timestamp_line.to_string()))?
            .with_timezone(&Utc);

        let begin =
            rendered.find(BODY_BEGIN).ok_or(ReportParseError::MissingBody)? + BODY_BEGIN.len();
        let end = rendered[begin..].find(BODY_END).ok_or(ReportParseError::MissingBody)? + begin;

        // The render puts exactly one newline on each side of the narrative.
        let body = &rendered[begin..end];
        let narrative = body
            .strip_prefix('\n')
            .and_then(|body| body.strip_suffix('\n'))
            .ok_or(ReportParseError::MissingBody)?;

        Ok(Self { generated_at, narrative: narrative.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditReport, ReportParseError, REPORT_DISCLAIMER};

    #[test]
    fn narrative_round_trips_byte_for_byte() {
        let narrative = "Status: Action Required\n\n- Sale price mismatch: $250,000 vs $255,000\n\
                         - Earnest money aligned\n\nOdd spacing   and trailing marks ** kept **";
        let report = AuditReport::new(narrative);

        let parsed = AuditReport::parse(&report.render()).expect("well-formed artifact");
        assert_eq!(parsed.narrative.as_bytes(), narrative.as_bytes());
    }

    #[test]
    fn rendered_artifact_carries_disclaimer_and_timestamp() {
        let report = AuditReport::new("Status: Aligned");
        let rendered = report.render();

        assert!(rendered.contains(REPORT_DISCLAIMER));
        assert!(rendered.contains("Generated: "));

        let parsed = AuditReport::parse(&rendered).expect("well-formed artifact");
        assert_eq!(parsed.generated_at.timestamp(), report.generated_at.timestamp());
    }

    #[test]
    fn file_name_is_prefixed_and_stamped() {
        let report = AuditReport::new("Status: Aligned");
        let name = report.file_name();
        assert!(name.starts_with("closing-audit-"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn parse_rejects_artifacts_without_delimiters() {
        let error = AuditReport::parse("Generated: 2026-08-27T00:00:00Z\nno body here")
            .expect_err("missing delimiters");
        assert_eq!(error, ReportParseError::MissingBody);
    }

    #[test]
    fn narrative_containing_delimiter_like_text_still_round_trips() {
        let narrative = "The phrase END AUDIT appears mid-sentence without the full marker.";
        let parsed =
            AuditReport::parse(&AuditReport::new(narrative).render()).expect("round trip");
        assert_eq!(parsed.narrative, narrative);
    }
}
