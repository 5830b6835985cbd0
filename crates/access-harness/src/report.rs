// crates/access-harness/src/report.rs
// ============================================================================
// Module: Run Reports
// Description: Aggregated verdicts and on-disk run artifacts.
// Purpose: Summarize a run for humans and machines without losing any step.
// Dependencies: serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! A [`RunReport`] aggregates every [`StepVerdict`] of a run in plan order.
//! [`RunArtifacts`] persists the report as canonical JSON (`summary.json`),
//! Markdown (`summary.md`), and the redacted HTTP transcript
//! (`transcript.json`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use thiserror::Error;

use crate::client::TranscriptEntry;
use crate::scenario::StepId;
use crate::scenario::Suite;
use crate::verdict::StepVerdict;
use crate::verdict::VerdictStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical JSON summary filename.
pub const SUMMARY_JSON: &str = "summary.json";
/// Markdown summary filename.
pub const SUMMARY_MARKDOWN: &str = "summary.md";
/// HTTP transcript filename.
pub const TRANSCRIPT_JSON: &str = "transcript.json";

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current wall-clock time in milliseconds since the epoch.
#[must_use]
pub fn now_millis() -> u64 {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Verdict counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunTotals {
    /// Steps that passed.
    pub passed: usize,
    /// Steps that failed.
    pub failed: usize,
    /// Steps that timed out.
    pub unresolved: usize,
}

impl RunTotals {
    /// Counts verdicts by status.
    #[must_use]
    pub fn tally(verdicts: &[StepVerdict]) -> Self {
        verdicts.iter().fold(Self::default(), |mut totals, verdict| {
            match verdict.status {
                VerdictStatus::Pass => totals.passed += 1,
                VerdictStatus::Fail => totals.failed += 1,
                VerdictStatus::Unresolved => totals.unresolved += 1,
            }
            totals
        })
    }
}

/// Aggregated outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Target base URL.
    pub base_url: String,
    /// Suite executed, when the plan came from a suite.
    pub suite: Option<Suite>,
    /// Run start (milliseconds since epoch).
    pub started_at_ms: u64,
    /// Run end (milliseconds since epoch).
    pub ended_at_ms: u64,
    /// Verdicts in plan order.
    pub verdicts: Vec<StepVerdict>,
    /// Verdict counts.
    pub totals: RunTotals,
}

impl RunReport {
    /// Builds a report and computes totals.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        suite: Option<Suite>,
        started_at_ms: u64,
        ended_at_ms: u64,
        verdicts: Vec<StepVerdict>,
    ) -> Self {
        let totals = RunTotals::tally(&verdicts);
        Self {
            base_url: base_url.into(),
            suite,
            started_at_ms,
            ended_at_ms,
            verdicts,
            totals,
        }
    }

    /// Returns true when every attempted step passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.verdicts.is_empty() && self.verdicts.iter().all(StepVerdict::passed)
    }

    /// Returns the verdict for `step`, if it was attempted.
    #[must_use]
    pub fn verdict(&self, step: StepId) -> Option<&StepVerdict> {
        self.verdicts.iter().find(|verdict| verdict.step == step)
    }

    /// Returns the overall label (`pass` or `fail`).
    #[must_use]
    pub fn overall(&self) -> &'static str {
        if self.is_success() { "pass" } else { "fail" }
    }

    /// Renders a plain-text report, one line per step.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let suite = self.suite.map_or("custom", Suite::as_str);
        let _ = writeln!(out, "access-harness: {} (suite {suite})", self.base_url);
        for verdict in &self.verdicts {
            let _ = write!(
                out,
                "  {:<10} {:<34} {:>6} ms",
                verdict.status.as_str(),
                verdict.step.as_str(),
                verdict.duration_ms
            );
            if let Some(failure) = &verdict.failure {
                let _ = write!(out, "  [{}] {}", failure.class.as_str(), failure.message);
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "result: {} ({} passed, {} failed, {} unresolved)",
            self.overall(),
            self.totals.passed,
            self.totals.failed,
            self.totals.unresolved
        );
        out
    }

    /// Renders a Markdown report.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Access Harness Summary\n\n");
        out.push_str("## Run\n\n");
        let _ = writeln!(out, "- Target: {}", self.base_url);
        let _ = writeln!(out, "- Suite: {}", self.suite.map_or("custom", Suite::as_str));
        let _ = writeln!(out, "- Result: {}", self.overall());
        let _ = writeln!(
            out,
            "- Duration (ms): {}",
            self.ended_at_ms.saturating_sub(self.started_at_ms)
        );
        let _ = writeln!(
            out,
            "- Totals: {} passed, {} failed, {} unresolved",
            self.totals.passed, self.totals.failed, self.totals.unresolved
        );
        out.push_str("\n## Steps\n\n");
        out.push_str("| Step | Status | Class | HTTP | Detail |\n");
        out.push_str("|---|---|---|---|---|\n");
        for verdict in &self.verdicts {
            let (class, http, detail) = verdict.failure.as_ref().map_or_else(
                || ("-".to_string(), "-".to_string(), String::new()),
                |failure| {
                    (
                        failure.class.as_str().to_string(),
                        failure.http_status.map_or_else(|| "-".to_string(), |s| s.to_string()),
                        failure.message.replace('|', "\\|"),
                    )
                },
            );
            let _ = writeln!(
                out,
                "| {} | {} | {class} | {http} | {detail} |",
                verdict.step.as_str(),
                verdict.status.as_str()
            );
        }
        out
    }
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Report artifact errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure.
    #[error("artifact io error: {0}")]
    Io(#[from] io::Error),
    /// Canonical serialization failure.
    #[error("artifact serialization error: {0}")]
    Serialize(String),
}

/// Writer for one run's artifact directory.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Directory receiving the artifacts.
    root: PathBuf,
}

impl RunArtifacts {
    /// Creates the artifact directory.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the artifact directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when serialization or the write fails.
    pub fn write_json<T: Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ReportError> {
        let path = self.root.join(name);
        let bytes =
            serde_jcs::to_vec(value).map_err(|err| ReportError::Serialize(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the write fails.
    pub fn write_text(&self, name: &str, value: &str) -> Result<PathBuf, ReportError> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }

    /// Writes the summary and transcript for a finished run.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when any artifact cannot be written.
    pub fn write_run(
        &self,
        report: &RunReport,
        transcript: &[TranscriptEntry],
    ) -> Result<Vec<PathBuf>, ReportError> {
        Ok(vec![
            self.write_json(SUMMARY_JSON, report)?,
            self.write_text(SUMMARY_MARKDOWN, &report.to_markdown())?,
            self.write_json(TRANSCRIPT_JSON, &transcript)?,
        ])
    }
}
