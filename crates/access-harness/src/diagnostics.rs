// crates/access-harness/src/diagnostics.rs
// ============================================================================
// Module: Step Diagnostics
// Description: Structured diagnostic events and sinks for scenario runs.
// Purpose: Preserve failure context (status, body) even when a step fails.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Steps emit [`DiagnosticEvent`] values through a [`DiagnosticSink`]. Sinks
//! write JSON lines so runs can be routed to any log pipeline. Events never
//! carry passwords or token values: login steps report only whether a token
//! was issued.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;

use crate::client::login_body;
use crate::config::DiagnosticSinkKind;
use crate::config::DiagnosticsConfig;
use crate::oracle::Violation;
use crate::outcome::HttpOutcome;
use crate::outcome::excerpt;
use crate::report::now_millis;
use crate::scenario::StepId;
use crate::verdict::FailureClass;
use crate::verdict::StepVerdict;
use crate::verdict::VerdictStatus;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Diagnostic event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Step that emitted the event.
    pub step: StepId,
    /// Verdict status (`step_finished` only).
    pub status: Option<VerdictStatus>,
    /// Failure class (`step_finished` only, when not passing).
    pub failure_class: Option<FailureClass>,
    /// Observed HTTP status.
    pub http_status: Option<u16>,
    /// Human-readable detail.
    pub message: Option<String>,
    /// Observed body excerpt, with secret fields redacted.
    pub body: Option<String>,
    /// Step duration in milliseconds (`step_finished` only).
    pub duration_ms: Option<u64>,
}

impl DiagnosticEvent {
    /// Base event with every optional field empty.
    fn bare(event: &'static str, step: StepId) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            step,
            status: None,
            failure_class: None,
            http_status: None,
            message: None,
            body: None,
            duration_ms: None,
        }
    }

    /// A step is about to run.
    #[must_use]
    pub fn step_started(step: StepId) -> Self {
        Self::bare("step_started", step)
    }

    /// A step produced its verdict.
    #[must_use]
    pub fn step_finished(verdict: &StepVerdict) -> Self {
        let mut event = Self::bare("step_finished", verdict.step);
        event.status = Some(verdict.status);
        event.duration_ms = Some(verdict.duration_ms);
        if let Some(failure) = &verdict.failure {
            event.failure_class = Some(failure.class);
            event.http_status = failure.http_status;
            event.message = Some(failure.message.clone());
        }
        event
    }

    /// A step observed a response that violates the contract.
    #[must_use]
    pub fn failure_context(step: StepId, violation: &Violation) -> Self {
        let mut event = Self::bare("step_failure_context", step);
        event.http_status = violation.status;
        event.message = Some(violation.expectation.clone());
        event.body.clone_from(&violation.body);
        event
    }

    /// A successful login response did not decode to a token.
    #[must_use]
    pub fn login_decode_failed(step: StepId, outcome: &HttpOutcome, detail: &str) -> Self {
        let mut event = Self::bare("login_decode_failed", step);
        event.http_status = Some(outcome.status());
        event.message = Some(excerpt(detail));
        event.body = Some(login_body(outcome));
        event
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    /// Record a diagnostic event.
    fn record(&self, event: &DiagnosticEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that writes JSON lines to stderr.
pub struct StderrDiagnosticSink;

impl DiagnosticSink for StderrDiagnosticSink {
    fn record(&self, event: &DiagnosticEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileDiagnosticSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileDiagnosticSink {
    /// Opens the diagnostics file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn record(&self, event: &DiagnosticEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryDiagnosticSink {
    /// Recorded events.
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemoryDiagnosticSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map_or_else(|_| Vec::new(), |events| events.clone())
    }
}

impl DiagnosticSink for MemoryDiagnosticSink {
    fn record(&self, event: &DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Sink that discards events.
pub struct NoopDiagnosticSink;

impl DiagnosticSink for NoopDiagnosticSink {
    fn record(&self, _event: &DiagnosticEvent) {}
}

/// Opens the sink selected by `config`.
///
/// # Errors
///
/// Returns an error when a file sink cannot be opened or has no path.
pub fn open_sink(config: &DiagnosticsConfig) -> io::Result<Arc<dyn DiagnosticSink>> {
    match config.sink {
        DiagnosticSinkKind::Stderr => Ok(Arc::new(StderrDiagnosticSink)),
        DiagnosticSinkKind::None => Ok(Arc::new(NoopDiagnosticSink)),
        DiagnosticSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "diagnostics.path is required")
            })?;
            Ok(Arc::new(FileDiagnosticSink::new(path)?))
        }
    }
}
