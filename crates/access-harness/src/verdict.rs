// crates/access-harness/src/verdict.rs
// ============================================================================
// Module: Step Verdicts
// Description: Pass/fail/unresolved results and failure classification.
// Purpose: Report every step outcome as a named, classified verdict.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`StepVerdict`] is produced for every attempted step. Failures carry a
//! [`FailureClass`]: transport (no response), contract violation (wrong status
//! or body), or unresolved (the step timed out). Nothing is swallowed; a step
//! either passes or yields one of these.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::client::TransportError;
use crate::oracle::Violation;
use crate::scenario::StepId;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Final status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// Observed behavior conforms to the contract.
    Pass,
    /// Transport failure or contract violation.
    Fail,
    /// The step did not finish within its timeout.
    Unresolved,
}

impl VerdictStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Unresolved => "unresolved",
        }
    }
}

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// No HTTP response (connection refused, request timeout, bad URL).
    Transport,
    /// Response diverged from the contract.
    ContractViolation,
    /// Step exceeded its timeout.
    Unresolved,
}

impl FailureClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::ContractViolation => "contract_violation",
            Self::Unresolved => "unresolved",
        }
    }
}

// ============================================================================
// SECTION: Failure
// ============================================================================

/// Classified failure detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// Failure class.
    pub class: FailureClass,
    /// Human-readable explanation.
    pub message: String,
    /// Observed HTTP status, if any.
    pub http_status: Option<u16>,
    /// Observed body excerpt, if any.
    pub body: Option<String>,
}

impl StepFailure {
    /// Builds an unresolved failure for a step that exceeded `timeout_ms`.
    #[must_use]
    pub fn timed_out(timeout_ms: u64) -> Self {
        Self {
            class: FailureClass::Unresolved,
            message: format!("step did not complete within {timeout_ms} ms"),
            http_status: None,
            body: None,
        }
    }
}

impl From<TransportError> for StepFailure {
    fn from(err: TransportError) -> Self {
        Self {
            class: FailureClass::Transport,
            message: err.to_string(),
            http_status: None,
            body: None,
        }
    }
}

impl From<Violation> for StepFailure {
    fn from(violation: Violation) -> Self {
        Self {
            class: FailureClass::ContractViolation,
            message: violation.expectation,
            http_status: violation.status,
            body: violation.body,
        }
    }
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Verdict for one attempted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepVerdict {
    /// Step identifier.
    pub step: StepId,
    /// Final status.
    pub status: VerdictStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Failure detail when the step did not pass.
    pub failure: Option<StepFailure>,
}

impl StepVerdict {
    /// Builds a verdict from a step result.
    #[must_use]
    pub fn from_result(step: StepId, duration_ms: u64, result: Result<(), StepFailure>) -> Self {
        match result {
            Ok(()) => Self {
                step,
                status: VerdictStatus::Pass,
                duration_ms,
                failure: None,
            },
            Err(failure) => Self {
                step,
                status: if failure.class == FailureClass::Unresolved {
                    VerdictStatus::Unresolved
                } else {
                    VerdictStatus::Fail
                },
                duration_ms,
                failure: Some(failure),
            },
        }
    }

    /// Returns true when the step passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == VerdictStatus::Pass
    }

    /// Returns the failure class, if the step did not pass.
    #[must_use]
    pub fn failure_class(&self) -> Option<FailureClass> {
        self.failure.as_ref().map(|failure| failure.class)
    }
}
