// crates/access-harness/src/oracle.rs
// ============================================================================
// Module: Contract Oracle
// Description: Expectations that classify HTTP outcomes against the contract.
// Purpose: Turn raw outcomes into conforming/violating results.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Each expectation inspects one [`HttpOutcome`] (or a session token) and
//! returns `Ok(())` when the observation conforms, or a [`Violation`] carrying
//! the expectation text plus the literal status and body for diagnosis.
//! Expectations are pure; logging happens in the step that calls them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::client::login_body;
use crate::client::redacted_body;
use crate::outcome::HttpOutcome;
use crate::session::SessionToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status the contract requires for authenticated callers lacking a role.
pub const STATUS_FORBIDDEN: u16 = 403;

// ============================================================================
// SECTION: Violation
// ============================================================================

/// An observation that diverges from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// What the contract expected.
    pub expectation: String,
    /// Observed HTTP status, when a response was involved.
    pub status: Option<u16>,
    /// Observed body excerpt with secret fields redacted, when a response was involved.
    pub body: Option<String>,
}

impl Violation {
    /// Builds a violation tied to an observed response.
    #[must_use]
    pub fn observed(expectation: impl Into<String>, outcome: &HttpOutcome) -> Self {
        Self {
            expectation: expectation.into(),
            status: Some(outcome.status()),
            body: Some(redacted_body(outcome)),
        }
    }

    /// Builds a violation tied to a login response, keeping only the shape of
    /// a successful body.
    #[must_use]
    pub fn credential(expectation: impl Into<String>, login_outcome: &HttpOutcome) -> Self {
        Self {
            expectation: expectation.into(),
            status: Some(login_outcome.status()),
            body: Some(login_body(login_outcome)),
        }
    }

    /// Builds a violation with no associated response.
    #[must_use]
    pub fn detached(expectation: impl Into<String>) -> Self {
        Self {
            expectation: expectation.into(),
            status: None,
            body: None,
        }
    }
}

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// Expects a 2xx status.
///
/// # Errors
///
/// Returns a [`Violation`] for any non-2xx status.
pub fn expect_success(outcome: &HttpOutcome) -> Result<(), Violation> {
    if outcome.is_success() {
        return Ok(());
    }
    Err(Violation::observed(
        format!("expected 2xx status, got {}", outcome.status()),
        outcome,
    ))
}

/// Expects a non-2xx status.
///
/// # Errors
///
/// Returns a [`Violation`] for any 2xx status.
pub fn expect_rejected(outcome: &HttpOutcome) -> Result<(), Violation> {
    if !outcome.is_success() {
        return Ok(());
    }
    Err(Violation::observed(
        format!("expected request to be rejected, got {}", outcome.status()),
        outcome,
    ))
}

/// Expects exactly `expected`; neighbouring error classes do not count.
///
/// # Errors
///
/// Returns a [`Violation`] for any other status.
pub fn expect_status(outcome: &HttpOutcome, expected: u16) -> Result<(), Violation> {
    if outcome.status() == expected {
        return Ok(());
    }
    Err(Violation::observed(
        format!("expected status {expected}, got {}", outcome.status()),
        outcome,
    ))
}

/// Expects the body to decode as a JSON array.
///
/// # Errors
///
/// Returns a [`Violation`] when the body is not JSON or not an array.
pub fn expect_list_body(outcome: &HttpOutcome) -> Result<(), Violation> {
    match outcome.json() {
        Ok(Value::Array(_)) => Ok(()),
        Ok(other) => Err(Violation::observed(
            format!("expected JSON array body, got {}", json_kind(&other)),
            outcome,
        )),
        Err(err) => Err(Violation::observed(format!("expected JSON array body: {err}"), outcome)),
    }
}

/// Expects the JSON object body to carry `field` as the string `expected`.
///
/// # Errors
///
/// Returns a [`Violation`] when the body is not JSON, the field is missing or
/// not a string, or its value differs.
pub fn expect_field_equals(
    outcome: &HttpOutcome,
    field: &str,
    expected: &str,
) -> Result<(), Violation> {
    let body = outcome
        .json()
        .map_err(|err| Violation::observed(format!("expected JSON object body: {err}"), outcome))?;
    match body.get(field) {
        Some(Value::String(actual)) if actual == expected => Ok(()),
        Some(Value::String(actual)) => Err(Violation::observed(
            format!("expected {field} = {expected:?}, got {actual:?}"),
            outcome,
        )),
        Some(other) => Err(Violation::observed(
            format!("expected {field} to be a string, got {}", json_kind(other)),
            outcome,
        )),
        None => Err(Violation::observed(format!("expected {field} field in body"), outcome)),
    }
}

/// Expects a login to have issued a token.
///
/// # Errors
///
/// Returns a [`Violation`] when the token is empty.
pub fn expect_token_issued(
    token: &SessionToken,
    login_outcome: &HttpOutcome,
    expectation: &str,
) -> Result<(), Violation> {
    if token.is_issued() {
        return Ok(());
    }
    Err(Violation::credential(expectation, login_outcome))
}

/// Expects a login to have been refused (empty token).
///
/// # Errors
///
/// Returns a [`Violation`] when a token was issued.
pub fn expect_token_withheld(
    token: &SessionToken,
    login_outcome: &HttpOutcome,
) -> Result<(), Violation> {
    if !token.is_issued() {
        return Ok(());
    }
    Err(Violation::credential(
        format!("expected login to be refused, got {} with a token", login_outcome.status()),
        login_outcome,
    ))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Names the JSON type of `value` for violation messages.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
