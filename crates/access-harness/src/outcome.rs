// crates/access-harness/src/outcome.rs
// ============================================================================
// Module: HTTP Outcomes
// Description: Transient status/body pairs observed from the target service.
// Purpose: Give oracles a transport-independent view of one response.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! An [`HttpOutcome`] is built for exactly one response, inspected by the step
//! that issued the request, and then dropped. It is never cached across steps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum body bytes kept in diagnostics and verdicts.
pub const MAX_BODY_EXCERPT_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Status code and body of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    /// HTTP status code.
    status: u16,
    /// Raw response body.
    body: String,
}

impl HttpOutcome {
    /// Builds an outcome from a status code and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns true for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200 ..= 299)
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the body is not valid JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Returns the body truncated to [`MAX_BODY_EXCERPT_BYTES`].
    #[must_use]
    pub fn body_excerpt(&self) -> String {
        excerpt(&self.body)
    }

    /// Describes the body by size and kind without reproducing any of it.
    #[must_use]
    pub fn shape_summary(&self) -> String {
        format!("[withheld: {} bytes, {}]", self.body.len(), self.body_kind())
    }

    /// Names the kind of body: empty, a JSON value type, or text.
    fn body_kind(&self) -> &'static str {
        if self.body.trim().is_empty() {
            return "empty";
        }
        match self.json() {
            Ok(Value::Object(_)) => "json object",
            Ok(Value::Array(_)) => "json array",
            Ok(Value::String(_)) => "json string",
            Ok(_) => "json scalar",
            Err(_) => "text",
        }
    }
}

/// Truncates `text` on a char boundary at [`MAX_BODY_EXCERPT_BYTES`].
pub(crate) fn excerpt(text: &str) -> String {
    if text.len() <= MAX_BODY_EXCERPT_BYTES {
        return text.to_string();
    }
    let mut end = MAX_BODY_EXCERPT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &text[.. end])
}
