// crates/access-harness/src/client.rs
// ============================================================================
// Module: Contract HTTP Client
// Description: Thin reqwest wrapper for the service under test.
// Purpose: Issue requests relative to a base URL and capture a transcript.
// Dependencies: reqwest, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! [`ContractClient`] sends one request per call and returns the raw
//! [`HttpOutcome`]; it never interprets status codes and never retries. Every
//! exchange is appended to a transcript with credential fields redacted,
//! successful login bodies reduced to their size and kind, and bearer
//! credentials reduced to their kind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::actions::LOGIN_PATH;
use crate::outcome::HttpOutcome;
use crate::outcome::excerpt;
use crate::session::SessionToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder written in place of secret values in transcripts.
const REDACTED: &str = "[redacted]";
/// Key fragments (lowercase) marking a JSON field as a credential.
const SECRET_KEY_FRAGMENTS: &[&str] = &["password", "token", "access", "jwt", "secret"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-level failures: the request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Base URL could not be parsed or joined.
    #[error("invalid target url: {0}")]
    InvalidUrl(String),
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),
    /// The request could not be sent or timed out.
    #[error("{method} {path} failed: {message}")]
    Send {
        /// HTTP method.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// Transport error detail.
        message: String,
    },
    /// The response body could not be read.
    #[error("{method} {path} body read failed: {message}")]
    Body {
        /// HTTP method.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// Transport error detail.
        message: String,
    },
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Credential attached to a request.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// No `Authorization` header.
    Anonymous,
    /// `Authorization: Bearer <token>`; an empty token is sent as-is.
    Bearer(SessionToken),
}

impl Authorization {
    /// Builds a bearer credential from a session token.
    #[must_use]
    pub fn bearer(token: &SessionToken) -> Self {
        Self::Bearer(token.clone())
    }

    /// Returns the transcript label for this credential.
    fn label(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Bearer(token) if token.is_issued() => "bearer",
            Self::Bearer(_) => "bearer_empty",
        }
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Transcript
// ============================================================================

/// One recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// Monotonic sequence number within the client.
    pub sequence: u64,
    /// HTTP method.
    pub method: String,
    /// Request path relative to the base URL.
    pub path: String,
    /// Credential kind (`anonymous`, `bearer`, `bearer_empty`).
    pub authorization: &'static str,
    /// Request body with password fields redacted.
    pub request: Option<Value>,
    /// Response status when one was received.
    pub status: Option<u16>,
    /// Response body excerpt when one was received.
    pub response: Option<String>,
    /// Transport error when no response was received.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client bound to the target service's base URL.
#[derive(Clone)]
pub struct ContractClient {
    /// Base URL; always ends with `/` so relative joins keep any prefix.
    base_url: Url,
    /// Underlying reqwest client.
    client: Client,
    /// Shared transcript of exchanges.
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl ContractClient {
    /// Creates a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL is invalid or the client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Self::new_with_client(base_url, client)
    }

    /// Creates a client from an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] when `base_url` is not an
    /// absolute http(s) URL.
    pub fn new_with_client(base_url: &str, client: Client) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            client,
            transcript: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns a snapshot of the transcript entries.
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Issues a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP response was received.
    pub async fn get(
        &self,
        path: &str,
        auth: &Authorization,
    ) -> Result<HttpOutcome, TransportError> {
        self.send::<Value>(Method::GET, path, auth, None).await
    }

    /// Issues a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP response was received.
    pub async fn delete(
        &self,
        path: &str,
        auth: &Authorization,
    ) -> Result<HttpOutcome, TransportError> {
        self.send::<Value>(Method::DELETE, path, auth, None).await
    }

    /// Issues a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP response was received.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        auth: &Authorization,
        body: &T,
    ) -> Result<HttpOutcome, TransportError> {
        self.send(Method::POST, path, auth, Some(body)).await
    }

    /// Issues a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP response was received.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        auth: &Authorization,
        body: &T,
    ) -> Result<HttpOutcome, TransportError> {
        self.send(Method::PUT, path, auth, Some(body)).await
    }

    /// Sends one request and records it in the transcript.
    async fn send<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        auth: &Authorization,
        body: Option<&T>,
    ) -> Result<HttpOutcome, TransportError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| TransportError::InvalidUrl(format!("{path}: {err}")))?;
        let mut request = self.client.request(method.clone(), url);
        if let Authorization::Bearer(token) = auth {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.as_str()));
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let recorded_request = body.and_then(|body| serde_json::to_value(body).ok()).map(redact);

        let result = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                response.text().await.map(|text| HttpOutcome::new(status, text)).map_err(|err| {
                    TransportError::Body {
                        method: method.to_string(),
                        path: path.to_string(),
                        message: err.to_string(),
                    }
                })
            }
            Err(err) => Err(TransportError::Send {
                method: method.to_string(),
                path: path.to_string(),
                message: describe_send_error(&err),
            }),
        };

        self.record(TranscriptEntry {
            sequence: 0,
            method: method.to_string(),
            path: path.to_string(),
            authorization: auth.label(),
            request: recorded_request,
            status: result.as_ref().ok().map(HttpOutcome::status),
            response: result.as_ref().ok().map(|outcome| recorded_response(path, outcome)),
            error: result.as_ref().err().map(|err| excerpt(&err.to_string())),
        });
        result
    }

    /// Appends an entry, assigning the next sequence number.
    fn record(&self, mut entry: TranscriptEntry) {
        if let Ok(mut entries) = self.transcript.lock() {
            entry.sequence = u64::try_from(entries.len()).unwrap_or(u64::MAX).saturating_add(1);
            entries.push(entry);
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses the base URL and forces a trailing slash on its path.
fn normalize_base_url(raw: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|err| TransportError::InvalidUrl(format!("{raw}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::InvalidUrl(format!("{raw}: scheme must be http or https")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Renders a send failure, naming timeouts and connection errors explicitly.
fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

/// Returns the response body excerpt with secret fields redacted.
pub(crate) fn redacted_body(outcome: &HttpOutcome) -> String {
    match outcome.json() {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => {
            excerpt(&redact(value).to_string())
        }
        _ => outcome.body_excerpt(),
    }
}

/// Returns the recordable form of a login response.
///
/// A successful login body carries the credential in whatever field the
/// service chose, so only its size and kind are kept.
pub(crate) fn login_body(outcome: &HttpOutcome) -> String {
    if outcome.is_success() { outcome.shape_summary() } else { redacted_body(outcome) }
}

/// Returns the recordable form of a response to `path`.
fn recorded_response(path: &str, outcome: &HttpOutcome) -> String {
    if path == LOGIN_PATH { login_body(outcome) } else { redacted_body(outcome) }
}

/// Replaces credential-bearing fields with a placeholder.
fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if is_secret_key(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

/// Returns true for keys that name passwords, tokens, or other credentials.
fn is_secret_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|fragment| lowered.contains(fragment))
}
