// crates/access-harness/src/actions.rs
// ============================================================================
// Module: Action Helpers
// Description: Registration and login requests against the target service.
// Purpose: Provide assertion-free building blocks shared by scenario steps.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! `register`, `login`, `update_profile` and `change_password` are thin
//! transport calls. They carry no pass/fail logic so steps with different
//! success criteria can reuse them.
//!
//! Login failure is data: any non-2xx response, and any 2xx response without a
//! string `token` field, yields [`SessionToken::empty`]. Only a transport
//! failure is returned as an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::error::Category;

use crate::client::Authorization;
use crate::client::ContractClient;
use crate::client::TransportError;
use crate::identity::Identity;
use crate::outcome::HttpOutcome;
use crate::session::SessionToken;

// ============================================================================
// SECTION: Endpoints
// ============================================================================

/// Account creation endpoint.
pub const REGISTER_PATH: &str = "/register";
/// Credential exchange endpoint.
pub const LOGIN_PATH: &str = "/login";
/// Administrator-only user listing.
pub const USERS_PATH: &str = "/users";
/// Caller's own profile.
pub const PROFILE_PATH: &str = "/user/profile";
/// Administrator-only role listing.
pub const ROLES_PATH: &str = "/roles";
/// Caller's own password change.
pub const CHANGE_PASSWORD_PATH: &str = "/user/change-password";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Registration request body.
#[derive(Debug, Serialize)]
pub struct RegistrationRequest<'a> {
    /// Account email.
    pub email: &'a str,
    /// Account username.
    pub username: &'a str,
    /// Account password.
    pub password: &'a str,
}

/// Login request body; username is not part of the login contract.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    /// Account email.
    email: &'a str,
    /// Account password.
    password: &'a str,
}

/// Own-profile update request body.
#[derive(Debug, Serialize)]
pub struct ProfileUpdateRequest<'a> {
    /// Replacement username.
    pub username: &'a str,
}

/// Own-password change request body.
#[derive(Debug, Serialize)]
pub struct ChangePasswordRequest<'a> {
    /// Current password.
    pub old_password: &'a str,
    /// Replacement password.
    pub new_password: &'a str,
}

/// Login response body.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    /// Issued bearer token.
    token: String,
}

/// Full result of a login exchange, for steps that need diagnostics.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// Extracted token; empty when the login did not succeed.
    pub token: SessionToken,
    /// Raw HTTP outcome of the login request.
    pub outcome: HttpOutcome,
    /// Decode problem on a 2xx response, if any.
    pub decode_error: Option<String>,
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Submits a registration request for `identity`.
///
/// # Errors
///
/// Returns [`TransportError`] when no HTTP response was received.
pub async fn register(
    client: &ContractClient,
    identity: &Identity,
) -> Result<HttpOutcome, TransportError> {
    let request = RegistrationRequest {
        email: identity.email(),
        username: identity.username(),
        password: identity.password(),
    };
    client.post_json(REGISTER_PATH, &Authorization::Anonymous, &request).await
}

/// Replaces the caller's username.
///
/// # Errors
///
/// Returns [`TransportError`] when no HTTP response was received.
pub async fn update_profile(
    client: &ContractClient,
    auth: &Authorization,
    username: &str,
) -> Result<HttpOutcome, TransportError> {
    let request = ProfileUpdateRequest {
        username,
    };
    client.put_json(PROFILE_PATH, auth, &request).await
}

/// Changes the caller's password from `old_password` to `new_password`.
///
/// # Errors
///
/// Returns [`TransportError`] when no HTTP response was received.
pub async fn change_password(
    client: &ContractClient,
    auth: &Authorization,
    old_password: &str,
    new_password: &str,
) -> Result<HttpOutcome, TransportError> {
    let request = ChangePasswordRequest {
        old_password,
        new_password,
    };
    client.post_json(CHANGE_PASSWORD_PATH, auth, &request).await
}

/// Logs in as `identity` and returns the issued token, or the empty token.
///
/// # Errors
///
/// Returns [`TransportError`] when no HTTP response was received. A rejected
/// login is not an error.
pub async fn login(
    client: &ContractClient,
    identity: &Identity,
) -> Result<SessionToken, TransportError> {
    Ok(login_attempt(client, identity).await?.token)
}

/// Logs in as `identity`, keeping the raw outcome for diagnostics.
///
/// # Errors
///
/// Returns [`TransportError`] when no HTTP response was received.
pub async fn login_attempt(
    client: &ContractClient,
    identity: &Identity,
) -> Result<LoginAttempt, TransportError> {
    login_with_credentials(client, identity.email(), identity.password()).await
}

/// Logs in with raw credentials, which need not belong to a valid identity.
///
/// # Errors
///
/// Returns [`TransportError`] when no HTTP response was received.
pub async fn login_with_credentials(
    client: &ContractClient,
    email: &str,
    password: &str,
) -> Result<LoginAttempt, TransportError> {
    let request = LoginRequest {
        email,
        password,
    };
    let outcome = client.post_json(LOGIN_PATH, &Authorization::Anonymous, &request).await?;
    if !outcome.is_success() {
        return Ok(LoginAttempt {
            token: SessionToken::empty(),
            outcome,
            decode_error: None,
        });
    }
    let (token, decode_error) = match serde_json::from_str::<LoginResponse>(outcome.body()) {
        Ok(response) => (SessionToken::new(response.token), None),
        Err(err) => (SessionToken::empty(), Some(describe_decode_error(&err))),
    };
    Ok(LoginAttempt {
        token,
        outcome,
        decode_error,
    })
}

/// Describes a login decode failure by position only.
///
/// The serde message can quote the offending value, which may be the
/// credential itself.
fn describe_decode_error(err: &serde_json::Error) -> String {
    let kind = match err.classify() {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "missing or mistyped token field",
        Category::Eof => "unexpected end of input",
    };
    format!("invalid login response: {kind} at line {} column {}", err.line(), err.column())
}
