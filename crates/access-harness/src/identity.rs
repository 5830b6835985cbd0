// crates/access-harness/src/identity.rs
// ============================================================================
// Module: Test Identities
// Description: Fixed account identities exercised against the target service.
// Purpose: Provide validated, immutable credentials for a single run.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An [`Identity`] carries the email, username and password of one account.
//! Three identities exist per run: the ordinary account the harness registers
//! itself, the administrator account the target environment seeds
//! out-of-band, and a self-service account whose username and password the
//! extended suite changes. Identities are immutable once constructed and never print their
//! password through `Debug`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::session::TokenSlot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default ordinary identity email.
pub const DEFAULT_USER_EMAIL: &str = "testuser@example.com";
/// Default ordinary identity username.
pub const DEFAULT_USER_USERNAME: &str = "testuser";
/// Default ordinary identity password.
pub const DEFAULT_USER_PASSWORD: &str = "testpass";
/// Default administrator identity email.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
/// Default administrator identity username.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Default administrator identity password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "adminpass";
/// Default self-service account email.
pub const DEFAULT_ACCOUNT_EMAIL: &str = "accountuser@example.com";
/// Default self-service account username.
pub const DEFAULT_ACCOUNT_USERNAME: &str = "accountuser";
/// Default self-service account password.
pub const DEFAULT_ACCOUNT_PASSWORD: &str = "accountpass";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// A required credential field was empty or whitespace.
    #[error("identity {field} must be non-empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Account credentials used by the harness.
///
/// # Invariants
/// - `email`, `username` and `password` are non-empty after trimming.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Account email, used as the login key.
    email: String,
    /// Account username, echoed back by the profile endpoint.
    username: String,
    /// Account password.
    #[serde(skip_serializing)]
    password: String,
}

impl Identity {
    /// Builds a validated identity.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::EmptyField`] when any field is empty.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let email = email.into();
        let username = username.into();
        let password = password.into();
        require_non_empty("email", &email)?;
        require_non_empty("username", &username)?;
        require_non_empty("password", &password)?;
        Ok(Self {
            email,
            username,
            password,
        })
    }

    /// Returns the default ordinary identity created by the harness.
    #[must_use]
    pub fn ordinary() -> Self {
        Self {
            email: DEFAULT_USER_EMAIL.to_string(),
            username: DEFAULT_USER_USERNAME.to_string(),
            password: DEFAULT_USER_PASSWORD.to_string(),
        }
    }

    /// Returns the default administrator identity seeded on the target.
    #[must_use]
    pub fn administrator() -> Self {
        Self {
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }

    /// Returns the default self-service account the extended suite mutates.
    #[must_use]
    pub fn self_service() -> Self {
        Self {
            email: DEFAULT_ACCOUNT_EMAIL.to_string(),
            username: DEFAULT_ACCOUNT_USERNAME.to_string(),
            password: DEFAULT_ACCOUNT_PASSWORD.to_string(),
        }
    }

    /// Returns the account email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the account username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the account password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// The identities used by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identities {
    /// Ordinary identity, registered by the harness.
    pub user: Identity,
    /// Administrator identity, assumed pre-seeded on the target.
    pub admin: Identity,
    /// Self-service identity, registered by the harness and then modified.
    pub account: Identity,
}

impl Identities {
    /// Returns the identity whose session lives in `slot`.
    #[must_use]
    pub const fn for_slot(&self, slot: TokenSlot) -> &Identity {
        match slot {
            TokenSlot::User => &self.user,
            TokenSlot::Admin => &self.admin,
            TokenSlot::Account => &self.account,
        }
    }
}

impl Default for Identities {
    fn default() -> Self {
        Self {
            user: Identity::ordinary(),
            admin: Identity::administrator(),
            account: Identity::self_service(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects empty or whitespace-only credential fields.
fn require_non_empty(field: &'static str, value: &str) -> Result<(), IdentityError> {
    if value.trim().is_empty() {
        return Err(IdentityError::EmptyField {
            field,
        });
    }
    Ok(())
}
