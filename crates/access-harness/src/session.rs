// crates/access-harness/src/session.rs
// ============================================================================
// Module: Session State
// Description: Bearer tokens and the run-scoped state that carries them.
// Purpose: Hand credentials forward from login steps to authorization steps.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SessionToken`] is the opaque bearer credential returned by a login. The
//! empty token is the designed "no session" value: a failed login produces it
//! instead of an error, so every downstream step checks the same thing.
//!
//! [`RunState`] holds one token per identity. It is created empty for each run,
//! written only by the matching login step, and dropped when the run ends.
//! Invariants:
//! - A token reports [`SessionToken::is_issued`] only when it is non-empty.
//! - Token values never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Session Token
// ============================================================================

/// Opaque bearer credential; empty means "no valid session".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns the distinguished "no session" token.
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Wraps a raw token string as returned by the target.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns true when a login produced a non-empty token.
    #[must_use]
    pub fn is_issued(&self) -> bool {
        !self.0.is_empty()
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_issued() {
            f.write_str("SessionToken(<issued>)")
        } else {
            f.write_str("SessionToken(<empty>)")
        }
    }
}

// ============================================================================
// SECTION: Token Slots
// ============================================================================

/// Identifies which identity a session token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSlot {
    /// Ordinary identity session.
    User,
    /// Administrator identity session.
    Admin,
    /// Self-service account session; its password and username are changed.
    Account,
}

impl TokenSlot {
    /// Returns a stable label for the slot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Account => "account",
        }
    }
}

impl fmt::Display for TokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// Run-scoped fixture holding the session tokens obtained so far.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Token issued to the ordinary identity.
    user_token: SessionToken,
    /// Token issued to the administrator identity.
    admin_token: SessionToken,
    /// Token issued to the self-service account identity.
    account_token: SessionToken,
}

impl RunState {
    /// Creates an empty run state (every token empty).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            user_token: SessionToken::empty(),
            admin_token: SessionToken::empty(),
            account_token: SessionToken::empty(),
        }
    }

    /// Returns the token currently held in `slot`.
    #[must_use]
    pub const fn token(&self, slot: TokenSlot) -> &SessionToken {
        match slot {
            TokenSlot::User => &self.user_token,
            TokenSlot::Admin => &self.admin_token,
            TokenSlot::Account => &self.account_token,
        }
    }

    /// Overwrites the token in `slot`. Only login steps call this.
    pub(crate) fn store(&mut self, slot: TokenSlot, token: SessionToken) {
        match slot {
            TokenSlot::User => self.user_token = token,
            TokenSlot::Admin => self.admin_token = token,
            TokenSlot::Account => self.account_token = token,
        }
    }
}
