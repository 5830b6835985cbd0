// crates/access-harness/src/scenario.rs
// ============================================================================
// Module: Scenario Plan
// Description: Named verification steps and their declared dependencies.
// Purpose: Enforce a dependency-respecting order before any request is sent.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every step is declared once as a [`StepSpec`]: which steps must precede it,
//! which session tokens it reads, and which one (if any) it writes. A
//! [`ScenarioPlan`] is an ordered list of steps validated against those
//! declarations, so the ordering guarantee does not depend on declaration
//! position in a test file.
//! Invariants:
//! - A dependency always appears earlier in the plan than its dependent.
//! - Every token slot read by a step is written by an earlier step.
//! - Each token slot has at most one writer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::session::TokenSlot;

// ============================================================================
// SECTION: Step Identifiers
// ============================================================================

/// Identifier of one verification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Target answers HTTP at all.
    TargetReachable,
    /// Ordinary identity can register.
    RegisterUser,
    /// Ordinary identity can log in.
    LoginUser,
    /// Administrator identity can log in.
    LoginAdmin,
    /// Ordinary token is refused on the privileged resource with 403.
    UserDeniedPrivileged,
    /// Administrator token lists the privileged resource.
    AdminListsPrivileged,
    /// Ordinary token reads its own profile.
    UserReadsOwnProfile,
    /// Administrator token reads its own profile.
    AdminReadsOwnProfile,
    /// Registering the same identity twice is refused.
    DuplicateRegistrationRejected,
    /// Registering empty credentials is refused.
    IncompleteRegistrationRejected,
    /// Wrong password yields no token.
    WrongPasswordLoginRejected,
    /// Unknown email yields no token.
    UnknownIdentityLoginRejected,
    /// Profile requires a credential.
    ProfileRequiresToken,
    /// Garbage token is refused on the privileged resource.
    InvalidTokenRejectedPrivileged,
    /// Garbage token is refused on the profile resource.
    InvalidTokenRejectedProfile,
    /// Ordinary token is refused on role listing with 403.
    UserDeniedRoles,
    /// Ordinary token is refused on role assignment with 403.
    UserDeniedRoleAssignment,
    /// Ordinary token is refused on password reset with 403.
    UserDeniedPasswordReset,
    /// Ordinary token is refused on user deletion with 403.
    UserDeniedUserDelete,
    /// Ordinary token is refused on updating another user with 403.
    UserDeniedUserUpdate,
    /// Self-service identity registers and logs in.
    AccountSessionEstablished,
    /// Self-service token renames its own profile.
    AccountUpdatesOwnProfile,
    /// Password change with the wrong current password is refused.
    ChangePasswordWrongOldRejected,
    /// Self-service token changes its password and the new one logs in.
    AccountChangesPassword,
}

impl StepId {
    /// Returns the stable snake-case name of the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetReachable => "target_reachable",
            Self::RegisterUser => "register_user",
            Self::LoginUser => "login_user",
            Self::LoginAdmin => "login_admin",
            Self::UserDeniedPrivileged => "user_denied_privileged",
            Self::AdminListsPrivileged => "admin_lists_privileged",
            Self::UserReadsOwnProfile => "user_reads_own_profile",
            Self::AdminReadsOwnProfile => "admin_reads_own_profile",
            Self::DuplicateRegistrationRejected => "duplicate_registration_rejected",
            Self::IncompleteRegistrationRejected => "incomplete_registration_rejected",
            Self::WrongPasswordLoginRejected => "wrong_password_login_rejected",
            Self::UnknownIdentityLoginRejected => "unknown_identity_login_rejected",
            Self::ProfileRequiresToken => "profile_requires_token",
            Self::InvalidTokenRejectedPrivileged => "invalid_token_rejected_privileged",
            Self::InvalidTokenRejectedProfile => "invalid_token_rejected_profile",
            Self::UserDeniedRoles => "user_denied_roles",
            Self::UserDeniedRoleAssignment => "user_denied_role_assignment",
            Self::UserDeniedPasswordReset => "user_denied_password_reset",
            Self::UserDeniedUserDelete => "user_denied_user_delete",
            Self::UserDeniedUserUpdate => "user_denied_user_update",
            Self::AccountSessionEstablished => "account_session_established",
            Self::AccountUpdatesOwnProfile => "account_updates_own_profile",
            Self::ChangePasswordWrongOldRejected => "change_password_wrong_old_rejected",
            Self::AccountChangesPassword => "account_changes_password",
        }
    }

    /// Returns the declaration for this step.
    #[must_use]
    pub const fn spec(self) -> StepSpec {
        use TokenSlot::Account;
        use TokenSlot::Admin;
        use TokenSlot::User;

        let (description, depends_on, reads, writes): (
            &'static str,
            &'static [Self],
            &'static [TokenSlot],
            Option<TokenSlot>,
        ) = match self {
            Self::TargetReachable => ("target answers HTTP requests", &[], &[], None),
            Self::RegisterUser => ("register ordinary identity", &[], &[], None),
            Self::LoginUser => {
                ("login ordinary identity", &[Self::RegisterUser], &[], Some(User))
            }
            Self::LoginAdmin => ("login administrator identity", &[], &[], Some(Admin)),
            Self::UserDeniedPrivileged => {
                ("user gets 403 on GET /users", &[Self::LoginUser], &[User], None)
            }
            Self::AdminListsPrivileged => {
                ("admin lists GET /users", &[Self::LoginAdmin], &[Admin], None)
            }
            Self::UserReadsOwnProfile => {
                ("user reads own profile", &[Self::LoginUser], &[User], None)
            }
            Self::AdminReadsOwnProfile => {
                ("admin reads own profile", &[Self::LoginAdmin], &[Admin], None)
            }
            Self::DuplicateRegistrationRejected => {
                ("duplicate registration is refused", &[Self::RegisterUser], &[], None)
            }
            Self::IncompleteRegistrationRejected => {
                ("registration with empty fields is refused", &[], &[], None)
            }
            Self::WrongPasswordLoginRejected => {
                ("login with wrong password yields no token", &[Self::RegisterUser], &[], None)
            }
            Self::UnknownIdentityLoginRejected => {
                ("login for unknown email yields no token", &[], &[], None)
            }
            Self::ProfileRequiresToken => {
                ("profile without credentials is refused", &[], &[], None)
            }
            Self::InvalidTokenRejectedPrivileged => {
                ("invalid token refused on GET /users", &[], &[], None)
            }
            Self::InvalidTokenRejectedProfile => {
                ("invalid token refused on GET /user/profile", &[], &[], None)
            }
            Self::UserDeniedRoles => {
                ("user gets 403 on GET /roles", &[Self::LoginUser], &[User], None)
            }
            Self::UserDeniedRoleAssignment => {
                ("user gets 403 on role assignment", &[Self::LoginUser], &[User], None)
            }
            Self::UserDeniedPasswordReset => {
                ("user gets 403 on password reset", &[Self::LoginUser], &[User], None)
            }
            Self::UserDeniedUserDelete => {
                ("user gets 403 on user deletion", &[Self::LoginUser], &[User], None)
            }
            Self::UserDeniedUserUpdate => {
                ("user gets 403 on PUT /users/{id}", &[Self::LoginUser], &[User], None)
            }
            Self::AccountSessionEstablished => {
                ("register and login self-service identity", &[], &[], Some(Account))
            }
            Self::AccountUpdatesOwnProfile => (
                "account renames itself via PUT /user/profile",
                &[Self::AccountSessionEstablished],
                &[Account],
                None,
            ),
            Self::ChangePasswordWrongOldRejected => (
                "password change with wrong current password is refused",
                &[Self::AccountSessionEstablished],
                &[Account],
                None,
            ),
            Self::AccountChangesPassword => (
                "account changes password and logs in with it",
                &[Self::AccountSessionEstablished],
                &[Account],
                None,
            ),
        };
        StepSpec {
            id: self,
            description,
            depends_on,
            reads,
            writes,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Step Declarations
// ============================================================================

/// Declaration of one step's ordering and data dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepSpec {
    /// Step identifier.
    pub id: StepId,
    /// One-line description.
    pub description: &'static str,
    /// Steps that must run earlier.
    pub depends_on: &'static [StepId],
    /// Session tokens the step presents.
    pub reads: &'static [TokenSlot],
    /// Session token the step overwrites.
    pub writes: Option<TokenSlot>,
}

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Reachability probe that precedes a suite when preflight is enabled.
pub const PREFLIGHT_STEPS: &[StepId] = &[StepId::TargetReachable];

/// The six-step access-control sequence.
pub const CORE_STEPS: &[StepId] = &[
    StepId::RegisterUser,
    StepId::LoginUser,
    StepId::LoginAdmin,
    StepId::UserDeniedPrivileged,
    StepId::AdminListsPrivileged,
    StepId::UserReadsOwnProfile,
];

/// Additional negative, symmetry and self-service checks appended by the
/// extended suite.
pub const EXTENDED_STEPS: &[StepId] = &[
    StepId::AdminReadsOwnProfile,
    StepId::DuplicateRegistrationRejected,
    StepId::IncompleteRegistrationRejected,
    StepId::WrongPasswordLoginRejected,
    StepId::UnknownIdentityLoginRejected,
    StepId::ProfileRequiresToken,
    StepId::InvalidTokenRejectedPrivileged,
    StepId::InvalidTokenRejectedProfile,
    StepId::UserDeniedRoles,
    StepId::UserDeniedRoleAssignment,
    StepId::UserDeniedPasswordReset,
    StepId::UserDeniedUserDelete,
    StepId::UserDeniedUserUpdate,
    StepId::AccountSessionEstablished,
    StepId::AccountUpdatesOwnProfile,
    StepId::ChangePasswordWrongOldRejected,
    StepId::AccountChangesPassword,
];

/// Named step collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    /// Register, login both identities, and the three authorization checks.
    #[default]
    Core,
    /// Core plus the negative and symmetry checks.
    Extended,
}

impl Suite {
    /// Returns a stable label for the suite.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Extended => "extended",
        }
    }

    /// Parses a suite label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "core" => Some(Self::Core),
            "extended" => Some(Self::Extended),
            _ => None,
        }
    }

    /// Returns the suite's steps in execution order, without preflight.
    #[must_use]
    pub fn steps(self) -> Vec<StepId> {
        match self {
            Self::Core => CORE_STEPS.to_vec(),
            Self::Extended => CORE_STEPS.iter().chain(EXTENDED_STEPS).copied().collect(),
        }
    }
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Plan construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The plan has no steps.
    #[error("scenario plan must contain at least one step")]
    Empty,
    /// A step appears twice.
    #[error("step {0} appears more than once")]
    DuplicateStep(StepId),
    /// A dependency is missing or scheduled after its dependent.
    #[error("step {step} requires {dependency} to run earlier")]
    DependencyOutOfOrder {
        /// Dependent step.
        step: StepId,
        /// Missing or late dependency.
        dependency: StepId,
    },
    /// A step reads a token no earlier step writes.
    #[error("step {step} reads the {slot} token before any step writes it")]
    TokenSlotUnwritten {
        /// Reading step.
        step: StepId,
        /// Unwritten slot.
        slot: TokenSlot,
    },
    /// Two steps write the same token slot.
    #[error("steps {first} and {second} both write the {slot} token")]
    MultipleWriters {
        /// Contested slot.
        slot: TokenSlot,
        /// Earlier writer.
        first: StepId,
        /// Later writer.
        second: StepId,
    },
}

/// Validated, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioPlan {
    /// Suite the plan was built from, if any.
    suite: Option<Suite>,
    /// Steps in execution order.
    steps: Vec<StepSpec>,
}

impl ScenarioPlan {
    /// Validates an explicit step order.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the order violates a declared dependency.
    pub fn new(steps: impl IntoIterator<Item = StepId>) -> Result<Self, PlanError> {
        let steps: Vec<StepSpec> = steps.into_iter().map(StepId::spec).collect();
        validate(&steps)?;
        Ok(Self {
            suite: None,
            steps,
        })
    }

    /// Builds the plan for `suite`, optionally preceded by the preflight probe.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the suite declarations are inconsistent.
    pub fn for_suite(suite: Suite, preflight: bool) -> Result<Self, PlanError> {
        let preflight_steps: &[StepId] = if preflight { PREFLIGHT_STEPS } else { &[] };
        let mut plan = Self::new(preflight_steps.iter().copied().chain(suite.steps()))?;
        plan.suite = Some(suite);
        Ok(plan)
    }

    /// Returns the suite this plan was built from.
    #[must_use]
    pub const fn suite(&self) -> Option<Suite> {
        self.suite
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    /// Returns the step identifiers in execution order.
    #[must_use]
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|spec| spec.id).collect()
    }
}

/// Checks ordering, token flow, and uniqueness for a step list.
fn validate(steps: &[StepSpec]) -> Result<(), PlanError> {
    if steps.is_empty() {
        return Err(PlanError::Empty);
    }
    let mut seen = BTreeSet::new();
    let mut writers: Vec<(TokenSlot, StepId)> = Vec::new();
    for spec in steps {
        if seen.contains(&spec.id) {
            return Err(PlanError::DuplicateStep(spec.id));
        }
        for dependency in spec.depends_on {
            if !seen.contains(dependency) {
                return Err(PlanError::DependencyOutOfOrder {
                    step: spec.id,
                    dependency: *dependency,
                });
            }
        }
        for slot in spec.reads {
            if !writers.iter().any(|(written, _)| written == slot) {
                return Err(PlanError::TokenSlotUnwritten {
                    step: spec.id,
                    slot: *slot,
                });
            }
        }
        if let Some(slot) = spec.writes {
            if let Some((_, first)) = writers.iter().find(|(written, _)| *written == slot) {
                return Err(PlanError::MultipleWriters {
                    slot,
                    first: *first,
                    second: spec.id,
                });
            }
            writers.push((slot, spec.id));
        }
        seen.insert(spec.id);
    }
    Ok(())
}
