// crates/access-harness/src/steps.rs
// ============================================================================
// Module: Step Execution
// Description: Request and oracle logic for each verification step.
// Purpose: Map a step identifier to its HTTP exchange and contract check.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`execute`] runs one step against the target and returns `Ok(())` or a
//! classified [`StepFailure`]. Every contract violation is written to the
//! diagnostic sink, with the observed status and body, before the failure is
//! returned. Login steps always store whatever token they obtained, including
//! the empty token, so later steps observe the real session state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::actions;
use crate::actions::PROFILE_PATH;
use crate::actions::ProfileUpdateRequest;
use crate::actions::REGISTER_PATH;
use crate::actions::ROLES_PATH;
use crate::actions::RegistrationRequest;
use crate::actions::USERS_PATH;
use crate::client::Authorization;
use crate::client::ContractClient;
use crate::diagnostics::DiagnosticEvent;
use crate::diagnostics::DiagnosticSink;
use crate::identity::Identities;
use crate::identity::Identity;
use crate::oracle;
use crate::oracle::STATUS_FORBIDDEN;
use crate::oracle::Violation;
use crate::outcome::HttpOutcome;
use crate::scenario::StepId;
use crate::session::RunState;
use crate::session::SessionToken;
use crate::session::TokenSlot;
use crate::verdict::StepFailure;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token that no conforming service would have issued.
pub const INVALID_TOKEN: &str = "invalidtoken";
/// User id targeted by the administrative-action probes.
const PROBE_USER_ID: &str = "1";
/// Role id sent by the role-assignment probe.
const PROBE_ROLE_ID: &str = "1";
/// Password sent by the password-reset probe.
const PROBE_NEW_PASSWORD: &str = "pw789";
/// Username sent by the foreign user-update probe.
const PROBE_USERNAME: &str = "intruder";
/// Failure text for an administrator login that yields no token.
pub const ADMIN_LOGIN_FAILURE: &str =
    "administrator identity missing from target or credentials rejected";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Role assignment request body.
#[derive(Serialize)]
struct AssignRoleRequest<'a> {
    /// Role to grant.
    role_id: &'a str,
}

/// Password reset request body.
#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    /// Replacement password.
    new_password: &'a str,
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Everything a step needs besides the run state.
pub(crate) struct StepContext<'a> {
    /// Step being executed.
    pub step: StepId,
    /// Client bound to the target.
    pub client: &'a ContractClient,
    /// Identities for this run.
    pub identities: &'a Identities,
    /// Diagnostic destination.
    pub sink: &'a dyn DiagnosticSink,
}

impl StepContext<'_> {
    /// Logs failure context for a violation before converting it.
    fn check(&self, result: Result<(), Violation>) -> Result<(), StepFailure> {
        result.map_err(|violation| {
            self.sink.record(&DiagnosticEvent::failure_context(self.step, &violation));
            StepFailure::from(violation)
        })
    }

    /// Bearer credential for the token held in `slot`.
    fn bearer(state: &RunState, slot: TokenSlot) -> Authorization {
        Authorization::bearer(state.token(slot))
    }

    /// Logs in as `identity`, stores the token in `slot`, and checks issuance.
    async fn login_into(
        &self,
        state: &mut RunState,
        slot: TokenSlot,
        expectation: &str,
    ) -> Result<(), StepFailure> {
        let identity = self.identities.for_slot(slot);
        let attempt = actions::login_attempt(self.client, identity).await?;
        if let Some(detail) = &attempt.decode_error {
            self.sink.record(&DiagnosticEvent::login_decode_failed(
                self.step,
                &attempt.outcome,
                detail,
            ));
        }
        state.store(slot, attempt.token.clone());
        self.check(
            oracle::expect_token_issued(&attempt.token, &attempt.outcome, expectation),
        )
    }

    /// Expects `outcome` to be exactly 403.
    fn forbidden(&self, outcome: &HttpOutcome) -> Result<(), StepFailure> {
        self.check(oracle::expect_status(outcome, STATUS_FORBIDDEN))
    }

    /// Expects 2xx and a `Username` equal to the identity's username.
    fn own_profile(&self, outcome: &HttpOutcome, identity: &Identity) -> Result<(), StepFailure> {
        self.check(oracle::expect_success(outcome))?;
        self.check(
            oracle::expect_field_equals(outcome, "Username", identity.username()),
        )
    }

    /// Expects a login with raw credentials to yield no token.
    async fn login_refused(&self, email: &str, password: &str) -> Result<(), StepFailure> {
        let attempt = actions::login_with_credentials(self.client, email, password).await?;
        self.check(
            oracle::expect_token_withheld(&attempt.token, &attempt.outcome),
        )
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes one step against `state`.
///
/// # Errors
///
/// Returns a [`StepFailure`] classified as transport or contract violation.
pub(crate) async fn execute(ctx: &StepContext<'_>, state: &mut RunState) -> Result<(), StepFailure> {
    let client = ctx.client;
    let user = &ctx.identities.user;
    let admin = &ctx.identities.admin;
    let account = &ctx.identities.account;
    match ctx.step {
        StepId::TargetReachable => {
            client.get(USERS_PATH, &Authorization::Anonymous).await?;
            Ok(())
        }
        StepId::RegisterUser => {
            let outcome = actions::register(client, user).await?;
            ctx.check(oracle::expect_success(&outcome))
        }
        StepId::LoginUser => {
            let expectation = format!("expected login for {} to issue a token", user.email());
            ctx.login_into(state, TokenSlot::User, &expectation).await
        }
        StepId::LoginAdmin => ctx.login_into(state, TokenSlot::Admin, ADMIN_LOGIN_FAILURE).await,
        StepId::UserDeniedPrivileged => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let outcome = client.get(USERS_PATH, &auth).await?;
            ctx.forbidden(&outcome)
        }
        StepId::AdminListsPrivileged => {
            let auth = StepContext::bearer(state, TokenSlot::Admin);
            let outcome = client.get(USERS_PATH, &auth).await?;
            ctx.check(oracle::expect_success(&outcome))?;
            ctx.check(oracle::expect_list_body(&outcome))
        }
        StepId::UserReadsOwnProfile => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let outcome = client.get(PROFILE_PATH, &auth).await?;
            ctx.own_profile(&outcome, user)
        }
        StepId::AdminReadsOwnProfile => {
            let auth = StepContext::bearer(state, TokenSlot::Admin);
            let outcome = client.get(PROFILE_PATH, &auth).await?;
            ctx.own_profile(&outcome, admin)
        }
        StepId::DuplicateRegistrationRejected => {
            let outcome = actions::register(client, user).await?;
            ctx.check(oracle::expect_rejected(&outcome))
        }
        StepId::IncompleteRegistrationRejected => {
            let request = RegistrationRequest {
                email: "",
                username: "",
                password: "",
            };
            let outcome =
                client.post_json(REGISTER_PATH, &Authorization::Anonymous, &request).await?;
            ctx.check(oracle::expect_rejected(&outcome))
        }
        StepId::WrongPasswordLoginRejected => {
            let wrong = format!("{}-wrong", user.password());
            ctx.login_refused(user.email(), &wrong).await
        }
        StepId::UnknownIdentityLoginRejected => {
            let unknown = format!("unregistered.{}", user.email());
            ctx.login_refused(&unknown, user.password()).await
        }
        StepId::ProfileRequiresToken => {
            let outcome = client.get(PROFILE_PATH, &Authorization::Anonymous).await?;
            ctx.check(oracle::expect_rejected(&outcome))
        }
        StepId::InvalidTokenRejectedPrivileged => {
            let auth = Authorization::bearer(&SessionToken::new(INVALID_TOKEN));
            let outcome = client.get(USERS_PATH, &auth).await?;
            ctx.check(oracle::expect_rejected(&outcome))
        }
        StepId::InvalidTokenRejectedProfile => {
            let auth = Authorization::bearer(&SessionToken::new(INVALID_TOKEN));
            let outcome = client.get(PROFILE_PATH, &auth).await?;
            ctx.check(oracle::expect_rejected(&outcome))
        }
        StepId::UserDeniedRoles => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let outcome = client.get(ROLES_PATH, &auth).await?;
            ctx.forbidden(&outcome)
        }
        StepId::UserDeniedRoleAssignment => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let path = format!("{USERS_PATH}/{PROBE_USER_ID}/assign-role");
            let request = AssignRoleRequest {
                role_id: PROBE_ROLE_ID,
            };
            let outcome = client.post_json(&path, &auth, &request).await?;
            ctx.forbidden(&outcome)
        }
        StepId::UserDeniedPasswordReset => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let path = format!("{USERS_PATH}/{PROBE_USER_ID}/reset-password");
            let request = ResetPasswordRequest {
                new_password: PROBE_NEW_PASSWORD,
            };
            let outcome = client.post_json(&path, &auth, &request).await?;
            ctx.forbidden(&outcome)
        }
        StepId::UserDeniedUserDelete => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let path = format!("{USERS_PATH}/{PROBE_USER_ID}");
            let outcome = client.delete(&path, &auth).await?;
            ctx.forbidden(&outcome)
        }
        StepId::UserDeniedUserUpdate => {
            let auth = StepContext::bearer(state, TokenSlot::User);
            let path = format!("{USERS_PATH}/{PROBE_USER_ID}");
            let request = ProfileUpdateRequest {
                username: PROBE_USERNAME,
            };
            let outcome = client.put_json(&path, &auth, &request).await?;
            ctx.forbidden(&outcome)
        }
        StepId::AccountSessionEstablished => {
            let outcome = actions::register(client, account).await?;
            ctx.check(oracle::expect_success(&outcome))?;
            let expectation = format!("expected login for {} to issue a token", account.email());
            ctx.login_into(state, TokenSlot::Account, &expectation).await
        }
        StepId::AccountUpdatesOwnProfile => {
            let auth = StepContext::bearer(state, TokenSlot::Account);
            let renamed = format!("{}-renamed", account.username());
            let outcome = actions::update_profile(client, &auth, &renamed).await?;
            ctx.check(oracle::expect_success(&outcome))?;
            ctx.check(oracle::expect_field_equals(&outcome, "Username", &renamed))
        }
        StepId::ChangePasswordWrongOldRejected => {
            let auth = StepContext::bearer(state, TokenSlot::Account);
            let wrong = format!("{}-wrong", account.password());
            let replacement = format!("{}-unused", account.password());
            let outcome = actions::change_password(client, &auth, &wrong, &replacement).await?;
            ctx.check(oracle::expect_rejected(&outcome))
        }
        StepId::AccountChangesPassword => {
            let auth = StepContext::bearer(state, TokenSlot::Account);
            let replacement = format!("{}-changed", account.password());
            let outcome =
                actions::change_password(client, &auth, account.password(), &replacement).await?;
            ctx.check(oracle::expect_success(&outcome))?;
            let attempt =
                actions::login_with_credentials(client, account.email(), &replacement).await?;
            ctx.check(oracle::expect_token_issued(
                &attempt.token,
                &attempt.outcome,
                "expected login with the changed password to issue a token",
            ))
        }
    }
}
