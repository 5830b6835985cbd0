// system-tests/tests/suites/faults.rs
// ============================================================================
// Module: Fault Detection Tests
// Description: Suites against stubs that break one part of the contract.
// Purpose: Validate that each deviation fails the step that checks it.
// Dependencies: system-tests helpers, access-harness
// ============================================================================

//! ## Overview
//! Each test injects a single fault into the stub and asserts that the run
//! fails exactly where the contract is broken, with the observed status and a
//! diagnostic trail, while unrelated steps still pass.

use access_harness::ADMIN_LOGIN_FAILURE;
use access_harness::FailureClass;
use access_harness::RunReport;
use access_harness::ScenarioPlan;
use access_harness::StepId;
use access_harness::Suite;
use access_harness::VerdictStatus;
use axum::http::StatusCode;
use helpers::artifacts::TestReporter;
use helpers::auth_stub::StubFaults;
use helpers::auth_stub::spawn_auth_stub_with_faults;
use helpers::harness::CapturedRunner;
use helpers::harness::captured_runner;
use helpers::harness::write_run_artifacts;

use crate::helpers;

type DynError = Box<dyn std::error::Error>;

/// Runs `suite` against a stub with `faults`, writing artifacts under `label`.
async fn run_with_faults(
    reporter: &mut TestReporter,
    label: &str,
    faults: StubFaults,
    suite: Suite,
) -> Result<(RunReport, CapturedRunner, Vec<String>), DynError> {
    let stub = spawn_auth_stub_with_faults(faults)?;
    let captured = captured_runner(stub.base_url())?;
    let plan = ScenarioPlan::for_suite(suite, true)?;
    let report = captured.runner.run(&plan).await;
    let written = write_run_artifacts(reporter, label, &captured, &report)?;
    Ok((report, captured, written))
}

/// Asserts that exactly `expected` failed, all as contract violations.
fn assert_failed_steps(report: &RunReport, expected: &[StepId]) {
    let failed: Vec<StepId> = report
        .verdicts
        .iter()
        .filter(|verdict| verdict.status != VerdictStatus::Pass)
        .map(|verdict| verdict.step)
        .collect();
    assert_eq!(failed, expected, "{}", report.to_text());
    for step in expected {
        let verdict = report.verdict(*step).expect("verdict present");
        assert_eq!(verdict.failure_class(), Some(FailureClass::ContractViolation));
    }
    assert!(!report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn ordinary_user_listing_users_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("ordinary_user_listing_users_is_detected")?;
    let faults = StubFaults {
        user_may_list_users: true,
        ..StubFaults::default()
    };
    let (report, captured, written) =
        run_with_faults(&mut reporter, "user_may_list", faults, Suite::Core).await?;

    assert_failed_steps(&report, &[StepId::UserDeniedPrivileged]);
    let failure = report
        .verdict(StepId::UserDeniedPrivileged)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.http_status, Some(200));
    assert_eq!(failure.message, "expected status 403, got 200");
    let context = captured
        .sink
        .events()
        .into_iter()
        .find(|event| event.event == "step_failure_context")
        .expect("failure context event");
    assert_eq!(context.step, StepId::UserDeniedPrivileged);
    assert_eq!(context.http_status, Some(200));
    assert!(context.body.is_some_and(|body| body.starts_with('[')));
    assert_eq!(reporter.failing_steps(), [(
        "user_may_list".to_string(),
        vec!["user_denied_privileged [contract_violation] expected status 403, got 200".to_string()],
    )]);

    reporter.finish("pass", vec!["privilege escalation failed the denial step".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_instead_of_forbidden_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("unauthorized_instead_of_forbidden_is_detected")?;
    let faults = StubFaults {
        denial_status: StatusCode::UNAUTHORIZED,
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "denial_401", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[
        StepId::UserDeniedPrivileged,
        StepId::UserDeniedRoles,
        StepId::UserDeniedRoleAssignment,
        StepId::UserDeniedPasswordReset,
        StepId::UserDeniedUserDelete,
        StepId::UserDeniedUserUpdate,
    ]);
    for verdict in report.verdicts.iter().filter(|verdict| !verdict.passed()) {
        let failure = verdict.failure.as_ref().expect("failure");
        assert_eq!(failure.message, "expected status 403, got 401");
    }

    reporter.finish("pass", vec!["401 denials failed every 403 check".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn foreign_profile_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("foreign_profile_is_detected")?;
    let faults = StubFaults {
        profile_username: Some("someone-else".to_string()),
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "foreign_profile", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[StepId::UserReadsOwnProfile, StepId::AdminReadsOwnProfile]);
    let failure = report
        .verdict(StepId::UserReadsOwnProfile)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.message, r#"expected Username = "testuser", got "someone-else""#);

    reporter.finish("pass", vec!["profile mismatch failed both profile steps".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_administrator_is_reported() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("missing_administrator_is_reported")?;
    let faults = StubFaults {
        skip_admin_seed: true,
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "no_admin", faults, Suite::Core).await?;

    assert_failed_steps(&report, &[StepId::LoginAdmin, StepId::AdminListsPrivileged]);
    let login = report.verdict(StepId::LoginAdmin).and_then(|verdict| verdict.failure.as_ref());
    assert_eq!(login.map(|failure| failure.message.as_str()), Some(ADMIN_LOGIN_FAILURE));
    assert_eq!(login.and_then(|failure| failure.http_status), Some(401));
    let listing =
        report.verdict(StepId::AdminListsPrivileged).and_then(|verdict| verdict.failure.as_ref());
    assert_eq!(listing.and_then(|failure| failure.http_status), Some(401));

    reporter.finish("pass", vec!["unseeded administrator failed admin steps".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn login_body_without_token_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("login_body_without_token_is_detected")?;
    let faults = StubFaults {
        malformed_login_body: true,
        ..StubFaults::default()
    };
    let (report, captured, written) =
        run_with_faults(&mut reporter, "malformed_login", faults, Suite::Core).await?;

    let login_user = report.verdict(StepId::LoginUser).expect("verdict");
    assert_eq!(login_user.status, VerdictStatus::Fail);
    assert_eq!(login_user.failure_class(), Some(FailureClass::ContractViolation));
    let decode_events: Vec<StepId> = captured
        .sink
        .events()
        .into_iter()
        .filter(|event| event.event == "login_decode_failed")
        .map(|event| event.step)
        .collect();
    assert_eq!(decode_events, [StepId::LoginUser, StepId::LoginAdmin]);
    assert_eq!(report.verdict(StepId::RegisterUser).map(|verdict| verdict.status), Some(VerdictStatus::Pass));

    let transcript = serde_json::to_string(&captured.runner.client().transcript())?;
    let diagnostics = serde_json::to_string(&captured.sink.events())?;
    let verdicts = serde_json::to_string(&report)?;
    for (label, recorded) in [("transcript", &transcript), ("diagnostics", &diagnostics), ("report", &verdicts)] {
        assert!(!recorded.contains("tok-"), "{label} leaked an issued token: {recorded}");
    }
    assert!(diagnostics.contains("[withheld:"));

    reporter.finish("pass", vec!["tokenless login bodies failed both logins".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn accepted_duplicate_registration_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("accepted_duplicate_registration_is_detected")?;
    let faults = StubFaults {
        accept_duplicate_registration: true,
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "duplicate_accepted", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[StepId::DuplicateRegistrationRejected]);
    let failure = report
        .verdict(StepId::DuplicateRegistrationRejected)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.http_status, Some(201));

    reporter.finish("pass", vec!["duplicate registration acceptance was flagged".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ignored_profile_update_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("ignored_profile_update_is_detected")?;
    let faults = StubFaults {
        profile_update_ignored: true,
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "profile_update_ignored", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[StepId::AccountUpdatesOwnProfile]);
    let failure = report
        .verdict(StepId::AccountUpdatesOwnProfile)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.http_status, Some(200));
    assert_eq!(failure.message, r#"expected Username = "accountuser-renamed", got "accountuser""#);

    reporter.finish("pass", vec!["unsaved profile update was flagged".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ignored_password_change_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("ignored_password_change_is_detected")?;
    let faults = StubFaults {
        password_change_ignored: true,
        ..StubFaults::default()
    };
    let (report, captured, written) =
        run_with_faults(&mut reporter, "password_change_ignored", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[StepId::AccountChangesPassword]);
    let failure = report
        .verdict(StepId::AccountChangesPassword)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.http_status, Some(401));
    assert_eq!(failure.message, "expected login with the changed password to issue a token");
    let transcript = serde_json::to_string(&captured.runner.client().transcript())?;
    assert!(!transcript.contains("accountpass"));

    reporter.finish("pass", vec!["unsaved password change was flagged".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unverified_old_password_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("unverified_old_password_is_detected")?;
    let faults = StubFaults {
        change_password_skips_old_check: true,
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "old_password_unchecked", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[StepId::ChangePasswordWrongOldRejected]);
    let failure = report
        .verdict(StepId::ChangePasswordWrongOldRejected)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.message, "expected request to be rejected, got 200");

    reporter.finish("pass", vec!["missing old-password check was flagged".to_string()], written)?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ordinary_user_updating_users_is_detected() -> Result<(), DynError> {
    let mut reporter = TestReporter::new("ordinary_user_updating_users_is_detected")?;
    let faults = StubFaults {
        user_may_update_users: true,
        ..StubFaults::default()
    };
    let (report, _captured, written) =
        run_with_faults(&mut reporter, "user_may_update", faults, Suite::Extended).await?;

    assert_failed_steps(&report, &[StepId::UserDeniedUserUpdate]);
    let failure = report
        .verdict(StepId::UserDeniedUserUpdate)
        .and_then(|verdict| verdict.failure.as_ref())
        .expect("failure");
    assert_eq!(failure.message, "expected status 403, got 200");

    reporter.finish("pass", vec!["user update escalation was flagged".to_string()], written)?;
    drop(reporter);
    Ok(())
}
