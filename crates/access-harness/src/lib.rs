// crates/access-harness/src/lib.rs
// ============================================================================
// Module: Access Harness Library
// Description: Contract verification for authentication and role-gated access.
// Purpose: Drive a target auth service through ordered steps and judge responses.
// Dependencies: reqwest, serde, serde_jcs, thiserror, tokio, toml, url
// ============================================================================

//! ## Overview
//! `access-harness` exercises an HTTP authentication service as a black box:
//! it registers an ordinary identity, logs in both that identity and a
//! pre-seeded administrator, and checks that role-gated resources admit and
//! refuse the right callers. Steps run sequentially against a run-scoped
//! [`RunState`], each producing a [`StepVerdict`] that the
//! [`ScenarioRunner`] aggregates into a [`RunReport`].
//!
//! Security posture: the target is untrusted. Response bodies are truncated
//! before they are logged, and passwords and tokens never reach diagnostics
//! or transcripts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actions;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod identity;
pub mod oracle;
pub mod outcome;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod session;
mod steps;
pub mod verdict;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::Authorization;
pub use client::ContractClient;
pub use client::TranscriptEntry;
pub use client::TransportError;
pub use config::ConfigError;
pub use config::HarnessConfig;
pub use diagnostics::DiagnosticEvent;
pub use diagnostics::DiagnosticSink;
pub use identity::Identities;
pub use identity::Identity;
pub use outcome::HttpOutcome;
pub use report::RunArtifacts;
pub use report::RunReport;
pub use runner::ScenarioRunner;
pub use scenario::PlanError;
pub use scenario::ScenarioPlan;
pub use scenario::StepId;
pub use scenario::Suite;
pub use session::RunState;
pub use session::SessionToken;
pub use session::TokenSlot;
pub use steps::ADMIN_LOGIN_FAILURE;
pub use steps::INVALID_TOKEN;
pub use verdict::FailureClass;
pub use verdict::StepVerdict;
pub use verdict::VerdictStatus;
