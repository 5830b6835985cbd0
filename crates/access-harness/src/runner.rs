// crates/access-harness/src/runner.rs
// ============================================================================
// Module: Scenario Runner
// Description: Sequential execution of a validated scenario plan.
// Purpose: Attempt every planned step, bounding each with a timeout.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`ScenarioRunner`] executes steps strictly in plan order on the calling
//! task. A failing step never aborts the run; each step yields exactly one
//! [`StepVerdict`]. Each step is bounded by a timeout and is never retried.
//! Invariants:
//! - `RunState` is borrowed mutably by one step at a time.
//! - Verdicts are returned in plan order, one per planned step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::client::ContractClient;
use crate::config::DEFAULT_TIMEOUT_MS;
use crate::diagnostics::DiagnosticEvent;
use crate::diagnostics::DiagnosticSink;
use crate::identity::Identities;
use crate::report::RunReport;
use crate::report::now_millis;
use crate::scenario::ScenarioPlan;
use crate::scenario::StepId;
use crate::session::RunState;
use crate::steps;
use crate::steps::StepContext;
use crate::verdict::StepFailure;
use crate::verdict::StepVerdict;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Executes scenario plans against one target.
#[derive(Clone)]
pub struct ScenarioRunner {
    /// Client bound to the target.
    client: ContractClient,
    /// Identities used by the steps.
    identities: Identities,
    /// Diagnostic destination.
    sink: Arc<dyn DiagnosticSink>,
    /// Upper bound for a single step.
    step_timeout: Duration,
}

impl ScenarioRunner {
    /// Creates a runner with the default step timeout.
    #[must_use]
    pub fn new(
        client: ContractClient,
        identities: Identities,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            client,
            identities,
            sink,
            step_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Overrides the per-step timeout.
    #[must_use]
    pub const fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Returns the client, for transcript access.
    #[must_use]
    pub const fn client(&self) -> &ContractClient {
        &self.client
    }

    /// Runs `plan` from a fresh, empty run state.
    pub async fn run(&self, plan: &ScenarioPlan) -> RunReport {
        let started_at_ms = now_millis();
        let mut state = RunState::new();
        let verdicts = self.run_with_state(plan, &mut state).await;
        RunReport::new(
            self.client.base_url().as_str(),
            plan.suite(),
            started_at_ms,
            now_millis(),
            verdicts,
        )
    }

    /// Runs `plan` against caller-supplied state.
    pub async fn run_with_state(&self, plan: &ScenarioPlan, state: &mut RunState) -> Vec<StepVerdict> {
        let mut verdicts = Vec::with_capacity(plan.steps().len());
        for spec in plan.steps() {
            verdicts.push(self.run_step(spec.id, state).await);
        }
        verdicts
    }

    /// Runs a single step against `state`, outside of any plan.
    ///
    /// No ordering checks apply, so a step may observe empty tokens.
    pub async fn run_step(&self, step: StepId, state: &mut RunState) -> StepVerdict {
        self.sink.record(&DiagnosticEvent::step_started(step));
        let ctx = StepContext {
            step,
            client: &self.client,
            identities: &self.identities,
            sink: self.sink.as_ref(),
        };
        let started = Instant::now();
        let result = match tokio::time::timeout(self.step_timeout, steps::execute(&ctx, state)).await
        {
            Ok(result) => result,
            Err(_) => Err(StepFailure::timed_out(duration_millis(self.step_timeout))),
        };
        let verdict = StepVerdict::from_result(step, duration_millis(started.elapsed()), result);
        self.sink.record(&DiagnosticEvent::step_finished(&verdict));
        verdict
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a duration to whole milliseconds, saturating.
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
