// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Runner Harness
// Description: Wiring between the scenario runner, stubs, and artifacts.
// Purpose: Build runners with captured diagnostics and persist their output.
// Dependencies: access-harness
// ============================================================================

use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use access_harness::ContractClient;
use access_harness::DiagnosticSink;
use access_harness::Identities;
use access_harness::RunArtifacts;
use access_harness::RunReport;
use access_harness::ScenarioRunner;
use access_harness::diagnostics::MemoryDiagnosticSink;
use system_tests::config::SystemTestConfig;

use super::artifacts::TestReporter;

/// Default per-request timeout used by system-test runners.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Runner plus the in-memory sink that receives its diagnostics.
pub struct CapturedRunner {
    pub runner: ScenarioRunner,
    pub sink: Arc<MemoryDiagnosticSink>,
}

/// Default request timeout raised to the configured floor.
pub fn request_timeout() -> Result<Duration, String> {
    Ok(SystemTestConfig::load()?.request_timeout(REQUEST_TIMEOUT))
}

/// Builds a runner against `base_url` with default identities.
pub fn captured_runner(base_url: &str) -> Result<CapturedRunner, String> {
    captured_runner_with(base_url, Identities::default(), request_timeout()?)
}

/// Builds a runner against `base_url` with explicit identities and request timeout.
pub fn captured_runner_with(
    base_url: &str,
    identities: Identities,
    request_timeout: Duration,
) -> Result<CapturedRunner, String> {
    let client = ContractClient::new(base_url, request_timeout)
        .map_err(|err| format!("client build failed: {err}"))?;
    let sink = Arc::new(MemoryDiagnosticSink::new());
    let shared: Arc<dyn DiagnosticSink> = Arc::clone(&sink) as Arc<dyn DiagnosticSink>;
    let runner = ScenarioRunner::new(client, identities, shared);
    Ok(CapturedRunner {
        runner,
        sink,
    })
}

/// Records the run with the reporter and writes its report, transcript, and
/// captured diagnostics under the reporter root.
pub fn write_run_artifacts(
    reporter: &mut TestReporter,
    label: &str,
    captured: &CapturedRunner,
    report: &RunReport,
) -> Result<Vec<String>, String> {
    reporter.record_run(label, report);
    let artifacts = RunArtifacts::new(reporter.artifacts().run_dir(label))
        .map_err(|err| format!("artifact root failed: {err}"))?;
    let mut written = artifacts
        .write_run(report, &captured.runner.client().transcript())
        .map_err(|err| format!("artifact write failed: {err}"))?;
    written.push(
        artifacts
            .write_json("diagnostics.json", &captured.sink.events())
            .map_err(|err| format!("diagnostics write failed: {err}"))?,
    );
    let reporter: &TestReporter = reporter;
    Ok(written.iter().map(|path| display_relative(reporter, path)).collect())
}

/// Reserves a loopback address nobody listens on.
pub fn allocate_closed_addr() -> Result<String, String> {
    let listener =
        TcpListener::bind("127.0.0.1:0").map_err(|err| format!("bind failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("addr lookup failed: {err}"))?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

fn display_relative(reporter: &TestReporter, path: &Path) -> String {
    path.strip_prefix(reporter.artifacts().root()).unwrap_or(path).display().to_string()
}
