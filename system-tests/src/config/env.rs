// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Settings
// Description: Environment-driven knobs for the harness system tests.
// Purpose: Resolve artifact locations, request timeouts, and the live target.
// Dependencies: url
// ============================================================================

//! ## Overview
//! Three variables shape a system-test run: where artifacts land, a floor
//! under every harness request timeout (for slow CI hosts), and an optional
//! live service for the live-target suite. Parsing goes through a lookup
//! function so the rules are testable without touching the process
//! environment; [`SystemTestConfig::load`] binds that lookup to the real
//! environment. Invalid values fail the load rather than falling back to
//! defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use url::Url;

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Directory that receives per-test artifact folders.
pub const RUN_ROOT_VAR: &str = "ACCESS_HARNESS_SYSTEM_TEST_RUN_ROOT";
/// Minimum request timeout, in whole seconds.
pub const TIMEOUT_FLOOR_VAR: &str = "ACCESS_HARNESS_SYSTEM_TEST_TIMEOUT_SEC";
/// Base URL of a running auth service for the live-target suite.
pub const TARGET_URL_VAR: &str = "ACCESS_HARNESS_SYSTEM_TEST_TARGET_URL";

/// Artifact root used when [`RUN_ROOT_VAR`] is unset.
const DEFAULT_RUN_ROOT: &str = "target/system-tests";

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Resolved system-test settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Artifact root override.
    pub run_root: Option<PathBuf>,
    /// Lower bound applied to harness request timeouts.
    pub timeout_floor: Option<Duration>,
    /// Live auth service; the live-target suite skips when absent.
    pub target_url: Option<Url>,
}

impl SystemTestConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable when a value is not UTF-8, is
    /// blank, or does not parse.
    pub fn load() -> Result<Self, String> {
        Self::from_lookup(read_env)
    }

    /// Reads settings through `lookup`, which returns a variable's raw value.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable when a value is blank or does
    /// not parse, or when `lookup` itself fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Result<Option<String>, String>,
    {
        let present = |name: &str| -> Result<Option<String>, String> {
            match lookup(name)? {
                Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
                other => Ok(other.map(|value| value.trim().to_string())),
            }
        };
        Ok(Self {
            run_root: present(RUN_ROOT_VAR)?.map(PathBuf::from),
            timeout_floor: present(TIMEOUT_FLOOR_VAR)?.map(|raw| parse_floor(&raw)).transpose()?,
            target_url: present(TARGET_URL_VAR)?.map(|raw| parse_target(&raw)).transpose()?,
        })
    }

    /// Returns `requested`, raised to the configured floor.
    #[must_use]
    pub fn request_timeout(&self, requested: Duration) -> Duration {
        self.timeout_floor.map_or(requested, |floor| requested.max(floor))
    }

    /// Returns the artifact directory for one test.
    ///
    /// Without an override each process gets a fresh timestamped run folder.
    #[must_use]
    pub fn test_dir(&self, test_name: &str) -> PathBuf {
        self.run_root.as_ref().map_or_else(
            || {
                let stamp =
                    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
                PathBuf::from(DEFAULT_RUN_ROOT).join(format!("run_{stamp}")).join(test_name)
            },
            |root| root.join(test_name),
        )
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Reads one variable from the process environment, rejecting non-UTF-8.
fn read_env(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Parses the timeout floor as a positive number of seconds.
fn parse_floor(raw: &str) -> Result<Duration, String> {
    match raw.parse::<u64>() {
        Ok(0) => Err(format!("{TIMEOUT_FLOOR_VAR} must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("{TIMEOUT_FLOOR_VAR} must be a whole number of seconds, got {raw:?}")),
    }
}

/// Parses the live target as an absolute http(s) URL with a host.
fn parse_target(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|err| format!("{TARGET_URL_VAR} is not a URL: {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{TARGET_URL_VAR} must use http or https, got {}", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("{TARGET_URL_VAR} must name a host"));
    }
    Ok(url)
}
