// crates/access-harness/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: TOML configuration with environment overrides.
// Purpose: Provide strict, fail-closed run configuration with hard limits.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! Configuration is read from a TOML file when one is named (via argument or
//! `ACCESS_HARNESS_CONFIG`) or when the default file exists; otherwise built-in
//! defaults apply. Environment overrides are applied on top, then the result
//! is validated. Invalid input fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::identity::Identities;
use crate::identity::Identity;
use crate::identity::IdentityError;
use crate::scenario::Suite;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "access-harness.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default target base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Default request and step timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Upper bound for any configured timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000;
/// Placeholder shown instead of passwords.
const REDACTED: &str = "[redacted]";

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Config file path.
    Config,
    /// Target base URL override.
    BaseUrl,
    /// Timeout override in seconds (positive integer, both timeouts).
    TimeoutSeconds,
    /// Suite override (`core` or `extended`).
    Suite,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "ACCESS_HARNESS_CONFIG",
            Self::BaseUrl => "ACCESS_HARNESS_BASE_URL",
            Self::TimeoutSeconds => "ACCESS_HARNESS_TIMEOUT_SEC",
            Self::Suite => "ACCESS_HARNESS_SUITE",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Target service settings.
    #[serde(default)]
    pub target: TargetConfig,
    /// Identity credentials.
    #[serde(default)]
    pub identities: IdentitiesConfig,
    /// Run selection settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Diagnostic sink settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Target service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Base URL of the service under test.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request transport timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Per-step timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub step_timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            step_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Credentials for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Account email.
    pub email: String,
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl IdentityConfig {
    /// Validates the credentials into an [`Identity`].
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when a field is empty.
    pub fn to_identity(&self) -> Result<Identity, IdentityError> {
        Identity::new(self.email.clone(), self.username.clone(), self.password.clone())
    }
}

impl From<&Identity> for IdentityConfig {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email().to_string(),
            username: identity.username().to_string(),
            password: identity.password().to_string(),
        }
    }
}

/// Credentials for every run identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitiesConfig {
    /// Ordinary identity, registered by the harness.
    #[serde(default = "default_user")]
    pub user: IdentityConfig,
    /// Administrator identity, pre-seeded on the target.
    #[serde(default = "default_admin")]
    pub admin: IdentityConfig,
    /// Self-service identity whose username and password the extended suite changes.
    #[serde(default = "default_account")]
    pub account: IdentityConfig,
}

impl Default for IdentitiesConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
            admin: default_admin(),
            account: default_account(),
        }
    }
}

/// Run selection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Suite to execute.
    #[serde(default)]
    pub suite: Suite,
    /// Whether the reachability probe runs first.
    #[serde(default = "default_true")]
    pub preflight: bool,
    /// Directory for per-run artifacts.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            suite: Suite::Core,
            preflight: true,
            artifacts_dir: None,
        }
    }
}

/// Diagnostic sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `diagnostics.path`.
    File,
    /// Discard diagnostics.
    None,
}

/// Diagnostic sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: DiagnosticSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads configuration, applies environment overrides, and validates.
    ///
    /// An explicit `path` or `ACCESS_HARNESS_CONFIG` must point at a readable
    /// file. Without either, the default file is used when present and
    /// built-in defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::parse_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates TOML text without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without validating it.
    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies `ACCESS_HARNESS_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override is malformed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(base_url) = read_env_nonempty(HarnessEnv::BaseUrl.as_str())? {
            self.target.base_url = base_url;
        }
        if let Some(raw) = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())? {
            let timeout_ms = parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &raw)?;
            self.target.request_timeout_ms = timeout_ms;
            self.target.step_timeout_ms = timeout_ms;
        }
        if let Some(raw) = read_env_nonempty(HarnessEnv::Suite.as_str())? {
            self.run.suite = Suite::parse(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{} must be core or extended",
                    HarnessEnv::Suite.as_str()
                ))
            })?;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        let identities = self.identities()?;
        let labelled = [
            ("user", &identities.user),
            ("admin", &identities.admin),
            ("account", &identities.account),
        ];
        for (index, (first, left)) in labelled.iter().enumerate() {
            for (second, right) in &labelled[index + 1 ..] {
                if left.email().eq_ignore_ascii_case(right.email()) {
                    return Err(ConfigError::Invalid(format!(
                        "identities.{first} and identities.{second} must have distinct emails"
                    )));
                }
            }
        }
        if self.diagnostics.sink == DiagnosticSinkKind::File && self.diagnostics.path.is_none() {
            return Err(ConfigError::Invalid(
                "diagnostics.path is required when diagnostics.sink = \"file\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the validated identities.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an identity field is empty.
    pub fn identities(&self) -> Result<Identities, ConfigError> {
        let user = self
            .identities
            .user
            .to_identity()
            .map_err(|err| ConfigError::Invalid(format!("identities.user: {err}")))?;
        let admin = self
            .identities
            .admin
            .to_identity()
            .map_err(|err| ConfigError::Invalid(format!("identities.admin: {err}")))?;
        let account = self
            .identities
            .account
            .to_identity()
            .map_err(|err| ConfigError::Invalid(format!("identities.account: {err}")))?;
        Ok(Identities {
            user,
            admin,
            account,
        })
    }

    /// Returns the per-request transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.target.request_timeout_ms)
    }

    /// Returns the per-step timeout.
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.target.step_timeout_ms)
    }

    /// Returns a copy with passwords replaced by a placeholder.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        REDACTED.clone_into(&mut copy.identities.user.password);
        REDACTED.clone_into(&mut copy.identities.admin.password);
        REDACTED.clone_into(&mut copy.identities.account.password);
        copy
    }
}

impl TargetConfig {
    /// Validates the base URL and timeouts.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|err| ConfigError::Invalid(format!("target.base_url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "target.base_url must use http or https".to_string(),
            ));
        }
        validate_timeout("target.request_timeout_ms", self.request_timeout_ms)?;
        validate_timeout("target.step_timeout_ms", self.step_timeout_ms)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default base URL for serde.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default timeout for serde.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default `true` for serde.
const fn default_true() -> bool {
    true
}

/// Default ordinary identity for serde.
fn default_user() -> IdentityConfig {
    IdentityConfig::from(&Identity::ordinary())
}

/// Default administrator identity for serde.
fn default_admin() -> IdentityConfig {
    IdentityConfig::from(&Identity::administrator())
}

/// Default self-service identity for serde.
fn default_account() -> IdentityConfig {
    IdentityConfig::from(&Identity::self_service())
}

/// Resolves which config file to read, if any.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = read_env_nonempty(HarnessEnv::Config.as_str())? {
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default_path.is_file().then_some(default_path))
}

/// Rejects zero and excessive timeouts.
fn validate_timeout(field: &str, value_ms: u64) -> Result<(), ConfigError> {
    if value_ms == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    if value_ms > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!("{field} must be at most {MAX_TIMEOUT_MS}")));
    }
    Ok(())
}

/// Reads an environment variable, enforcing UTF-8 and rejecting empty values.
fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    let Some(raw) = env::var_os(name) else {
        return Ok(None);
    };
    let value = raw
        .into_string()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{name} must not be empty")));
    }
    Ok(Some(value))
}

/// Parses a positive whole number of seconds into milliseconds.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(secs.saturating_mul(1000))
}
