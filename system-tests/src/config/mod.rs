// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Centralized configuration for access harness system tests.
// Purpose: Provide typed access to test environment settings and defaults.
// Dependencies: url
// ============================================================================

//! ## Overview
//! System-test settings are read from environment variables into
//! [`SystemTestConfig`], which the test helpers consult for artifact
//! locations, request timeouts, and the optional live target.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::RUN_ROOT_VAR;
pub use env::SystemTestConfig;
pub use env::TARGET_URL_VAR;
pub use env::TIMEOUT_FLOOR_VAR;
