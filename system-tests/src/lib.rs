// system-tests/src/lib.rs
// ============================================================================
// Module: Access Harness System Tests Library
// Description: Shared configuration for end-to-end harness scenarios.
// Purpose: Provide common settings for the system-test binaries.
// Dependencies: url
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the system-test binaries in
//! `system-tests/tests`, which run the access harness over loopback HTTP
//! against an in-process stub of the authentication service.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
