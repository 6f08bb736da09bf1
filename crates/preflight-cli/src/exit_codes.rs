//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - every enabled check passed
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure, including a cancelled run
pub const ERROR: i32 = 1;

/// Veto - one or more preflight checks rejected the planned changes
pub const CHECKS_FAILED: i32 = 2;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments, manifests or configuration (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
