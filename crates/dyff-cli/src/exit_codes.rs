//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - the full report was written
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - a value source could not be parsed or values failed the schema
pub const VALIDATION_ERROR: i32 = 2;

/// Template error - rendering the target chart failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Pack error - chart not found, wrong version or invalid Pack.yaml
pub const PACK_ERROR: i32 = 4;

/// IO error - staging, reading or writing failed
pub const IO_ERROR: i32 = 5;

/// Release error - the installed release could not be fetched
pub const RELEASE_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
