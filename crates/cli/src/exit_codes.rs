//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `poinv` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success, no discrepancies                |
//! | 1       | run              | Report contains discrepancies            |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | recon            | Configuration, extraction, rendering     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - reconciled, the report holds only the sentinel row.
pub const EXIT_SUCCESS: u8 = 0;

/// Discrepancies found. Like `diff(1)`, exit 1 means "documents differ."
pub const EXIT_DISCREPANCIES: u8 = 1;

/// Usage error - bad arguments, unreadable config path.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 60;

/// A PO or invoice document could not be turned into a table
/// (missing, unsupported type, corrupt, scanned PDF, over the byte limit).
pub const EXIT_EXTRACTION_FAILED: u8 = 61;

/// A table exceeded `limits.max_rows`.
pub const EXIT_INPUT_TOO_LARGE: u8 = 62;

/// Report files could not be written.
pub const EXIT_RENDER_FAILED: u8 = 63;
