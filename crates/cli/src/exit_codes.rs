//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: batch scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success                                       |
//! | 2       | Universal | CLI usage error (bad args, unknown school)    |
//! | 3       | Universal | Partial success (warnings with --strict)      |
//! | 30-39   | artifacts | File I/O, missing artifacts, parse/config     |
//! | 40-49   | input     | Nothing to process                            |

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing root, unknown school.
pub const EXIT_USAGE: u8 = 2;

/// Partial - the run finished but skipped files or employees, and
/// `--strict` was given.
pub const EXIT_PARTIAL: u8 = 3;

// =============================================================================
// Artifacts (30-39)
// =============================================================================

/// Cannot read or write a workbook or directory.
pub const EXIT_IO: u8 = 30;

/// An intermediate artifact (merged workbook) does not exist yet.
pub const EXIT_MISSING_ARTIFACT: u8 = 31;

/// Schema TOML or settings could not be parsed or failed validation.
pub const EXIT_PARSE: u8 = 32;

// =============================================================================
// Input (40-49)
// =============================================================================

/// No month folders or no source files were found.
pub const EXIT_NO_INPUT: u8 = 40;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_USAGE,
            EXIT_PARTIAL,
            EXIT_IO,
            EXIT_MISSING_ARTIFACT,
            EXIT_PARSE,
            EXIT_NO_INPUT,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
