//! CLI Exit Code Registry
//!
//! Single source of truth for `cm` exit codes. Schedulers and wrapper
//! scripts branch on these, so a code's meaning never changes once shipped.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | Usage error (bad arguments; clap also exits with 2) |
//! | 3    | Configuration error (settings file unreadable/bad)  |
//! | 4    | Reference store error (open, schema, query)         |
//! | 5    | Input error (unreadable or headerless source file)  |
//! | 6    | Output error (export file cannot be written)        |
//!
//! A missing input file is not an error; the run continues without it.

/// Success - command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Settings file cannot be read, parsed or validated.
pub const EXIT_CONFIG: u8 = 3;

/// SQLite store cannot be opened, migrated or queried.
pub const EXIT_STORE: u8 = 4;

/// Source CSV exists but cannot be read or has no header row.
pub const EXIT_INPUT: u8 = 5;

/// One of the three team files cannot be created or written.
pub const EXIT_OUTPUT: u8 = 6;
