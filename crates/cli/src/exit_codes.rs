//! CLI Exit Code Registry
//!
//! Single source of truth for `vinrecon` exit codes. Scripts and schedulers
//! rely on them, so codes are never reused.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success, no discrepancies                                 |
//! | 1    | Run completed and found discrepancies                     |
//! | 2    | Usage / validation error (missing required input)         |
//! | 60   | Feed download failed                                      |
//! | 61   | Feed could not be decoded                                 |
//! | 62   | Configuration error (bad config file, missing column)     |
//! | 63   | Data error (bad price, unknown type, duplicate VIN)       |
//! | 64   | Output could not be written                               |

/// Success - command completed, nothing to report.
pub const EXIT_SUCCESS: u8 = 0;

/// Discrepancies found. Like `diff(1)`, exit 1 means "sources differ."
pub const EXIT_DISCREPANCIES: u8 = 1;

/// Usage error - bad arguments, missing required inputs.
/// Checked before any network activity.
pub const EXIT_USAGE: u8 = 2;

/// Feed download failed (non-2xx, network error, timeout, unreadable file).
pub const EXIT_FETCH_FAILED: u8 = 60;

/// Feed bytes are not delimited text with a header row.
pub const EXIT_DECODE_FAILED: u8 = 61;

/// Config file unparseable or invalid, or a mapped column is absent.
pub const EXIT_CONFIG: u8 = 62;

/// Feed data rejected under the configured policies.
pub const EXIT_DATA: u8 = 63;

/// Report or snapshot could not be written.
pub const EXIT_OUTPUT: u8 = 64;
