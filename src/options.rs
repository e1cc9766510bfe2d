//! Parsing options shared by the record, item-file, and tree-walk layers.
//!
//! `ParseMode` selects between strict decoding (propagate every anomaly)
//! and permissive decoding (downgrade recoverable anomalies to a logged
//! warning and keep going), per the error-handling policy table.

/// Overall decoding strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Fail on the first CRC mismatch, unrecognized record, or unknown
    /// revision action.
    Strict,
    /// Log and skip unrecognized records/actions and CRC mismatches instead
    /// of failing; dangling offsets are still always captured as
    /// non-fatal error strings on the owning `Action` regardless of mode.
    Permissive,
}

impl Default for ParseMode {
    fn default() -> Self {
        ParseMode::Strict
    }
}

impl ParseMode {
    pub fn is_permissive(&self) -> bool {
        matches!(self, ParseMode::Permissive)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, ParseMode::Strict)
    }
}

/// Options threaded through record decoding, item-file parsing, and the
/// tree walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub parse_mode: ParseMode,
    /// Skip records with an unrecognized signature instead of failing.
    pub ignore_unknown_records: bool,
    /// Skip revision records with an unknown action code instead of failing.
    pub ignore_unknown_actions: bool,
    /// Treat a CRC mismatch (on a non-comment record) as a warning.
    pub lenient_crc: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            parse_mode: ParseMode::Strict,
            ignore_unknown_records: false,
            ignore_unknown_actions: false,
            lenient_crc: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// All lenient flags on: unknown records/actions are skipped, CRC
    /// mismatches are logged rather than fatal.
    pub fn permissive() -> Self {
        ParseOptions {
            parse_mode: ParseMode::Permissive,
            ignore_unknown_records: true,
            ignore_unknown_actions: true,
            lenient_crc: true,
        }
    }

    pub fn strict() -> Self {
        ParseOptions::default()
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        if parse_mode.is_permissive() {
            self.ignore_unknown_records = true;
            self.ignore_unknown_actions = true;
            self.lenient_crc = true;
        }
        self
    }
}
