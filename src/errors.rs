//! Typed errors at module boundaries.
//!
//! Application plumbing uses `anyhow`; these enums cover the places where a
//! caller needs to tell failure kinds apart.

use thiserror::Error;

use crate::scoring::Category;

// ---------------------------------------------------------------------------
// Probe errors
// ---------------------------------------------------------------------------

/// Why a single HTTP probe against a module could not be evaluated.
///
/// Every variant makes the affected check fail; none of them abort a run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid probe URL: {0}")]
    Url(String),

    #[error("response body is not valid JSON: {0}")]
    Decode(String),

    #[error("unexpected response envelope: {0}")]
    Envelope(String),
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout(_))
    }
}

// ---------------------------------------------------------------------------
// Results CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum CsvError {
    #[error("results file is empty")]
    Empty,

    #[error("unexpected header: {0}")]
    Header(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unterminated quoted field")]
    Unterminated { line: usize },

    #[error("line {line}: invalid {column} value '{value}'")]
    Value {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: totalScore {stored} does not match checks ({computed})")]
    ScoreMismatch {
        line: usize,
        stored: u32,
        computed: u32,
    },
}

// ---------------------------------------------------------------------------
// Blind assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum AssignError {
    #[error("not enough subjects: {subjects} available for {participants} participants")]
    NotEnoughSubjects { subjects: usize, participants: usize },

    #[error("duplicate participant '{0}'")]
    DuplicateParticipant(String),

    #[error("no participants to assign")]
    NoParticipants,
}

// ---------------------------------------------------------------------------
// Reference resource registry
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("module {category}/{name} registered twice")]
    Duplicate { category: Category, name: String },

    #[error("invalid module name '{0}'")]
    InvalidName(String),
}

// ---------------------------------------------------------------------------
// Reference resource operations
// ---------------------------------------------------------------------------

/// Failure of a single resource operation, mapped to an HTTP status by the router.
#[derive(Debug, Error, PartialEq)]
pub enum ResourceError {
    #[error("Invalid id")]
    InvalidId,

    #[error("Item not found")]
    NotFound,

    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(Vec<crate::reference::FieldError>),
}

fn format_field_errors(errors: &[crate::reference::FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
