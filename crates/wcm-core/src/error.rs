//! Error types for WCM.

use std::fmt;

use thiserror::Error;

/// Top-level result type for WCM operations.
pub type Result<T> = std::result::Result<T, WcmError>;

/// Top-level error type for WCM.
#[derive(Debug, Error)]
pub enum WcmError {
    #[error("{collection} entry with id {id} not found")]
    NotFound { collection: String, id: u32 },

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("scheduling rejected: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("parse error in '{document}'{}: {message}", position(.line, .column))]
    Parse {
        document: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock error: {0}")]
    Lock(String),
}

impl WcmError {
    /// True for schema violations and business-rule rejections alike.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Schedule(_))
    }

    pub fn not_found(collection: impl Into<String>, id: u32) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id,
        }
    }
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(line), Some(column)) => format!(" at line {line}, column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}

/// Where in a document a validation failure was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Field path such as `vehicles[2].capacity`.
    Path(String),
    /// Line and column in the source text.
    Position { line: usize, column: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.write_str(path),
            Self::Position { line, column } => write!(f, "line {line}, column {column}"),
        }
    }
}

/// A structural violation found while checking a document against its schema.
#[derive(Debug, Clone, Error)]
#[error("{location}: {message}")]
pub struct ValidationError {
    pub location: Location,
    pub message: String,
}

impl ValidationError {
    pub fn at_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: Location::Path(path.into()),
            message: message.into(),
        }
    }
}

/// Business-rule violations raised by the tour scheduler.
#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("employee {name} (id {employee_id}) is not available")]
    EmployeeUnavailable { employee_id: u32, name: String },

    #[error("employee {employee_id} is already assigned to another tour on {date}{}", hour_suffix(.hour))]
    Conflict {
        employee_id: u32,
        date: String,
        hour: Option<u32>,
        conflicting_tour: u32,
    },

    #[error("vehicle capacity exceeded: vehicle capacity ({capacity}) is insufficient for tour ({required} needed)")]
    CapacityExceeded { capacity: f64, required: f64 },
}

fn hour_suffix(hour: &Option<u32>) -> String {
    hour.map(|h| format!(" at hour {h:02}")).unwrap_or_default()
}

/// Errors related to schema definitions themselves (configuration, not data).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema not found: {0}")]
    NotFound(String),

    #[error("no schema can be inferred for collection '{0}'")]
    Uninferable(String),

    #[error("schema parse error in '{name}': {message}")]
    ParseError { name: String, message: String },
}
