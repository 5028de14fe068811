//! Error types shared by every xlgrid-core module.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlgridError>;

/// Which dimension of a write payload disagreed with its target range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Rows => f.write_str("rows"),
            Axis::Columns => f.write_str("columns"),
        }
    }
}

/// Coarse classification of a failure, used by the transport to pick an error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or inconsistent caller input.
    InvalidParams,
    /// No document exists at the requested path.
    NotFound,
    /// Anything the caller could not have prevented (I/O, corrupt package, ...).
    Internal,
}

#[derive(Debug, Error)]
pub enum XlgridError {
    #[error("Invalid range address format [{0}]. Expected format like \"A1:C10\"")]
    InvalidRange(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Range [{0}] ends before it starts")]
    ReversedRange(String),

    #[error(
        "Number of {axis} [{payload}] of 'data' argument is not equal to the number of {axis} of specified range [{range}]"
    )]
    ShapeMismatch {
        axis: Axis,
        payload: usize,
        range: usize,
    },

    #[error("'data' argument does not contain any value to write")]
    EmptyPayload,

    #[error("Formula [{0}] must start with '='")]
    InvalidFormula(String),

    #[error("Sheet {0} not found")]
    WorksheetNotFound(String),

    #[error("Sheet {0} already exists")]
    WorksheetAlreadyExists(String),

    #[error("Invalid sheet name [{0}]: must be 1-31 characters without any of : \\ / ? * [ ]")]
    InvalidSheetName(String),

    #[error("Workbook has no worksheets")]
    NoWorksheets,

    #[error("File [{0}] not found")]
    NotFound(String),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("{0}")]
    ParseError(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl XlgridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            XlgridError::InvalidRange(_)
            | XlgridError::InvalidCoordinate(_)
            | XlgridError::ReversedRange(_)
            | XlgridError::ShapeMismatch { .. }
            | XlgridError::EmptyPayload
            | XlgridError::InvalidFormula(_)
            | XlgridError::WorksheetNotFound(_)
            | XlgridError::WorksheetAlreadyExists(_)
            | XlgridError::InvalidSheetName(_)
            | XlgridError::NoWorksheets => ErrorKind::InvalidParams,
            XlgridError::NotFound(_) => ErrorKind::NotFound,
            XlgridError::InvalidFormat(_)
            | XlgridError::ParseError(_)
            | XlgridError::Task(_)
            | XlgridError::Io(_)
            | XlgridError::Zip(_) => ErrorKind::Internal,
        }
    }
}
