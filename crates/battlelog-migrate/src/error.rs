//! Engine error types
//!
//! Validation diagnostics and duplicate outcomes never show up here; they are
//! folded into [`crate::import::ImportResult`]. These errors are the fatal
//! ones that abort a whole call.

use battlelog_common::types::RecordKind;
use std::path::PathBuf;
use thiserror::Error;

use crate::db::DbError;
use crate::storage::DocumentError;

/// Payload could not be parsed at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("JSON payload must be an array of records")]
    NotAnArray,

    #[error("CSV payload is empty or has no header row")]
    EmptyCsv,

    #[error("Missing required CSV headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("Invalid CSV payload: {0}")]
    InvalidCsv(String),

    #[error("Cannot infer payload format from '{0}'. Expected a .json or .csv file")]
    UnknownFormat(String),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Failed to look up existing {} ids: {source}", .kind.table_name())]
    Lookup {
        kind: RecordKind,
        #[source]
        source: DbError,
    },
}

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Legacy document '{0}' not found")]
    MissingDocument(String),

    #[error(transparent)]
    Document(DocumentError),

    #[error("Legacy document '{name}' is malformed: {message}")]
    InvalidDocument { name: String, message: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl From<DocumentError> for MigrationError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Missing(name) => MigrationError::MissingDocument(name),
            other => MigrationError::Document(other),
        }
    }
}

pub type MigrationResult<T> = std::result::Result<T, MigrationError>;
