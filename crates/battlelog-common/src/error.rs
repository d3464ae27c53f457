//! Error types shared across the battlelog crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while interpreting shared domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    #[error("Unknown record kind: '{0}'. Expected one of: deck_masters, my_decks, battle_logs")]
    UnknownRecordKind(String),

    #[error("Invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}
