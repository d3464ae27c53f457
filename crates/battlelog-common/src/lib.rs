//! Battlelog Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the battlelog workspace.
//!
//! # Overview
//!
//! - **Types**: record kinds and the normalized row shapes for deck masters,
//!   personal decks and battle logs
//! - **Error Handling**: the common error type and result alias
//! - **Logging**: `tracing` subscriber bootstrap shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use battlelog_common::types::RecordKind;
//!
//! let kind: RecordKind = "battle_logs".parse().unwrap();
//! assert_eq!(kind.table_name(), "battle_logs");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
