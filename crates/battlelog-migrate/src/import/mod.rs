//! Bulk import of deck masters, personal decks and battle logs
//!
//! - [`parse`]: JSON / CSV payloads into loosely typed records
//! - [`engine`]: dedup, validation and row writes
//! - [`id`]: id assignment for records that arrive without one

pub mod engine;
pub mod id;
pub mod parse;

pub use engine::{
    BatchImporter, ErrorDetails, ImportOptions, ImportResult, ImportSummary, RowError,
    DEFAULT_LOOKUP_CHUNK_SIZE,
};
pub use id::{IdGenerator, SequentialIdGenerator, TimestampIdGenerator};
pub use parse::{parse_payload, ParsedPayload, PayloadFormat, RecordOrigin};
