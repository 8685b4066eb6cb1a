//! Error types for the reconciliation engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Domain errors raised by the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The entity has no fact under any configured alias tag
    #[error("Missing tag data for {symbol}: no facts under any of {alias_count} alias tags")]
    MissingTagData { symbol: String, alias_count: usize },

    /// A raw fact lacks a field a strategy needs (skipped, never fatal to a run)
    #[error("Malformed record ({tag}): {reason}")]
    MalformedRecord { tag: String, reason: String },

    /// Year range is empty or inverted
    #[error("Invalid year range: [{start_year}, {end_year})")]
    InvalidYearRange { start_year: i32, end_year: i32 },

    /// Frame label outside the CY{yyyy} / CY{yyyy}Q{n} vocabulary
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl EngineError {
    /// Whether the caller should skip the entity rather than treat this as a bug
    pub fn is_skip(&self) -> bool {
        matches!(self, EngineError::MissingTagData { .. })
    }
}
