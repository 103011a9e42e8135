//! Engine-wide configuration.
//!
//! Loading configuration from a file or environment belongs to the database
//! façade this crate stops short of (see spec §1); what lives here is just
//! the small set of knobs the core itself reads.

use crate::types::IsolationLevel;

/// Target tuples per `Next` chunk, absent any other guidance.
pub const DEFAULT_CHUNK_SUGGEST_SIZE: usize = 128;

/// Recognized engine options (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Suggested number of `(Tuple, RowId)` pairs per chunk. Operators may
    /// emit a smaller final chunk; this is a target, not a hard limit.
    pub chunk_suggest_size: usize,
    /// Isolation level new transactions are created under.
    pub isolation_level: IsolationLevel,
}

impl Config {
    /// Start from the defaults and override the chunk size.
    pub fn with_chunk_suggest_size(mut self, size: usize) -> Self {
        self.chunk_suggest_size = size;
        self
    }

    /// Start from the defaults and override the isolation level.
    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_suggest_size: DEFAULT_CHUNK_SUGGEST_SIZE,
            isolation_level: IsolationLevel::Snapshot,
        }
    }
}
