//! Error type shared by every stage of the pipeline.

use thiserror::Error;

/// Errors that can occur while compiling a pattern into an automaton.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The pattern is malformed. `offset` is the character offset at which
    /// the parser gave up.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// A fixed-capacity state set cannot hold the requested state.
    #[error("state capacity exceeded: requested {requested} states (capacity: {capacity})")]
    CapacityExceeded { capacity: usize, requested: usize },

    /// An automaton grew past its configured state ceiling: the NFA while
    /// parsing, or the DFA during subset construction.
    #[error("state limit exceeded: {states} states (max: {max})")]
    StateLimitExceeded { states: usize, max: usize },

    /// An internal invariant was broken. This is a bug, never a property of
    /// the input pattern.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            offset,
        }
    }

    /// Returns `true` for errors caused by the pattern text itself.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
