//! Converter configuration.

use crate::automaton::{Alphabet, StateSetKind};
use serde::{Deserialize, Serialize};

/// Configuration for [`crate::RegexToDfaConverter`] and the stages it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum DFA states subset construction may create.
    pub max_dfa_states: usize,

    /// Maximum NFA states the parser may allocate. Every `+` copies its
    /// operand twice, so repeated quantifiers grow the NFA exponentially.
    pub max_nfa_states: usize,

    /// Maximum parenthesis nesting accepted by the parser. The parser
    /// recurses once per level, so this also bounds its stack use.
    pub max_nesting_depth: usize,

    /// Maximum number of symbols a single bracket class may expand to.
    pub max_class_size: usize,

    /// Symbols matched by `.`.
    pub dot_alphabet: Alphabet,

    /// Estimated NFA size above which bit-set state sets are used.
    pub bitset_threshold: usize,

    /// Force a state-set strategy instead of estimating one.
    pub strategy: Option<StateSetKind>,

    /// Let the optimizer build DFAs for recognized pattern shapes directly.
    pub enable_fast_paths: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_dfa_states: 10_000,
            max_nfa_states: 100_000,
            max_nesting_depth: 64,
            max_class_size: 4096,
            dot_alphabet: Alphabet::default(),
            bitset_threshold: 64,
            strategy: None,
            enable_fast_paths: true,
        }
    }
}
