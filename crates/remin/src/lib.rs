//! Compile regular expressions into minimal deterministic finite automata.
//!
//! The pipeline follows the textbook route: Thompson's construction turns a
//! pattern into an ε-NFA, subset construction determinizes it, and Hopcroft's
//! partition refinement minimizes the result. [`RegexToDfaConverter`] drives
//! the whole pipeline; the individual stages are public for callers that
//! want to inspect intermediate automata.
//!
//! ```
//! use remin::RegexToDfaConverter;
//!
//! let converter = RegexToDfaConverter::default();
//! let dfa = converter.convert("(a|b)*abb").unwrap();
//! assert_eq!(dfa.num_states(), 4);
//! assert!(dfa.accepts("aabb"));
//! assert!(!dfa.accepts("ab"));
//! ```

pub mod automaton;
pub mod config;
pub mod converter;
pub mod error;
pub mod minimizer;
pub mod nfa_minimizer;
pub mod optimizer;
pub mod parser;
pub mod subset_construction;

#[cfg(test)]
mod testing;

pub use automaton::{
    Alphabet, BitStateSet, Dfa, GraphEdge, HashStateSet, Label, Nfa, NfaBuilder, Outcome,
    StateId, StateSet, StateSetKind, Step, Symbol, Trace,
};
pub use config::ConverterConfig;
pub use converter::RegexToDfaConverter;
pub use error::{Error, Result};
pub use minimizer::minimize;
pub use nfa_minimizer::minimize_nfa;
pub use optimizer::{RegexOptimizer, Shape};
pub use parser::RegexParser;
pub use subset_construction::subset_construction;
