//! Finite automata data model.
//!
//! This module provides:
//! - An epsilon-NFA generic over its state-set strategy, with memoized
//!   epsilon closures and the Thompson construction operators
//! - A DFA with read-only queries for viewers (dead states, graph export)
//! - String simulation with step traces

mod dfa;
mod nfa;
mod simulation;
mod state;
mod symbol;

pub use dfa::{Dfa, GraphEdge};
pub use nfa::{Nfa, NfaBuilder};
pub use simulation::{Outcome, Step, Trace};
pub use state::{BitStateSet, HashStateSet, StateId, StateSet, StateSetKind};
pub use symbol::{Alphabet, Label, Symbol};
