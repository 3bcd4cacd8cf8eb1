//! Running a DFA over an input string.

use crate::automaton::dfa::Dfa;
use crate::automaton::state::StateId;
use crate::automaton::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// One consumed symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub from: StateId,
    pub symbol: Symbol,
    pub to: StateId,
}

/// How a simulation ended. `position` is a character offset into the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The whole input was consumed and the final state accepts.
    Accepted,
    /// The whole input was consumed but the final state does not accept.
    Rejected { state: StateId },
    /// The symbol is not part of the DFA's alphabet.
    UnknownSymbol { position: usize, symbol: Symbol },
    /// The current state has no outgoing transition on the symbol.
    NoTransition {
        position: usize,
        state: StateId,
        symbol: Symbol,
    },
}

/// Record of a simulation, for step-by-step display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub steps: Vec<Step>,
    pub outcome: Outcome,
}

impl Trace {
    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }

    /// States visited, starting with the start state.
    pub fn states<'a>(&'a self, dfa: &Dfa) -> impl Iterator<Item = StateId> + 'a {
        std::iter::once(dfa.start_state()).chain(self.steps.iter().map(|step| step.to))
    }
}

impl Dfa {
    /// Consume `input` from the start state and report whether it ends in an
    /// accepting state.
    pub fn accepts(&self, input: &str) -> bool {
        let mut state = self.start_state();
        for symbol in input.chars() {
            match self.transition(state, symbol) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.is_accepting(state)
    }

    /// Like [`Dfa::accepts`], recording every step taken.
    pub fn trace(&self, input: &str) -> Trace {
        let mut steps = Vec::new();
        let mut state = self.start_state();

        for (position, symbol) in input.chars().enumerate() {
            if !self.alphabet().contains(&symbol) {
                return Trace {
                    steps,
                    outcome: Outcome::UnknownSymbol { position, symbol },
                };
            }
            let Some(next) = self.transition(state, symbol) else {
                return Trace {
                    steps,
                    outcome: Outcome::NoTransition {
                        position,
                        state,
                        symbol,
                    },
                };
            };
            steps.push(Step {
                from: state,
                symbol,
                to: next,
            });
            state = next;
        }

        let outcome = if self.is_accepting(state) {
            Outcome::Accepted
        } else {
            Outcome::Rejected { state }
        };
        Trace { steps, outcome }
    }
}
