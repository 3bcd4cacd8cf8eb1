//! Helpers shared by the unit tests.

use crate::automaton::{Dfa, StateId};

/// All strings over `symbols` up to `max_len` characters, shortest first.
pub(crate) fn strings(symbols: &[char], max_len: usize) -> Vec<String> {
    let mut all = vec![String::new()];
    let mut frontier = vec![String::new()];
    for _ in 0..max_len {
        frontier = frontier
            .iter()
            .flat_map(|prefix| {
                symbols.iter().map(move |&c| {
                    let mut s = prefix.clone();
                    s.push(c);
                    s
                })
            })
            .collect();
        all.extend(frontier.iter().cloned());
    }
    all
}

/// Run `dfa` from `state` instead of the start state.
pub(crate) fn accepts_from(dfa: &Dfa, mut state: StateId, input: &str) -> bool {
    for symbol in input.chars() {
        match dfa.transition(state, symbol) {
            Some(next) => state = next,
            None => return false,
        }
    }
    dfa.is_accepting(state)
}

/// Check that no two states of `dfa` accept the same strings up to
/// `max_len` characters over its alphabet.
pub(crate) fn assert_distinguishable(dfa: &Dfa, max_len: usize) {
    let symbols: Vec<char> = dfa.alphabet().iter().copied().collect();
    let inputs = strings(&symbols, max_len);
    for p in dfa.states() {
        for q in dfa.states().filter(|&q| q > p) {
            assert!(
                inputs
                    .iter()
                    .any(|input| accepts_from(dfa, p, input) != accepts_from(dfa, q, input)),
                "states q{p} and q{q} are equivalent up to length {max_len}"
            );
        }
    }
}
