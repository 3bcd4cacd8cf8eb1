//! NFA "minimization" through the DFA pipeline.

use crate::automaton::{Nfa, StateSet};
use crate::error::Result;
use crate::minimizer::minimize;
use crate::subset_construction::subset_construction;
use log::debug;

/// Determinize `nfa`, minimize the result and re-express it as an NFA.
///
/// This is an approximation: the result is the minimal DFA viewed as an NFA,
/// with deterministic symbol edges and no epsilon edges. It is never larger
/// than the minimal DFA but can be larger than the smallest equivalent NFA.
pub fn minimize_nfa<S: StateSet>(nfa: &Nfa<S>, max_dfa_states: usize) -> Result<Nfa<S>> {
    let dfa = subset_construction(nfa, max_dfa_states)?;
    let minimal = minimize(&dfa)?;
    let result = Nfa::from_dfa(&minimal)?;
    debug!(
        "NFA minimization: {} states -> {} states",
        nfa.num_states(),
        result.num_states()
    );
    Ok(result)
}
