//! Subset construction algorithm for converting ε-NFA to DFA.

use crate::automaton::{Dfa, Nfa, StateId, StateSet, Symbol};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, trace};
use std::collections::{HashMap, VecDeque};

/// Convert an epsilon-NFA to a complete DFA using the powerset construction.
///
/// DFA states are numbered in breadth-first discovery order, exploring
/// symbols in ascending order, so `q0` is always the closure of the NFA start
/// state. Once every reachable subset is known, missing transitions are sent
/// to a single non-accepting dead state (see [`complete_with_dead_state`]).
///
/// Fails with [`Error::StateLimitExceeded`] as soon as the DFA would need
/// more than `max_states` states, dead state included.
pub fn subset_construction<S: StateSet>(nfa: &Nfa<S>, max_states: usize) -> Result<Dfa> {
    let symbols: Vec<Symbol> = nfa.alphabet().iter().copied().collect();

    // Each DFA state corresponds to a set of NFA states, keyed by its sorted
    // member list so the key does not depend on the strategy.
    let mut state_mapping: IndexMap<Vec<StateId>, StateId> = IndexMap::new();
    let mut dfa = Dfa::with_alphabet(nfa.alphabet().clone());
    let mut queue: VecDeque<(StateId, S)> = VecDeque::new();

    let initial = nfa.initial_closure();
    let start = new_state(&mut dfa, nfa, &initial, max_states)?;
    dfa.set_start_state(start);
    state_mapping.insert(initial.to_vec(), start);
    queue.push_back((start, initial));

    while let Some((current, subset)) = queue.pop_front() {
        for &symbol in &symbols {
            let next = nfa.advance(&subset, symbol);
            if next.is_empty() {
                continue;
            }

            let key = next.to_vec();
            let target = match state_mapping.get(&key) {
                Some(&existing) => existing,
                None => {
                    let state = new_state(&mut dfa, nfa, &next, max_states)?;
                    trace!("q{state} = {key:?} (from q{current} on {symbol:?})");
                    state_mapping.insert(key, state);
                    queue.push_back((state, next));
                    state
                }
            };
            dfa.add_transition(current, symbol, target)?;
        }
    }

    let reachable = dfa.num_states();
    if !dfa.is_complete() {
        check_limit(reachable as usize + 1, max_states)?;
    }
    let dead = complete_with_dead_state(&mut dfa)?;

    // Store the DFA-to-NFA state mapping in the DFA for later use
    let mut inverse_mapping: HashMap<StateId, Vec<StateId>> = state_mapping
        .into_iter()
        .map(|(nfa_states, dfa_state)| (dfa_state, nfa_states))
        .collect();
    if let Some(dead) = dead {
        inverse_mapping.insert(dead, Vec::new());
    }
    dfa.set_state_mapping(inverse_mapping);

    debug!(
        "subset construction: {} NFA states -> {} DFA states ({} reachable subsets, dead state: {})",
        nfa.num_states(),
        dfa.num_states(),
        reachable,
        dead.is_some()
    );
    Ok(dfa)
}

fn new_state<S: StateSet>(
    dfa: &mut Dfa,
    nfa: &Nfa<S>,
    subset: &S,
    max_states: usize,
) -> Result<StateId> {
    check_limit(dfa.num_states() as usize + 1, max_states)?;
    Ok(dfa.add_state(subset.intersects(nfa.accept_states())))
}

fn check_limit(states: usize, max: usize) -> Result<()> {
    if states > max {
        return Err(Error::StateLimitExceeded { states, max });
    }
    Ok(())
}

/// Make the transition function total over the alphabet.
///
/// If some `(state, symbol)` pair has no transition, one non-accepting dead
/// state is added with a self-loop on every symbol, and every missing pair is
/// pointed at it. Returns the dead state, or `None` if the DFA was already
/// complete.
pub(crate) fn complete_with_dead_state(dfa: &mut Dfa) -> Result<Option<StateId>> {
    let symbols: Vec<Symbol> = dfa.alphabet().iter().copied().collect();
    let missing: Vec<(StateId, Symbol)> = dfa
        .states()
        .flat_map(|state| symbols.iter().map(move |&symbol| (state, symbol)))
        .filter(|&(state, symbol)| dfa.transition(state, symbol).is_none())
        .collect();

    if missing.is_empty() {
        return Ok(None);
    }

    let dead = dfa.add_state(false);
    for &symbol in &symbols {
        dfa.add_transition(dead, symbol, dead)?;
    }
    for (state, symbol) in missing {
        dfa.add_transition(state, symbol, dead)?;
    }
    Ok(Some(dead))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{BitStateSet, HashStateSet, NfaBuilder};
    use crate::testing::strings;

    fn ab_star_abb() -> Nfa {
        let a = Nfa::<HashStateSet>::symbol('a');
        let b = Nfa::symbol('b');
        a.union(&b)
            .unwrap()
            .star()
            .unwrap()
            .concat(&a)
            .unwrap()
            .concat(&b)
            .unwrap()
            .concat(&b)
            .unwrap()
    }

    #[test]
    fn test_subset_construction_basic() {
        // NFA: 0 -a-> 1, 0 -a-> 2, 1 -b-> 3(final), 2 -b-> 3(final)
        let mut builder = NfaBuilder::<HashStateSet>::new();
        for _ in 0..4 {
            builder.add_state().unwrap();
        }
        builder.add_transition(0, 'a', 1).unwrap();
        builder.add_transition(0, 'a', 2).unwrap();
        builder.add_transition(1, 'b', 3).unwrap();
        builder.add_transition(2, 'b', 3).unwrap();
        builder.set_start_state(0).unwrap();
        builder.add_accept_state(3).unwrap();
        let nfa = builder.build().unwrap();

        let dfa = subset_construction(&nfa, 100).unwrap();

        // {0}, {1,2}, {3}, dead
        assert_eq!(dfa.num_states(), 4);
        assert_eq!(dfa.start_state(), 0);
        assert_eq!(dfa.transition(0, 'a'), Some(1));
        assert_eq!(dfa.transition(1, 'b'), Some(2));
        assert_eq!(dfa.accept_states().iter().collect::<Vec<_>>(), vec![&2]);
        assert_eq!(dfa.dead_states().into_iter().collect::<Vec<_>>(), vec![3]);

        let mapping = dfa.state_mapping().unwrap();
        assert_eq!(mapping[&1], vec![1, 2]);
        assert!(mapping[&3].is_empty());
    }

    #[test]
    fn test_subset_construction_with_epsilon() {
        // NFA: 0 -ε-> 1 -a-> 2(final)
        let mut builder = NfaBuilder::<HashStateSet>::new();
        for _ in 0..3 {
            builder.add_state().unwrap();
        }
        builder.add_epsilon_transition(0, 1).unwrap();
        builder.add_transition(1, 'a', 2).unwrap();
        builder.set_start_state(0).unwrap();
        builder.add_accept_state(2).unwrap();
        let nfa = builder.build().unwrap();

        let dfa = subset_construction(&nfa, 100).unwrap();

        // Initial DFA state is {0, 1}, the epsilon closure of {0}
        assert_eq!(dfa.state_mapping().unwrap()[&0], vec![0, 1]);
        assert!(dfa.accepts("a"));
        assert!(!dfa.accepts(""));
        assert!(!dfa.accepts("aa"));
    }

    #[test]
    fn test_result_is_complete() {
        let dfa = subset_construction(&ab_star_abb(), 100).unwrap();
        assert!(dfa.is_complete());
        for state in dfa.states() {
            for &symbol in dfa.alphabet() {
                assert!(dfa.transition(state, symbol).is_some());
            }
        }
    }

    #[test]
    fn test_ab_star_abb_state_count() {
        let dfa = subset_construction(&ab_star_abb(), 100).unwrap();
        assert_eq!(dfa.num_states(), 5);
        assert_eq!(dfa.accept_states().len(), 1);
        assert!(dfa.accepts("abb"));
        assert!(dfa.accepts("aabb"));
        assert!(!dfa.accepts("ab"));
    }

    #[test]
    fn test_language_matches_nfa() {
        let nfa = ab_star_abb();
        let dfa = subset_construction(&nfa, 100).unwrap();
        for input in strings(&['a', 'b', 'c'], 6) {
            assert_eq!(dfa.accepts(&input), nfa.accepts(&input), "input {input:?}");
        }

        let dense: Nfa<BitStateSet> = nfa.to_strategy().unwrap();
        let dense_dfa = subset_construction(&dense, 100).unwrap();
        assert_eq!(dense_dfa.num_states(), dfa.num_states());
        assert_eq!(
            dense_dfa.transitions().collect::<Vec<_>>(),
            dfa.transitions().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_closure_fixpoint() {
        let nfa = ab_star_abb();
        let dfa = subset_construction(&nfa, 100).unwrap();
        for subset in dfa.state_mapping().unwrap().values() {
            let set: HashStateSet = subset.iter().copied().collect();
            assert_eq!(nfa.epsilon_closure(&set), set);
        }
    }

    #[test]
    fn test_empty_alphabet() {
        let dfa = subset_construction(&Nfa::<HashStateSet>::epsilon(), 100).unwrap();
        assert_eq!(dfa.num_states(), 1);
        assert!(dfa.alphabet().is_empty());
        assert!(dfa.is_accepting(0));
        assert!(dfa.accepts(""));

        let dfa = subset_construction(&Nfa::<HashStateSet>::empty(), 100).unwrap();
        assert_eq!(dfa.num_states(), 1);
        assert!(dfa.accept_states().is_empty());
    }

    #[test]
    fn test_state_limit() {
        let result = subset_construction(&ab_star_abb(), 3);
        assert_eq!(
            result.unwrap_err(),
            Error::StateLimitExceeded { states: 4, max: 3 }
        );

        // Four reachable subsets fit, the dead state does not.
        let a = Nfa::<HashStateSet>::symbol('a');
        let aab = a.concat(&a).unwrap().concat(&Nfa::symbol('b')).unwrap();
        assert!(matches!(
            subset_construction(&aab, 4),
            Err(Error::StateLimitExceeded { states: 5, max: 4 })
        ));
        assert_eq!(subset_construction(&aab, 5).unwrap().num_states(), 5);
    }

    #[test]
    fn test_complete_with_dead_state() {
        let mut dfa = Dfa::with_alphabet(['a', 'b'].into());
        let s0 = dfa.add_state(false);
        let s1 = dfa.add_state(true);
        dfa.add_transition(s0, 'a', s1).unwrap();

        let dead = complete_with_dead_state(&mut dfa).unwrap();
        assert_eq!(dead, Some(2));
        assert_eq!(dfa.transition(s0, 'b'), Some(2));
        assert_eq!(dfa.transition(s1, 'a'), Some(2));
        assert_eq!(dfa.transition(2, 'a'), Some(2));
        assert!(dfa.is_complete());

        assert_eq!(complete_with_dead_state(&mut dfa).unwrap(), None);
    }
}
