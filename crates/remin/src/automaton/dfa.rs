//! Deterministic Finite Automaton (DFA) implementation.

use crate::automaton::state::StateId;
use crate::automaton::symbol::Symbol;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ops::Range;

/// A labeled edge in the graph representation: (source, destination, label).
pub type GraphEdge = (StateId, StateId, String);

/// A Deterministic Finite Automaton.
///
/// States are numbered `0..num_states` and displayed as `q0`, `q1`, ...
/// Values are only mutated by the algorithms that build them; once returned
/// they are read-only.
#[derive(Debug, Clone)]
pub struct Dfa {
    /// Number of states
    num_states: StateId,
    start_state: StateId,
    /// Final (accepting) states
    accept_states: BTreeSet<StateId>,
    /// Transitions: (source, symbol) -> destination
    transitions: BTreeMap<(StateId, Symbol), StateId>,
    /// Reverse transitions: (destination, symbol) -> sources
    reverse_transitions: HashMap<(StateId, Symbol), Vec<StateId>>,
    /// All symbols, including ones that label no transition
    alphabet: BTreeSet<Symbol>,
    /// Mapping from DFA states to original NFA states (if created via subset construction)
    state_mapping: Option<HashMap<StateId, Vec<StateId>>>,
}

impl Dfa {
    /// Create a DFA without states over the given alphabet. The first state
    /// added becomes the start state.
    pub(crate) fn with_alphabet(alphabet: BTreeSet<Symbol>) -> Self {
        Self {
            num_states: 0,
            start_state: 0,
            accept_states: BTreeSet::new(),
            transitions: BTreeMap::new(),
            reverse_transitions: HashMap::new(),
            alphabet,
            state_mapping: None,
        }
    }

    /// Add a new state and return its ID.
    pub(crate) fn add_state(&mut self, accepting: bool) -> StateId {
        let id = self.num_states;
        self.num_states += 1;
        if accepting {
            self.accept_states.insert(id);
        }
        id
    }

    pub(crate) fn set_start_state(&mut self, state: StateId) {
        debug_assert!(state < self.num_states);
        self.start_state = state;
    }

    /// Add a transition. A second, different target for the same
    /// `(source, symbol)` pair would break determinism and is rejected.
    pub(crate) fn add_transition(
        &mut self,
        source: StateId,
        symbol: Symbol,
        destination: StateId,
    ) -> Result<()> {
        if source >= self.num_states || destination >= self.num_states {
            return Err(Error::InvariantViolation(format!(
                "transition {source} -{symbol:?}-> {destination} references a missing state"
            )));
        }
        if let Some(&existing) = self.transitions.get(&(source, symbol)) {
            if existing == destination {
                return Ok(());
            }
            return Err(Error::InvariantViolation(format!(
                "state {source} already moves to {existing} on {symbol:?}, not {destination}"
            )));
        }

        self.alphabet.insert(symbol);
        self.transitions.insert((source, symbol), destination);

        // Also update reverse transitions
        self.reverse_transitions
            .entry((destination, symbol))
            .or_default()
            .push(source);
        Ok(())
    }

    /// Set the state mapping from original NFA states.
    pub(crate) fn set_state_mapping(&mut self, mapping: HashMap<StateId, Vec<StateId>>) {
        self.state_mapping = Some(mapping);
    }

    /// Get the number of states.
    pub fn num_states(&self) -> StateId {
        self.num_states
    }

    /// All state ids, in ascending order.
    pub fn states(&self) -> Range<StateId> {
        0..self.num_states
    }

    /// Display name of a state.
    pub fn state_name(&self, state: StateId) -> String {
        format!("q{state}")
    }

    /// Get the start state.
    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    /// Get the final states.
    pub fn accept_states(&self) -> &BTreeSet<StateId> {
        &self.accept_states
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accept_states.contains(&state)
    }

    /// Get the alphabet.
    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        &self.alphabet
    }

    /// Get the transition from a state on a symbol.
    pub fn transition(&self, source: StateId, symbol: Symbol) -> Option<StateId> {
        self.transitions.get(&(source, symbol)).copied()
    }

    /// States that move to `destination` on `symbol`.
    pub fn predecessors(&self, destination: StateId, symbol: Symbol) -> &[StateId] {
        self.reverse_transitions
            .get(&(destination, symbol))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get all transitions as an iterator, ordered by source state then symbol.
    pub fn transitions(&self) -> impl Iterator<Item = (StateId, Symbol, StateId)> + '_ {
        self.transitions
            .iter()
            .map(|(&(src, sym), &dst)| (src, sym, dst))
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Get the state mapping.
    pub fn state_mapping(&self) -> Option<&HashMap<StateId, Vec<StateId>>> {
        self.state_mapping.as_ref()
    }

    /// Check whether every state has a transition on every alphabet symbol.
    pub fn is_complete(&self) -> bool {
        self.transitions.len() == self.num_states as usize * self.alphabet.len()
    }

    /// Non-accepting states from which no accepting state can be reached.
    ///
    /// Computed on every call by a backward reachability fixpoint seeded
    /// from the accept states.
    pub fn dead_states(&self) -> BTreeSet<StateId> {
        let mut live: BTreeSet<StateId> = self.accept_states.clone();
        let mut stack: Vec<StateId> = live.iter().copied().collect();

        while let Some(state) = stack.pop() {
            for &symbol in &self.alphabet {
                for &source in self.predecessors(state, symbol) {
                    if live.insert(source) {
                        stack.push(source);
                    }
                }
            }
        }

        self.states().filter(|state| !live.contains(state)).collect()
    }

    pub fn is_dead(&self, state: StateId) -> bool {
        self.dead_states().contains(&state)
    }

    /// Check if the DFA is empty (accepts no strings).
    pub fn is_empty(&self) -> bool {
        if self.accept_states.is_empty() {
            return true;
        }
        self.reachable_states()
            .iter()
            .all(|state| !self.accept_states.contains(state))
    }

    /// Find all states reachable from the start state.
    pub fn reachable_states(&self) -> BTreeSet<StateId> {
        let mut reachable = BTreeSet::new();
        if self.num_states == 0 {
            return reachable;
        }

        let mut queue = VecDeque::new();
        queue.push_back(self.start_state);

        while let Some(state) = queue.pop_front() {
            if !reachable.insert(state) {
                continue;
            }

            for &symbol in &self.alphabet {
                if let Some(next) = self.transition(state, symbol) {
                    if !reachable.contains(&next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        reachable
    }

    /// Convert to a graph representation (edges with labels).
    /// Returns: (nodes, edges) where edges are (src, dst, label). Symbols
    /// sharing a source and destination are merged into one comma-separated
    /// label.
    pub fn to_graph(&self) -> (Vec<StateId>, Vec<GraphEdge>) {
        let nodes: Vec<StateId> = self.states().collect();
        let mut merged: BTreeMap<(StateId, StateId), Vec<Symbol>> = BTreeMap::new();

        for (src, symbol, dst) in self.transitions() {
            merged.entry((src, dst)).or_default().push(symbol);
        }

        let edges = merged
            .into_iter()
            .map(|((src, dst), symbols)| {
                let label = symbols
                    .iter()
                    .map(|symbol| symbol.escape_debug().to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                (src, dst, label)
            })
            .collect();

        (nodes, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -a-> 1 -b-> 2 (final), 3 unreachable; no transitions out of 2.
    fn sample() -> Dfa {
        let mut dfa = Dfa::with_alphabet(BTreeSet::new());
        let s0 = dfa.add_state(false);
        let s1 = dfa.add_state(false);
        let s2 = dfa.add_state(true);
        let s3 = dfa.add_state(false);
        dfa.set_start_state(s0);
        dfa.add_transition(s0, 'a', s1).unwrap();
        dfa.add_transition(s1, 'b', s2).unwrap();
        dfa.add_transition(s3, 'a', s3).unwrap();
        dfa
    }

    #[test]
    fn test_dfa_basic() {
        let dfa = sample();
        assert_eq!(dfa.num_states(), 4);
        assert_eq!(dfa.start_state(), 0);
        assert_eq!(dfa.state_name(2), "q2");
        assert_eq!(dfa.transition(0, 'a'), Some(1));
        assert_eq!(dfa.transition(0, 'b'), None);
        assert_eq!(dfa.predecessors(2, 'b'), &[1]);
        assert_eq!(dfa.alphabet().iter().collect::<String>(), "ab");
        assert!(!dfa.is_empty());
        assert!(!dfa.is_complete());
    }

    #[test]
    fn test_determinism_enforced() {
        let mut dfa = sample();
        assert!(dfa.add_transition(0, 'a', 1).is_ok());
        assert!(matches!(
            dfa.add_transition(0, 'a', 2),
            Err(Error::InvariantViolation(_))
        ));
        assert!(dfa.add_transition(0, 'a', 9).is_err());
    }

    #[test]
    fn test_dead_states() {
        let dfa = sample();
        assert_eq!(dfa.dead_states(), BTreeSet::from([3]));
        assert!(dfa.is_dead(3));
        assert!(!dfa.is_dead(0));
    }

    #[test]
    fn test_reachable_states() {
        let dfa = sample();
        assert_eq!(dfa.reachable_states(), BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn test_empty_dfa() {
        let mut dfa = Dfa::with_alphabet(BTreeSet::from(['a']));
        let s0 = dfa.add_state(false);
        dfa.add_transition(s0, 'a', s0).unwrap();
        assert!(dfa.is_empty());
        assert!(dfa.is_complete());
        assert_eq!(dfa.dead_states(), BTreeSet::from([0]));

        // An accepting state that cannot be reached does not count.
        dfa.add_state(true);
        assert!(dfa.is_empty());
    }

    #[test]
    fn test_to_graph_merges_parallel_edges() {
        let mut dfa = Dfa::with_alphabet(BTreeSet::new());
        let s0 = dfa.add_state(false);
        let s1 = dfa.add_state(true);
        dfa.add_transition(s0, 'b', s1).unwrap();
        dfa.add_transition(s0, 'a', s1).unwrap();
        dfa.add_transition(s1, 'a', s1).unwrap();

        let (nodes, edges) = dfa.to_graph();
        assert_eq!(nodes, vec![0, 1]);
        assert_eq!(
            edges,
            vec![(0, 1, "a,b".to_string()), (1, 1, "a".to_string())]
        );
    }
}
