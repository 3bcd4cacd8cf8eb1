//! Epsilon Non-deterministic Finite Automaton (ε-NFA) implementation.
//!
//! An [`Nfa`] is built either through an [`NfaBuilder`] or from the leaf
//! constructors and structural operators used by Thompson's construction.
//! Operators never touch their operands: each one allocates a fresh automaton
//! and copies the operands into it with renumbered states, so the same
//! sub-automaton can be reused any number of times.

use crate::automaton::dfa::Dfa;
use crate::automaton::state::{HashStateSet, StateId, StateSet};
use crate::automaton::symbol::{Label, Symbol};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// An Epsilon Non-deterministic Finite Automaton, generic over the state-set
/// strategy used for targets, accept states and closures.
///
/// Epsilon closures are memoized per instance, keyed by the input set. The
/// memo uses interior mutability, so an `Nfa` must not be shared across
/// threads without external synchronization.
#[derive(Debug, Clone)]
pub struct Nfa<S: StateSet = HashStateSet> {
    /// Number of states (states are numbered 0..num_states)
    num_states: StateId,
    start_state: StateId,
    /// Final (accepting) states
    accept_states: S,
    /// Symbol transitions, per source state: symbol -> destinations
    transitions: Vec<IndexMap<Symbol, S>>,
    /// Epsilon transitions, per source state
    epsilon_transitions: Vec<S>,
    /// All symbols used (excluding epsilon)
    alphabet: BTreeSet<Symbol>,
    /// Memoized epsilon closures, keyed by the input set
    closure_cache: RefCell<HashMap<S, S>>,
}

/// Where an embedded operand landed inside a new automaton.
struct Embedded {
    start: StateId,
    accepts: Vec<StateId>,
}

impl<S: StateSet> Nfa<S> {
    fn blank() -> Self {
        Self {
            num_states: 0,
            start_state: 0,
            accept_states: S::default(),
            transitions: Vec::new(),
            epsilon_transitions: Vec::new(),
            alphabet: BTreeSet::new(),
            closure_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Leaf constructors allocate at most two states, well inside every
    /// strategy's capacity.
    fn push_state(&mut self) -> StateId {
        let id = self.num_states;
        self.num_states += 1;
        self.transitions.push(IndexMap::new());
        self.epsilon_transitions.push(S::default());
        id
    }

    fn add_state(&mut self) -> Result<StateId> {
        S::check_capacity(self.num_states as usize + 1)?;
        Ok(self.push_state())
    }

    fn check_state(&self, state: StateId) -> Result<()> {
        if state < self.num_states {
            Ok(())
        } else {
            Err(Error::InvariantViolation(format!(
                "state {state} does not exist (automaton has {} states)",
                self.num_states
            )))
        }
    }

    /// Add a transition from source to destination on the given label.
    fn add_transition(&mut self, source: StateId, label: Label, destination: StateId) -> Result<()> {
        self.check_state(source)?;
        self.check_state(destination)?;

        let capacity = self.num_states as usize;
        let targets = match label {
            Label::Epsilon => &mut self.epsilon_transitions[source as usize],
            Label::Symbol(symbol) => {
                self.alphabet.insert(symbol);
                self.transitions[source as usize]
                    .entry(symbol)
                    .or_insert_with(|| S::with_capacity(capacity))
            }
        };
        targets.insert(destination);

        // Invalidate cached epsilon closures
        self.closure_cache.get_mut().clear();
        Ok(())
    }

    /// Copy `other` into `self` with every state id shifted past the states
    /// already present.
    fn embed(&mut self, other: &Nfa<S>) -> Result<Embedded> {
        S::check_capacity(self.num_states as usize + other.num_states as usize)?;
        let offset = self.num_states;
        for _ in 0..other.num_states {
            self.push_state();
        }
        for (source, label, destination) in other.transitions() {
            self.add_transition(source + offset, label, destination + offset)?;
        }
        // Keep the operand's alphabet even for symbols without edges.
        self.alphabet.extend(other.alphabet.iter().copied());
        Ok(Embedded {
            start: other.start_state + offset,
            accepts: other.accept_states.iter().map(|s| s + offset).collect(),
        })
    }

    /// An automaton accepting exactly the one-symbol string `symbol`.
    pub fn symbol(symbol: Symbol) -> Self {
        Self::one_of([symbol])
    }

    /// An automaton accepting any single symbol from `symbols`: two states
    /// joined by one edge per symbol. With no symbols the language is empty.
    pub fn one_of(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut nfa = Self::blank();
        let start = nfa.push_state();
        let accept = nfa.push_state();
        nfa.start_state = start;
        nfa.accept_states = S::singleton(accept, 2);
        let targets = S::singleton(accept, 2);
        for symbol in symbols {
            nfa.alphabet.insert(symbol);
            nfa.transitions[start as usize].insert(symbol, targets.clone());
        }
        nfa
    }

    /// An automaton accepting only the empty string.
    pub fn epsilon() -> Self {
        let mut nfa = Self::blank();
        let start = nfa.push_state();
        nfa.start_state = start;
        nfa.accept_states = S::singleton(start, 1);
        nfa
    }

    /// An automaton accepting nothing.
    pub fn empty() -> Self {
        let mut nfa = Self::blank();
        nfa.start_state = nfa.push_state();
        nfa
    }

    /// `self | other`: a fresh start forks into both operands, and both
    /// operands' accept states join a fresh accept state.
    pub fn union(&self, other: &Self) -> Result<Self> {
        let mut nfa = Self::blank();
        let start = nfa.add_state()?;
        let left = nfa.embed(self)?;
        let right = nfa.embed(other)?;
        let accept = nfa.add_state()?;

        nfa.add_transition(start, Label::Epsilon, left.start)?;
        nfa.add_transition(start, Label::Epsilon, right.start)?;
        for &state in left.accepts.iter().chain(&right.accepts) {
            nfa.add_transition(state, Label::Epsilon, accept)?;
        }
        Ok(nfa.finish(start, [accept]))
    }

    /// `self · other`: the accept states of `self` lead into the start of
    /// `other`.
    pub fn concat(&self, other: &Self) -> Result<Self> {
        let mut nfa = Self::blank();
        let left = nfa.embed(self)?;
        let right = nfa.embed(other)?;
        for &state in &left.accepts {
            nfa.add_transition(state, Label::Epsilon, right.start)?;
        }
        Ok(nfa.finish(left.start, right.accepts))
    }

    /// `self*`: enter, skip, repeat and exit edges around a copy of `self`.
    pub fn star(&self) -> Result<Self> {
        let mut nfa = Self::blank();
        let start = nfa.add_state()?;
        let inner = nfa.embed(self)?;
        let accept = nfa.add_state()?;

        nfa.add_transition(start, Label::Epsilon, inner.start)?;
        nfa.add_transition(start, Label::Epsilon, accept)?;
        for &state in &inner.accepts {
            nfa.add_transition(state, Label::Epsilon, inner.start)?;
            nfa.add_transition(state, Label::Epsilon, accept)?;
        }
        Ok(nfa.finish(start, [accept]))
    }

    /// `self+`, built as `self · self*`. Both halves copy the operand.
    pub fn plus(&self) -> Result<Self> {
        self.concat(&self.star()?)
    }

    /// `self?`: like `star` without the repeat edge.
    pub fn optional(&self) -> Result<Self> {
        let mut nfa = Self::blank();
        let start = nfa.add_state()?;
        let inner = nfa.embed(self)?;
        let accept = nfa.add_state()?;

        nfa.add_transition(start, Label::Epsilon, inner.start)?;
        nfa.add_transition(start, Label::Epsilon, accept)?;
        for &state in &inner.accepts {
            nfa.add_transition(state, Label::Epsilon, accept)?;
        }
        Ok(nfa.finish(start, [accept]))
    }

    fn finish(mut self, start: StateId, accepts: impl IntoIterator<Item = StateId>) -> Self {
        let capacity = self.num_states as usize;
        self.start_state = start;
        self.accept_states = S::with_capacity(capacity);
        for state in accepts {
            self.accept_states.insert(state);
        }
        self
    }

    /// Re-express a DFA as an NFA with the same states, deterministic symbol
    /// edges and no epsilon edges.
    pub fn from_dfa(dfa: &Dfa) -> Result<Self> {
        S::check_capacity(dfa.num_states() as usize)?;
        let mut nfa = Self::blank();
        for _ in dfa.states() {
            nfa.push_state();
        }
        nfa.alphabet.extend(dfa.alphabet().iter().copied());
        for (source, symbol, destination) in dfa.transitions() {
            nfa.add_transition(source, Label::Symbol(symbol), destination)?;
        }
        let accepts = dfa.accept_states().iter().copied();
        Ok(nfa.finish(dfa.start_state(), accepts))
    }

    /// Copy this automaton into another state-set strategy.
    pub fn to_strategy<T: StateSet>(&self) -> Result<Nfa<T>> {
        T::check_capacity(self.num_states as usize)?;
        let mut nfa = Nfa::<T>::blank();
        for _ in 0..self.num_states {
            nfa.push_state();
        }
        nfa.alphabet = self.alphabet.clone();
        for (source, label, destination) in self.transitions() {
            nfa.add_transition(source, label, destination)?;
        }
        Ok(nfa.finish(self.start_state, self.accept_states.iter()))
    }

    /// Get the number of states.
    pub fn num_states(&self) -> StateId {
        self.num_states
    }

    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    /// Get the final states.
    pub fn accept_states(&self) -> &S {
        &self.accept_states
    }

    /// Get the alphabet (all symbols except epsilon).
    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        &self.alphabet
    }

    /// Destinations of `state` on `label`, if any.
    pub fn targets(&self, state: StateId, label: Label) -> Option<&S> {
        match label {
            Label::Epsilon => self
                .epsilon_transitions
                .get(state as usize)
                .filter(|targets| !targets.is_empty()),
            Label::Symbol(symbol) => self.transitions.get(state as usize)?.get(&symbol),
        }
    }

    /// Get all transitions as an iterator, epsilon edges included.
    pub fn transitions(&self) -> impl Iterator<Item = (StateId, Label, StateId)> + '_ {
        let symbol_edges = self.transitions.iter().enumerate().flat_map(|(src, edges)| {
            edges.iter().flat_map(move |(&symbol, dests)| {
                dests
                    .iter()
                    .map(move |dst| (src as StateId, Label::Symbol(symbol), dst))
            })
        });
        let epsilon_edges = self
            .epsilon_transitions
            .iter()
            .enumerate()
            .flat_map(|(src, dests)| dests.iter().map(move |dst| (src as StateId, Label::Epsilon, dst)));
        symbol_edges.chain(epsilon_edges)
    }

    pub fn num_transitions(&self) -> usize {
        let symbol_edges: usize = self
            .transitions
            .iter()
            .flat_map(|edges| edges.values())
            .map(|targets| targets.len())
            .sum();
        let epsilon_edges: usize = self
            .epsilon_transitions
            .iter()
            .map(|targets| targets.len())
            .sum();
        symbol_edges + epsilon_edges
    }

    /// Get the epsilon closure of a set of states: every state reachable
    /// through zero or more epsilon edges.
    pub fn epsilon_closure(&self, states: &S) -> S {
        let cached = self.closure_cache.borrow().get(states).cloned();
        if let Some(closure) = cached {
            return closure;
        }

        let mut closure = S::with_capacity(self.num_states as usize);
        let mut stack: Vec<StateId> = states.iter().collect();

        while let Some(s) = stack.pop() {
            if !closure.insert(s) {
                continue;
            }

            // Follow epsilon transitions
            if let Some(destinations) = self.epsilon_transitions.get(s as usize) {
                stack.extend(destinations.iter().filter(|&dest| !closure.contains(dest)));
            }
        }

        self.closure_cache
            .borrow_mut()
            .insert(states.clone(), closure.clone());
        closure
    }

    /// The epsilon closure of the start state.
    pub fn initial_closure(&self) -> S {
        self.epsilon_closure(&S::singleton(self.start_state, self.num_states as usize))
    }

    /// Get the states reachable from a set of states on a given symbol,
    /// without following epsilon edges.
    pub fn move_on_symbol(&self, states: &S, symbol: Symbol) -> S {
        let mut reached = S::with_capacity(self.num_states as usize);

        for state in states.iter() {
            if let Some(destinations) = self.targets(state, Label::Symbol(symbol)) {
                reached.union_with(destinations);
            }
        }

        reached
    }

    /// One simulation step: `epsilon_closure(move_on_symbol(states, symbol))`.
    pub fn advance(&self, states: &S, symbol: Symbol) -> S {
        self.epsilon_closure(&self.move_on_symbol(states, symbol))
    }

    /// Run the automaton directly on `input`, tracking the set of active
    /// states.
    pub fn accepts(&self, input: &str) -> bool {
        let mut current = self.initial_closure();
        for symbol in input.chars() {
            current = self.advance(&current, symbol);
            if current.is_empty() {
                return false;
            }
        }
        current.intersects(&self.accept_states)
    }

    /// Check if the NFA accepts any string (i.e., if the language is non-empty).
    /// Uses BFS from the start state following all transitions.
    pub fn is_empty(&self) -> bool {
        let mut visited = S::with_capacity(self.num_states as usize);
        let mut queue: VecDeque<StateId> = VecDeque::new();
        queue.push_back(self.start_state);

        while let Some(state) = queue.pop_front() {
            if !visited.insert(state) {
                continue;
            }

            // Check if we reached a final state
            if self.accept_states.contains(state) {
                return false;
            }

            for destinations in self.transitions[state as usize]
                .values()
                .chain(std::iter::once(&self.epsilon_transitions[state as usize]))
            {
                queue.extend(destinations.iter().filter(|&dest| !visited.contains(dest)));
            }
        }

        true
    }

    /// Convert to an ordered map representation for debugging and display.
    /// Targets are sorted; epsilon edges come first for each state.
    pub fn to_transition_map(&self) -> IndexMap<StateId, IndexMap<Label, Vec<StateId>>> {
        let mut map: IndexMap<StateId, IndexMap<Label, Vec<StateId>>> = IndexMap::new();

        for state in 0..self.num_states {
            let mut edges = IndexMap::new();
            let epsilon = &self.epsilon_transitions[state as usize];
            if !epsilon.is_empty() {
                edges.insert(Label::Epsilon, epsilon.to_vec());
            }
            let mut symbols: Vec<_> = self.transitions[state as usize].iter().collect();
            symbols.sort_unstable_by_key(|(symbol, _)| **symbol);
            for (&symbol, dests) in symbols {
                edges.insert(Label::Symbol(symbol), dests.to_vec());
            }
            if !edges.is_empty() {
                map.insert(state, edges);
            }
        }

        map
    }
}

/// Incremental construction of an [`Nfa`] with explicit states and edges.
#[derive(Debug, Clone)]
pub struct NfaBuilder<S: StateSet = HashStateSet> {
    nfa: Nfa<S>,
    start_state: Option<StateId>,
}

impl<S: StateSet> NfaBuilder<S> {
    pub fn new() -> Self {
        Self {
            nfa: Nfa::blank(),
            start_state: None,
        }
    }

    /// Allocate a new state. Ids are handed out in increasing order from 0.
    pub fn add_state(&mut self) -> Result<StateId> {
        self.nfa.add_state()
    }

    /// Add a transition from source to destination on a symbol or epsilon.
    pub fn add_transition(
        &mut self,
        source: StateId,
        label: impl Into<Label>,
        destination: StateId,
    ) -> Result<()> {
        self.nfa.add_transition(source, label.into(), destination)
    }

    /// Add an epsilon transition from source to destination.
    pub fn add_epsilon_transition(&mut self, source: StateId, destination: StateId) -> Result<()> {
        self.nfa.add_transition(source, Label::Epsilon, destination)
    }

    pub fn set_start_state(&mut self, state: StateId) -> Result<()> {
        self.nfa.check_state(state)?;
        self.start_state = Some(state);
        Ok(())
    }

    /// Add a final (accepting) state.
    pub fn add_accept_state(&mut self, state: StateId) -> Result<()> {
        self.nfa.check_state(state)?;
        self.nfa.accept_states.insert(state);
        Ok(())
    }

    pub fn build(mut self) -> Result<Nfa<S>> {
        let start = self
            .start_state
            .ok_or_else(|| Error::InvariantViolation("NFA has no start state".to_string()))?;
        self.nfa.start_state = start;
        Ok(self.nfa)
    }
}

impl<S: StateSet> Default for NfaBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::state::BitStateSet;

    fn set<S: StateSet>(states: &[StateId]) -> S {
        let mut set = S::with_capacity(16);
        for &state in states {
            set.insert(state);
        }
        set
    }

    #[test]
    fn test_epsilon_nfa_basic() {
        // 0 -a-> 1 -ε-> 2 (final)
        let mut builder = NfaBuilder::<HashStateSet>::new();
        for _ in 0..3 {
            builder.add_state().unwrap();
        }
        builder.add_transition(0, 'a', 1).unwrap();
        builder.add_epsilon_transition(1, 2).unwrap();
        builder.set_start_state(0).unwrap();
        builder.add_accept_state(2).unwrap();
        let nfa = builder.build().unwrap();

        assert_eq!(nfa.num_states(), 3);
        assert_eq!(nfa.num_transitions(), 2);
        assert!(!nfa.is_empty());
        assert!(nfa.accepts("a"));
        assert!(!nfa.accepts(""));
        assert!(!nfa.accepts("aa"));
    }

    #[test]
    fn test_builder_rejects_unknown_states() {
        let mut builder = NfaBuilder::<HashStateSet>::new();
        let state = builder.add_state().unwrap();
        assert!(matches!(
            builder.add_transition(state, 'a', 7),
            Err(Error::InvariantViolation(_))
        ));
        assert!(builder.add_accept_state(3).is_err());

        let builder = NfaBuilder::<HashStateSet>::new();
        assert!(matches!(builder.build(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_epsilon_closure() {
        // 0 -ε-> 1 -ε-> 2, 2 -ε-> 0
        let mut builder = NfaBuilder::<BitStateSet>::new();
        for _ in 0..4 {
            builder.add_state().unwrap();
        }
        builder.add_epsilon_transition(0, 1).unwrap();
        builder.add_epsilon_transition(1, 2).unwrap();
        builder.add_epsilon_transition(2, 0).unwrap();
        builder.set_start_state(0).unwrap();
        let nfa = builder.build().unwrap();

        let closure = nfa.epsilon_closure(&set(&[0]));
        assert_eq!(closure.to_vec(), vec![0, 1, 2]);
        assert_eq!(nfa.epsilon_closure(&closure), closure);
        assert_eq!(nfa.epsilon_closure(&set(&[3])).to_vec(), vec![3]);
    }

    #[test]
    fn test_closure_cache_invalidated_by_new_transition() {
        let mut nfa = Nfa::<HashStateSet>::epsilon().concat(&Nfa::epsilon()).unwrap();
        let start = set(&[nfa.start_state()]);
        let before = nfa.epsilon_closure(&start);
        assert_eq!(nfa.closure_cache.borrow().len(), 1);

        let extra = nfa.add_state().unwrap();
        nfa.add_transition(nfa.start_state(), Label::Epsilon, extra).unwrap();
        assert!(nfa.closure_cache.borrow().is_empty());

        let after = nfa.epsilon_closure(&start);
        assert!(!before.contains(extra));
        assert!(after.contains(extra));
    }

    #[test]
    fn test_move_on_symbol() {
        // 0 -a-> 1, 0 -a-> 2, 1 -ε-> 3
        let mut builder = NfaBuilder::<HashStateSet>::new();
        for _ in 0..4 {
            builder.add_state().unwrap();
        }
        builder.add_transition(0, 'a', 1).unwrap();
        builder.add_transition(0, 'a', 2).unwrap();
        builder.add_epsilon_transition(1, 3).unwrap();
        builder.set_start_state(0).unwrap();
        let nfa = builder.build().unwrap();

        let start = set(&[0]);
        assert_eq!(nfa.move_on_symbol(&start, 'a').to_vec(), vec![1, 2]);
        assert_eq!(nfa.advance(&start, 'a').to_vec(), vec![1, 2, 3]);
        assert!(nfa.move_on_symbol(&start, 'b').is_empty());
    }

    #[test]
    fn test_leaf_constructors() {
        let a = Nfa::<HashStateSet>::symbol('a');
        assert_eq!(a.num_states(), 2);
        assert!(a.accepts("a"));
        assert!(!a.accepts(""));

        let eps = Nfa::<HashStateSet>::epsilon();
        assert!(eps.accepts(""));
        assert!(!eps.accepts("a"));
        assert!(eps.alphabet().is_empty());

        let empty = Nfa::<HashStateSet>::empty();
        assert!(empty.is_empty());
        assert!(!empty.accepts(""));

        let digits = Nfa::<HashStateSet>::one_of('0'..='9');
        assert_eq!(digits.num_states(), 2);
        assert_eq!(digits.alphabet().len(), 10);
        assert!(digits.accepts("7"));
        assert!(!digits.accepts("77"));
    }

    #[test]
    fn test_operators_do_not_mutate_operands() {
        let a = Nfa::<HashStateSet>::symbol('a');
        let b = Nfa::<HashStateSet>::symbol('b');
        let before = a.to_transition_map();

        let union = a.union(&b).unwrap();
        let concat = a.concat(&b).unwrap();
        let star = a.star().unwrap();
        let plus = a.plus().unwrap();
        let optional = a.optional().unwrap();

        assert_eq!(a.to_transition_map(), before);
        assert_eq!(a.num_states(), 2);

        assert_eq!(union.num_states(), 6);
        assert_eq!(concat.num_states(), 4);
        assert_eq!(star.num_states(), 4);
        assert_eq!(plus.num_states(), 6);
        assert_eq!(optional.num_states(), 4);
    }

    #[test]
    fn test_operator_languages() {
        let a = Nfa::<BitStateSet>::symbol('a');
        let b = Nfa::<BitStateSet>::symbol('b');

        let union = a.union(&b).unwrap();
        assert!(union.accepts("a") && union.accepts("b"));
        assert!(!union.accepts("ab") && !union.accepts(""));

        let concat = a.concat(&b).unwrap();
        assert!(concat.accepts("ab"));
        assert!(!concat.accepts("a") && !concat.accepts("ba"));

        let star = a.star().unwrap();
        assert!(star.accepts("") && star.accepts("a") && star.accepts("aaaa"));
        assert!(!star.accepts("b"));

        let plus = a.plus().unwrap();
        assert!(!plus.accepts(""));
        assert!(plus.accepts("a") && plus.accepts("aaa"));

        let optional = a.optional().unwrap();
        assert!(optional.accepts("") && optional.accepts("a"));
        assert!(!optional.accepts("aa"));

        let empty_union = Nfa::<BitStateSet>::empty().union(&a).unwrap();
        assert!(empty_union.accepts("a"));
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut builder = NfaBuilder::<BitStateSet>::new();
        for _ in 0..BitStateSet::CAPACITY {
            builder.add_state().unwrap();
        }
        assert_eq!(
            builder.add_state(),
            Err(Error::CapacityExceeded {
                capacity: BitStateSet::CAPACITY,
                requested: BitStateSet::CAPACITY + 1,
            })
        );
    }

    #[test]
    fn test_to_strategy_preserves_language() {
        let ab = Nfa::<HashStateSet>::symbol('a')
            .union(&Nfa::symbol('b'))
            .unwrap()
            .star()
            .unwrap();
        let dense: Nfa<BitStateSet> = ab.to_strategy().unwrap();
        assert_eq!(dense.num_states(), ab.num_states());
        assert_eq!(dense.num_transitions(), ab.num_transitions());
        for input in ["", "a", "abba", "c", "abc"] {
            assert_eq!(dense.accepts(input), ab.accepts(input), "input {input:?}");
        }
    }

    #[test]
    fn test_to_transition_map() {
        let nfa = Nfa::<HashStateSet>::symbol('a').star().unwrap();
        let map = nfa.to_transition_map();
        // star start (0) forks into the operand (1) and the exit (3)
        assert_eq!(map[&0][&Label::Epsilon], vec![1, 3]);
        assert_eq!(map[&1][&Label::Symbol('a')], vec![2]);
        assert_eq!(map[&2][&Label::Epsilon], vec![1, 3]);
        assert!(!map.contains_key(&3));
    }
}
