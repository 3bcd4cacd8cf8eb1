//! State identifiers and the pluggable state-set strategies.
//!
//! Every algorithm in the crate is written once against [`StateSet`]. Two
//! strategies implement it: [`HashStateSet`] for small or sparse automata and
//! [`BitStateSet`], a fixed-capacity bit vector, for larger ones.

use crate::error::{Error, Result};
use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A state identifier represented as a u32.
pub type StateId = u32;

/// A set of automaton states.
///
/// Equality and hashing are by membership only, so two sets holding the same
/// states compare equal whatever capacity they were created with.
pub trait StateSet: Clone + Default + Eq + Hash + fmt::Debug {
    /// Which strategy this is.
    const KIND: StateSetKind;

    /// Largest number of distinct states the strategy can represent, if
    /// bounded.
    const MAX_STATES: Option<usize>;

    /// Create a new empty state set sized for `capacity` states.
    fn with_capacity(capacity: usize) -> Self;

    /// Insert a state, returning `true` if it was not present.
    fn insert(&mut self, state: StateId) -> bool;

    fn contains(&self, state: StateId) -> bool;

    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;

    /// Iterate over the states in the set. The order is unspecified.
    fn iter(&self) -> impl Iterator<Item = StateId> + '_;

    /// Union this set with another, modifying self in place.
    fn union_with(&mut self, other: &Self);

    /// Check if this set shares at least one state with another.
    fn intersects(&self, other: &Self) -> bool;

    /// Create a state set containing a single state.
    fn singleton(state: StateId, capacity: usize) -> Self {
        let mut set = Self::with_capacity(capacity);
        set.insert(state);
        set
    }

    /// Canonical sorted representation, usable as a map key across
    /// strategies.
    fn to_vec(&self) -> Vec<StateId> {
        let mut states: Vec<StateId> = self.iter().collect();
        states.sort_unstable();
        states
    }

    /// Fail with [`Error::CapacityExceeded`] if `requested` states cannot be
    /// represented by this strategy.
    fn check_capacity(requested: usize) -> Result<()> {
        match Self::MAX_STATES {
            Some(capacity) if requested > capacity => {
                Err(Error::CapacityExceeded { capacity, requested })
            }
            _ => Ok(()),
        }
    }
}

/// Identifies a [`StateSet`] implementation at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSetKind {
    Hash,
    Bit,
}

impl StateSetKind {
    /// Pick a strategy for an automaton expected to hold `estimated_states`
    /// states. Bit vectors win once the automaton is dense enough for whole
    /// word operations to pay off, as long as it fits their fixed capacity.
    pub fn for_estimate(estimated_states: usize, bitset_threshold: usize) -> Self {
        let fits = BitStateSet::MAX_STATES.is_none_or(|max| estimated_states <= max);
        if estimated_states > bitset_threshold && fits {
            StateSetKind::Bit
        } else {
            StateSetKind::Hash
        }
    }
}

/// A state set backed by a hash set.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HashStateSet {
    states: HashSet<StateId>,
}

impl StateSet for HashStateSet {
    const KIND: StateSetKind = StateSetKind::Hash;
    const MAX_STATES: Option<usize> = None;

    fn with_capacity(capacity: usize) -> Self {
        // The capacity is a state count hint; most sets hold a small fraction.
        Self {
            states: HashSet::with_capacity(capacity.min(16)),
        }
    }

    fn insert(&mut self, state: StateId) -> bool {
        self.states.insert(state)
    }

    fn contains(&self, state: StateId) -> bool {
        self.states.contains(&state)
    }

    fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn len(&self) -> usize {
        self.states.len()
    }

    fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.iter().copied()
    }

    fn union_with(&mut self, other: &Self) {
        self.states.extend(other.states.iter().copied());
    }

    fn intersects(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.states.iter().any(|state| large.states.contains(state))
    }
}

impl Hash for HashStateSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_vec().hash(state);
    }
}

impl fmt::Debug for HashStateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_vec()).finish()
    }
}

impl FromIterator<StateId> for HashStateSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

/// A set of states implemented using a fixed-size bit set for efficiency.
#[derive(Clone, Default)]
pub struct BitStateSet {
    bits: FixedBitSet,
}

impl BitStateSet {
    /// Bit vectors are fixed-capacity: automata with more states than this
    /// must use [`HashStateSet`].
    pub const CAPACITY: usize = 4096;
}

impl StateSet for BitStateSet {
    const KIND: StateSetKind = StateSetKind::Bit;
    const MAX_STATES: Option<usize> = Some(Self::CAPACITY);

    fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(capacity.min(Self::CAPACITY)),
        }
    }

    fn insert(&mut self, state: StateId) -> bool {
        let idx = state as usize;
        debug_assert!(idx < Self::CAPACITY, "state {idx} beyond bit set capacity");
        if idx >= self.bits.len() {
            self.bits.grow(idx + 1);
        }
        !self.bits.put(idx)
    }

    fn contains(&self, state: StateId) -> bool {
        let idx = state as usize;
        idx < self.bits.len() && self.bits.contains(idx)
    }

    fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }

    fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.bits.ones().map(|i| i as StateId)
    }

    fn union_with(&mut self, other: &Self) {
        if other.bits.len() > self.bits.len() {
            self.bits.grow(other.bits.len());
        }
        self.bits.union_with(&other.bits);
    }

    fn intersects(&self, other: &Self) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }

    // `ones()` already yields ascending indices.
    fn to_vec(&self) -> Vec<StateId> {
        self.iter().collect()
    }
}

impl PartialEq for BitStateSet {
    fn eq(&self, other: &Self) -> bool {
        self.bits.ones().eq(other.bits.ones())
    }
}

impl Eq for BitStateSet {}

impl Hash for BitStateSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for idx in self.bits.ones() {
            idx.hash(state);
        }
    }
}

impl fmt::Debug for BitStateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<StateId> for BitStateSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        let items: Vec<StateId> = iter.into_iter().collect();
        let capacity = items.iter().copied().max().map_or(0, |m| m as usize + 1);
        let mut set = Self::with_capacity(capacity);
        for state in items {
            set.insert(state);
        }
        set
    }
}
