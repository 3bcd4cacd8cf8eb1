//! Symbol types for automata transitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An input symbol. Patterns and inputs are matched character by character.
pub type Symbol = char;

/// The label of an NFA edge: either an input symbol or epsilon.
///
/// Epsilon is kept out of the symbol space entirely, so no character is
/// reserved as a sentinel and the alphabet never contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Epsilon,
    Symbol(Symbol),
}

impl Label {
    /// Check if this label is an epsilon transition.
    #[inline]
    pub fn is_epsilon(self) -> bool {
        matches!(self, Label::Epsilon)
    }

    #[inline]
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Label::Epsilon => None,
            Label::Symbol(symbol) => Some(symbol),
        }
    }
}

impl From<Symbol> for Label {
    fn from(symbol: Symbol) -> Self {
        Label::Symbol(symbol)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Epsilon => f.write_str("ε"),
            Label::Symbol(symbol) => write!(f, "{}", symbol.escape_debug()),
        }
    }
}

/// Punctuation included in the default `.` alphabet.
const DEFAULT_PUNCTUATION: &str = " !\"#%&',-/:;<=>@_`~";

/// A finite, ordered set of symbols.
///
/// Used for the expansion of `.`, which matches a bounded set of characters
/// rather than every `char`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alphabet {
    symbols: BTreeSet<Symbol>,
}

impl Alphabet {
    pub fn new() -> Self {
        Self {
            symbols: BTreeSet::new(),
        }
    }

    /// ASCII letters, digits and a fixed punctuation set. Regex metacharacters
    /// are left out so that `.` never has to be escaped in a rendered label.
    pub fn ascii_printable() -> Self {
        ('a'..='z')
            .chain('A'..='Z')
            .chain('0'..='9')
            .chain(DEFAULT_PUNCTUATION.chars())
            .collect()
    }

    pub fn insert(&mut self, symbol: Symbol) -> bool {
        self.symbols.insert(symbol)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over the symbols in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols.iter().copied()
    }

    pub fn as_set(&self) -> &BTreeSet<Symbol> {
        &self.symbols
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::ascii_printable()
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.symbols.iter()).finish()
    }
}

impl FromIterator<Symbol> for Alphabet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}
