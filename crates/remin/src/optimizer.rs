//! Direct DFA construction for common pattern shapes.
//!
//! Short literal-like patterns do not need Thompson's construction and subset
//! construction: their minimal DFA can be written down directly. Shapes are
//! recognized with precompiled matchers; anything else goes through the
//! general pipeline.

use crate::automaton::{Dfa, StateId, Symbol};
use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use crate::minimizer::minimize;
use crate::parser::class_members;
use crate::subset_construction::complete_with_dead_state;
use log::{debug, warn};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// One character that has no special meaning in a pattern.
const PLAIN: &str = r"[^\\|*+?.()\[\]^$]";

static LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({PLAIN}+)$")).expect("literal matcher"));
static PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\^({PLAIN}+)$")).expect("prefix matcher"));
static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({PLAIN}+)\$$")).expect("suffix matcher"));
static ALTERNATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({PLAIN}+)\|({PLAIN}+)$")).expect("alternation matcher")
});
static STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({PLAIN})\*$")).expect("star matcher"));
static CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\[\]^\\][^\[\]\\]*\]$").expect("class matcher"));

/// A pattern shape with a directly constructible DFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'p> {
    /// `abc`
    Literal(&'p str),
    /// `^abc`
    AnchoredPrefix(&'p str),
    /// `abc$`
    AnchoredSuffix(&'p str),
    /// `abc|abd`
    Alternation(&'p str, &'p str),
    /// `a*`
    Star(Symbol),
    /// `[a-z_]`, the whole pattern
    Class(&'p str),
}

/// Recognizes [`Shape`]s and builds their minimal DFAs.
#[derive(Debug, Clone, Copy)]
pub struct RegexOptimizer<'c> {
    config: &'c ConverterConfig,
}

impl<'c> RegexOptimizer<'c> {
    pub fn new(config: &'c ConverterConfig) -> Self {
        Self { config }
    }

    pub fn recognize<'p>(&self, pattern: &'p str) -> Option<Shape<'p>> {
        if let Some(text) = first_group(&LITERAL, pattern) {
            return Some(Shape::Literal(text));
        }
        if let Some(text) = first_group(&PREFIX, pattern) {
            return Some(Shape::AnchoredPrefix(text));
        }
        if let Some(text) = first_group(&SUFFIX, pattern) {
            return Some(Shape::AnchoredSuffix(text));
        }
        if let Some(captures) = ALTERNATION.captures(pattern) {
            let (_, [left, right]) = captures.extract();
            return Some(Shape::Alternation(left, right));
        }
        if let Some(symbol) = first_group(&STAR, pattern).and_then(|text| text.chars().next()) {
            return Some(Shape::Star(symbol));
        }
        if CLASS.is_match(pattern) {
            return Some(Shape::Class(pattern));
        }
        None
    }

    pub fn can_directly_convert(&self, pattern: &str) -> bool {
        self.recognize(pattern).is_some()
    }

    /// Build the minimal DFA of a recognized pattern.
    ///
    /// Returns `None` if the pattern has no known shape, or if building it
    /// failed; the caller is expected to fall back to the general pipeline,
    /// which reports the actual error.
    pub fn try_convert(&self, pattern: &str) -> Option<Dfa> {
        let shape = self.recognize(pattern)?;
        match self.build(shape) {
            Ok(dfa) => {
                debug!(
                    "fast path: {pattern:?} as {shape:?} -> {} states",
                    dfa.num_states()
                );
                Some(dfa)
            }
            Err(err) => {
                warn!("fast path failed for {pattern:?} ({shape:?}): {err}");
                None
            }
        }
    }

    fn build(&self, shape: Shape<'_>) -> Result<Dfa> {
        let mut dfa = match shape {
            Shape::Literal(text) | Shape::AnchoredPrefix(text) | Shape::AnchoredSuffix(text) => {
                self.trie([text])?
            }
            Shape::Alternation(left, right) => self.trie([left, right])?,
            Shape::Star(symbol) => {
                let mut dfa = Dfa::with_alphabet(BTreeSet::from([symbol]));
                let state = dfa.add_state(true);
                dfa.add_transition(state, symbol, state)?;
                dfa
            }
            Shape::Class(pattern) => {
                let members = class_members(pattern, self.config)?;
                let mut dfa = Dfa::with_alphabet(members.clone());
                let start = dfa.add_state(false);
                let accept = dfa.add_state(true);
                for symbol in members {
                    dfa.add_transition(start, symbol, accept)?;
                }
                dfa
            }
        };

        complete_with_dead_state(&mut dfa)?;
        let max = self.config.max_dfa_states;
        if dfa.num_states() as usize > max {
            return Err(Error::StateLimitExceeded {
                states: dfa.num_states() as usize,
                max,
            });
        }
        // Canonical numbering, and merges the common suffixes of a trie.
        minimize(&dfa)
    }

    /// A prefix tree accepting exactly `words`.
    fn trie<'w>(&self, words: impl IntoIterator<Item = &'w str>) -> Result<Dfa> {
        let mut accepting = vec![false];
        let mut edges: BTreeMap<(StateId, Symbol), StateId> = BTreeMap::new();
        let mut alphabet = BTreeSet::new();

        for word in words {
            let mut state: StateId = 0;
            for symbol in word.chars() {
                alphabet.insert(symbol);
                let next = accepting.len() as StateId;
                state = *edges.entry((state, symbol)).or_insert_with(|| {
                    accepting.push(false);
                    next
                });
            }
            accepting[state as usize] = true;
        }

        let mut dfa = Dfa::with_alphabet(alphabet);
        for accepts in accepting {
            dfa.add_state(accepts);
        }
        for ((source, symbol), destination) in edges {
            dfa.add_transition(source, symbol, destination)?;
        }
        Ok(dfa)
    }
}

fn first_group<'p>(regex: &Regex, pattern: &'p str) -> Option<&'p str> {
    regex.captures(pattern)?.get(1).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::HashStateSet;
    use crate::parser::RegexParser;
    use crate::subset_construction::subset_construction;

    fn general(pattern: &str) -> Dfa {
        let config = ConverterConfig::default();
        let nfa = RegexParser::new(&config)
            .parse::<HashStateSet>(pattern)
            .unwrap();
        minimize(&subset_construction(&nfa, config.max_dfa_states).unwrap()).unwrap()
    }

    fn assert_same_dfa(fast: &Dfa, general: &Dfa) {
        assert_eq!(fast.num_states(), general.num_states());
        assert_eq!(fast.alphabet(), general.alphabet());
        assert_eq!(fast.start_state(), general.start_state());
        assert_eq!(fast.accept_states(), general.accept_states());
        assert_eq!(
            fast.transitions().collect::<Vec<_>>(),
            general.transitions().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_recognize() {
        let config = ConverterConfig::default();
        let optimizer = RegexOptimizer::new(&config);
        assert_eq!(optimizer.recognize("hello"), Some(Shape::Literal("hello")));
        assert_eq!(optimizer.recognize("^abc"), Some(Shape::AnchoredPrefix("abc")));
        assert_eq!(optimizer.recognize("abc$"), Some(Shape::AnchoredSuffix("abc")));
        assert_eq!(
            optimizer.recognize("cat|dog"),
            Some(Shape::Alternation("cat", "dog"))
        );
        assert_eq!(optimizer.recognize("a*"), Some(Shape::Star('a')));
        assert_eq!(optimizer.recognize("[a-z_]"), Some(Shape::Class("[a-z_]")));

        let general_only = [
            "", "a(b|c)*", "a|b|c", "ab*", "a.c", "[^a]", r"a\*", "[a]b", "^a$",
        ];
        for pattern in general_only {
            assert_eq!(optimizer.recognize(pattern), None, "pattern {pattern:?}");
            assert!(!optimizer.can_directly_convert(pattern));
        }
    }

    #[test]
    fn test_fast_path_matches_general_pipeline() {
        let config = ConverterConfig::default();
        let optimizer = RegexOptimizer::new(&config);
        let patterns = [
            "ba", "aab", "^abc", "abc$", "cat|dog", "abc|abd", "ab|b", "a*", "[a-c_]", "[-x]",
        ];
        for pattern in patterns {
            let fast = optimizer
                .try_convert(pattern)
                .unwrap_or_else(|| panic!("{pattern:?} should take the fast path"));
            assert_same_dfa(&fast, &general(pattern));
        }
    }

    #[test]
    fn test_star_is_single_state() {
        let config = ConverterConfig::default();
        let dfa = RegexOptimizer::new(&config).try_convert("a*").unwrap();
        assert_eq!(dfa.num_states(), 1);
        assert!(dfa.is_accepting(0));
        assert_eq!(dfa.transition(0, 'a'), Some(0));
    }

    #[test]
    fn test_alternation_shares_prefix() {
        let config = ConverterConfig::default();
        let dfa = RegexOptimizer::new(&config).try_convert("abc|abd").unwrap();
        // root, a, ab, accept, dead
        assert_eq!(dfa.num_states(), 5);
        assert!(dfa.accepts("abc") && dfa.accepts("abd"));
        assert!(!dfa.accepts("ab") && !dfa.accepts("abcd"));
    }

    #[test]
    fn test_fast_path_failure_falls_through() {
        let config = ConverterConfig::default();
        let optimizer = RegexOptimizer::new(&config);
        assert!(optimizer.can_directly_convert("[z-a]"));
        assert!(optimizer.try_convert("[z-a]").is_none());

        let small = ConverterConfig {
            max_dfa_states: 4,
            ..ConverterConfig::default()
        };
        let optimizer = RegexOptimizer::new(&small);
        assert!(optimizer.try_convert("ab").is_some());
        assert!(optimizer.try_convert("abcdef").is_none());
    }
}
