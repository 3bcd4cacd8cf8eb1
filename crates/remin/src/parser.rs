//! Regular expression parser producing Thompson NFAs.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expression := term ('|' term)*
//! term       := factor*
//! factor     := atom ('*' | '+' | '?')*
//! atom       := literal | '\' any | '.' | '[' class ']' | '(' expression ')'
//! ```
//!
//! Matching is always whole-string, so a leading `^` and a trailing
//! unescaped `$` are accepted and dropped. Anywhere else they are literals.

use crate::automaton::{Nfa, StateSet, Symbol};
use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use log::debug;
use std::collections::BTreeSet;
use std::str::Chars;

/// Parses patterns into NFAs according to a [`ConverterConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RegexParser<'c> {
    config: &'c ConverterConfig,
}

impl<'c> RegexParser<'c> {
    pub fn new(config: &'c ConverterConfig) -> Self {
        Self { config }
    }

    /// Build the Thompson NFA for `pattern`.
    ///
    /// Errors carry the character offset at which the problem was detected.
    /// No automaton is returned for an invalid pattern.
    pub fn parse<S: StateSet>(&self, pattern: &str) -> Result<Nfa<S>> {
        let (body, base) = strip_anchors(pattern);
        check_nesting(body, base, self.config.max_nesting_depth)?;
        let mut parse = Parse::new(body, base, self.config);

        let nfa = parse.expression::<S>()?;
        if let Some(c) = parse.peek() {
            // `expression` only stops early on a closing parenthesis.
            return Err(Error::syntax(format!("unmatched '{c}'"), parse.offset));
        }

        debug!(
            "parsed {pattern:?} into {} NFA states ({} transitions, {:?} sets)",
            nfa.num_states(),
            nfa.num_transitions(),
            S::KIND
        );
        Ok(nfa)
    }
}

/// Symbols of a bracket expression that makes up the whole of `pattern`,
/// such as `[a-cx]`.
pub(crate) fn class_members(pattern: &str, config: &ConverterConfig) -> Result<BTreeSet<Symbol>> {
    let mut parse = Parse::new(pattern, 0, config);
    if parse.bump() != Some('[') {
        return Err(Error::syntax("expected '['", 0));
    }
    let members = parse.class(0)?;
    if parse.peek().is_some() {
        return Err(Error::syntax("unexpected input after ']'", parse.offset));
    }
    Ok(members)
}

/// Rough number of NFA states Thompson's construction will allocate for
/// `pattern`. Used to pick a state-set strategy before parsing.
pub fn estimate_states(pattern: &str) -> usize {
    let mut states = 0;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        states += match c {
            '(' | ')' | '^' | '$' => 0,
            '|' | '*' | '?' => 2,
            // Each '+' copies its operand.
            '+' => 4,
            '[' => {
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
                2
            }
            '\\' => {
                chars.next();
                2
            }
            _ => 2,
        };
    }
    states.max(1)
}

/// Reject groups nested deeper than `max` before the recursive descent
/// starts. Escaped parentheses and class members do not count.
fn check_nesting(body: &str, base: usize, max: usize) -> Result<()> {
    let mut depth = 0usize;
    let mut chars = body.chars().enumerate();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => loop {
                match chars.next() {
                    Some((_, '\\')) => {
                        chars.next();
                    }
                    Some((_, ']')) | None => break,
                    Some(_) => {}
                }
            },
            '(' => {
                depth += 1;
                if depth > max {
                    return Err(Error::syntax(
                        format!("groups nested deeper than {max} levels"),
                        base + index,
                    ));
                }
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Strip a leading `^` and a trailing `$` that is not escaped. Returns the
/// remaining pattern and the offset of its first character.
fn strip_anchors(pattern: &str) -> (&str, usize) {
    let (mut body, base) = match pattern.strip_prefix('^') {
        Some(rest) => (rest, 1),
        None => (pattern, 0),
    };
    if let Some(rest) = body.strip_suffix('$') {
        let backslashes = rest.chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 0 {
            body = rest;
        }
    }
    (body, base)
}

struct Parse<'a> {
    config: &'a ConverterConfig,
    chars: Chars<'a>,
    /// Offset of the next character in the original pattern
    offset: usize,
}

impl<'a> Parse<'a> {
    fn new(body: &'a str, base: usize, config: &'a ConverterConfig) -> Self {
        Self {
            config,
            chars: body.chars(),
            offset: base,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Fail if an operator result of `states` states would pass the NFA
    /// ceiling. Checked before the operator allocates anything.
    fn reserve(&self, states: usize) -> Result<()> {
        let max = self.config.max_nfa_states;
        if states > max {
            return Err(Error::StateLimitExceeded { states, max });
        }
        Ok(())
    }

    fn expression<S: StateSet>(&mut self) -> Result<Nfa<S>> {
        let mut nfa = self.term()?;
        while self.eat('|') {
            let rhs = self.term()?;
            self.reserve(size(&nfa) + size(&rhs) + 2)?;
            nfa = nfa.union(&rhs)?;
        }
        Ok(nfa)
    }

    /// A possibly empty sequence of factors. The empty sequence matches the
    /// empty string.
    fn term<S: StateSet>(&mut self) -> Result<Nfa<S>> {
        let mut nfa: Option<Nfa<S>> = None;
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let factor = self.factor()?;
            nfa = Some(match nfa {
                Some(prefix) => {
                    self.reserve(size(&prefix) + size(&factor))?;
                    prefix.concat(&factor)?
                }
                None => factor,
            });
        }
        Ok(nfa.unwrap_or_else(Nfa::epsilon))
    }

    fn factor<S: StateSet>(&mut self) -> Result<Nfa<S>> {
        let mut nfa = self.atom()?;
        loop {
            let states = size(&nfa);
            nfa = match self.peek() {
                Some('*') => {
                    self.reserve(states + 2)?;
                    nfa.star()?
                }
                Some('+') => {
                    self.reserve(2 * states + 2)?;
                    nfa.plus()?
                }
                Some('?') => {
                    self.reserve(states + 2)?;
                    nfa.optional()?
                }
                _ => return Ok(nfa),
            };
            self.bump();
        }
    }

    fn atom<S: StateSet>(&mut self) -> Result<Nfa<S>> {
        let offset = self.offset;
        let Some(c) = self.bump() else {
            return Err(Error::syntax("unexpected end of pattern", offset));
        };

        match c {
            '(' => {
                // Depth was checked up front by `check_nesting`.
                let inner = self.expression()?;
                if !self.eat(')') {
                    return Err(Error::syntax("unmatched '('", offset));
                }
                Ok(inner)
            }
            '[' => Ok(Nfa::one_of(self.class(offset)?)),
            '.' => Ok(Nfa::one_of(self.config.dot_alphabet.iter())),
            '\\' => match self.bump() {
                Some(escaped) => Ok(Nfa::symbol(escaped)),
                None => Err(Error::syntax("trailing backslash", offset)),
            },
            '*' | '+' | '?' => Err(Error::syntax(
                format!("'{c}' has nothing to repeat"),
                offset,
            )),
            c => Ok(Nfa::symbol(c)),
        }
    }

    /// Parse a bracket expression. The opening `[` at `open` has already
    /// been consumed.
    fn class(&mut self, open: usize) -> Result<BTreeSet<Symbol>> {
        if self.peek() == Some('^') {
            return Err(Error::syntax(
                "negated character classes are not supported",
                self.offset,
            ));
        }

        let mut members = BTreeSet::new();
        loop {
            let offset = self.offset;
            let first = match self.class_char(open)? {
                ClassChar::Close => break,
                ClassChar::Symbol(c) => c,
            };

            // A '-' right before ']' is a literal, not a range.
            let is_range = self.peek() == Some('-')
                && !matches!(self.peek_second(), Some(']') | None);
            if !is_range {
                members.insert(first);
            } else {
                self.bump();
                let last = match self.class_char(open)? {
                    ClassChar::Symbol(c) => c,
                    ClassChar::Close => return Err(Error::syntax("unmatched '['", open)),
                };
                if last < first {
                    return Err(Error::syntax(
                        format!("invalid range {first:?}-{last:?}"),
                        offset,
                    ));
                }
                let span = (last as u32 - first as u32) as usize + 1;
                if members.len() + span > self.config.max_class_size {
                    return Err(self.class_too_large(open));
                }
                members.extend(first..=last);
            }

            if members.len() > self.config.max_class_size {
                return Err(self.class_too_large(open));
            }
        }

        if members.is_empty() {
            return Err(Error::syntax("empty character class", open));
        }
        Ok(members)
    }

    fn class_char(&mut self, open: usize) -> Result<ClassChar> {
        let offset = self.offset;
        match self.bump() {
            None => Err(Error::syntax("unmatched '['", open)),
            Some(']') => Ok(ClassChar::Close),
            Some('\\') => self
                .bump()
                .map(ClassChar::Symbol)
                .ok_or_else(|| Error::syntax("trailing backslash", offset)),
            Some(c) => Ok(ClassChar::Symbol(c)),
        }
    }

    fn class_too_large(&self, open: usize) -> Error {
        Error::syntax(
            format!(
                "character class has more than {} symbols",
                self.config.max_class_size
            ),
            open,
        )
    }
}

fn size<S: StateSet>(nfa: &Nfa<S>) -> usize {
    nfa.num_states() as usize
}

enum ClassChar {
    Symbol(Symbol),
    Close,
}
