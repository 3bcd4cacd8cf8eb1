//! High-level pattern-to-DFA conversion.

use crate::automaton::{BitStateSet, Dfa, HashStateSet, Nfa, StateSet, StateSetKind};
use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use crate::minimizer::minimize;
use crate::nfa_minimizer::minimize_nfa;
use crate::optimizer::RegexOptimizer;
use crate::parser::{RegexParser, estimate_states};
use crate::subset_construction::subset_construction;
use log::{debug, warn};

/// Converts patterns to minimal DFAs.
///
/// The general pipeline is parse → subset construction → minimization. When
/// fast paths are enabled, patterns with a simple shape skip straight to a
/// directly built DFA.
#[derive(Debug, Clone, Default)]
pub struct RegexToDfaConverter {
    config: ConverterConfig,
}

impl RegexToDfaConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// The state-set strategy used for `pattern`: the configured one, or a
    /// choice based on the estimated NFA size.
    pub fn strategy_for(&self, pattern: &str) -> StateSetKind {
        self.config.strategy.unwrap_or_else(|| {
            StateSetKind::for_estimate(estimate_states(pattern), self.config.bitset_threshold)
        })
    }

    /// Convert `pattern` to its minimal DFA.
    pub fn convert(&self, pattern: &str) -> Result<Dfa> {
        if self.config.enable_fast_paths {
            if let Some(dfa) = RegexOptimizer::new(&self.config).try_convert(pattern) {
                return Ok(dfa);
            }
        }
        let dfa = self.convert_unminimized(pattern)?;
        minimize(&dfa)
    }

    /// The DFA straight out of subset construction, before minimization.
    pub fn convert_unminimized(&self, pattern: &str) -> Result<Dfa> {
        let kind = self.strategy_for(pattern);
        debug!("converting {pattern:?} with {kind:?} state sets");
        match kind {
            StateSetKind::Hash => self.determinize::<HashStateSet>(pattern),
            StateSetKind::Bit => match self.determinize::<BitStateSet>(pattern) {
                // The estimate was too low; only an explicit choice is binding.
                Err(err @ Error::CapacityExceeded { .. }) if self.config.strategy.is_none() => {
                    warn!("{err}; retrying {pattern:?} with hash state sets");
                    self.determinize::<HashStateSet>(pattern)
                }
                result => result,
            },
        }
    }

    fn determinize<S: StateSet>(&self, pattern: &str) -> Result<Dfa> {
        let nfa = RegexParser::new(&self.config).parse::<S>(pattern)?;
        subset_construction(&nfa, self.config.max_dfa_states)
    }

    /// The Thompson NFA of `pattern`.
    pub fn parse(&self, pattern: &str) -> Result<Nfa> {
        RegexParser::new(&self.config).parse(pattern)
    }

    /// The minimal DFA of `pattern` re-expressed as an NFA.
    pub fn minimize_nfa(&self, pattern: &str) -> Result<Nfa> {
        let nfa = self.parse(pattern)?;
        minimize_nfa(&nfa, self.config.max_dfa_states)
    }

    /// Check whether `pattern` matches the whole of `input`.
    pub fn matches(&self, pattern: &str, input: &str) -> Result<bool> {
        Ok(self.convert(pattern)?.accepts(input))
    }
}
