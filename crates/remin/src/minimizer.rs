//! DFA minimization by Hopcroft's partition refinement.
//!
//! Only states reachable from the start state take part. A partial input is
//! completed with a virtual sink first, so that "no transition" is a
//! distinguishable behavior; if the sink ends up alone in its block it is
//! left out of the result, which is then exactly as partial as the input.
//!
//! Blocks of the final partition are Myhill–Nerode equivalence classes of
//! the reachable states. The minimized DFA numbers them breadth-first from
//! the start block, so two minimizations of equivalent DFAs are identical.

use crate::automaton::{Dfa, StateId, Symbol};
use crate::error::{Error, Result};
use fixedbitset::FixedBitSet;
use log::{debug, trace};
use std::collections::{HashMap, VecDeque};

/// Minimize a DFA. The input is left untouched.
///
/// DFAs with at most one state or an empty alphabet are returned as a
/// structural copy.
pub fn minimize(dfa: &Dfa) -> Result<Dfa> {
    if dfa.num_states() <= 1 || dfa.alphabet().is_empty() {
        return Ok(dfa.clone());
    }

    let table = Table::new(dfa);
    let partition = Partition::refine(&table);
    let minimized = build_minimized_dfa(dfa, &table, &partition)?;

    debug!(
        "minimized DFA: {} states -> {} states ({} reachable)",
        dfa.num_states(),
        minimized.num_states(),
        table.originals.len()
    );
    Ok(minimized)
}

impl Dfa {
    /// Minimize the DFA using Hopcroft's algorithm.
    /// Returns a new minimized DFA.
    pub fn minimize(&self) -> Result<Dfa> {
        minimize(self)
    }
}

/// Dense view of the reachable part of a DFA. Indices `0..originals.len()`
/// are reachable states in ascending order; the virtual sink, when needed,
/// takes the next index.
struct Table {
    originals: Vec<StateId>,
    symbols: Vec<Symbol>,
    start: usize,
    sink: Option<usize>,
    accepting: Vec<bool>,
    /// `delta[state][symbol index]`
    delta: Vec<Vec<usize>>,
    /// `inverse[symbol index][state]`: states moving to `state` on the symbol
    inverse: Vec<Vec<Vec<usize>>>,
}

impl Table {
    fn new(dfa: &Dfa) -> Self {
        let originals: Vec<StateId> = dfa.reachable_states().into_iter().collect();
        let index: HashMap<StateId, usize> = originals
            .iter()
            .enumerate()
            .map(|(idx, &state)| (state, idx))
            .collect();
        let symbols: Vec<Symbol> = dfa.alphabet().iter().copied().collect();

        let real = originals.len();
        let mut needs_sink = false;
        let mut delta: Vec<Vec<usize>> = originals
            .iter()
            .map(|&state| {
                symbols
                    .iter()
                    .map(|&symbol| match dfa.transition(state, symbol) {
                        // Successors of reachable states are reachable.
                        Some(next) => index[&next],
                        None => {
                            needs_sink = true;
                            real
                        }
                    })
                    .collect()
            })
            .collect();

        let sink = needs_sink.then_some(real);
        if sink.is_some() {
            delta.push(vec![real; symbols.len()]);
        }

        let mut inverse = vec![vec![Vec::new(); delta.len()]; symbols.len()];
        for (source, row) in delta.iter().enumerate() {
            for (symbol, &target) in row.iter().enumerate() {
                inverse[symbol][target].push(source);
            }
        }

        let mut accepting: Vec<bool> = originals
            .iter()
            .map(|&state| dfa.is_accepting(state))
            .collect();
        accepting.resize(delta.len(), false);

        Self {
            start: index[&dfa.start_state()],
            originals,
            symbols,
            sink,
            accepting,
            delta,
            inverse,
        }
    }

    fn len(&self) -> usize {
        self.delta.len()
    }
}

/// Disjoint blocks covering every index of a [`Table`].
struct Partition {
    blocks: Vec<Vec<usize>>,
    block_of: Vec<usize>,
}

impl Partition {
    fn refine(table: &Table) -> Self {
        // Initial partition: accepting and non-accepting states. When one
        // side is empty, refinement starts from the single coarsest block.
        let (accepting, rejecting): (Vec<usize>, Vec<usize>) =
            (0..table.len()).partition(|&state| table.accepting[state]);
        let blocks: Vec<Vec<usize>> = [accepting, rejecting]
            .into_iter()
            .filter(|block| !block.is_empty())
            .collect();

        let mut block_of = vec![0; table.len()];
        for (idx, block) in blocks.iter().enumerate() {
            for &state in block {
                block_of[state] = idx;
            }
        }
        let mut partition = Self { blocks, block_of };

        // Worklist of (block index, symbol index) splitters
        let num_symbols = table.symbols.len();
        let mut worklist: VecDeque<(usize, usize)> = (0..partition.blocks.len())
            .flat_map(|idx| (0..num_symbols).map(move |symbol| (idx, symbol)))
            .collect();
        let mut predecessors = FixedBitSet::with_capacity(table.len());

        while let Some((splitter, symbol)) = worklist.pop_front() {
            // States that move into the splitter on this symbol
            predecessors.clear();
            for &target in &partition.blocks[splitter] {
                for &source in &table.inverse[symbol][target] {
                    predecessors.insert(source);
                }
            }
            if predecessors.is_clear() {
                continue;
            }

            let mut touched: Vec<usize> = predecessors
                .ones()
                .map(|state| partition.block_of[state])
                .collect();
            touched.sort_unstable();
            touched.dedup();

            for idx in touched {
                let (inside, outside): (Vec<usize>, Vec<usize>) = partition.blocks[idx]
                    .iter()
                    .copied()
                    .partition(|&state| predecessors.contains(state));
                if outside.is_empty() {
                    continue;
                }

                // The larger part keeps the index, so a pending splitter
                // entry for it stays meaningful.
                let (keep, split) = if inside.len() >= outside.len() {
                    (inside, outside)
                } else {
                    (outside, inside)
                };
                let new_idx = partition.blocks.len();
                trace!(
                    "split block {idx} on {:?}: {} + {} states",
                    table.symbols[symbol],
                    keep.len(),
                    split.len()
                );
                for &state in &split {
                    partition.block_of[state] = new_idx;
                }
                partition.blocks[idx] = keep;
                partition.blocks.push(split);
                worklist.extend((0..num_symbols).map(|symbol| (new_idx, symbol)));
            }
        }

        partition
    }
}

/// Build a minimized DFA with one state per block.
fn build_minimized_dfa(dfa: &Dfa, table: &Table, partition: &Partition) -> Result<Dfa> {
    let blocks = &partition.blocks;
    let block_of = &partition.block_of;

    // A block holding nothing but the virtual sink has no counterpart in the
    // input and is left out.
    let dropped = table
        .sink
        .map(|sink| block_of[sink])
        .filter(|&block| blocks[block].len() == 1);

    // Number blocks breadth-first from the start block, following each
    // block's first member.
    let start_block = block_of[table.start];
    let mut numbering: Vec<Option<StateId>> = vec![None; blocks.len()];
    let mut order: Vec<usize> = Vec::with_capacity(blocks.len());
    let mut queue = VecDeque::from([start_block]);
    numbering[start_block] = Some(0);

    while let Some(block) = queue.pop_front() {
        order.push(block);
        let representative = blocks[block][0];
        for &target in &table.delta[representative] {
            let target_block = block_of[target];
            if Some(target_block) == dropped || numbering[target_block].is_some() {
                continue;
            }
            numbering[target_block] = Some((order.len() + queue.len()) as StateId);
            queue.push_back(target_block);
        }
    }

    let mut minimized = Dfa::with_alphabet(dfa.alphabet().clone());
    for &block in &order {
        minimized.add_state(block_accepts(table, &blocks[block])?);
    }
    minimized.set_start_state(0);

    // Add transitions (use representative state from each block)
    for (from, &block) in order.iter().enumerate() {
        let representative = blocks[block][0];
        for (&symbol, &target) in table.symbols.iter().zip(&table.delta[representative]) {
            let target_block = block_of[target];
            if Some(target_block) == dropped {
                continue;
            }
            let to = numbering[target_block].ok_or_else(|| {
                Error::InvariantViolation(format!("block {target_block} was never numbered"))
            })?;
            minimized.add_transition(from as StateId, symbol, to)?;
        }
    }

    // Build state mapping from minimized states to original NFA states
    if let Some(orig_mapping) = dfa.state_mapping() {
        let new_mapping: HashMap<StateId, Vec<StateId>> = order
            .iter()
            .enumerate()
            .map(|(new_state, &block)| {
                let mut nfa_states: Vec<StateId> = blocks[block]
                    .iter()
                    .filter_map(|&member| table.originals.get(member))
                    .filter_map(|state| orig_mapping.get(state))
                    .flatten()
                    .copied()
                    .collect();
                nfa_states.sort_unstable();
                nfa_states.dedup();
                (new_state as StateId, nfa_states)
            })
            .collect();
        minimized.set_state_mapping(new_mapping);
    }

    Ok(minimized)
}

fn block_accepts(table: &Table, block: &[usize]) -> Result<bool> {
    let accepting = table.accepting[block[0]];
    if block.iter().any(|&state| table.accepting[state] != accepting) {
        return Err(Error::InvariantViolation(format!(
            "block {:?} mixes accepting and non-accepting states",
            block
                .iter()
                .filter_map(|&state| table.originals.get(state))
                .collect::<Vec<_>>()
        )));
    }
    Ok(accepting)
}
