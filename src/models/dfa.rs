//! Transition table validator
//!
//! When the symbol dictionary saw no competing particles the position
//! automaton is subset-constructed into a dense `state × symbol` table.
//! Each row has one extra column flagging accepting states. Construction
//! is abandoned (and the NFA used instead) when the table would outgrow
//! the configured budget.

use indexmap::IndexSet;

use super::bitset::BitSet;
use super::positions::{MatchedParticle, Positions};
use super::state::{Cursor, ValidationState};
use super::symbols::SymbolsDictionary;
use super::validator::{push_unique, ContentError, ContentType, ContentValidation};
use crate::limits::Limits;
use crate::namespaces::QName;

/// Marker for "no transition"
const NO_STATE: i32 = -1;

/// Subset construction over a position automaton
///
/// Returns the row-major table (`symbols.count() + 1` columns per row), or
/// `None` when the number of states exceeds what `limits` allows.
pub(crate) fn build_transition_table(
    firstpos: &BitSet,
    followpos: &[BitSet],
    positions: &Positions,
    symbols: &SymbolsDictionary,
    end_marker: usize,
    limits: &Limits,
) -> Option<Vec<i32>> {
    let symbols_count = symbols.count();
    let stride = symbols_count + 1;
    let mut states: IndexSet<BitSet> = IndexSet::new();
    states.insert(firstpos.clone());

    let mut table = Vec::new();
    let mut state = 0;
    while let Some(state_set) = states.get_index(state).cloned() {
        let row = table.len();
        table.resize(row + stride, NO_STATE);
        table[row + symbols_count] = i32::from(state_set.get(end_marker));

        for symbol in 0..symbols_count {
            let mut next = BitSet::new(positions.count());
            for pos in state_set.iter() {
                if positions[pos].symbol == symbol {
                    next.or(&followpos[pos]);
                }
            }
            if next.is_empty() {
                continue;
            }
            let (index, inserted) = states.insert_full(next);
            if inserted && !limits.fits_dfa_table(states.len(), positions.count()) {
                return None;
            }
            table[row + symbol] = index as i32;
        }
        state += 1;
    }
    Some(table)
}

/// Deterministic content validator
#[derive(Debug, Clone)]
pub struct DfaContentValidator {
    table: Vec<i32>,
    symbols: SymbolsDictionary,
    symbol_particles: Vec<Option<MatchedParticle>>,
    content_type: ContentType,
    open: bool,
    emptiable: bool,
}

impl DfaContentValidator {
    pub(crate) fn new(
        table: Vec<i32>,
        symbols: SymbolsDictionary,
        positions: &Positions,
        content_type: ContentType,
        open: bool,
        emptiable: bool,
    ) -> Self {
        let mut symbol_particles = vec![None; symbols.count()];
        for position in positions.iter() {
            if let (Some(particle), Some(slot)) =
                (position.particle(), symbol_particles.get_mut(position.symbol))
            {
                if slot.is_none() {
                    *slot = Some(particle.clone());
                }
            }
        }

        Self {
            table,
            symbols,
            symbol_particles,
            content_type,
            open,
            emptiable,
        }
    }

    fn stride(&self) -> usize {
        self.symbols.count() + 1
    }

    /// Number of states of the transition table
    pub fn states_count(&self) -> usize {
        self.table.len() / self.stride()
    }

    /// Target of `state` on `symbol`, `None` when there is no transition
    pub fn transition(&self, state: usize, symbol: usize) -> Option<usize> {
        let target = self.table[state * self.stride() + symbol];
        (target != NO_STATE).then_some(target as usize)
    }

    fn is_accepting(&self, state: usize) -> bool {
        self.table[state * self.stride() + self.symbols.count()] > 0
    }

    /// The symbol dictionary of the model
    pub fn symbols(&self) -> &SymbolsDictionary {
        &self.symbols
    }

    fn current(state: &ValidationState) -> usize {
        match state.cursor {
            Cursor::Dfa { state } => state,
            _ => 0,
        }
    }
}

impl ContentValidation for DfaContentValidator {
    fn content_type(&self) -> ContentType {
        self.content_type
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_emptiable(&self) -> bool {
        self.emptiable
    }

    fn init_validation(&self, state: &mut ValidationState) {
        state.reset(Cursor::Dfa { state: 0 }, self.is_accepting(0));
    }

    fn validate_element(
        &self,
        name: &QName,
        state: &mut ValidationState,
    ) -> Result<Option<MatchedParticle>, ContentError> {
        if !matches!(state.cursor, Cursor::Dfa { .. }) {
            self.init_validation(state);
        }

        let symbol = self.symbols.lookup(name);
        if let Some(next) = self.transition(Self::current(state), symbol) {
            state.cursor = Cursor::Dfa { state: next };
            state.has_matched = self.is_accepting(next);
            return Ok(self.symbol_particles[symbol].clone());
        }

        if self.open && state.has_matched {
            return Ok(None);
        }
        state.reject();
        Err(ContentError::UnexpectedElement)
    }

    fn complete_validation(&self, state: &ValidationState) -> bool {
        match state.cursor {
            Cursor::Dfa { state } => self.is_accepting(state),
            _ => self.is_accepting(0),
        }
    }

    fn expected_particles(&self, state: &ValidationState) -> Vec<MatchedParticle> {
        let current = Self::current(state);
        let mut particles = Vec::new();
        for symbol in 0..self.symbols.count() {
            if self.transition(current, symbol).is_some() {
                if let Some(particle) = &self.symbol_particles[symbol] {
                    push_unique(&mut particles, particle);
                }
            }
        }
        particles
    }
}
