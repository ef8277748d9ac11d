//! Position-set validator
//!
//! Keeps firstpos/followpos and advances by taking the union of the follow
//! sets of every current position that matches the child. Used when the
//! model is not known to be deterministic, or when the DFA would be too
//! large. Accepts exactly the same sequences as the DFA built from the
//! same tables.

use super::bitset::BitSet;
use super::positions::{MatchedParticle, Positions};
use super::state::{Cursor, ValidationState};
use super::symbols::SymbolsDictionary;
use super::validator::{push_unique, ContentError, ContentType, ContentValidation};
use crate::namespaces::QName;

/// Non-deterministic content validator
#[derive(Debug, Clone)]
pub struct NfaContentValidator {
    firstpos: BitSet,
    followpos: Vec<BitSet>,
    positions: Positions,
    symbols: SymbolsDictionary,
    end_marker: usize,
    content_type: ContentType,
    open: bool,
    emptiable: bool,
}

impl NfaContentValidator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        firstpos: BitSet,
        followpos: Vec<BitSet>,
        positions: Positions,
        symbols: SymbolsDictionary,
        end_marker: usize,
        content_type: ContentType,
        open: bool,
        emptiable: bool,
    ) -> Self {
        Self {
            firstpos,
            followpos,
            positions,
            symbols,
            end_marker,
            content_type,
            open,
            emptiable,
        }
    }

    /// The symbol dictionary of the model
    pub fn symbols(&self) -> &SymbolsDictionary {
        &self.symbols
    }

    fn current<'s>(&'s self, state: &'s ValidationState) -> &'s BitSet {
        match &state.cursor {
            Cursor::Nfa { cur_pos, index } => &cur_pos[*index],
            _ => &self.firstpos,
        }
    }
}

impl ContentValidation for NfaContentValidator {
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
        let has_matched = self.firstpos.get(self.end_marker);
        if let Cursor::Nfa { cur_pos, index } = &mut state.cursor {
            cur_pos[0].copy_from(&self.firstpos);
            cur_pos[1].clear_all();
            *index = 0;
            let cursor = std::mem::take(&mut state.cursor);
            state.reset(cursor, has_matched);
        } else {
            let cursor = Cursor::Nfa {
                cur_pos: [self.firstpos.clone(), BitSet::new(self.positions.count())],
                index: 0,
            };
            state.reset(cursor, has_matched);
        }
    }

    fn validate_element(
        &self,
        name: &QName,
        state: &mut ValidationState,
    ) -> Result<Option<MatchedParticle>, ContentError> {
        if !matches!(state.cursor, Cursor::Nfa { .. }) {
            self.init_validation(state);
        }
        let symbol = self.symbols.lookup(name);

        let Cursor::Nfa { cur_pos, index } = &mut state.cursor else {
            return Err(ContentError::UnexpectedElement);
        };
        let next_index = (*index + 1) % 2;
        let [first, second] = cur_pos;
        let (current, next) = if *index == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };

        next.clear_all();
        let mut particle = None;
        for pos in current.iter() {
            let position = &self.positions[pos];
            if position.symbol == symbol {
                next.or(&self.followpos[pos]);
                // element leaves are numbered before wildcard leaves
                if particle.is_none() {
                    particle = position.particle().cloned();
                }
            }
        }

        if !next.is_empty() {
            let has_matched = next.get(self.end_marker);
            *index = next_index;
            state.has_matched = has_matched;
            return Ok(particle);
        }

        if self.open && current.get(self.end_marker) {
            return Ok(None);
        }
        state.reject();
        Err(ContentError::UnexpectedElement)
    }

    fn complete_validation(&self, state: &ValidationState) -> bool {
        self.current(state).get(self.end_marker)
    }

    fn expected_particles(&self, state: &ValidationState) -> Vec<MatchedParticle> {
        let mut particles = Vec::new();
        for pos in self.current(state).iter() {
            if let Some(particle) = self.positions[pos].particle() {
                push_unique(&mut particles, particle);
            }
        }
        particles
    }
}
