//! Per-element validation cursor
//!
//! Compiled validators are immutable and shared; everything that changes
//! while the children of one element are checked lives here. Which
//! [`Cursor`] variant is active depends on the validator that initialized
//! the state.

use super::bitset::BitSet;

/// One running configuration of the range validator: a position set and
/// the iteration count of every counted repetition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangePosition {
    /// Positions that may match the next child
    pub cur_pos: BitSet,
    /// Completed iterations, indexed like the validator's range table
    pub counters: Vec<u32>,
}

/// Validator specific part of the state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Not initialized, or owned by a validator without a cursor
    #[default]
    Unstarted,
    /// Current DFA state
    Dfa {
        /// Row of the transition table
        state: usize,
    },
    /// Double-buffered position sets of the NFA
    Nfa {
        /// The two buffers
        cur_pos: [BitSet; 2],
        /// Which buffer holds the current set
        index: usize,
    },
    /// Running configurations of the range validator
    Range {
        /// Configurations still alive
        running: Vec<RangePosition>,
    },
    /// Members of an all group seen so far
    All {
        /// Indexes of the members already matched
        seen: BitSet,
        /// Required members matched so far, `None` before the first child
        required: Option<usize>,
    },
}

/// Cursor plus flags for validating the children of one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationState {
    pub(crate) cursor: Cursor,
    pub(crate) has_matched: bool,
    pub(crate) need_validate_children: bool,
    pub(crate) too_complex: bool,
}

impl Default for ValidationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationState {
    /// Fresh state; a validator must initialize it before use
    pub fn new() -> Self {
        Self {
            cursor: Cursor::Unstarted,
            has_matched: false,
            need_validate_children: true,
            too_complex: false,
        }
    }

    /// The validator specific cursor
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Whether the children seen so far form complete content
    pub fn has_matched(&self) -> bool {
        self.has_matched
    }

    /// False once a child was rejected: its own content need not be
    /// checked against a particle
    pub fn need_validate_children(&self) -> bool {
        self.need_validate_children
    }

    /// Set when the range validator had to drop running configurations
    pub fn too_complex(&self) -> bool {
        self.too_complex
    }

    pub(crate) fn reset(&mut self, cursor: Cursor, has_matched: bool) {
        self.cursor = cursor;
        self.has_matched = has_matched;
        self.need_validate_children = true;
        self.too_complex = false;
    }

    pub(crate) fn reject(&mut self) {
        self.need_validate_children = false;
    }
}
