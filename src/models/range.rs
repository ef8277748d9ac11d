//! Counting validator for `{min,max}` repetitions
//!
//! A position set alone cannot tell the third iteration of `(a, b?){2,4}`
//! from the fourth, so this validator runs a set of configurations, each a
//! position set plus one iteration counter per counted repetition. Every
//! time a configuration reaches the iteration terminal of a repetition it
//! forks:
//!
//! - below `min` it must loop back into the body,
//! - at `max` it must leave,
//! - in between it does both.
//!
//! Configurations can multiply on adversarial models, so their number is
//! capped. Hitting the cap sets [`ValidationState::too_complex`] and drops
//! half of them: a loss of precision, not an error.

use std::collections::HashSet;

use super::bitset::BitSet;
use super::positions::{MatchedParticle, Positions, Terminal};
use super::state::{Cursor, RangePosition, ValidationState};
use super::symbols::SymbolsDictionary;
use super::syntax::RangeNode;
use super::validator::{push_unique, ContentError, ContentType, ContentValidation};
use crate::namespaces::QName;

/// Content validator for models with counted repetitions
#[derive(Debug, Clone)]
pub struct RangeContentValidator {
    firstpos: BitSet,
    followpos: Vec<BitSet>,
    positions: Positions,
    symbols: SymbolsDictionary,
    ranges: Vec<RangeNode>,
    range_terminals: BitSet,
    end_marker: usize,
    max_running: usize,
    content_type: ContentType,
    open: bool,
    emptiable: bool,
}

impl RangeContentValidator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        firstpos: BitSet,
        followpos: Vec<BitSet>,
        positions: Positions,
        symbols: SymbolsDictionary,
        ranges: Vec<RangeNode>,
        end_marker: usize,
        max_running: usize,
        content_type: ContentType,
        open: bool,
        emptiable: bool,
    ) -> Self {
        let range_terminals = BitSet::with_members(
            positions.count(),
            ranges.iter().map(|range| range.pos),
        );
        Self {
            firstpos,
            followpos,
            positions,
            symbols,
            ranges,
            range_terminals,
            end_marker,
            max_running: max_running.max(2),
            content_type,
            open,
            emptiable,
        }
    }

    /// The symbol dictionary of the model
    pub fn symbols(&self) -> &SymbolsDictionary {
        &self.symbols
    }

    /// Counted repetitions of the model
    pub fn ranges(&self) -> &[RangeNode] {
        &self.ranges
    }

    /// Follow every iteration terminal reachable from `running[origin]`,
    /// appending the forked configurations
    fn expand_terminals(
        &self,
        running: &mut Vec<RangePosition>,
        origin: usize,
        too_complex: &mut bool,
    ) {
        let mut seen: HashSet<RangePosition> = HashSet::new();
        seen.insert(running[origin].clone());
        let mut pending = vec![origin];

        while let Some(current) = pending.pop() {
            if !running[current].cur_pos.intersects(&self.range_terminals) {
                continue;
            }
            let terminals: Vec<usize> = running[current]
                .cur_pos
                .iter()
                .filter(|&pos| self.range_terminals.get(pos))
                .collect();

            for pos in terminals {
                let Terminal::Range(index) = self.positions[pos].terminal else {
                    continue;
                };
                let range = &self.ranges[index];
                let count = running[current].counters[index].saturating_add(1);

                let mut forks = Vec::with_capacity(2);
                let repeat = |count: u32| {
                    let mut counters = running[current].counters.clone();
                    counters[index] = count;
                    RangePosition {
                        cur_pos: range.next_iteration.clone(),
                        counters,
                    }
                };
                let leave = || {
                    let mut counters = running[current].counters.clone();
                    counters[index] = 0;
                    RangePosition {
                        cur_pos: self.followpos[pos].clone(),
                        counters,
                    }
                };

                if count < range.min {
                    forks.push(repeat(count));
                } else if Some(count) == range.max {
                    forks.push(leave());
                } else {
                    // unbounded repetitions stop counting once min is reached
                    let kept = if range.max.is_none() { range.min } else { count };
                    forks.push(repeat(kept));
                    forks.push(leave());
                }

                for fork in forks {
                    if running.len() >= self.max_running {
                        *too_complex = true;
                        return;
                    }
                    if seen.insert(fork.clone()) {
                        running.push(fork);
                        pending.push(running.len() - 1);
                    }
                }
            }
        }
    }

    fn expand_all(&self, running: &mut Vec<RangePosition>, too_complex: &mut bool) {
        for origin in (0..running.len()).rev() {
            self.expand_terminals(running, origin, too_complex);
        }
    }

    fn any_accepting(&self, running: &[RangePosition]) -> bool {
        running.iter().any(|r| r.cur_pos.get(self.end_marker))
    }

    /// Locate the position matching `symbol`
    ///
    /// Returns the index of the configuration to keep matching from and the
    /// matched position. A configuration whose match is a declared element
    /// wins over an earlier one whose match is only a wildcard.
    fn find_match(&self, running: &[RangePosition], symbol: usize) -> Option<(usize, usize)> {
        let mut first_match = None;
        for (k, configuration) in running.iter().enumerate() {
            let Some(pos) = configuration
                .cur_pos
                .iter()
                .find(|&pos| self.positions[pos].symbol == symbol)
            else {
                continue;
            };
            if first_match.is_none() {
                first_match = Some((k, pos));
            }
            if self.positions[pos].particle().map_or(false, |p| p.is_element()) {
                return Some((k, pos));
            }
        }
        first_match
    }
}

impl ContentValidation for RangeContentValidator {
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
        let mut running = match std::mem::take(&mut state.cursor) {
            Cursor::Range { mut running } => {
                running.clear();
                running
            }
            _ => Vec::new(),
        };
        running.push(RangePosition {
            cur_pos: self.firstpos.clone(),
            counters: vec![0; self.ranges.len()],
        });

        let mut too_complex = false;
        self.expand_all(&mut running, &mut too_complex);
        let has_matched = self.any_accepting(&running);
        state.reset(Cursor::Range { running }, has_matched);
        state.too_complex = too_complex;
    }

    fn validate_element(
        &self,
        name: &QName,
        state: &mut ValidationState,
    ) -> Result<Option<MatchedParticle>, ContentError> {
        if !matches!(state.cursor, Cursor::Range { .. }) {
            self.init_validation(state);
        }
        let symbol = self.symbols.lookup(name);

        let Cursor::Range { running } = &mut state.cursor else {
            return Err(ContentError::UnexpectedElement);
        };

        let Some((first, pos)) = self.find_match(running, symbol) else {
            if self.open && state.has_matched {
                return Ok(None);
            }
            state.reject();
            return Err(ContentError::UnexpectedElement);
        };

        // Configurations before the chosen one are dropped, the rest keep
        // only those that can take the same position.
        running.drain(..first);
        let mut k = 0;
        while k < running.len() {
            if running[k].cur_pos.get(pos) {
                running[k].cur_pos = self.followpos[pos].clone();
                k += 1;
            } else {
                running.swap_remove(k);
            }
        }

        if running.len() >= self.max_running {
            state.too_complex = true;
            running.truncate(running.len() / 2);
        }
        self.expand_all(running, &mut state.too_complex);

        state.has_matched = self.any_accepting(running);
        Ok(self.positions[pos].particle().cloned())
    }

    fn complete_validation(&self, state: &ValidationState) -> bool {
        match &state.cursor {
            Cursor::Range { .. } => state.has_matched,
            _ => {
                let mut fresh = ValidationState::new();
                self.init_validation(&mut fresh);
                fresh.has_matched
            }
        }
    }

    fn expected_particles(&self, state: &ValidationState) -> Vec<MatchedParticle> {
        let mut particles = Vec::new();
        let Cursor::Range { running } = &state.cursor else {
            return particles;
        };
        for configuration in running {
            for pos in configuration.cur_pos.iter() {
                if let Some(particle) = self.positions[pos].particle() {
                    push_unique(&mut particles, particle);
                }
            }
        }
        particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::models::builder::{ContentModelBuilder, ModelOptions};
    use crate::models::validator::ContentValidator;
    use crate::validators::groups::XsdGroup;
    use crate::validators::particles::Occurs;
    use crate::validators::wildcards::XsdAnyElement;

    fn compile(group: &XsdGroup, options: ModelOptions) -> RangeContentValidator {
        match ContentModelBuilder::new(options).build(group).unwrap().into_validator() {
            ContentValidator::Range(validator) => validator,
            other => panic!("expected a range validator, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_nested_counted_groups() {
        // ((a, b?){2,3})
        let body = XsdGroup::sequence()
            .with_occurs(Occurs::range(2, 3))
            .with_element(QName::local("a"), Occurs::once())
            .with_element(QName::local("b"), Occurs::optional());
        let validator = compile(&XsdGroup::sequence().with(body), ModelOptions::default());
        assert_eq!(validator.ranges().len(), 1);

        let run = |children: &[&str]| {
            let mut state = ValidationState::new();
            validator.init_validation(&mut state);
            for child in children {
                if validator.validate_element(&QName::local(*child), &mut state).is_err() {
                    return false;
                }
            }
            validator.complete_validation(&state)
        };
        assert!(!run(&["a"]));
        assert!(run(&["a", "a"]));
        assert!(run(&["a", "b", "a"]));
        assert!(run(&["a", "b", "a", "b", "a", "b"]));
        assert!(!run(&["a", "a", "a", "a"]));
        assert!(!run(&["b", "a"]));
    }

    #[test]
    fn test_failure_leaves_state_alone() {
        let group = XsdGroup::sequence().with_element(QName::local("a"), Occurs::range(2, 4));
        let validator = compile(&group, ModelOptions::default());
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        validator.validate_element(&QName::local("a"), &mut state).unwrap();

        let before = state.cursor().clone();
        let result = validator.validate_element(&QName::local("z"), &mut state);
        assert_eq!(result, Err(ContentError::UnexpectedElement));
        assert_eq!(state.cursor(), &before);
        assert!(!state.need_validate_children());
    }

    #[test]
    fn test_element_preferred_over_wildcard() {
        // (any{1,2}, a): after one foreign child, "a" is claimed by the
        // element rather than by a second wildcard iteration
        let group = XsdGroup::sequence()
            .with(XsdAnyElement::new().with_occurs(Occurs::range(1, 2)))
            .with_element(QName::local("a"), Occurs::once());
        let validator = compile(&group, ModelOptions::default());
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);

        let first = validator.validate_element(&QName::local("x"), &mut state).unwrap();
        assert!(first.map_or(false, |p| !p.is_element()));
        let second = validator.validate_element(&QName::local("a"), &mut state).unwrap();
        assert!(second.map_or(false, |p| p.is_element()));
        assert!(validator.complete_validation(&state));
    }

    #[test]
    fn test_too_complex_degrades() {
        // ((a+){100,100}) doubles its configurations on every child
        let inner = XsdGroup::sequence()
            .with_occurs(Occurs::range(100, 100))
            .with_element(QName::local("a"), Occurs::one_or_more());
        let options = ModelOptions::new().with_limits(Limits {
            max_running_positions: 500,
            ..Limits::default()
        });
        let validator = compile(&XsdGroup::sequence().with(inner), options);

        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        assert!(!state.too_complex());
        for _ in 0..20 {
            assert!(validator.validate_element(&QName::local("a"), &mut state).is_ok());
        }
        assert!(state.too_complex());
        assert!(!validator.complete_validation(&state));

        validator.init_validation(&mut state);
        assert!(!state.too_complex());
    }

    #[test]
    fn test_expected_elements() {
        let group = XsdGroup::sequence()
            .with_element(QName::local("a"), Occurs::range(2, 3))
            .with_element(QName::local("b"), Occurs::once());
        let validator = compile(&group, ModelOptions::default());
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        assert_eq!(validator.expected_elements(&state), vec!["a"]);

        validator.validate_element(&QName::local("a"), &mut state).unwrap();
        validator.validate_element(&QName::local("a"), &mut state).unwrap();
        assert_eq!(validator.expected_elements(&state), vec!["a", "b"]);
    }
}
