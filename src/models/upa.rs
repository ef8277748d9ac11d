//! Unique Particle Attribution analysis
//!
//! The symbol dictionary only notices that two particles share a symbol
//! somewhere in the model. Whether that is a real ambiguity depends on
//! whether both particles can compete for the same child, i.e. whether
//! they appear together in firstpos or in one followpos set. This module
//! does the precise check and reports every competing pair.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#cos-nonambig

use std::fmt;

use super::bitset::BitSet;
use super::positions::{MatchedParticle, Positions, Terminal};
use super::symbols::SymbolsDictionary;
use super::syntax::RangeNode;

/// Two particles competing for the same child element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpaViolation {
    /// The contested symbol, rendered for humans
    pub symbol: String,
    /// Particle seen first
    pub first: MatchedParticle,
    /// Competing particle
    pub second: MatchedParticle,
}

impl fmt::Display for UpaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "content model is not deterministic: '{}' can be matched by both {} and {}",
            self.symbol, self.first, self.second
        )
    }
}

struct Checker<'a> {
    positions: &'a Positions,
    symbols: &'a SymbolsDictionary,
    violations: Vec<UpaViolation>,
}

impl Checker<'_> {
    fn check(&mut self, set: &BitSet) {
        let positions = self.positions;
        let mut claimed: Vec<Option<&MatchedParticle>> = vec![None; self.symbols.count()];
        for pos in set.iter() {
            let position = &positions[pos];
            let Some(particle) = position.particle() else {
                continue;
            };
            let Some(slot) = claimed.get_mut(position.symbol) else {
                continue;
            };
            match *slot {
                None => *slot = Some(particle),
                Some(first) if first != particle => {
                    let violation = UpaViolation {
                        symbol: self.symbols.name_of(position.symbol),
                        first: first.clone(),
                        second: particle.clone(),
                    };
                    if !self.violations.contains(&violation) {
                        self.violations.push(violation);
                    }
                }
                Some(_) => {}
            }
        }
    }
}

/// Check firstpos and every followpos set of a model without counted
/// repetitions
pub fn check_unique_particle_attribution(
    firstpos: &BitSet,
    followpos: &[BitSet],
    positions: &Positions,
    symbols: &SymbolsDictionary,
) -> Vec<UpaViolation> {
    let mut checker = Checker {
        positions,
        symbols,
        violations: Vec::new(),
    };
    checker.check(firstpos);
    for follow in followpos {
        checker.check(follow);
    }
    checker.violations
}

/// Extend a position set with everything reachable through iteration
/// terminals: both re-entering the loop and leaving it
pub(crate) fn range_closure(
    set: &BitSet,
    followpos: &[BitSet],
    positions: &Positions,
    ranges: &[RangeNode],
) -> BitSet {
    let mut result = set.clone();
    let mut done = BitSet::new(positions.count());
    let mut pending: Vec<usize> = set
        .iter()
        .filter(|&pos| positions[pos].is_range_terminal())
        .collect();

    while let Some(pos) = pending.pop() {
        if done.get(pos) {
            continue;
        }
        done.set(pos);
        let Terminal::Range(index) = positions[pos].terminal else {
            continue;
        };
        let mut reached = ranges[index].next_iteration.clone();
        reached.or(&followpos[pos]);
        for next in reached.iter() {
            if positions[next].is_range_terminal() && !done.get(next) {
                pending.push(next);
            }
        }
        result.or(&reached);
    }
    result
}

/// Same check for models with counted repetitions, where a set holding an
/// iteration terminal also competes with whatever follows the terminal
pub fn check_with_ranges(
    firstpos: &BitSet,
    followpos: &[BitSet],
    positions: &Positions,
    symbols: &SymbolsDictionary,
    ranges: &[RangeNode],
) -> Vec<UpaViolation> {
    let mut checker = Checker {
        positions,
        symbols,
        violations: Vec::new(),
    };
    checker.check(&range_closure(firstpos, followpos, positions, ranges));
    for follow in followpos {
        checker.check(&range_closure(follow, followpos, positions, ranges));
    }
    checker.violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::validators::groups::ElementParticle;
    use crate::validators::particles::Occurs;
    use std::sync::Arc;

    fn element(name: &str) -> MatchedParticle {
        MatchedParticle::Element(Arc::new(ElementParticle::new(
            QName::local(name),
            Occurs::once(),
        )))
    }

    #[test]
    fn test_competing_particles_in_firstpos() {
        let mut symbols = SymbolsDictionary::new();
        let mut positions = Positions::new();
        let first = element("a");
        let second = element("a");
        let s = symbols.add_name(&QName::local("a"), first.clone());
        symbols.add_name(&QName::local("a"), second.clone());
        positions.add(s, Terminal::Particle(first.clone()));
        positions.add(s, Terminal::Particle(second.clone()));

        let firstpos = BitSet::with_members(2, [0, 1]);
        let followpos = vec![BitSet::new(2), BitSet::new(2)];
        let violations = check_unique_particle_attribution(&firstpos, &followpos, &positions, &symbols);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].first, first);
        assert_eq!(violations[0].second, second);
        assert!(violations[0].to_string().contains("'a'"));
    }

    #[test]
    fn test_separated_particles_are_fine() {
        let mut symbols = SymbolsDictionary::new();
        let mut positions = Positions::new();
        let first = element("a");
        let second = element("a");
        let s = symbols.add_name(&QName::local("a"), first.clone());
        positions.add(s, Terminal::Particle(first));
        positions.add(s, Terminal::Particle(second));

        // (a, a): the two particles never share a set
        let firstpos = BitSet::with_members(2, [0]);
        let followpos = vec![BitSet::with_members(2, [1]), BitSet::new(2)];
        assert!(check_unique_particle_attribution(&firstpos, &followpos, &positions, &symbols)
            .is_empty());
    }
}
