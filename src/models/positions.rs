//! Automaton positions
//!
//! Every leaf of a compiled syntax tree owns one position: an index into an
//! append-only table recording which symbol the leaf consumes and what it
//! stands for (an element or wildcard particle, a counted-repetition
//! terminal, or the end marker).

use std::fmt;
use std::sync::Arc;

use crate::validators::groups::ElementParticle;
use crate::validators::wildcards::XsdAnyElement;

/// Symbol value of positions that never consume input
pub const NO_SYMBOL: usize = usize::MAX;

/// The particle a child element was attributed to
///
/// Equality is identity: two element particles with the same name are
/// still different particles.
#[derive(Debug, Clone)]
pub enum MatchedParticle {
    /// A declared element
    Element(Arc<ElementParticle>),
    /// An element wildcard
    Any(Arc<XsdAnyElement>),
}

impl MatchedParticle {
    /// Whether this is a declared element rather than a wildcard
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }

    /// The element declaration, if this is one
    pub fn as_element(&self) -> Option<&Arc<ElementParticle>> {
        match self {
            Self::Element(element) => Some(element),
            Self::Any(_) => None,
        }
    }

    /// The wildcard, if this is one
    pub fn as_any(&self) -> Option<&Arc<XsdAnyElement>> {
        match self {
            Self::Any(any) => Some(any),
            Self::Element(_) => None,
        }
    }
}

impl PartialEq for MatchedParticle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => Arc::ptr_eq(a, b),
            (Self::Any(a), Self::Any(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for MatchedParticle {}

impl fmt::Display for MatchedParticle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => write!(f, "{}", element.name),
            Self::Any(any) => write!(f, "{}", any),
        }
    }
}

/// What a position stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// A leaf matching an element or wildcard particle
    Particle(MatchedParticle),
    /// The synthetic terminal closing one iteration of a counted repetition;
    /// the payload indexes the model's range table
    Range(usize),
    /// The end of content
    EndMarker,
    /// A leaf that can never match (a wildcard allowing no namespace)
    Void,
}

/// One automaton position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Symbol consumed by this position, [`NO_SYMBOL`] for synthetic ones
    pub symbol: usize,
    /// What the position stands for
    pub terminal: Terminal,
}

impl Position {
    /// The particle of this position, if it matches input
    pub fn particle(&self) -> Option<&MatchedParticle> {
        match &self.terminal {
            Terminal::Particle(particle) => Some(particle),
            _ => None,
        }
    }

    /// Whether this position is a counted-repetition terminal
    pub fn is_range_terminal(&self) -> bool {
        matches!(self.terminal, Terminal::Range(_))
    }
}

/// Append-only position table
#[derive(Debug, Clone, Default)]
pub struct Positions {
    positions: Vec<Position>,
}

impl Positions {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position and return its index
    pub fn add(&mut self, symbol: usize, terminal: Terminal) -> usize {
        self.positions.push(Position { symbol, terminal });
        self.positions.len() - 1
    }

    /// Position at `index`
    pub fn get(&self, index: usize) -> &Position {
        &self.positions[index]
    }

    /// Number of positions
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over positions in index order
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }
}

impl std::ops::Index<usize> for Positions {
    type Output = Position;

    fn index(&self, index: usize) -> &Position {
        &self.positions[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::validators::particles::Occurs;

    #[test]
    fn test_positions_are_append_only() {
        let mut positions = Positions::new();
        let element = Arc::new(ElementParticle::new(QName::local("a"), Occurs::once()));
        let first = positions.add(0, Terminal::Particle(MatchedParticle::Element(element)));
        let second = positions.add(NO_SYMBOL, Terminal::Range(0));
        let end = positions.add(1, Terminal::EndMarker);

        assert_eq!((first, second, end), (0, 1, 2));
        assert_eq!(positions.count(), 3);
        assert!(positions[0].particle().is_some());
        assert!(positions[1].is_range_terminal());
        assert!(positions[2].particle().is_none());
    }

    #[test]
    fn test_matched_particle_identity() {
        let a = Arc::new(ElementParticle::new(QName::local("a"), Occurs::once()));
        let twin = Arc::new(ElementParticle::new(QName::local("a"), Occurs::once()));
        let any = Arc::new(XsdAnyElement::new());

        assert_eq!(
            MatchedParticle::Element(a.clone()),
            MatchedParticle::Element(a.clone())
        );
        assert_ne!(MatchedParticle::Element(a.clone()), MatchedParticle::Element(twin));
        assert_ne!(MatchedParticle::Element(a), MatchedParticle::Any(any.clone()));
        assert!(!MatchedParticle::Any(any).is_element());
    }
}
