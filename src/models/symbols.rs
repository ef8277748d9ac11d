//! Symbol dictionary for one content model level
//!
//! Every distinct child name of a content model gets a small dense integer
//! symbol, in insertion order. Wildcards add one symbol per namespace they
//! name explicitly (a "bucket"), and one extra symbol, `last`, stands for
//! every name that is neither declared nor in a bucket. The automata are
//! then plain tables over `0..count()`.
//!
//! While symbols are assigned the dictionary watches for two different
//! particles claiming the same symbol. That is the cheap half of the
//! Unique Particle Attribution check: when it never happens the model is
//! deterministic and may be compiled into a DFA.

use indexmap::IndexMap;

use super::positions::MatchedParticle;
use crate::namespaces::QName;
use crate::validators::wildcards::NamespaceConstraint;

/// Maps child element names and wildcard namespaces to automaton symbols
#[derive(Debug, Clone)]
pub struct SymbolsDictionary {
    names: IndexMap<QName, usize>,
    wildcards: IndexMap<String, usize>,
    particles: Vec<Option<MatchedParticle>>,
    particle_last: Option<MatchedParticle>,
    last: usize,
    upa_enforced: bool,
}

impl Default for SymbolsDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolsDictionary {
    /// Create an empty dictionary: only the `last` symbol exists
    pub fn new() -> Self {
        Self {
            names: IndexMap::new(),
            wildcards: IndexMap::new(),
            particles: Vec::new(),
            particle_last: None,
            last: 0,
            upa_enforced: true,
        }
    }

    /// Number of symbols, the `last` sentinel included
    pub fn count(&self) -> usize {
        self.last + 1
    }

    /// The symbol standing for every otherwise unknown name
    pub fn last(&self) -> usize {
        self.last
    }

    /// Whether no two particles have claimed the same symbol so far
    pub fn is_upa_enforced(&self) -> bool {
        self.upa_enforced
    }

    pub(crate) fn disable_upa(&mut self) {
        self.upa_enforced = false;
    }

    /// Register a declared element name and return its symbol
    pub fn add_name(&mut self, name: &QName, particle: MatchedParticle) -> usize {
        if let Some(&symbol) = self.names.get(name) {
            if self.particles[symbol].as_ref() != Some(&particle) {
                self.upa_enforced = false;
            }
            return symbol;
        }

        let symbol = self.last;
        self.names.insert(name.clone(), symbol);
        self.particles.push(Some(particle));
        self.last += 1;
        symbol
    }

    fn add_wildcard(&mut self, namespace: &str, particle: Option<MatchedParticle>) {
        match self.wildcards.get(namespace) {
            None => {
                self.wildcards.insert(namespace.to_string(), self.last);
                self.particles.push(particle);
                self.last += 1;
            }
            Some(&symbol) => {
                if particle.is_some() {
                    self.particles[symbol] = particle;
                }
            }
        }
    }

    /// Register the namespace buckets of a wildcard
    ///
    /// Explicitly enumerated namespaces become buckets owned by the
    /// wildcard. Excluded namespaces become buckets owned by nobody, so that
    /// names in them do not fall through to `last`. Open-ended wildcards
    /// claim `last`.
    pub fn add_namespace_list(&mut self, constraint: &NamespaceConstraint, particle: MatchedParticle) {
        match constraint {
            NamespaceConstraint::Enumeration(namespaces) => {
                for namespace in namespaces {
                    self.add_wildcard(namespace, Some(particle.clone()));
                }
            }
            NamespaceConstraint::Any => {
                self.particle_last = Some(particle);
            }
            NamespaceConstraint::Other { .. } | NamespaceConstraint::Not(_) => {
                for namespace in constraint.excluded() {
                    self.add_wildcard(namespace, None);
                }
                self.particle_last = Some(particle);
            }
        }
    }

    /// Symbol of a child element name
    pub fn lookup(&self, name: &QName) -> usize {
        if let Some(&symbol) = self.names.get(name) {
            return symbol;
        }
        if let Some(&symbol) = self.wildcards.get(name.namespace_or_empty()) {
            return symbol;
        }
        self.last
    }

    /// Whether the name was declared explicitly
    pub fn exists(&self, name: &QName) -> bool {
        self.names.contains_key(name)
    }

    /// The particle that claimed a symbol, if any
    pub fn get_particle(&self, symbol: usize) -> Option<&MatchedParticle> {
        if symbol == self.last {
            self.particle_last.as_ref()
        } else {
            self.particles.get(symbol).and_then(Option::as_ref)
        }
    }

    /// All symbols a wildcard with this namespace constraint can match
    ///
    /// Declared names come first, then buckets, then `last` for
    /// open-ended constraints.
    pub fn get_namespace_list_symbols(&self, constraint: &NamespaceConstraint) -> Vec<usize> {
        let mut symbols: Vec<usize> = self
            .names
            .iter()
            .filter(|(name, _)| constraint.allows(name))
            .map(|(_, &symbol)| symbol)
            .collect();

        symbols.extend(
            self.wildcards
                .iter()
                .filter(|(namespace, _)| constraint.is_allowed(namespace))
                .map(|(_, &symbol)| symbol),
        );

        if constraint.is_open_ended() {
            symbols.push(self.last);
        }
        symbols
    }

    /// Human readable form of a symbol for diagnostics
    pub fn name_of(&self, symbol: usize) -> String {
        if let Some((name, _)) = self.names.iter().find(|(_, s)| **s == symbol) {
            return name.to_string();
        }
        if let Some((namespace, _)) = self.wildcards.iter().find(|(_, s)| **s == symbol) {
            return if namespace.is_empty() {
                "*".to_string()
            } else {
                format!("{{{}}}*", namespace)
            };
        }
        "##any".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::groups::ElementParticle;
    use crate::validators::particles::Occurs;
    use crate::validators::wildcards::XsdAnyElement;
    use std::sync::Arc;

    fn element(name: &str) -> MatchedParticle {
        MatchedParticle::Element(Arc::new(ElementParticle::new(
            QName::local(name),
            Occurs::once(),
        )))
    }

    fn wildcard() -> MatchedParticle {
        MatchedParticle::Any(Arc::new(XsdAnyElement::new()))
    }

    #[test]
    fn test_dense_symbols_in_insertion_order() {
        let mut symbols = SymbolsDictionary::new();
        assert_eq!(symbols.count(), 1);

        let a = symbols.add_name(&QName::local("a"), element("a"));
        let b = symbols.add_name(&QName::local("b"), element("b"));
        assert_eq!((a, b), (0, 1));
        assert_eq!(symbols.count(), 3);
        assert_eq!(symbols.last(), 2);
        assert_eq!(symbols.lookup(&QName::local("b")), 1);
        assert_eq!(symbols.lookup(&QName::local("zzz")), symbols.last());
        assert!(symbols.is_upa_enforced());
    }

    #[test]
    fn test_same_particle_keeps_upa() {
        let mut symbols = SymbolsDictionary::new();
        let a = element("a");
        symbols.add_name(&QName::local("a"), a.clone());
        symbols.add_name(&QName::local("a"), a);
        assert!(symbols.is_upa_enforced());
    }

    #[test]
    fn test_different_particles_break_upa() {
        let mut symbols = SymbolsDictionary::new();
        symbols.add_name(&QName::local("a"), element("a"));
        let again = symbols.add_name(&QName::local("a"), element("a"));
        assert_eq!(again, 0);
        assert!(!symbols.is_upa_enforced());
    }

    #[test]
    fn test_namespace_buckets() {
        let mut symbols = SymbolsDictionary::new();
        symbols.add_name(&QName::namespaced("urn:a", "x"), element("x"));
        let constraint = NamespaceConstraint::from_namespace_attr("urn:a urn:b", None).unwrap();
        symbols.add_namespace_list(&constraint, wildcard());

        assert_eq!(symbols.count(), 4);
        assert_eq!(symbols.lookup(&QName::namespaced("urn:b", "y")), 2);
        assert_eq!(symbols.lookup(&QName::namespaced("urn:c", "y")), symbols.last());
        assert_eq!(symbols.get_namespace_list_symbols(&constraint), vec![0, 1, 2]);
    }

    #[test]
    fn test_other_excludes_target_namespace() {
        let mut symbols = SymbolsDictionary::new();
        let constraint = NamespaceConstraint::from_namespace_attr("##other", Some("urn:t")).unwrap();
        let any = wildcard();
        symbols.add_namespace_list(&constraint, any.clone());

        let tns_symbol = symbols.lookup(&QName::namespaced("urn:t", "x"));
        assert_ne!(tns_symbol, symbols.last());
        assert!(symbols.get_particle(tns_symbol).is_none());
        assert_eq!(symbols.get_particle(symbols.last()), Some(&any));
        assert_eq!(
            symbols.get_namespace_list_symbols(&constraint),
            vec![symbols.last()]
        );
    }

    #[test]
    fn test_name_of() {
        let mut symbols = SymbolsDictionary::new();
        symbols.add_name(&QName::namespaced("urn:a", "x"), element("x"));
        let constraint = NamespaceConstraint::from_namespace_attr("urn:b", None).unwrap();
        symbols.add_namespace_list(&constraint, wildcard());
        assert_eq!(symbols.name_of(0), "{urn:a}x");
        assert_eq!(symbols.name_of(1), "{urn:b}*");
        assert_eq!(symbols.name_of(2), "##any");
    }
}
