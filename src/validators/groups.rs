//! XSD Model Groups
//!
//! The resolved particle tree a content model is compiled from:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content (elements only, each at most once)
//!
//! Group references are expected to be resolved already; a referenced
//! group appears here as a nested [`GroupParticle::Group`].
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Model_Groups

use crate::namespaces::QName;
use std::sync::Arc;

use super::identities::IdentityConstraint;
use super::particles::{Occurs, Particle};
use super::values::SimpleType;
use super::wildcards::XsdAnyElement;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of particles
    All,
}

impl ModelType {
    /// Parse from element tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" | "{http://www.w3.org/2001/XMLSchema}sequence" => Some(Self::Sequence),
            "choice" | "{http://www.w3.org/2001/XMLSchema}choice" => Some(Self::Choice),
            "all" | "{http://www.w3.org/2001/XMLSchema}all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A particle in a model group (element, wildcard, or nested group)
#[derive(Debug, Clone)]
pub enum GroupParticle {
    /// Element declaration
    Element(Arc<ElementParticle>),
    /// Wildcard (xs:any)
    Any(Arc<XsdAnyElement>),
    /// Nested model group
    Group(Arc<XsdGroup>),
}

impl GroupParticle {
    /// Get the occurrence constraints
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element(e) => e.occurs,
            Self::Any(a) => a.occurs,
            Self::Group(g) => g.occurs,
        }
    }

    /// Check if this particle is emptiable
    pub fn is_emptiable(&self) -> bool {
        match self {
            Self::Element(e) => e.occurs.is_emptiable(),
            Self::Any(a) => a.occurs.is_emptiable(),
            Self::Group(g) => g.is_emptiable(),
        }
    }
}

impl From<ElementParticle> for GroupParticle {
    fn from(element: ElementParticle) -> Self {
        Self::Element(Arc::new(element))
    }
}

impl From<XsdAnyElement> for GroupParticle {
    fn from(any: XsdAnyElement) -> Self {
        Self::Any(Arc::new(any))
    }
}

impl From<XsdGroup> for GroupParticle {
    fn from(group: XsdGroup) -> Self {
        Self::Group(Arc::new(group))
    }
}

/// Element particle in a model group
///
/// Besides the name and bounds, the declaration carries what the identity
/// constraint layer needs: the simple type of the element's value (when it
/// has simple content) and the constraints declared on it.
#[derive(Debug, Clone)]
pub struct ElementParticle {
    /// Element name
    pub name: QName,
    /// Occurrence constraints
    pub occurs: Occurs,
    /// Simple type of the element's content, `None` for complex content
    pub simple_type: Option<SimpleType>,
    /// Compiled identity constraints declared on this element
    pub identities: Vec<Arc<IdentityConstraint>>,
}

impl ElementParticle {
    /// Create a new element particle
    pub fn new(name: QName, occurs: Occurs) -> Self {
        Self {
            name,
            occurs,
            simple_type: None,
            identities: Vec::new(),
        }
    }

    /// Set the simple type of the element content
    pub fn with_simple_type(mut self, simple_type: impl Into<SimpleType>) -> Self {
        self.simple_type = Some(simple_type.into());
        self
    }

    /// Declare an identity constraint on this element
    pub fn with_identity(mut self, identity: IdentityConstraint) -> Self {
        self.identities.push(Arc::new(identity));
        self
    }
}

impl Particle for ElementParticle {
    fn occurs(&self) -> Occurs {
        self.occurs
    }
}

/// XSD Model Group (sequence, choice, all)
#[derive(Debug, Clone)]
pub struct XsdGroup {
    /// Optional name for named model groups
    pub name: Option<QName>,
    /// Model type (sequence, choice, all)
    pub model: ModelType,
    /// Particles in this group
    pub particles: Vec<GroupParticle>,
    /// Occurrence constraints
    pub occurs: Occurs,
    /// Whether content is mixed (text + elements)
    pub mixed: bool,
}

impl XsdGroup {
    /// Create a new model group
    pub fn new(model: ModelType) -> Self {
        Self {
            name: None,
            model,
            particles: Vec::new(),
            occurs: Occurs::once(),
            mixed: false,
        }
    }

    /// Create a named model group
    pub fn named(name: QName, model: ModelType) -> Self {
        Self {
            name: Some(name),
            ..Self::new(model)
        }
    }

    /// Shorthand for an `xs:sequence`
    pub fn sequence() -> Self {
        Self::new(ModelType::Sequence)
    }

    /// Shorthand for an `xs:choice`
    pub fn choice() -> Self {
        Self::new(ModelType::Choice)
    }

    /// Shorthand for an `xs:all`
    pub fn all() -> Self {
        Self::new(ModelType::All)
    }

    /// Set the occurrence bounds of the group itself
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Mark the group as mixed content
    pub fn with_mixed(mut self, mixed: bool) -> Self {
        self.mixed = mixed;
        self
    }

    /// Add any particle, builder style
    pub fn with(mut self, particle: impl Into<GroupParticle>) -> Self {
        self.add_particle(particle.into());
        self
    }

    /// Add an element particle, builder style
    pub fn with_element(mut self, name: QName, occurs: Occurs) -> Self {
        self.add_element(name, occurs);
        self
    }

    /// Add a particle to the group
    pub fn add_particle(&mut self, particle: GroupParticle) {
        self.particles.push(particle);
    }

    /// Add an element particle and return it, so callers can keep the
    /// handle and compare it with what the validator reports as matched
    pub fn add_element(&mut self, name: QName, occurs: Occurs) -> Arc<ElementParticle> {
        let element = Arc::new(ElementParticle::new(name, occurs));
        self.particles.push(GroupParticle::Element(Arc::clone(&element)));
        element
    }

    /// Add a wildcard particle
    pub fn add_any(&mut self, any: XsdAnyElement) -> Arc<XsdAnyElement> {
        let any = Arc::new(any);
        self.particles.push(GroupParticle::Any(Arc::clone(&any)));
        any
    }

    /// Add a nested group
    pub fn add_group(&mut self, group: XsdGroup) {
        self.particles.push(GroupParticle::Group(Arc::new(group)));
    }

    /// Check if group is empty
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Check if group can produce empty content
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.min == 0 {
            return true;
        }
        if self.particles.is_empty() {
            return true;
        }

        match self.model {
            // Choice is emptiable if any branch is emptiable
            ModelType::Choice => self.particles.iter().any(|p| p.is_emptiable()),
            // Sequence/All is emptiable only if all particles are emptiable
            ModelType::Sequence | ModelType::All => {
                self.particles.iter().all(|p| p.is_emptiable())
            }
        }
    }

    /// Iterate over direct particles
    pub fn iter(&self) -> impl Iterator<Item = &GroupParticle> {
        self.particles.iter()
    }

    /// Get number of particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }
}

impl Particle for XsdGroup {
    fn occurs(&self) -> Occurs {
        self.occurs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_from_tag() {
        assert_eq!(ModelType::from_tag("sequence"), Some(ModelType::Sequence));
        assert_eq!(ModelType::from_tag("choice"), Some(ModelType::Choice));
        assert_eq!(ModelType::from_tag("all"), Some(ModelType::All));
        assert_eq!(ModelType::from_tag("invalid"), None);
    }

    #[test]
    fn test_group_creation() {
        let group = XsdGroup::new(ModelType::Sequence);
        assert_eq!(group.model, ModelType::Sequence);
        assert!(group.particles.is_empty());
        assert_eq!(group.occurs, Occurs::once());

        let named = XsdGroup::named(QName::local("myGroup"), ModelType::Choice);
        assert_eq!(named.name, Some(QName::local("myGroup")));
        assert_eq!(named.model, ModelType::Choice);
    }

    #[test]
    fn test_add_elements() {
        let mut group = XsdGroup::sequence();
        let first = group.add_element(QName::local("first"), Occurs::once());
        group.add_element(QName::local("second"), Occurs::optional());
        group.add_element(QName::local("third"), Occurs::zero_or_more());

        assert_eq!(group.len(), 3);
        match &group.particles[0] {
            GroupParticle::Element(e) => assert!(Arc::ptr_eq(e, &first)),
            other => panic!("unexpected particle {:?}", other),
        }
    }

    #[test]
    fn test_is_emptiable_sequence() {
        let mut group = XsdGroup::sequence();
        assert!(group.is_emptiable());

        group.add_element(QName::local("required"), Occurs::once());
        assert!(!group.is_emptiable());

        group.add_element(QName::local("optional"), Occurs::optional());
        assert!(!group.is_emptiable());
    }

    #[test]
    fn test_is_emptiable_choice() {
        let group = XsdGroup::choice()
            .with_element(QName::local("required"), Occurs::once())
            .with_element(QName::local("optional"), Occurs::optional());

        assert!(group.is_emptiable());
    }

    #[test]
    fn test_nested_group() {
        let inner = XsdGroup::sequence()
            .with_element(QName::local("a"), Occurs::once())
            .with_element(QName::local("b"), Occurs::once());

        let outer = XsdGroup::choice()
            .with(inner)
            .with_element(QName::local("c"), Occurs::once());

        assert_eq!(outer.len(), 2);
        assert!(!outer.is_emptiable());
        assert!(outer.clone().with_occurs(Occurs::optional()).is_emptiable());
    }

    #[test]
    fn test_matched_particles_are_the_added_handles() {
        use crate::models::{ContentModelBuilder, ContentValidation, MatchedParticle, ValidationState};

        let mut inner = XsdGroup::choice();
        let b = inner.add_element(QName::local("b"), Occurs::once());
        let mut group = XsdGroup::sequence();
        let a = group.add_element(QName::local("a"), Occurs::once());
        group.add_group(inner);
        let any = group.add_any(XsdAnyElement::new());
        assert_eq!(group.len(), 3);

        let model = ContentModelBuilder::default().build(&group).unwrap();
        let validator = model.validator();
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);

        match validator.validate_element(&QName::local("a"), &mut state) {
            Ok(Some(MatchedParticle::Element(matched))) => assert!(Arc::ptr_eq(&matched, &a)),
            other => panic!("unexpected match {:?}", other),
        }
        match validator.validate_element(&QName::local("b"), &mut state) {
            Ok(Some(MatchedParticle::Element(matched))) => assert!(Arc::ptr_eq(&matched, &b)),
            other => panic!("unexpected match {:?}", other),
        }
        match validator.validate_element(&QName::namespaced("urn:x", "z"), &mut state) {
            Ok(Some(MatchedParticle::Any(matched))) => assert!(Arc::ptr_eq(&matched, &any)),
            other => panic!("unexpected match {:?}", other),
        }
        assert!(validator.complete_validation(&state));
    }

    #[test]
    fn test_element_particle_builder() {
        use crate::validators::values::{AtomicType, SimpleType};

        let element = ElementParticle::new(QName::local("id"), Occurs::once())
            .with_simple_type(AtomicType::Integer);
        assert_eq!(element.simple_type, Some(SimpleType::atomic(AtomicType::Integer)));
        assert!(element.identities.is_empty());
    }
}
