//! Schema components consumed by the content model compiler and the
//! identity constraint checker
//!
//! Components arrive here already resolved: references are followed,
//! groups are expanded and names carry their namespace. Nothing in this
//! module reads schema documents.

pub mod constraints;
pub mod groups;
pub mod identities;
pub mod keys;
pub mod particles;
pub mod values;
pub mod wildcards;

pub use constraints::{
    ConstraintStruct, Declarations, IdentityValidator, IdentityViolation, KSStruct,
    LocatedActiveAxis, SelectorActiveAxis,
};
pub use groups::{ElementParticle, GroupParticle, ModelType, XsdGroup};
pub use identities::{
    IdentityBuilder, IdentityConstraint, IdentityConstraintKind, XsdField, XsdIdentity,
    XsdSelector,
};
pub use keys::{KeySequence, TypedObject};
pub use particles::{parse_occurs, Occurs, OccursShape, Particle};
pub use values::{AtomicType, AtomicValue, SimpleType, WhiteSpace};
pub use wildcards::{NamespaceConstraint, ProcessContents, XsdAnyElement};
