//! Content model compilation and matching
//!
//! A complex type's particle tree is compiled once into a
//! [`ContentValidator`] and then shared by every validation that needs it.
//! Per-element progress lives in a caller owned [`ValidationState`].
//!
//! ```rust
//! use xmlschema_automata::models::{ContentModelBuilder, ContentValidation, ValidationState};
//! use xmlschema_automata::namespaces::QName;
//! use xmlschema_automata::validators::{Occurs, XsdGroup};
//!
//! let group = XsdGroup::sequence()
//!     .with_element(QName::local("title"), Occurs::once())
//!     .with_element(QName::local("para"), Occurs::zero_or_more());
//! let model = ContentModelBuilder::default().build(&group).unwrap();
//! let validator = model.validator();
//!
//! let mut state = ValidationState::new();
//! validator.init_validation(&mut state);
//! validator.validate_element(&QName::local("title"), &mut state).unwrap();
//! validator.validate_element(&QName::local("para"), &mut state).unwrap();
//! assert!(validator.complete_validation(&state));
//! ```

pub mod all;
pub mod bitset;
pub mod builder;
pub mod dfa;
pub mod nfa;
pub mod positions;
pub mod range;
pub mod state;
pub mod symbols;
pub mod syntax;
pub mod upa;
pub mod validator;

pub use all::AllElementsContentValidator;
pub use bitset::BitSet;
pub use builder::{ContentModel, ContentModelBuilder, ModelOptions};
pub use dfa::DfaContentValidator;
pub use nfa::NfaContentValidator;
pub use positions::{MatchedParticle, Position, Positions, Terminal};
pub use range::RangeContentValidator;
pub use state::{Cursor, RangePosition, ValidationState};
pub use symbols::SymbolsDictionary;
pub use syntax::{NodeId, PositionTables, RangeNode, SyntaxNode, SyntaxTree};
pub use upa::UpaViolation;
pub use validator::{ContentError, ContentType, ContentValidation, ContentValidator, ValidatorKind};
