//! XPath Support for Identity Constraints
//!
//! Selectors and fields of `xs:unique`, `xs:key` and `xs:keyref` use a
//! restricted XPath subset that can be evaluated while streaming, without
//! building a tree.
//!
//! ## Overview
//!
//! - [`parsers`] turns an expression into union branches of name steps
//!   and rejects anything outside the subset.
//! - [`axes`] resolves prefixes and compiles the branches into an
//!   [`Asttree`] of [`ForwardAxis`] chains. A compiled tree is immutable
//!   and shared between validations.
//! - [`active`] holds the per-validation matcher ([`ActiveAxis`]) driven
//!   by start tags, attributes and end tags.
//!
//! ```rust
//! use std::sync::Arc;
//! use xmlschema_automata::limits::Limits;
//! use xmlschema_automata::namespaces::{NamespaceContext, QName};
//! use xmlschema_automata::xpath::{ActiveAxis, Asttree};
//!
//! let tree = Asttree::compile("a/b", false, &NamespaceContext::new(), &Limits::default()).unwrap();
//! let mut axis = ActiveAxis::new(Arc::new(tree));
//!
//! assert!(!axis.move_to_start_element(&QName::local("x")));
//! assert!(!axis.move_to_start_element(&QName::local("a")));
//! assert!(axis.move_to_start_element(&QName::local("b")));
//! ```

pub mod active;
pub mod axes;
pub mod parsers;

pub use active::{name_matches, ActiveAxis, AxisElement, AxisStack};
pub use axes::{Asttree, Axis, AxisKind, DoubleLinkAxis, ForwardAxis};
pub use parsers::{IdentityXPathParser, NodeTest, ParsedPath, ParsedStep, XPathAxis, XPathParseError};

impl From<XPathParseError> for crate::error::Error {
    fn from(err: XPathParseError) -> Self {
        crate::error::Error::Parse(crate::error::ParseError::new(err.to_string()))
    }
}
