//! # xmlschema-automata
//!
//! The matching core of an XML Schema validator: content model automata
//! and streaming identity constraint evaluation.
//!
//! ## Features
//!
//! - Compile a resolved model group into a content validator. The
//!   builder picks a DFA, an NFA, a counting range validator or an
//!   `xs:all` validator depending on the model.
//! - Unique Particle Attribution checking while compiling
//! - Restricted XPath (selector and field subset) compiled into forward
//!   axes and matched incrementally on start and end tags
//! - `xs:key`, `xs:unique` and `xs:keyref` evaluation with typed value
//!   equality
//! - Resource limits for every structure that grows with the input
//!
//! ## Example
//!
//! ```rust
//! use xmlschema_automata::documents::Document;
//! use xmlschema_automata::limits::Limits;
//! use xmlschema_automata::namespaces::{NamespaceContext, QName};
//! use xmlschema_automata::validators::{
//!     AtomicType, Declarations, ElementParticle, IdentityBuilder, IdentityValidator, Occurs,
//! };
//!
//! let key = IdentityBuilder::key()
//!     .name(QName::local("isbn"))
//!     .selector("book")
//!     .field("@isbn")
//!     .compile(&NamespaceContext::new(), &Limits::default())?;
//!
//! let declarations = Declarations::new()
//!     .with_element(ElementParticle::new(QName::local("library"), Occurs::once()).with_identity(key))
//!     .with_attribute(QName::local("isbn"), AtomicType::Token);
//!
//! let document = Document::from_string(r#"<library><book isbn="1"/><book isbn=" 1 "/></library>"#)?;
//! let violations = IdentityValidator::new().validate_document(&document, &declarations);
//! assert_eq!(violations.len(), 1);
//! # Ok::<(), xmlschema_automata::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod names;
pub mod namespaces;

// Document replay
pub mod documents;

// Schema components and identity constraints
pub mod validators;

// Content model automata
pub mod models;

// Selector and field matching
pub mod xpath;

pub use error::{Error, Result};

/// Version of the xmlschema-automata library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
