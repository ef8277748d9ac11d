//! XSD Identity Constraints
//!
//! This module describes identity constraints as declared in a schema:
//! - xs:unique - Ensures values are unique within scope
//! - xs:key - Like unique, but all field values must be present
//! - xs:keyref - References a key/unique constraint (foreign key)
//!
//! A declaration ([`XsdIdentity`]) is compiled once into an
//! [`IdentityConstraint`] whose selector and fields are [`Asttree`]s. The
//! compiled form is what element declarations carry and what
//! [`IdentityValidator`](super::constraints::IdentityValidator) runs.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};
use crate::xpath::{Asttree, IdentityXPathParser};

/// XPath selector for identity constraints.
/// The selector identifies which elements are subject to the constraint.
#[derive(Debug, Clone)]
pub struct XsdSelector {
    /// The XPath expression
    pub xpath: String,
    /// XPath default namespace (XSD 1.1)
    pub xpath_default_namespace: Option<String>,
    /// Parse errors
    errors: Vec<ParseError>,
}

impl XsdSelector {
    /// Create a new selector with the given XPath expression
    pub fn new(xpath: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
            xpath_default_namespace: None,
            errors: Vec::new(),
        }
    }

    /// Create a selector with default namespace
    pub fn with_default_namespace(xpath: impl Into<String>, ns: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
            xpath_default_namespace: Some(ns.into()),
            errors: Vec::new(),
        }
    }

    /// Check the expression against the selector subset
    pub fn validate(&mut self) -> bool {
        match IdentityXPathParser::new().parse(&self.xpath) {
            Ok(_) => true,
            Err(err) => {
                self.errors.push(
                    ParseError::new(format!("invalid selector: {}", err))
                        .with_source(self.xpath.clone()),
                );
                false
            }
        }
    }

    /// Get parse errors
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn compile(&self, namespaces: &NamespaceContext, limits: &Limits) -> Result<Asttree> {
        Asttree::compile_with_default(
            &self.xpath,
            false,
            namespaces,
            self.xpath_default_namespace.as_deref(),
            limits,
        )
    }
}

/// XPath field selector for identity constraints.
/// Fields identify which values form the key within selected elements.
#[derive(Debug, Clone)]
pub struct XsdField {
    /// The XPath expression
    pub xpath: String,
    /// XPath default namespace (XSD 1.1)
    pub xpath_default_namespace: Option<String>,
    /// Parse errors
    errors: Vec<ParseError>,
}

impl XsdField {
    /// Create a new field with the given XPath expression
    pub fn new(xpath: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
            xpath_default_namespace: None,
            errors: Vec::new(),
        }
    }

    /// Create a field with default namespace
    pub fn with_default_namespace(xpath: impl Into<String>, ns: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
            xpath_default_namespace: Some(ns.into()),
            errors: Vec::new(),
        }
    }

    /// Check the expression against the field subset
    pub fn validate(&mut self) -> bool {
        match IdentityXPathParser::for_field().parse(&self.xpath) {
            Ok(_) => true,
            Err(err) => {
                self.errors.push(
                    ParseError::new(format!("invalid field: {}", err))
                        .with_source(self.xpath.clone()),
                );
                false
            }
        }
    }

    /// Get parse errors
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn compile(&self, namespaces: &NamespaceContext, limits: &Limits) -> Result<Asttree> {
        Asttree::compile_with_default(
            &self.xpath,
            true,
            namespaces,
            self.xpath_default_namespace.as_deref(),
            limits,
        )
    }
}

/// Type of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityConstraintKind {
    /// xs:unique - values must be unique, but fields can be missing
    Unique,
    /// xs:key - values must be unique AND all fields must be present
    Key,
    /// xs:keyref - references a key or unique constraint
    Keyref,
}

impl fmt::Display for IdentityConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => write!(f, "unique"),
            Self::Key => write!(f, "key"),
            Self::Keyref => write!(f, "keyref"),
        }
    }
}

/// An identity constraint declaration
#[derive(Debug, Clone)]
pub struct XsdIdentity {
    /// Constraint name
    pub name: QName,
    /// Kind of constraint
    pub kind: IdentityConstraintKind,
    /// XPath selector
    pub selector: XsdSelector,
    /// XPath fields
    pub fields: Vec<XsdField>,
    /// Reference to another constraint (for keyref)
    pub refer: Option<QName>,
    /// Parse errors
    errors: Vec<ParseError>,
}

impl XsdIdentity {
    /// Create a new identity constraint
    pub fn new(name: QName, kind: IdentityConstraintKind, selector: XsdSelector) -> Self {
        Self {
            name,
            kind,
            selector,
            fields: Vec::new(),
            refer: None,
            errors: Vec::new(),
        }
    }

    /// Create a unique constraint
    pub fn unique(name: QName, selector: XsdSelector) -> Self {
        Self::new(name, IdentityConstraintKind::Unique, selector)
    }

    /// Create a key constraint
    pub fn key(name: QName, selector: XsdSelector) -> Self {
        Self::new(name, IdentityConstraintKind::Key, selector)
    }

    /// Create a keyref constraint
    pub fn keyref(name: QName, selector: XsdSelector, refer: QName) -> Self {
        let mut identity = Self::new(name, IdentityConstraintKind::Keyref, selector);
        identity.refer = Some(refer);
        identity
    }

    /// Add a field to this constraint
    pub fn add_field(&mut self, field: XsdField) {
        self.fields.push(field);
    }

    /// Add multiple fields
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = XsdField>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Set the refer attribute (for keyref)
    pub fn with_refer(mut self, refer: QName) -> Self {
        self.refer = Some(refer);
        self
    }

    /// Check if this is a keyref constraint
    pub fn is_keyref(&self) -> bool {
        matches!(self.kind, IdentityConstraintKind::Keyref)
    }

    /// Validate the declaration, collecting every problem found
    pub fn validate(&mut self) -> bool {
        let mut valid = true;

        if !self.selector.validate() {
            valid = false;
            self.errors.extend(self.selector.errors().iter().cloned());
        }

        if self.fields.is_empty() {
            self.errors.push(ParseError::new(format!(
                "identity constraint '{}' must have at least one field",
                self.name
            )));
            valid = false;
        }

        for field in &mut self.fields {
            if !field.validate() {
                valid = false;
                self.errors.extend(field.errors().iter().cloned());
            }
        }

        if self.is_keyref() && self.refer.is_none() {
            self.errors.push(ParseError::new(format!(
                "keyref '{}' must have a 'refer' attribute",
                self.name
            )));
            valid = false;
        }

        valid
    }

    /// Get parse errors
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Compile the selector and fields
    ///
    /// `namespaces` resolves the prefixes used in the paths. The first
    /// problem found is returned.
    pub fn compile(&self, namespaces: &NamespaceContext, limits: &Limits) -> Result<IdentityConstraint> {
        let located = |err: Error| match err {
            Error::Parse(parse) => {
                Error::Parse(parse.with_location(format!("{} '{}'", self.kind, self.name)))
            }
            other => other,
        };

        if self.fields.is_empty() {
            return Err(Error::Parse(ParseError::new(format!(
                "identity constraint '{}' must have at least one field",
                self.name
            ))));
        }
        if self.is_keyref() && self.refer.is_none() {
            return Err(Error::Parse(ParseError::new(format!(
                "keyref '{}' must have a 'refer' attribute",
                self.name
            ))));
        }

        let selector = self.selector.compile(namespaces, limits).map_err(located)?;
        let fields = self
            .fields
            .iter()
            .map(|field| field.compile(namespaces, limits).map(Arc::new))
            .collect::<Result<Vec<_>>>()
            .map_err(located)?;

        Ok(IdentityConstraint {
            name: self.name.clone(),
            kind: self.kind,
            refer: self.refer.clone(),
            selector: Arc::new(selector),
            fields,
        })
    }
}

/// A compiled identity constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConstraint {
    /// Constraint name
    pub name: QName,
    /// Kind of constraint
    pub kind: IdentityConstraintKind,
    /// Referenced key or unique, for keyrefs
    pub refer: Option<QName>,
    /// Compiled selector
    pub selector: Arc<Asttree>,
    /// Compiled fields, one per key column
    pub fields: Vec<Arc<Asttree>>,
}

impl IdentityConstraint {
    /// Number of key columns
    pub fn dim(&self) -> usize {
        self.fields.len()
    }
}

/// Builder for identity constraints
#[derive(Debug)]
pub struct IdentityBuilder {
    name: Option<QName>,
    kind: IdentityConstraintKind,
    selector: Option<XsdSelector>,
    fields: Vec<XsdField>,
    refer: Option<QName>,
}

impl IdentityBuilder {
    fn new(kind: IdentityConstraintKind) -> Self {
        Self {
            name: None,
            kind,
            selector: None,
            fields: Vec::new(),
            refer: None,
        }
    }

    /// Create a builder for a unique constraint
    pub fn unique() -> Self {
        Self::new(IdentityConstraintKind::Unique)
    }

    /// Create a builder for a key constraint
    pub fn key() -> Self {
        Self::new(IdentityConstraintKind::Key)
    }

    /// Create a builder for a keyref constraint
    pub fn keyref() -> Self {
        Self::new(IdentityConstraintKind::Keyref)
    }

    /// Set the constraint name
    pub fn name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the selector
    pub fn selector(mut self, xpath: impl Into<String>) -> Self {
        self.selector = Some(XsdSelector::new(xpath));
        self
    }

    /// Add a field
    pub fn field(mut self, xpath: impl Into<String>) -> Self {
        self.fields.push(XsdField::new(xpath));
        self
    }

    /// Set the refer attribute (for keyref)
    pub fn refer(mut self, refer: QName) -> Self {
        self.refer = Some(refer);
        self
    }

    /// Build the identity constraint
    pub fn build(self) -> std::result::Result<XsdIdentity, ParseError> {
        let name = self
            .name
            .ok_or_else(|| ParseError::new("identity constraint must have a name"))?;

        let selector = self
            .selector
            .ok_or_else(|| ParseError::new("identity constraint must have a selector"))?;

        if self.fields.is_empty() {
            return Err(ParseError::new(
                "identity constraint must have at least one field",
            ));
        }

        if self.kind == IdentityConstraintKind::Keyref && self.refer.is_none() {
            return Err(ParseError::new("keyref must have a 'refer' attribute"));
        }

        let mut identity = XsdIdentity::new(name, self.kind, selector);
        for field in self.fields {
            identity.add_field(field);
        }
        Ok(match self.refer {
            Some(refer) => identity.with_refer(refer),
            None => identity,
        })
    }

    /// Build and compile in one go
    pub fn compile(self, namespaces: &NamespaceContext, limits: &Limits) -> Result<IdentityConstraint> {
        self.build()?.compile(namespaces, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_creation() {
        let selector = XsdSelector::new(".//item");
        assert_eq!(selector.xpath, ".//item");
        assert!(selector.xpath_default_namespace.is_none());

        let selector_ns = XsdSelector::with_default_namespace(".//item", "http://example.com");
        assert_eq!(
            selector_ns.xpath_default_namespace.as_deref(),
            Some("http://example.com")
        );
    }

    #[test]
    fn test_selector_and_field_validation() {
        let mut selector = XsdSelector::new("@id");
        assert!(!selector.validate());
        assert_eq!(selector.errors().len(), 1);

        let mut field = XsdField::new("@id");
        assert!(field.validate());
        let mut field = XsdField::new("a[1]");
        assert!(!field.validate());
    }

    #[test]
    fn test_identity_keyref_creation() {
        let identity = XsdIdentity::keyref(
            QName::local("orderProductRef"),
            XsdSelector::new(".//orderItem"),
            QName::local("productKey"),
        );

        assert!(identity.is_keyref());
        assert_eq!(identity.refer.as_ref().unwrap().local_name, "productKey");
    }

    #[test]
    fn test_identity_builder() {
        let identity = IdentityBuilder::key()
            .name(QName::local("bookKey"))
            .selector(".//book")
            .field("@isbn")
            .build()
            .unwrap();

        assert_eq!(identity.kind, IdentityConstraintKind::Key);
        assert_eq!(identity.name.local_name, "bookKey");
        assert_eq!(identity.selector.xpath, ".//book");
        assert_eq!(identity.fields[0].xpath, "@isbn");
    }

    #[test]
    fn test_builder_validation_errors() {
        let result = IdentityBuilder::unique().selector(".").field("@id").build();
        assert!(result.is_err());

        let result = IdentityBuilder::unique()
            .name(QName::local("test"))
            .field("@id")
            .build();
        assert!(result.is_err());

        let result = IdentityBuilder::unique()
            .name(QName::local("test"))
            .selector(".")
            .build();
        assert!(result.is_err());

        let result = IdentityBuilder::keyref()
            .name(QName::local("test"))
            .selector(".")
            .field("@id")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_identity_validation() {
        let mut identity = XsdIdentity::unique(QName::local("test"), XsdSelector::new(".//item"));

        assert!(!identity.validate());
        assert_eq!(identity.errors().len(), 1);

        let mut identity = identity.with_fields([XsdField::new("@id"), XsdField::new("..")]);
        identity.errors.clear();
        assert!(!identity.validate());
        assert_eq!(identity.errors().len(), 1);
    }

    #[test]
    fn test_compile() {
        let namespaces = NamespaceContext::new().with_prefix("p", "urn:p");
        let constraint = IdentityBuilder::keyref()
            .name(QName::local("ref"))
            .selector(".//p:order")
            .field("@product")
            .field("p:qty")
            .refer(QName::local("productKey"))
            .compile(&namespaces, &Limits::default())
            .unwrap();

        assert_eq!(constraint.dim(), 2);
        assert_eq!(constraint.kind, IdentityConstraintKind::Keyref);
        assert!(constraint.selector.axes()[0].is_dss());
        assert!(constraint.fields[0].axes()[0].is_attribute());
    }

    #[test]
    fn test_declaration_compiles_like_builder() {
        let mut declared = XsdIdentity::new(
            QName::local("ref"),
            IdentityConstraintKind::Keyref,
            XsdSelector::new("order"),
        );
        declared.add_field(XsdField::new("@product"));
        assert!(declared.compile(&NamespaceContext::new(), &Limits::default()).is_err());

        let declared = declared.with_refer(QName::local("productKey"));
        let built = IdentityBuilder::keyref()
            .name(QName::local("ref"))
            .selector("order")
            .field("@product")
            .refer(QName::local("productKey"))
            .build()
            .unwrap();
        assert_eq!(built.fields.len(), 1);
        assert_eq!(built.refer, declared.refer);

        let limits = Limits::default();
        assert_eq!(
            declared.compile(&NamespaceContext::new(), &limits).unwrap(),
            built.compile(&NamespaceContext::new(), &limits).unwrap()
        );
    }

    #[test]
    fn test_compile_errors_are_located() {
        let result = IdentityBuilder::unique()
            .name(QName::local("u"))
            .selector("q:item")
            .field("@id")
            .compile(&NamespaceContext::new(), &Limits::default());
        match result {
            Err(Error::Parse(err)) => {
                assert_eq!(err.location.as_deref(), Some("unique 'u'"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
