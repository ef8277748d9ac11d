//! XSD element wildcards
//!
//! `xs:any` particles and their namespace constraints. A content model
//! compiles every wildcard into one symbol per namespace bucket it can
//! match, so the constraint has to expose both a membership test and the
//! list of namespaces it names explicitly.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Wildcards

use crate::error::ParseError;
use crate::namespaces::QName;
use indexmap::IndexSet;
use std::fmt;

use super::particles::{Occurs, Particle};

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// The empty string stands for "no namespace" everywhere in this type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except target namespace and no namespace (##other)
    Other {
        /// The target namespace to exclude
        target_namespace: Option<String>,
    },
    /// Specific set of allowed namespaces
    Enumeration(IndexSet<String>),
    /// Set of disallowed namespaces (notNamespace)
    Not(IndexSet<String>),
}

fn parse_namespace_list(
    value: &str,
    target_namespace: Option<&str>,
    attribute: &str,
) -> Result<IndexSet<String>, ParseError> {
    let mut namespaces = IndexSet::new();
    for ns in value.split_whitespace() {
        match ns {
            "##local" => {
                namespaces.insert(String::new());
            }
            "##targetNamespace" => {
                namespaces.insert(target_namespace.unwrap_or("").to_string());
            }
            s if s.starts_with("##") => {
                return Err(ParseError::new(format!(
                    "wrong value '{}' in '{}' attribute",
                    s, attribute
                )));
            }
            uri => {
                namespaces.insert(uri.to_string());
            }
        }
    }
    Ok(namespaces)
}

impl NamespaceConstraint {
    /// Create from namespace attribute value
    pub fn from_namespace_attr(
        value: &str,
        target_namespace: Option<&str>,
    ) -> Result<Self, ParseError> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace
                    .filter(|ns| !ns.is_empty())
                    .map(String::from),
            }),
            other => Ok(Self::Enumeration(parse_namespace_list(
                other,
                target_namespace,
                "namespace",
            )?)),
        }
    }

    /// Create from notNamespace attribute
    pub fn from_not_namespace_attr(
        value: &str,
        target_namespace: Option<&str>,
    ) -> Result<Self, ParseError> {
        Ok(Self::Not(parse_namespace_list(
            value,
            target_namespace,
            "notNamespace",
        )?))
    }

    /// Check if a namespace ("" for none) is allowed by this constraint
    pub fn is_allowed(&self, namespace: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => {
                !namespace.is_empty() && target_namespace.as_deref() != Some(namespace)
            }
            Self::Enumeration(set) => set.contains(namespace),
            Self::Not(set) => !set.contains(namespace),
        }
    }

    /// Check if a qualified name is allowed by this constraint
    pub fn allows(&self, name: &QName) -> bool {
        self.is_allowed(name.namespace_or_empty())
    }

    /// Namespaces the constraint rules out explicitly
    ///
    /// `##other` excludes its target namespace and the absent namespace.
    pub fn excluded(&self) -> Vec<&str> {
        match self {
            Self::Any | Self::Enumeration(_) => Vec::new(),
            Self::Other { target_namespace } => {
                let mut excluded = vec![target_namespace.as_deref().unwrap_or("")];
                if !excluded.contains(&"") {
                    excluded.push("");
                }
                excluded
            }
            Self::Not(set) => set.iter().map(String::as_str).collect(),
        }
    }

    /// Whether names outside every explicitly listed namespace are allowed
    pub fn is_open_ended(&self) -> bool {
        !matches!(self, Self::Enumeration(_))
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(set: &IndexSet<String>) -> String {
            set.iter()
                .map(|ns| if ns.is_empty() { "##local" } else { ns.as_str() })
                .collect::<Vec<_>>()
                .join(" ")
        }

        match self {
            Self::Any => write!(f, "##any"),
            Self::Other { .. } => write!(f, "##other"),
            Self::Enumeration(set) => write!(f, "{}", list(set)),
            Self::Not(set) => write!(f, "not {}", list(set)),
        }
    }
}

/// XSD element wildcard (xs:any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdAnyElement {
    /// Namespace constraint
    pub namespace: NamespaceConstraint,
    /// Process contents mode
    pub process_contents: ProcessContents,
    /// Occurrence bounds
    pub occurs: Occurs,
}

impl XsdAnyElement {
    /// `##any`, strict, exactly once
    pub fn new() -> Self {
        Self {
            namespace: NamespaceConstraint::Any,
            process_contents: ProcessContents::Strict,
            occurs: Occurs::once(),
        }
    }

    /// Wildcard with explicit settings
    pub fn with_settings(
        namespace: NamespaceConstraint,
        process_contents: ProcessContents,
        occurs: Occurs,
    ) -> Self {
        Self {
            namespace,
            process_contents,
            occurs,
        }
    }

    /// Set the occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Check whether an element name is matched by this wildcard
    pub fn is_matching(&self, name: &QName) -> bool {
        self.namespace.allows(name)
    }
}

impl Default for XsdAnyElement {
    fn default() -> Self {
        Self::new()
    }
}

impl Particle for XsdAnyElement {
    fn occurs(&self) -> Occurs {
        self.occurs
    }
}

impl fmt::Display for XsdAnyElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "any element ({})", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TNS: &str = "http://example.com/ns";

    #[test]
    fn test_process_contents_parse() {
        assert_eq!(ProcessContents::parse("strict"), Some(ProcessContents::Strict));
        assert_eq!(ProcessContents::parse("lax"), Some(ProcessContents::Lax));
        assert_eq!(ProcessContents::parse("skip"), Some(ProcessContents::Skip));
        assert_eq!(ProcessContents::parse("invalid"), None);
    }

    #[test]
    fn test_namespace_constraint_any() {
        let nc = NamespaceConstraint::from_namespace_attr("##any", None).unwrap();
        assert!(nc.is_allowed(""));
        assert!(nc.is_allowed(TNS));
        assert!(nc.excluded().is_empty());
    }

    #[test]
    fn test_namespace_constraint_other() {
        let nc = NamespaceConstraint::from_namespace_attr("##other", Some(TNS)).unwrap();
        assert!(!nc.is_allowed(""));
        assert!(!nc.is_allowed(TNS));
        assert!(nc.is_allowed("http://other.com"));
        assert_eq!(nc.excluded(), vec![TNS, ""]);

        let no_tns = NamespaceConstraint::from_namespace_attr("##other", None).unwrap();
        assert_eq!(no_tns.excluded(), vec![""]);
    }

    #[test]
    fn test_namespace_constraint_enumeration() {
        let nc =
            NamespaceConstraint::from_namespace_attr("##local ##targetNamespace urn:x", Some(TNS))
                .unwrap();
        assert!(nc.is_allowed(""));
        assert!(nc.is_allowed(TNS));
        assert!(nc.is_allowed("urn:x"));
        assert!(!nc.is_allowed("urn:y"));
        assert!(!nc.is_open_ended());

        assert!(NamespaceConstraint::from_namespace_attr("##bogus", None).is_err());
    }

    #[test]
    fn test_namespace_constraint_not() {
        let nc = NamespaceConstraint::from_not_namespace_attr("##local urn:x", None).unwrap();
        assert!(!nc.is_allowed(""));
        assert!(!nc.is_allowed("urn:x"));
        assert!(nc.is_allowed("urn:y"));
        assert_eq!(nc.excluded(), vec!["", "urn:x"]);
    }

    #[test]
    fn test_any_element_matching() {
        let any = XsdAnyElement::with_settings(
            NamespaceConstraint::from_namespace_attr("##other", Some(TNS)).unwrap(),
            ProcessContents::Lax,
            Occurs::zero_or_more(),
        );
        assert!(any.is_matching(&QName::namespaced("urn:x", "a")));
        assert!(!any.is_matching(&QName::namespaced(TNS, "a")));
        assert!(!any.is_matching(&QName::local("a")));
        assert_eq!(any.to_string(), "any element (##other)");
    }
}
