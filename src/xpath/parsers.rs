//! Parser for identity-constraint XPath expressions
//!
//! `xs:selector` and `xs:field` accept a small XPath subset:
//!
//! ```text
//! Selector ::= Path ( '|' Path )*
//! Path     ::= ('.//')? Step ( '/' Step )*
//! Field    ::= FPath ( '|' FPath )*
//! FPath    ::= ('.//')? ( Step '/' )* ( Step | '@' NameTest )
//! Step     ::= '.' | NameTest
//! NameTest ::= QName | '*' | NCName ':' '*'
//! ```
//!
//! `child::` and `attribute::` are accepted as the long forms of the
//! default and `@` steps. Everything else (predicates, functions, other
//! axes, absolute paths, `//` past the first step) is rejected.

use std::fmt;

use crate::names::is_valid_ncname;

/// XPath axis types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathAxis {
    /// child:: axis (default)
    Child,
    /// descendant:: axis
    Descendant,
    /// descendant-or-self:: axis
    DescendantOrSelf,
    /// self:: axis
    Self_,
    /// parent:: axis
    Parent,
    /// ancestor:: axis
    Ancestor,
    /// ancestor-or-self:: axis
    AncestorOrSelf,
    /// following-sibling:: axis
    FollowingSibling,
    /// preceding-sibling:: axis
    PrecedingSibling,
    /// following:: axis
    Following,
    /// preceding:: axis
    Preceding,
    /// attribute:: axis
    Attribute,
    /// namespace:: axis
    Namespace,
}

impl XPathAxis {
    /// Parse axis from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Self::Child),
            "descendant" => Some(Self::Descendant),
            "descendant-or-self" => Some(Self::DescendantOrSelf),
            "self" => Some(Self::Self_),
            "parent" => Some(Self::Parent),
            "ancestor" => Some(Self::Ancestor),
            "ancestor-or-self" => Some(Self::AncestorOrSelf),
            "following-sibling" => Some(Self::FollowingSibling),
            "preceding-sibling" => Some(Self::PrecedingSibling),
            "following" => Some(Self::Following),
            "preceding" => Some(Self::Preceding),
            "attribute" => Some(Self::Attribute),
            "namespace" => Some(Self::Namespace),
            _ => None,
        }
    }
}

impl fmt::Display for XPathAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::Self_ => "self",
            Self::Parent => "parent",
            Self::Ancestor => "ancestor",
            Self::AncestorOrSelf => "ancestor-or-self",
            Self::FollowingSibling => "following-sibling",
            Self::PrecedingSibling => "preceding-sibling",
            Self::Following => "following",
            Self::Preceding => "preceding",
            Self::Attribute => "attribute",
            Self::Namespace => "namespace",
        };
        write!(f, "{}", s)
    }
}

/// Node test in an XPath step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Name test (element or attribute name)
    Name {
        /// Namespace prefix
        prefix: Option<String>,
        /// Local name
        local: String,
    },
    /// Wildcard test (*)
    Wildcard,
    /// Namespace wildcard (prefix:*)
    NamespaceWildcard(String),
    /// node() test, the implicit test of `.` and `//`
    Node,
}

impl NodeTest {
    /// Parse a node test from a string
    pub fn parse(s: &str) -> Result<Self, XPathParseError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        if s == "*" {
            return Ok(Self::Wildcard);
        }
        if s == "node()" {
            return Ok(Self::Node);
        }
        if s.contains('(') || s.contains('[') {
            return Err(XPathParseError::InvalidSyntax(format!(
                "'{}': only name tests are allowed",
                s
            )));
        }

        if let Some(prefix) = s.strip_suffix(":*") {
            if !is_valid_ncname(prefix) {
                return Err(XPathParseError::InvalidSyntax(format!("invalid prefix '{}'", prefix)));
            }
            return Ok(Self::NamespaceWildcard(prefix.to_string()));
        }

        let (prefix, local) = match s.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, s),
        };
        if prefix.map_or(false, |p| !is_valid_ncname(p)) || !is_valid_ncname(local) {
            return Err(XPathParseError::InvalidSyntax(format!("invalid name test '{}'", s)));
        }

        Ok(Self::Name {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        })
    }

    /// Get the local name if this is a name test
    pub fn local_name(&self) -> Option<&str> {
        match self {
            Self::Name { local, .. } => Some(local),
            _ => None,
        }
    }

    /// Get the prefix of a prefixed name test or namespace wildcard
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Name { prefix, .. } => prefix.as_deref(),
            Self::NamespaceWildcard(prefix) => Some(prefix),
            _ => None,
        }
    }
}

/// A parsed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStep {
    /// The axis
    pub axis: XPathAxis,
    /// The node test
    pub node_test: NodeTest,
}

impl ParsedStep {
    /// Parse a single step (no `/` inside)
    pub fn parse(step: &str) -> Result<Self, XPathParseError> {
        let step = step.trim();

        if step.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        if step == "." {
            return Ok(Self {
                axis: XPathAxis::Self_,
                node_test: NodeTest::Node,
            });
        }
        if step == ".." {
            return Ok(Self {
                axis: XPathAxis::Parent,
                node_test: NodeTest::Node,
            });
        }
        if step.contains('[') {
            return Err(XPathParseError::InvalidSyntax(format!(
                "'{}': predicates are not allowed",
                step
            )));
        }

        let (axis, node_test) = if let Some(rest) = step.strip_prefix('@') {
            (XPathAxis::Attribute, rest)
        } else if let Some((axis, rest)) = step.split_once("::") {
            let axis = axis.trim();
            let axis = XPathAxis::parse(axis)
                .ok_or_else(|| XPathParseError::UnknownAxis(axis.to_string()))?;
            (axis, rest)
        } else {
            (XPathAxis::Child, step)
        };

        Ok(Self {
            axis,
            node_test: NodeTest::parse(node_test)?,
        })
    }
}

/// One `|`-separated branch of an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// The branch as written
    pub expression: String,
    /// Whether the branch starts with `.//`
    pub is_descendant: bool,
    /// Steps after the leading `.` / `.//` and with inner `.` steps dropped;
    /// a branch that is just `.` keeps one self step
    pub steps: Vec<ParsedStep>,
}

impl ParsedPath {
    /// Split a branch on `/` and parse each step
    pub fn parse(expression: &str) -> Result<Self, XPathParseError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        if expression.starts_with('/') {
            return Err(XPathParseError::InvalidSyntax(format!(
                "'{}': absolute paths are not allowed",
                expression
            )));
        }

        let mut raw = Vec::new();
        let mut is_descendant = false;
        for (index, part) in expression.split('/').enumerate() {
            if part.trim().is_empty() {
                // the empty part between the slashes of a leading ".//"
                if index == 1 && !is_descendant && raw.len() == 1 && expression.contains("//") {
                    is_descendant = true;
                    continue;
                }
                return Err(XPathParseError::InvalidSyntax(format!(
                    "'{}': '//' is only allowed after a leading '.'",
                    expression
                )));
            }
            raw.push(ParsedStep::parse(part)?);
        }

        if is_descendant && raw[0].axis != XPathAxis::Self_ {
            return Err(XPathParseError::InvalidSyntax(format!(
                "'{}': '//' is only allowed after a leading '.'",
                expression
            )));
        }

        let only_self = raw.iter().all(|step| step.axis == XPathAxis::Self_);
        let steps: Vec<ParsedStep> = if only_self && !is_descendant {
            raw.truncate(1);
            raw
        } else {
            raw.into_iter()
                .filter(|step| step.axis != XPathAxis::Self_)
                .collect()
        };
        if steps.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }

        Ok(Self {
            expression: expression.to_string(),
            is_descendant,
            steps,
        })
    }

    /// Get the number of steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether the last step selects an attribute
    pub fn is_attribute(&self) -> bool {
        self.steps.last().map_or(false, |step| step.axis == XPathAxis::Attribute)
    }

    /// Whether the branch is a bare `.`
    pub fn is_self(&self) -> bool {
        self.steps.len() == 1 && self.steps[0].axis == XPathAxis::Self_
    }
}

/// XPath parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathParseError {
    /// Unknown axis name
    UnknownAxis(String),
    /// Invalid syntax
    InvalidSyntax(String),
    /// Unexpected end of expression
    UnexpectedEnd,
}

impl fmt::Display for XPathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAxis(axis) => write!(f, "Unknown XPath axis: {}", axis),
            Self::InvalidSyntax(msg) => write!(f, "Invalid XPath syntax: {}", msg),
            Self::UnexpectedEnd => write!(f, "Unexpected end of XPath expression"),
        }
    }
}

impl std::error::Error for XPathParseError {}

/// Parser for identity constraint XPath (xs:selector, xs:field)
#[derive(Debug, Clone)]
pub struct IdentityXPathParser {
    /// Whether a final attribute step is allowed
    allow_attributes: bool,
}

impl Default for IdentityXPathParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityXPathParser {
    /// Create a new parser for selector expressions
    pub fn new() -> Self {
        Self {
            allow_attributes: false,
        }
    }

    /// Create a parser for field expressions (allows attributes)
    pub fn for_field() -> Self {
        Self {
            allow_attributes: true,
        }
    }

    /// Parse an expression into its union branches
    pub fn parse(&self, xpath: &str) -> Result<Vec<ParsedPath>, XPathParseError> {
        if xpath.trim().is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        xpath
            .split('|')
            .map(|branch| {
                let parsed = ParsedPath::parse(branch)?;
                self.validate(&parsed)?;
                Ok(parsed)
            })
            .collect()
    }

    fn validate(&self, parsed: &ParsedPath) -> Result<(), XPathParseError> {
        let last = parsed.steps.len() - 1;
        for (index, step) in parsed.steps.iter().enumerate() {
            match step.axis {
                XPathAxis::Child => {}
                XPathAxis::Self_ if parsed.is_self() => {}
                XPathAxis::Attribute if !self.allow_attributes => {
                    return Err(XPathParseError::InvalidSyntax(format!(
                        "'{}': attributes cannot be selected",
                        parsed.expression
                    )));
                }
                XPathAxis::Attribute if index != last => {
                    return Err(XPathParseError::InvalidSyntax(format!(
                        "'{}': an attribute step must be the last one",
                        parsed.expression
                    )));
                }
                XPathAxis::Attribute => {}
                axis => {
                    return Err(XPathParseError::InvalidSyntax(format!(
                        "'{}': axis {} not allowed in identity constraint",
                        parsed.expression, axis
                    )));
                }
            }
            if step.node_test == NodeTest::Node && step.axis != XPathAxis::Self_ {
                return Err(XPathParseError::InvalidSyntax(format!(
                    "'{}': only name tests are allowed",
                    parsed.expression
                )));
            }
        }
        Ok(())
    }
}
