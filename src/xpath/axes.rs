//! Compiled selector and field paths
//!
//! A parsed branch becomes an [`Axis`] chain that points from the last step
//! back to the first one through `input`. The matcher wants to walk it the
//! other way too, so [`ForwardAxis`] flattens the chain into an arena of
//! [`DoubleLinkAxis`] nodes linked by index in both directions. Node `0`
//! is the root (first step), the last node is the top (final step).

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::namespaces::NamespaceContext;

use super::parsers::{IdentityXPathParser, NodeTest, ParsedPath, XPathAxis};

/// Step kinds that survive parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    /// Child element step
    Child,
    /// Final attribute step
    Attribute,
    /// A bare `.`
    Self_,
}

/// One resolved step of a reversed chain
///
/// An empty `name` matches any local name and an empty `urn` matches any
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    /// Step kind
    pub kind: AxisKind,
    /// Local name, empty for `*` and `p:*`
    pub name: String,
    /// Namespace URI, empty when unconstrained
    pub urn: String,
    /// Preceding step
    pub input: Option<Box<Axis>>,
}

impl Axis {
    /// Resolve a parsed branch into a reversed chain
    ///
    /// Unprefixed element names take `default_namespace` when one is
    /// given; unprefixed attribute names never do.
    pub fn from_path(
        path: &ParsedPath,
        namespaces: &NamespaceContext,
        default_namespace: Option<&str>,
    ) -> Result<Self> {
        let mut chain: Option<Box<Axis>> = None;
        for step in &path.steps {
            let kind = match step.axis {
                XPathAxis::Attribute => AxisKind::Attribute,
                XPathAxis::Self_ => AxisKind::Self_,
                _ => AxisKind::Child,
            };
            let resolve = |prefix: &str| {
                namespaces.get_namespace(prefix).map(str::to_string).ok_or_else(|| {
                    Error::Parse(
                        ParseError::new(format!("unknown prefix '{}'", prefix))
                            .with_source(path.expression.clone()),
                    )
                })
            };
            let (name, urn) = match &step.node_test {
                NodeTest::Name { prefix: Some(prefix), local } => (local.clone(), resolve(prefix)?),
                NodeTest::Name { prefix: None, local } => {
                    let urn = match kind {
                        AxisKind::Child => default_namespace.unwrap_or_default().to_string(),
                        _ => String::new(),
                    };
                    (local.clone(), urn)
                }
                NodeTest::NamespaceWildcard(prefix) => (String::new(), resolve(prefix)?),
                NodeTest::Wildcard | NodeTest::Node => (String::new(), String::new()),
            };
            chain = Some(Box::new(Axis {
                kind,
                name,
                urn,
                input: chain,
            }));
        }
        chain.map(|axis| *axis).ok_or_else(|| {
            Error::Parse(ParseError::new("empty path").with_source(path.expression.clone()))
        })
    }

    /// Number of steps in the chain ending here
    pub fn len(&self) -> usize {
        1 + self.input.as_ref().map_or(0, |input| input.len())
    }

    /// Whether this step selects an attribute
    pub fn is_attribute(&self) -> bool {
        self.kind == AxisKind::Attribute
    }

    /// Whether this step is a bare `.`
    pub fn is_self(&self) -> bool {
        self.kind == AxisKind::Self_
    }
}

/// A step of a [`ForwardAxis`] with links to both neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleLinkAxis {
    /// Step kind
    pub kind: AxisKind,
    /// Local name, empty matches any
    pub name: String,
    /// Namespace URI, empty matches any
    pub urn: String,
    /// Index of the preceding step
    pub input: Option<usize>,
    /// Index of the following step
    pub next: Option<usize>,
}

impl DoubleLinkAxis {
    /// Whether this step selects an attribute
    pub fn is_attribute(&self) -> bool {
        self.kind == AxisKind::Attribute
    }
}

/// One union branch, walkable root to top
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardAxis {
    nodes: Vec<DoubleLinkAxis>,
    is_dss: bool,
    is_attribute: bool,
    is_self_axis: bool,
}

impl ForwardAxis {
    /// Flatten a reversed chain; `is_dss` marks a leading `.//`
    pub fn new(axis: Axis, is_dss: bool) -> Self {
        let mut reversed = Vec::with_capacity(axis.len());
        let mut current = Some(Box::new(axis));
        while let Some(step) = current {
            let Axis {
                kind,
                name,
                urn,
                input,
            } = *step;
            reversed.push((kind, name, urn));
            current = input;
        }

        let count = reversed.len();
        let nodes: Vec<DoubleLinkAxis> = reversed
            .into_iter()
            .rev()
            .enumerate()
            .map(|(index, (kind, name, urn))| DoubleLinkAxis {
                kind,
                name,
                urn,
                input: index.checked_sub(1),
                next: (index + 1 < count).then_some(index + 1),
            })
            .collect();

        let top = &nodes[count - 1];
        let is_attribute = top.is_attribute();
        let is_self_axis = top.kind == AxisKind::Self_;
        Self {
            nodes,
            is_dss,
            is_attribute,
            is_self_axis,
        }
    }

    /// Index of the first step
    pub fn root(&self) -> usize {
        0
    }

    /// Index of the final step
    pub fn top(&self) -> usize {
        self.nodes.len() - 1
    }

    /// A step by index
    pub fn node(&self, index: usize) -> &DoubleLinkAxis {
        &self.nodes[index]
    }

    /// The first step
    pub fn root_node(&self) -> &DoubleLinkAxis {
        &self.nodes[0]
    }

    /// The final step
    pub fn top_node(&self) -> &DoubleLinkAxis {
        &self.nodes[self.top()]
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, a branch has at least one step
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the branch started with `.//`
    pub fn is_dss(&self) -> bool {
        self.is_dss
    }

    /// Whether the final step selects an attribute
    pub fn is_attribute(&self) -> bool {
        self.is_attribute
    }

    /// Whether the branch is a bare `.`
    pub fn is_self_axis(&self) -> bool {
        self.is_self_axis
    }
}

/// A compiled selector or field expression: one [`ForwardAxis`] per branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asttree {
    xpath: String,
    axes: Vec<ForwardAxis>,
}

impl Asttree {
    /// Compile a selector (`is_field == false`) or field expression
    pub fn compile(
        xpath: &str,
        is_field: bool,
        namespaces: &NamespaceContext,
        limits: &Limits,
    ) -> Result<Self> {
        Self::compile_with_default(xpath, is_field, namespaces, None, limits)
    }

    /// Like [`compile`](Self::compile), with a default namespace for
    /// unprefixed element names
    pub fn compile_with_default(
        xpath: &str,
        is_field: bool,
        namespaces: &NamespaceContext,
        default_namespace: Option<&str>,
        limits: &Limits,
    ) -> Result<Self> {
        let parser = if is_field {
            IdentityXPathParser::for_field()
        } else {
            IdentityXPathParser::new()
        };
        let branches = parser.parse(xpath).map_err(|err| {
            Error::Parse(ParseError::new(err.to_string()).with_source(xpath.to_string()))
        })?;

        let mut axes = Vec::with_capacity(branches.len());
        for branch in &branches {
            limits.check_xpath_steps(branch.step_count())?;
            let axis = Axis::from_path(branch, namespaces, default_namespace)?;
            axes.push(ForwardAxis::new(axis, branch.is_descendant));
        }

        Ok(Self {
            xpath: xpath.to_string(),
            axes,
        })
    }

    /// The source expression
    pub fn xpath(&self) -> &str {
        &self.xpath
    }

    /// The compiled branches
    pub fn axes(&self) -> &[ForwardAxis] {
        &self.axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(xpath: &str, is_field: bool) -> Result<Asttree> {
        let namespaces = NamespaceContext::new().with_prefix("p", "urn:p");
        Asttree::compile(xpath, is_field, &namespaces, &Limits::default())
    }

    #[test]
    fn test_forward_links() {
        let tree = compile("a/p:b/c", false).unwrap();
        let axis = &tree.axes()[0];
        assert_eq!(axis.len(), 3);
        assert_eq!(axis.root_node().name, "a");
        assert_eq!(axis.top_node().name, "c");
        assert_eq!(axis.node(1).urn, "urn:p");
        assert_eq!(axis.node(1).input, Some(0));
        assert_eq!(axis.node(1).next, Some(2));
        assert_eq!(axis.root_node().input, None);
        assert_eq!(axis.top_node().next, None);
        assert!(!axis.is_dss());
        assert!(!axis.is_attribute());
    }

    #[test]
    fn test_classification() {
        let tree = compile(".//item/@id | . | @p:code", true).unwrap();
        let axes = tree.axes();
        assert_eq!(axes.len(), 3);

        assert!(axes[0].is_dss());
        assert!(axes[0].is_attribute());
        assert_eq!(axes[0].root_node().name, "item");

        assert!(axes[1].is_self_axis());
        assert!(!axes[1].is_attribute());

        assert!(axes[2].is_attribute());
        assert_eq!(axes[2].top_node().urn, "urn:p");
        assert_eq!(axes[2].top(), axes[2].root());
    }

    #[test]
    fn test_wildcards() {
        let tree = compile("* / p:*", false).unwrap();
        let axis = &tree.axes()[0];
        assert_eq!(axis.node(0).name, "");
        assert_eq!(axis.node(0).urn, "");
        assert_eq!(axis.node(1).name, "");
        assert_eq!(axis.node(1).urn, "urn:p");
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(compile("q:a", false), Err(Error::Parse(_))));
        assert!(matches!(compile("a/@id", false), Err(Error::Parse(_))));
        assert!(matches!(compile("", true), Err(Error::Parse(_))));

        let namespaces = NamespaceContext::new();
        let limits = Limits {
            max_xpath_steps: 2,
            ..Limits::default()
        };
        let result = Asttree::compile("a/b/c", false, &namespaces, &limits);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_default_namespace() {
        let namespaces = NamespaceContext::new();
        let tree =
            Asttree::compile_with_default("a/@b", true, &namespaces, Some("urn:d"), &Limits::default())
                .unwrap();
        let axis = &tree.axes()[0];
        assert_eq!(axis.root_node().urn, "urn:d");
        assert_eq!(axis.top_node().urn, "");
    }
}
