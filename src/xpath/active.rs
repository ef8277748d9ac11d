//! Incremental matching of compiled paths against a stream of elements
//!
//! An [`ActiveAxis`] is created when the element that scopes a constraint
//! starts, and is then fed every start tag, attribute and end tag below
//! it. Depths count from that scoping element (depth `0`); `-1` means the
//! axis has not entered it yet.
//!
//! Each branch of the compiled path gets an [`AxisStack`] of candidate
//! cursors ([`AxisElement`]). A plain branch has exactly one candidate
//! starting at depth 1. A `.//` branch gets a new candidate every time an
//! element matching its first step starts, and drops one when such an
//! element ends.

use std::sync::Arc;

use crate::namespaces::QName;

use super::axes::{Asttree, DoubleLinkAxis, ForwardAxis};

/// Name test shared by every step: empty test fields match anything
pub fn name_matches(step: &DoubleLinkAxis, name: &QName) -> bool {
    (step.name.is_empty() || step.name == name.local_name)
        && (step.urn.is_empty() || step.urn == name.namespace_or_empty())
}

/// A candidate cursor on one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisElement {
    cur_node: usize,
    root_depth: i32,
    cur_depth: i32,
    is_match: bool,
}

impl AxisElement {
    fn new(root: usize, depth: i32) -> Self {
        Self {
            cur_node: root,
            root_depth: depth,
            cur_depth: depth,
            is_match: false,
        }
    }

    /// The step this candidate waits on
    pub fn cur_node(&self) -> usize {
        self.cur_node
    }

    /// The depth of the element that started this candidate
    pub fn root_depth(&self) -> i32 {
        self.root_depth
    }

    /// The depth the current step expects
    pub fn cur_depth(&self) -> i32 {
        self.cur_depth
    }

    /// Whether the last element reached the final element step
    pub fn is_match(&self) -> bool {
        self.is_match
    }

    fn set_depth(&mut self, depth: i32) {
        self.root_depth = depth;
        self.cur_depth = depth;
    }

    fn move_to_child(&mut self, name: &QName, depth: i32, axis: &ForwardAxis) -> bool {
        let node = axis.node(self.cur_node);
        if node.is_attribute() {
            return false;
        }
        self.is_match = false;
        if !name_matches(node, name) {
            return false;
        }

        if self.cur_depth == -1 {
            self.set_depth(depth);
        } else if depth > self.cur_depth {
            return false;
        }

        if self.cur_node == axis.top() {
            self.is_match = true;
            return true;
        }

        let next = self.cur_node + 1;
        if axis.node(next).is_attribute() {
            // the element part is done, the attribute test comes later
            self.is_match = true;
            return false;
        }
        self.cur_node = next;
        self.cur_depth += 1;
        false
    }

    fn move_to_parent(&mut self, depth: i32, axis: &ForwardAxis) {
        if depth == self.cur_depth - 1 {
            if axis.is_dss() && axis.node(self.cur_node).input == Some(axis.root()) {
                self.cur_node = axis.root();
                self.root_depth = -1;
                self.cur_depth = -1;
            } else if let Some(input) = axis.node(self.cur_node).input {
                self.cur_node = input;
                self.cur_depth -= 1;
            }
        } else if depth == self.cur_depth {
            self.is_match = false;
        }
    }
}

/// Candidates of one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisStack {
    branch: usize,
    elements: Vec<AxisElement>,
}

impl AxisStack {
    fn new(branch: usize, axis: &ForwardAxis) -> Self {
        let mut stack = Self {
            branch,
            elements: Vec::new(),
        };
        if !axis.is_dss() {
            stack.push(axis, 1);
        }
        stack
    }

    /// Current candidates, oldest first
    pub fn elements(&self) -> &[AxisElement] {
        &self.elements
    }

    fn push(&mut self, axis: &ForwardAxis, depth: i32) {
        self.elements.push(AxisElement::new(axis.root(), depth));
    }

    fn move_to_child(&mut self, name: &QName, depth: i32, axis: &ForwardAxis) -> bool {
        if axis.is_dss() && name_matches(axis.root_node(), name) {
            self.push(axis, -1);
        }
        let mut result = false;
        for element in &mut self.elements {
            if element.move_to_child(name, depth, axis) {
                result = true;
            }
        }
        result
    }

    fn move_to_parent(&mut self, name: &QName, depth: i32, axis: &ForwardAxis) {
        if axis.is_self_axis() {
            return;
        }
        for element in &mut self.elements {
            element.move_to_parent(depth, axis);
        }
        if axis.is_dss() && name_matches(axis.root_node(), name) {
            self.elements.pop();
        }
    }

    fn move_to_attribute(&self, name: &QName, depth: i32, axis: &ForwardAxis) -> bool {
        if !axis.is_attribute() || !name_matches(axis.top_node(), name) {
            return false;
        }
        match axis.top_node().input {
            // an attribute of the scoping element, or of any element below
            // it for `.//@a`
            None => depth == 1 || axis.is_dss(),
            Some(parent) => self
                .elements
                .iter()
                .any(|element| element.is_match && element.cur_node == parent),
        }
    }
}

/// Matcher state of one compiled path within one scope
#[derive(Debug, Clone)]
pub struct ActiveAxis {
    tree: Arc<Asttree>,
    stacks: Vec<AxisStack>,
    current_depth: i32,
    is_active: bool,
}

impl ActiveAxis {
    /// Start matching `tree`; the next start tag is the scoping element
    pub fn new(tree: Arc<Asttree>) -> Self {
        let stacks = Self::fresh_stacks(&tree);
        Self {
            tree,
            stacks,
            current_depth: -1,
            is_active: true,
        }
    }

    fn fresh_stacks(tree: &Asttree) -> Vec<AxisStack> {
        tree.axes()
            .iter()
            .enumerate()
            .map(|(index, axis)| AxisStack::new(index, axis))
            .collect()
    }

    /// The compiled path
    pub fn tree(&self) -> &Arc<Asttree> {
        &self.tree
    }

    /// Depth of the innermost open element, `-1` before the scope starts
    pub fn current_depth(&self) -> i32 {
        self.current_depth
    }

    /// False once the scoping element has ended
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Candidate stacks, one per branch
    pub fn stacks(&self) -> &[AxisStack] {
        &self.stacks
    }

    /// Make the axis usable for a new scope
    pub fn reactivate(&mut self) {
        self.is_active = true;
        self.current_depth = -1;
        self.stacks = Self::fresh_stacks(&self.tree);
    }

    /// A start tag; true if the element completes a branch
    pub fn move_to_start_element(&mut self, name: &QName) -> bool {
        if !self.is_active {
            return false;
        }
        self.current_depth += 1;

        let mut result = false;
        let tree = &self.tree;
        for stack in &mut self.stacks {
            let axis = &tree.axes()[stack.branch];
            if axis.is_self_axis() {
                if axis.is_dss() || self.current_depth == 0 {
                    result = true;
                }
                continue;
            }
            if self.current_depth != 0 && stack.move_to_child(name, self.current_depth, axis) {
                result = true;
            }
        }
        result
    }

    /// An end tag; always false here, see
    /// [`SelectorActiveAxis`](crate::validators::constraints::SelectorActiveAxis)
    pub fn end_element(&mut self, name: &QName) -> bool {
        if self.current_depth == 0 {
            self.is_active = false;
            self.current_depth -= 1;
        }
        if !self.is_active {
            return false;
        }

        let tree = &self.tree;
        for stack in &mut self.stacks {
            let axis = &tree.axes()[stack.branch];
            stack.move_to_parent(name, self.current_depth, axis);
        }
        self.current_depth -= 1;
        false
    }

    /// An attribute of the innermost open element; true if it completes
    /// an attribute branch
    pub fn move_to_attribute(&self, name: &QName) -> bool {
        if !self.is_active {
            return false;
        }
        let depth = self.current_depth + 1;
        self.stacks
            .iter()
            .any(|stack| stack.move_to_attribute(name, depth, &self.tree.axes()[stack.branch]))
    }
}
