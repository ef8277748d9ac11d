//! Regular-expression syntax tree of a content model
//!
//! Nodes live in an arena and refer to each other by index. The tree is
//! built bottom-up by the content model builder, then:
//!
//! 1. [`SyntaxTree::expand`] replaces every wildcard (namespace list) node
//!    with a choice over one fresh leaf per symbol the wildcard can match;
//! 2. [`SyntaxTree::construct_pos`] computes nullability, firstpos and
//!    lastpos for every node and fills the followpos table, following the
//!    usual position-automaton (Berry-Sethi) rules.
//!
//! Counted repetitions `body{min,max}` are kept as a sequence of the body
//! and a [`SyntaxNode::LeafRange`]: a synthetic position that closes one
//! iteration. Its follow set leaves the loop; its "next iteration" set
//! (firstpos of the body) re-enters it. The range validator decides which
//! one to take by counting.

use super::bitset::BitSet;
use super::positions::{MatchedParticle, Positions, Terminal, NO_SYMBOL};
use super::symbols::SymbolsDictionary;
use crate::validators::wildcards::NamespaceConstraint;

/// Index of a node in the arena
pub type NodeId = usize;

/// One syntax tree node
#[derive(Debug, Clone)]
pub enum SyntaxNode {
    /// A single position
    Leaf(usize),
    /// A wildcard, replaced during expansion
    NamespaceList {
        /// The wildcard's namespace constraint
        constraint: NamespaceConstraint,
        /// The wildcard particle
        particle: MatchedParticle,
    },
    /// Concatenation
    Sequence(NodeId, NodeId),
    /// Alternation
    Choice(NodeId, NodeId),
    /// Zero or more
    Star(NodeId),
    /// One or more
    Plus(NodeId),
    /// Zero or one
    Qmark(NodeId),
    /// Iteration terminal of a counted repetition
    LeafRange {
        /// Position of the terminal
        pos: usize,
        /// Index into the range table
        range: usize,
    },
}

/// A counted repetition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeNode {
    /// Position of the iteration terminal
    pub pos: usize,
    /// Minimum number of iterations
    pub min: u32,
    /// Maximum number of iterations, `None` when unbounded
    pub max: Option<u32>,
    /// Positions that start another iteration (firstpos of the body)
    pub next_iteration: BitSet,
}

/// Result of position construction
#[derive(Debug, Clone)]
pub struct PositionTables {
    /// Positions that can match first
    pub firstpos: BitSet,
    /// For every position, the positions that can follow it
    pub followpos: Vec<BitSet>,
    /// Whether the whole tree matches the empty sequence
    pub nullable: bool,
}

#[derive(Debug, Clone)]
struct NodeSets {
    first: BitSet,
    last: BitSet,
    nullable: bool,
}

impl NodeSets {
    fn empty(count: usize) -> Self {
        Self {
            first: BitSet::new(count),
            last: BitSet::new(count),
            nullable: false,
        }
    }

    fn single(count: usize, pos: usize) -> Self {
        Self {
            first: BitSet::with_members(count, [pos]),
            last: BitSet::with_members(count, [pos]),
            nullable: false,
        }
    }
}

/// Arena holding the syntax tree of one content model
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    ranges: Vec<RangeNode>,
}

impl SyntaxTree {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: SyntaxNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Node at `id`
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counted repetitions, indexed by [`SyntaxNode::LeafRange::range`]
    pub fn ranges(&self) -> &[RangeNode] {
        &self.ranges
    }

    /// Whether the tree contains counted repetitions
    pub fn has_ranges(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Leaf for an existing position
    pub fn leaf(&mut self, pos: usize) -> NodeId {
        self.push(SyntaxNode::Leaf(pos))
    }

    /// Wildcard node; positions are created by [`expand`](Self::expand)
    pub fn namespace_list(
        &mut self,
        constraint: NamespaceConstraint,
        particle: MatchedParticle,
    ) -> NodeId {
        self.push(SyntaxNode::NamespaceList {
            constraint,
            particle,
        })
    }

    /// `left , right`
    pub fn sequence(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.push(SyntaxNode::Sequence(left, right))
    }

    /// `left | right`
    pub fn choice(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.push(SyntaxNode::Choice(left, right))
    }

    /// `child*`
    pub fn star(&mut self, child: NodeId) -> NodeId {
        self.push(SyntaxNode::Star(child))
    }

    /// `child+`
    pub fn plus(&mut self, child: NodeId) -> NodeId {
        self.push(SyntaxNode::Plus(child))
    }

    /// `child?`
    pub fn qmark(&mut self, child: NodeId) -> NodeId {
        self.push(SyntaxNode::Qmark(child))
    }

    /// `body{min,max}` as `body , R{min,max}`
    pub fn range(
        &mut self,
        body: NodeId,
        positions: &mut Positions,
        min: u32,
        max: Option<u32>,
    ) -> NodeId {
        let range = self.ranges.len();
        let pos = positions.add(NO_SYMBOL, Terminal::Range(range));
        self.ranges.push(RangeNode {
            pos,
            min,
            max,
            next_iteration: BitSet::new(0),
        });
        let terminal = self.push(SyntaxNode::LeafRange { pos, range });
        self.sequence(body, terminal)
    }

    /// Replace wildcard nodes by choices over the symbols they match
    ///
    /// Must run after every name and namespace list has been registered
    /// in `symbols`. A resolved symbol claimed by a different particle
    /// drops the dictionary's UPA flag.
    pub fn expand(&mut self, symbols: &mut SymbolsDictionary, positions: &mut Positions) {
        for id in 0..self.nodes.len() {
            let (constraint, particle) = match &self.nodes[id] {
                SyntaxNode::NamespaceList {
                    constraint,
                    particle,
                } => (constraint.clone(), particle.clone()),
                _ => continue,
            };

            let mut leaf_positions = Vec::new();
            for symbol in symbols.get_namespace_list_symbols(&constraint) {
                if symbols.get_particle(symbol) != Some(&particle) {
                    symbols.disable_upa();
                }
                leaf_positions.push(positions.add(symbol, Terminal::Particle(particle.clone())));
            }

            let replacement = match leaf_positions.split_last() {
                None => SyntaxNode::Leaf(positions.add(NO_SYMBOL, Terminal::Void)),
                Some((&pos, [])) => SyntaxNode::Leaf(pos),
                Some((&last, rest)) => {
                    let mut chain = self.leaf(rest[0]);
                    for &pos in &rest[1..] {
                        let leaf = self.leaf(pos);
                        chain = self.choice(chain, leaf);
                    }
                    let leaf = self.leaf(last);
                    SyntaxNode::Choice(chain, leaf)
                }
            };
            self.nodes[id] = replacement;
        }
    }

    /// Whether the subtree at `id` can match the empty sequence
    ///
    /// Usable before [`expand`](Self::expand): a wildcard always consumes
    /// one element. An iteration terminal counts as nullable, so a counted
    /// repetition is nullable exactly when its body is.
    pub fn is_nullable(&self, id: NodeId) -> bool {
        let mut nullable: Vec<Option<bool>> = vec![None; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(&top) = stack.last() {
            let value = match self.nodes[top] {
                SyntaxNode::Leaf(_) | SyntaxNode::NamespaceList { .. } => Some(false),
                SyntaxNode::LeafRange { .. } | SyntaxNode::Star(_) | SyntaxNode::Qmark(_) => {
                    Some(true)
                }
                SyntaxNode::Plus(child) => match nullable[child] {
                    Some(value) => Some(value),
                    None => {
                        stack.push(child);
                        None
                    }
                },
                SyntaxNode::Sequence(left, right) | SyntaxNode::Choice(left, right) => {
                    match (nullable[left], nullable[right]) {
                        (Some(l), Some(r)) if matches!(self.nodes[top], SyntaxNode::Sequence(..)) => {
                            Some(l && r)
                        }
                        (Some(l), Some(r)) => Some(l || r),
                        (l, r) => {
                            if r.is_none() {
                                stack.push(right);
                            }
                            if l.is_none() {
                                stack.push(left);
                            }
                            None
                        }
                    }
                }
            };
            if let Some(value) = value {
                nullable[top] = Some(value);
                stack.pop();
            }
        }
        nullable[id].unwrap_or(false)
    }

    /// Compute firstpos/lastpos/nullable bottom-up and fill followpos
    ///
    /// Uses an explicit stack so long sequence or choice chains cannot
    /// overflow the call stack. Also records the next-iteration set of
    /// every counted repetition.
    pub fn construct_pos(&mut self, root: NodeId, positions: &Positions) -> PositionTables {
        let count = positions.count();
        let mut followpos = vec![BitSet::new(count); count];
        let mut computed: Vec<Option<NodeSets>> = vec![None; self.nodes.len()];
        let Self { nodes, ranges } = self;

        let take = |computed: &mut Vec<Option<NodeSets>>, id: NodeId| {
            computed[id].take().unwrap_or_else(|| NodeSets::empty(count))
        };

        let mut stack = vec![(root, false)];
        while let Some((id, children_done)) = stack.pop() {
            if !children_done {
                stack.push((id, true));
                match nodes[id] {
                    SyntaxNode::Sequence(left, right) | SyntaxNode::Choice(left, right) => {
                        stack.push((right, false));
                        stack.push((left, false));
                    }
                    SyntaxNode::Star(child) | SyntaxNode::Plus(child) | SyntaxNode::Qmark(child) => {
                        stack.push((child, false));
                    }
                    _ => {}
                }
                continue;
            }

            let sets = match nodes[id] {
                SyntaxNode::Leaf(pos) | SyntaxNode::LeafRange { pos, .. } => {
                    NodeSets::single(count, pos)
                }
                // Not reachable after expansion; an unexpanded wildcard
                // matches nothing.
                SyntaxNode::NamespaceList { .. } => NodeSets::empty(count),
                SyntaxNode::Choice(left, right) => {
                    let mut left = take(&mut computed, left);
                    let right = take(&mut computed, right);
                    left.first.or(&right.first);
                    left.last.or(&right.last);
                    left.nullable |= right.nullable;
                    left
                }
                SyntaxNode::Sequence(left_id, right_id) => {
                    let left = take(&mut computed, left_id);
                    let right = take(&mut computed, right_id);

                    for pos in left.last.iter() {
                        followpos[pos].or(&right.first);
                    }
                    if let SyntaxNode::LeafRange { range, .. } = nodes[right_id] {
                        ranges[range].next_iteration = left.first.clone();
                    }

                    let mut first = left.first;
                    if left.nullable {
                        first.or(&right.first);
                    }
                    let mut last = right.last;
                    if right.nullable {
                        last.or(&left.last);
                    }
                    NodeSets {
                        first,
                        last,
                        nullable: left.nullable && right.nullable,
                    }
                }
                SyntaxNode::Star(child) | SyntaxNode::Plus(child) => {
                    let mut sets = take(&mut computed, child);
                    for pos in sets.last.iter() {
                        followpos[pos].or(&sets.first);
                    }
                    if matches!(nodes[id], SyntaxNode::Star(_)) {
                        sets.nullable = true;
                    }
                    sets
                }
                SyntaxNode::Qmark(child) => {
                    let mut sets = take(&mut computed, child);
                    sets.nullable = true;
                    sets
                }
            };
            computed[id] = Some(sets);
        }

        let root_sets = take(&mut computed, root);
        PositionTables {
            firstpos: root_sets.first,
            followpos,
            nullable: root_sets.nullable,
        }
    }
}
