//! Content model compiler
//!
//! Turns a resolved particle tree into a [`ContentModel`]: a validator plus
//! the Unique Particle Attribution diagnostics found on the way.
//!
//! Occurrence bounds map onto syntax tree operators:
//!
//! | bounds          | node                         |
//! |-----------------|------------------------------|
//! | `(0,0)`         | dropped                      |
//! | `(1,1)`         | the term itself              |
//! | `(0,1)`         | `term?`                      |
//! | `(0,unbounded)` | `term*`                      |
//! | `(1,unbounded)` | `term+`                      |
//! | `(m,n)`         | `term{m,n}` (or unrolled)    |
//!
//! `term{0,n}` is compiled as `(term{1,n})?` so the counter never has to
//! start at zero.

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;

use super::all::AllElementsContentValidator;
use super::dfa::{build_transition_table, DfaContentValidator};
use super::nfa::NfaContentValidator;
use super::positions::{MatchedParticle, Positions, Terminal, NO_SYMBOL};
use super::range::RangeContentValidator;
use super::symbols::SymbolsDictionary;
use super::syntax::{NodeId, SyntaxTree};
use super::upa::{check_unique_particle_attribution, check_with_ranges, UpaViolation};
use super::validator::{ContentType, ContentValidator, ValidatorKind};
use crate::validators::groups::{GroupParticle, ModelType, XsdGroup};
use crate::validators::particles::{Occurs, OccursShape};

/// Options controlling how content models are compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOptions {
    /// Allow subset construction into a transition table
    pub use_dfa: bool,
    /// Tolerate unknown trailing children once the content is complete
    pub open: bool,
    /// Report competing particles when the model is not deterministic
    pub check_upa: bool,
    /// Copy the term of small `{m,n}` repetitions instead of counting
    pub unroll_ranges: bool,
    /// Resource limits in force
    pub limits: Limits,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            use_dfa: true,
            open: false,
            check_upa: true,
            unroll_ranges: false,
            limits: Limits::default(),
        }
    }
}

impl ModelOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the DFA strategy
    pub fn with_dfa(mut self, use_dfa: bool) -> Self {
        self.use_dfa = use_dfa;
        self
    }

    /// Enable or disable open content
    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    /// Enable or disable the precise UPA analysis
    pub fn with_upa_check(mut self, check_upa: bool) -> Self {
        self.check_upa = check_upa;
        self
    }

    /// Enable or disable unrolling of counted repetitions
    pub fn with_unrolled_ranges(mut self, unroll_ranges: bool) -> Self {
        self.unroll_ranges = unroll_ranges;
        self
    }

    /// Use other limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// A compiled content model
#[derive(Debug, Clone)]
pub struct ContentModel {
    validator: ContentValidator,
    upa_violations: Vec<UpaViolation>,
}

impl ContentModel {
    /// The validator to drive
    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    /// Take the validator, dropping the diagnostics
    pub fn into_validator(self) -> ContentValidator {
        self.validator
    }

    /// Strategy chosen for this model
    pub fn kind(&self) -> ValidatorKind {
        self.validator.kind()
    }

    /// Particles competing for the same child, empty for deterministic
    /// models or when the analysis was disabled
    pub fn upa_violations(&self) -> &[UpaViolation] {
        &self.upa_violations
    }

    /// Whether no UPA violation was found
    pub fn is_deterministic(&self) -> bool {
        self.upa_violations.is_empty()
    }
}

/// Compiles particle trees into content validators
///
/// The builder holds only options: compiling the same tree twice yields
/// validators with identical behavior.
#[derive(Debug, Clone, Default)]
pub struct ContentModelBuilder {
    options: ModelOptions,
}

impl ContentModelBuilder {
    /// Create a builder
    pub fn new(options: ModelOptions) -> Self {
        Self { options }
    }

    /// The options in force
    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Compile the content model of a complex type
    pub fn build(&self, group: &XsdGroup) -> Result<ContentModel> {
        let content_type = if group.mixed {
            ContentType::Mixed
        } else {
            ContentType::ElementOnly
        };

        if group.is_empty() || group.occurs.is_empty() {
            let validator = if group.mixed {
                ContentValidator::Mixed
            } else {
                ContentValidator::Empty
            };
            return Ok(ContentModel {
                validator,
                upa_violations: Vec::new(),
            });
        }

        if group.model == ModelType::All {
            return self.build_all(group, content_type);
        }

        let mut compiler = Compiler::new(&self.options);
        let content = compiler.compile_group(group, 1)?;
        Ok(compiler.finish(content, content_type))
    }

    /// Compile a single particle as if it were the only member of a
    /// sequence
    pub fn build_particle(&self, particle: &GroupParticle) -> Result<ContentModel> {
        match particle {
            GroupParticle::Group(group) => self.build(group),
            other => self.build(&XsdGroup::sequence().with(other.clone())),
        }
    }

    fn build_all(&self, group: &XsdGroup, content_type: ContentType) -> Result<ContentModel> {
        if group.occurs.max != Some(1) {
            return Err(invalid_all(format!(
                "xs:all group must have maxOccurs=1, found {}",
                group.occurs
            )));
        }

        let mut validator = AllElementsContentValidator::new(
            content_type,
            self.options.open,
            group.occurs.min == 0,
        );
        for particle in group.iter() {
            let element = match particle {
                GroupParticle::Element(element) => element,
                GroupParticle::Any(any) => {
                    return Err(invalid_all(format!("{} is not allowed in xs:all", any)));
                }
                GroupParticle::Group(nested) => {
                    return Err(invalid_all(format!(
                        "{} group is not allowed in xs:all",
                        nested.model
                    )));
                }
            };
            if element.occurs.is_empty() {
                continue;
            }
            if element.occurs.max != Some(1) {
                return Err(invalid_all(format!(
                    "element '{}' in xs:all must have maxOccurs=1",
                    element.name
                )));
            }
            if !validator.add_element(element.clone(), element.occurs.min == 0) {
                return Err(invalid_all(format!(
                    "element '{}' is declared twice in xs:all",
                    element.name
                )));
            }
        }

        Ok(ContentModel {
            validator: ContentValidator::All(validator),
            upa_violations: Vec::new(),
        })
    }
}

fn invalid_all(message: String) -> Error {
    Error::Parse(ParseError::new(message).with_source("xs:all"))
}

/// One compilation run: the arena, positions and symbols being filled
struct Compiler<'a> {
    options: &'a ModelOptions,
    tree: SyntaxTree,
    positions: Positions,
    symbols: SymbolsDictionary,
}

impl<'a> Compiler<'a> {
    fn new(options: &'a ModelOptions) -> Self {
        Self {
            options,
            tree: SyntaxTree::new(),
            positions: Positions::new(),
            symbols: SymbolsDictionary::new(),
        }
    }

    /// Compile a group with its own bounds; `None` means the group can
    /// only match the empty sequence
    fn compile_group(&mut self, group: &XsdGroup, depth: usize) -> Result<Option<NodeId>> {
        self.options.limits.check_model_depth(depth)?;
        self.with_occurs(group.occurs, |compiler| compiler.compile_group_term(group, depth))
    }

    fn compile_group_term(&mut self, group: &XsdGroup, depth: usize) -> Result<Option<NodeId>> {
        let mut result: Option<NodeId> = None;
        match group.model {
            ModelType::All => {
                return Err(Error::Parse(
                    ParseError::new("xs:all group must be the whole content model")
                        .with_source(group.name.as_ref().map_or_else(
                            || "xs:all".to_string(),
                            |name| name.to_string(),
                        )),
                ));
            }
            ModelType::Sequence => {
                for particle in group.iter().filter(|p| !p.occurs().is_empty()) {
                    if let Some(node) = self.compile_particle(particle, depth + 1)? {
                        result = Some(match result {
                            Some(left) => self.tree.sequence(left, node),
                            None => node,
                        });
                    }
                }
            }
            ModelType::Choice => {
                let mut nullable = false;
                for particle in group.iter().filter(|p| !p.occurs().is_empty()) {
                    match self.compile_particle(particle, depth + 1)? {
                        Some(node) => {
                            result = Some(match result {
                                Some(left) => self.tree.choice(left, node),
                                None => node,
                            });
                        }
                        None => nullable = true,
                    }
                }
                if nullable {
                    result = result.map(|node| self.tree.qmark(node));
                }
            }
        }
        Ok(result)
    }

    fn compile_particle(&mut self, particle: &GroupParticle, depth: usize) -> Result<Option<NodeId>> {
        match particle {
            GroupParticle::Element(element) => {
                let matched = MatchedParticle::Element(element.clone());
                let name = &element.name;
                self.with_occurs(element.occurs, |compiler| {
                    let symbol = compiler.symbols.add_name(name, matched.clone());
                    let pos = compiler
                        .positions
                        .add(symbol, Terminal::Particle(matched.clone()));
                    Ok(Some(compiler.tree.leaf(pos)))
                })
            }
            GroupParticle::Any(any) => {
                let matched = MatchedParticle::Any(any.clone());
                self.symbols.add_namespace_list(&any.namespace, matched.clone());
                self.with_occurs(any.occurs, |compiler| {
                    Ok(Some(
                        compiler
                            .tree
                            .namespace_list(any.namespace.clone(), matched.clone()),
                    ))
                })
            }
            GroupParticle::Group(group) => self.compile_group(group, depth),
        }
    }

    /// Apply occurrence bounds to a term
    ///
    /// `term` may be called several times when a repetition is unrolled;
    /// every call must produce a fresh copy of the term.
    fn with_occurs<F>(&mut self, occurs: Occurs, mut term: F) -> Result<Option<NodeId>>
    where
        F: FnMut(&mut Self) -> Result<Option<NodeId>>,
    {
        let node = match occurs.shape() {
            OccursShape::Absent => return Ok(None),
            OccursShape::Once => return term(self),
            OccursShape::Optional => term(self)?.map(|n| self.tree.qmark(n)),
            OccursShape::ZeroOrMore => term(self)?.map(|n| self.tree.star(n)),
            OccursShape::OneOrMore => term(self)?.map(|n| self.tree.plus(n)),
            OccursShape::Range { min, max } => {
                let copies = max.unwrap_or(min);
                if self.options.unroll_ranges && copies <= self.options.limits.max_unrolled_occurs {
                    return self.unroll(min, max, term);
                }
                match term(self)? {
                    None => None,
                    // A nullable body can satisfy any minimum with empty
                    // iterations.
                    Some(body) if min == 0 || self.tree.is_nullable(body) => {
                        let counted = self.tree.range(body, &mut self.positions, 1, max);
                        Some(self.tree.qmark(counted))
                    }
                    Some(body) => Some(self.tree.range(body, &mut self.positions, min, max)),
                }
            }
        };
        Ok(node)
    }

    /// `term{min,max}` as `min` copies followed by nested optional copies
    /// (or a `+` copy when unbounded)
    fn unroll<F>(&mut self, min: u32, max: Option<u32>, mut term: F) -> Result<Option<NodeId>>
    where
        F: FnMut(&mut Self) -> Result<Option<NodeId>>,
    {
        let mut result: Option<NodeId> = None;
        let required = match max {
            Some(_) => min,
            None => min.saturating_sub(1),
        };
        for _ in 0..required {
            let Some(copy) = term(self)? else {
                return Ok(None);
            };
            result = Some(match result {
                Some(left) => self.tree.sequence(left, copy),
                None => copy,
            });
        }

        let tail = match max {
            None => term(self)?.map(|copy| self.tree.plus(copy)),
            Some(max) => {
                let mut tail: Option<NodeId> = None;
                for _ in min..max {
                    let Some(copy) = term(self)? else {
                        break;
                    };
                    let optional = match tail {
                        Some(rest) => self.tree.sequence(copy, rest),
                        None => copy,
                    };
                    tail = Some(self.tree.qmark(optional));
                }
                tail
            }
        };

        Ok(match (result, tail) {
            (Some(left), Some(right)) => Some(self.tree.sequence(left, right)),
            (left, right) => left.or(right),
        })
    }

    fn finish(mut self, content: Option<NodeId>, content_type: ContentType) -> ContentModel {
        self.tree.expand(&mut self.symbols, &mut self.positions);

        let end_marker = self.positions.add(NO_SYMBOL, Terminal::EndMarker);
        let end = self.tree.leaf(end_marker);
        let root = match content {
            Some(content) => self.tree.sequence(content, end),
            None => end,
        };
        let tables = self.tree.construct_pos(root, &self.positions);
        let emptiable = tables.firstpos.get(end_marker);
        let options = self.options;

        let upa_violations = if options.check_upa && !self.symbols.is_upa_enforced() {
            if self.tree.has_ranges() {
                check_with_ranges(
                    &tables.firstpos,
                    &tables.followpos,
                    &self.positions,
                    &self.symbols,
                    self.tree.ranges(),
                )
            } else {
                check_unique_particle_attribution(
                    &tables.firstpos,
                    &tables.followpos,
                    &self.positions,
                    &self.symbols,
                )
            }
        } else {
            Vec::new()
        };

        let validator = if self.tree.has_ranges() {
            ContentValidator::Range(RangeContentValidator::new(
                tables.firstpos,
                tables.followpos,
                self.positions,
                self.symbols,
                self.tree.ranges().to_vec(),
                end_marker,
                options.limits.max_running_positions,
                content_type,
                options.open,
                emptiable,
            ))
        } else {
            let table = if options.use_dfa && self.symbols.is_upa_enforced() {
                build_transition_table(
                    &tables.firstpos,
                    &tables.followpos,
                    &self.positions,
                    &self.symbols,
                    end_marker,
                    &options.limits,
                )
            } else {
                None
            };
            match table {
                Some(table) => ContentValidator::Dfa(DfaContentValidator::new(
                    table,
                    self.symbols,
                    &self.positions,
                    content_type,
                    options.open,
                    emptiable,
                )),
                None => ContentValidator::Nfa(NfaContentValidator::new(
                    tables.firstpos,
                    tables.followpos,
                    self.positions,
                    self.symbols,
                    end_marker,
                    content_type,
                    options.open,
                    emptiable,
                )),
            }
        };

        ContentModel {
            validator,
            upa_violations,
        }
    }
}
