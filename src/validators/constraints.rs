//! Identity constraint checking over a streamed document
//!
//! [`IdentityValidator`] keeps one frame per open element. When an element
//! that declares constraints starts, each constraint gets a
//! [`ConstraintStruct`] in that element's frame, and its selector starts
//! watching the subtree. Every node the selector picks opens a
//! [`KeySequence`] whose fields are filled by [`LocatedActiveAxis`]
//! matchers; the row is checked when the selected element ends.
//!
//! Keyrefs are bound when their scope starts, to the nearest open key or
//! unique with the referenced name. Their rows are stored on that target
//! and resolved when the target's scope ends.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::documents::{Document, DocumentEvent};
use crate::error::ValidationError;
use crate::namespaces::{NamespaceContext, QName};
use crate::xpath::ActiveAxis;

use super::groups::ElementParticle;
use super::identities::{IdentityConstraint, IdentityConstraintKind};
use super::keys::{KeySequence, TypedObject};
use super::values::SimpleType;

/// A failed identity check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityViolation {
    /// A key row with a field missing
    #[error("missing field value for key '{constraint}' at line {line}, column {column}")]
    MissingKey {
        /// Key name
        constraint: QName,
        /// Line of the selected element
        line: u32,
        /// Column of the selected element
        column: u32,
    },

    /// A row already present in a key or unique table
    #[error("duplicate key sequence {key} for {kind} '{constraint}' at line {line}, column {column}")]
    DuplicateKey {
        /// Constraint name
        constraint: QName,
        /// Key or unique
        kind: IdentityConstraintKind,
        /// The row as text
        key: String,
        /// Line of the selected element
        line: u32,
        /// Column of the selected element
        column: u32,
    },

    /// A keyref row with no matching key row
    #[error("key sequence {key} of keyref '{constraint}' at line {line}, column {column} does not match any '{refer}'")]
    UnresolvedKeyref {
        /// Keyref name
        constraint: QName,
        /// Referenced key or unique
        refer: QName,
        /// The row as text
        key: String,
        /// Line of the selected element
        line: u32,
        /// Column of the selected element
        column: u32,
    },

    /// No key or unique of the referenced name is open
    #[error("keyref '{constraint}' refers to '{refer}', which is not in scope")]
    RefNotInScope {
        /// Keyref name
        constraint: QName,
        /// Referenced name
        refer: QName,
    },

    /// A field selected more than one value for the same row
    #[error("field {field} of '{constraint}' selects more than one value")]
    FieldSingleValueExpected {
        /// Constraint name
        constraint: QName,
        /// Field index
        field: usize,
    },

    /// A field selected an element without simple content
    #[error("field {field} of '{constraint}' selects element '{element}', which has no simple content")]
    FieldSimpleTypeExpected {
        /// Constraint name
        constraint: QName,
        /// Field index
        field: usize,
        /// The selected element
        element: QName,
    },

    /// A field value does not parse with its type
    #[error("field {field} of '{constraint}': {message}")]
    InvalidValue {
        /// Constraint name
        constraint: QName,
        /// Field index
        field: usize,
        /// Parser message
        message: String,
    },
}

impl IdentityViolation {
    /// Name of the constraint that failed
    pub fn constraint(&self) -> &QName {
        match self {
            Self::MissingKey { constraint, .. }
            | Self::DuplicateKey { constraint, .. }
            | Self::UnresolvedKeyref { constraint, .. }
            | Self::RefNotInScope { constraint, .. }
            | Self::FieldSingleValueExpected { constraint, .. }
            | Self::FieldSimpleTypeExpected { constraint, .. }
            | Self::InvalidValue { constraint, .. } => constraint,
        }
    }

    fn position(&self) -> Option<(u32, u32)> {
        match self {
            Self::MissingKey { line, column, .. }
            | Self::DuplicateKey { line, column, .. }
            | Self::UnresolvedKeyref { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }
}

impl From<IdentityViolation> for ValidationError {
    fn from(violation: IdentityViolation) -> Self {
        let error = ValidationError::new(violation.to_string());
        match violation.position() {
            Some((line, column)) => error.with_position(line, column),
            None => error,
        }
    }
}

/// A field matcher bound to one column of a row
#[derive(Debug, Clone)]
pub struct LocatedActiveAxis {
    axis: ActiveAxis,
    column: usize,
    matched_at: Option<usize>,
}

impl LocatedActiveAxis {
    fn new(axis: ActiveAxis, column: usize) -> Self {
        Self {
            axis,
            column,
            matched_at: None,
        }
    }

    /// Column of the row this field fills
    pub fn column(&self) -> usize {
        self.column
    }

    /// Whether an element selected by this field is still open
    pub fn is_matched(&self) -> bool {
        self.matched_at.is_some()
    }

    fn reactivate(&mut self) {
        self.axis.reactivate();
        self.matched_at = None;
    }
}

/// A row being filled, with the field matchers rooted at the selected node
#[derive(Debug, Clone)]
pub struct KSStruct {
    ks: KeySequence,
    depth: i32,
    fields: Vec<LocatedActiveAxis>,
}

impl KSStruct {
    /// The row
    pub fn key_sequence(&self) -> &KeySequence {
        &self.ks
    }

    /// Field matchers
    pub fn fields(&self) -> &[LocatedActiveAxis] {
        &self.fields
    }
}

/// Selector matcher that also tracks the rows opened by its matches
///
/// Rows are pooled: a slot below the stack pointer is live, slots above it
/// are kept for reuse by later matches.
#[derive(Debug, Clone)]
pub struct SelectorActiveAxis {
    axis: ActiveAxis,
    constraint: Arc<IdentityConstraint>,
    kss: Vec<KSStruct>,
    ks_pointer: usize,
}

impl SelectorActiveAxis {
    /// Watch the scope of `constraint`
    pub fn new(constraint: Arc<IdentityConstraint>) -> Self {
        Self {
            axis: ActiveAxis::new(Arc::clone(&constraint.selector)),
            constraint,
            kss: Vec::new(),
            ks_pointer: 0,
        }
    }

    /// The underlying matcher
    pub fn axis(&self) -> &ActiveAxis {
        &self.axis
    }

    /// Number of open rows
    pub fn open_rows(&self) -> usize {
        self.ks_pointer
    }

    /// A start tag; true if the element is selected
    pub fn move_to_start_element(&mut self, name: &QName) -> bool {
        self.axis.move_to_start_element(name)
    }

    /// Open a row for the element just selected; returns its slot
    pub fn push_ks(&mut self, line: u32, column: u32) -> usize {
        let dim = self.constraint.dim();
        let ks = KeySequence::new(dim, line, column);
        let depth = self.axis.current_depth() - 1;

        if let Some(kss) = self.kss.get_mut(self.ks_pointer) {
            kss.ks = ks;
            kss.depth = depth;
            for field in &mut kss.fields {
                field.reactivate();
            }
        } else {
            let fields = self
                .constraint
                .fields
                .iter()
                .enumerate()
                .map(|(column, tree)| LocatedActiveAxis::new(ActiveAxis::new(Arc::clone(tree)), column))
                .collect();
            self.kss.push(KSStruct { ks, depth, fields });
        }

        self.ks_pointer += 1;
        self.ks_pointer - 1
    }

    /// Close the innermost open row
    pub fn pop_ks(&mut self) -> Option<KeySequence> {
        if self.ks_pointer == 0 {
            return None;
        }
        self.ks_pointer -= 1;
        let dim = self.constraint.dim();
        self.kss
            .get_mut(self.ks_pointer)
            .map(|kss| std::mem::replace(&mut kss.ks, KeySequence::new(dim, 0, 0)))
    }

    fn last_depth(&self) -> i32 {
        match self.ks_pointer {
            0 => -1,
            pointer => self.kss[pointer - 1].depth,
        }
    }

    /// An end tag; true if it closes the innermost selected element
    pub fn end_element(&mut self, name: &QName) -> bool {
        self.axis.end_element(name);
        self.ks_pointer > 0 && self.axis.current_depth() == self.last_depth()
    }

    fn open_kss_mut(&mut self) -> &mut [KSStruct] {
        &mut self.kss[..self.ks_pointer]
    }
}

/// Runtime state of one constraint within one scope
#[derive(Debug, Clone)]
pub struct ConstraintStruct {
    constraint: Arc<IdentityConstraint>,
    selector: SelectorActiveAxis,
    qualified: HashSet<KeySequence>,
    keyref_table: Option<Vec<(KeySequence, QName)>>,
    keyref_target: Option<(usize, usize)>,
}

impl ConstraintStruct {
    /// Fresh state for a scope of `constraint`
    pub fn new(constraint: Arc<IdentityConstraint>) -> Self {
        Self {
            selector: SelectorActiveAxis::new(Arc::clone(&constraint)),
            constraint,
            qualified: HashSet::new(),
            keyref_table: None,
            keyref_target: None,
        }
    }

    /// The compiled constraint
    pub fn constraint(&self) -> &Arc<IdentityConstraint> {
        &self.constraint
    }

    /// The selector matcher
    pub fn selector(&self) -> &SelectorActiveAxis {
        &self.selector
    }

    /// Rows accepted so far (keys and uniques)
    pub fn qualified(&self) -> &HashSet<KeySequence> {
        &self.qualified
    }
}

#[derive(Debug)]
struct Frame {
    simple_type: Option<SimpleType>,
    constraints: Vec<ConstraintStruct>,
}

/// Element and attribute declarations consulted by
/// [`IdentityValidator::validate_document`], looked up by name
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    elements: IndexMap<QName, Arc<ElementParticle>>,
    attributes: IndexMap<QName, SimpleType>,
}

impl Declarations {
    /// No declarations: everything is untyped
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an element
    pub fn with_element(mut self, element: ElementParticle) -> Self {
        self.elements.insert(element.name.clone(), Arc::new(element));
        self
    }

    /// Declare the type of an attribute
    pub fn with_attribute(mut self, name: QName, simple_type: impl Into<SimpleType>) -> Self {
        self.attributes.insert(name, simple_type.into());
        self
    }

    /// Look up an element declaration
    pub fn element(&self, name: &QName) -> Option<&ElementParticle> {
        self.elements.get(name).map(Arc::as_ref)
    }

    /// Look up an attribute type
    pub fn attribute(&self, name: &QName) -> Option<SimpleType> {
        self.attributes.get(name).copied()
    }
}

/// Streaming identity constraint checker for one document
#[derive(Debug, Default)]
pub struct IdentityValidator {
    frames: Vec<Frame>,
    namespaces: Arc<NamespaceContext>,
    violations: Vec<IdentityViolation>,
}

impl IdentityValidator {
    /// A validator for a new document
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace declarations used to parse QName values
    pub fn set_namespaces(&mut self, namespaces: Arc<NamespaceContext>) {
        self.namespaces = namespaces;
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Violations found so far
    pub fn violations(&self) -> &[IdentityViolation] {
        &self.violations
    }

    /// Hand over the violations found so far
    pub fn take_violations(&mut self) -> Vec<IdentityViolation> {
        std::mem::take(&mut self.violations)
    }

    /// A start tag
    ///
    /// `element` is the declaration the element was validated against, if
    /// any. An undeclared element has untyped content.
    pub fn start_element(
        &mut self,
        name: &QName,
        element: Option<&ElementParticle>,
        line: u32,
        column: u32,
    ) {
        let constraints: Vec<ConstraintStruct> = element
            .map(|decl| {
                decl.identities
                    .iter()
                    .map(|constraint| ConstraintStruct::new(Arc::clone(constraint)))
                    .collect()
            })
            .unwrap_or_default();
        let simple_type = element.and_then(|decl| decl.simple_type);
        let has_declaration = element.is_some();

        self.frames.push(Frame {
            simple_type,
            constraints,
        });
        self.bind_keyrefs();

        let depth = self.frames.len();
        let Self {
            frames, violations, ..
        } = self;
        for frame in frames.iter_mut().rev() {
            for cs in &mut frame.constraints {
                if cs.selector.move_to_start_element(name) {
                    cs.selector.push_ks(line, column);
                }
                let constraint_name = &cs.constraint.name;
                for kss in cs.selector.open_kss_mut() {
                    for field in &mut kss.fields {
                        if !field.axis.move_to_start_element(name) {
                            continue;
                        }
                        if has_declaration && simple_type.is_none() {
                            violations.push(IdentityViolation::FieldSimpleTypeExpected {
                                constraint: constraint_name.clone(),
                                field: field.column,
                                element: name.clone(),
                            });
                        } else {
                            field.matched_at = Some(depth);
                        }
                    }
                }
            }
        }
    }

    fn bind_keyrefs(&mut self) {
        let top = self.frames.len() - 1;
        for index in 0..self.frames[top].constraints.len() {
            let constraint = Arc::clone(&self.frames[top].constraints[index].constraint);
            if constraint.kind != IdentityConstraintKind::Keyref {
                continue;
            }
            let Some(refer) = constraint.refer.as_ref() else {
                continue;
            };

            let target = self.frames.iter().enumerate().rev().find_map(|(frame_index, frame)| {
                frame
                    .constraints
                    .iter()
                    .position(|cs| {
                        cs.constraint.kind != IdentityConstraintKind::Keyref
                            && &cs.constraint.name == refer
                    })
                    .map(|cs_index| (frame_index, cs_index))
            });

            match target {
                Some((frame_index, cs_index)) => {
                    self.frames[top].constraints[index].keyref_target = Some((frame_index, cs_index));
                    self.frames[frame_index].constraints[cs_index]
                        .keyref_table
                        .get_or_insert_with(Vec::new);
                }
                None => self.violations.push(IdentityViolation::RefNotInScope {
                    constraint: constraint.name.clone(),
                    refer: refer.clone(),
                }),
            }
        }
    }

    /// An attribute of the innermost open element
    ///
    /// `value_type` is the attribute's declared type, `None` if untyped.
    pub fn attribute(&mut self, name: &QName, value: &str, value_type: Option<SimpleType>) {
        let Self {
            frames,
            namespaces,
            violations,
        } = self;
        for frame in frames.iter_mut().rev() {
            for cs in &mut frame.constraints {
                let constraint_name = &cs.constraint.name;
                for kss in cs.selector.open_kss_mut() {
                    for field in &kss.fields {
                        if !field.axis.move_to_attribute(name) {
                            continue;
                        }
                        if kss.ks.is_set(field.column) {
                            violations.push(IdentityViolation::FieldSingleValueExpected {
                                constraint: constraint_name.clone(),
                                field: field.column,
                            });
                            continue;
                        }
                        match typed_value(value, value_type, namespaces) {
                            Ok(typed) => {
                                kss.ks.set(field.column, typed);
                            }
                            Err(message) => violations.push(IdentityViolation::InvalidValue {
                                constraint: constraint_name.clone(),
                                field: field.column,
                                message,
                            }),
                        }
                    }
                }
            }
        }
    }

    /// An end tag; `text` is the element's character content
    pub fn end_element(&mut self, name: &QName, text: &str) {
        let Some(top) = self.frames.last() else {
            return;
        };
        let depth = self.frames.len();
        let value = typed_value(text, top.simple_type, &self.namespaces);

        let mut deferred: Vec<((usize, usize), KeySequence, QName)> = Vec::new();
        let Self {
            frames, violations, ..
        } = self;
        for frame in frames.iter_mut().rev() {
            for cs in &mut frame.constraints {
                let constraint_name = cs.constraint.name.clone();
                for kss in cs.selector.open_kss_mut() {
                    for field in &mut kss.fields {
                        if field.matched_at == Some(depth) {
                            field.matched_at = None;
                            match &value {
                                Ok(typed) => {
                                    if !kss.ks.set(field.column, typed.clone()) {
                                        violations.push(IdentityViolation::FieldSingleValueExpected {
                                            constraint: constraint_name.clone(),
                                            field: field.column,
                                        });
                                    }
                                }
                                Err(message) => violations.push(IdentityViolation::InvalidValue {
                                    constraint: constraint_name.clone(),
                                    field: field.column,
                                    message: message.clone(),
                                }),
                            }
                        }
                        field.axis.end_element(name);
                    }
                }

                if !cs.selector.end_element(name) {
                    continue;
                }
                let Some(ks) = cs.selector.pop_ks() else {
                    continue;
                };
                match cs.constraint.kind {
                    IdentityConstraintKind::Key if !ks.is_qualified() => {
                        violations.push(IdentityViolation::MissingKey {
                            constraint: constraint_name,
                            line: ks.line(),
                            column: ks.column(),
                        });
                    }
                    IdentityConstraintKind::Unique if !ks.is_qualified() => {}
                    IdentityConstraintKind::Key | IdentityConstraintKind::Unique => {
                        if cs.qualified.contains(&ks) {
                            violations.push(IdentityViolation::DuplicateKey {
                                constraint: constraint_name,
                                kind: cs.constraint.kind,
                                key: ks.to_string(),
                                line: ks.line(),
                                column: ks.column(),
                            });
                        } else {
                            cs.qualified.insert(ks);
                        }
                    }
                    IdentityConstraintKind::Keyref => {
                        if let Some(target) = cs.keyref_target {
                            if ks.is_qualified() {
                                deferred.push((target, ks, constraint_name));
                            }
                        }
                    }
                }
            }
        }

        for ((frame_index, cs_index), ks, keyref) in deferred {
            if let Some(cs) = frames
                .get_mut(frame_index)
                .and_then(|frame| frame.constraints.get_mut(cs_index))
            {
                cs.keyref_table.get_or_insert_with(Vec::new).push((ks, keyref));
            }
        }

        if let Some(frame) = frames.pop() {
            for cs in &frame.constraints {
                if cs.constraint.kind == IdentityConstraintKind::Keyref {
                    continue;
                }
                let Some(table) = &cs.keyref_table else {
                    continue;
                };
                for (ks, keyref) in table {
                    if !cs.qualified.contains(ks) {
                        violations.push(IdentityViolation::UnresolvedKeyref {
                            constraint: keyref.clone(),
                            refer: cs.constraint.name.clone(),
                            key: ks.to_string(),
                            line: ks.line(),
                            column: ks.column(),
                        });
                    }
                }
            }
        }
    }

    /// Drive the validator with a replayed document and return every
    /// violation found
    pub fn validate_document(&mut self, document: &Document, declarations: &Declarations) -> Vec<IdentityViolation> {
        for event in document.events() {
            match event {
                DocumentEvent::Start {
                    name,
                    attributes,
                    namespaces,
                    line,
                    column,
                } => {
                    self.set_namespaces(Arc::clone(namespaces));
                    self.start_element(name, declarations.element(name), *line, *column);
                    for (attribute, value) in attributes {
                        self.attribute(attribute, value, declarations.attribute(attribute));
                    }
                }
                DocumentEvent::End {
                    name,
                    text,
                    namespaces,
                } => {
                    self.set_namespaces(Arc::clone(namespaces));
                    self.end_element(name, text);
                }
            }
        }
        self.take_violations()
    }
}

fn typed_value(
    text: &str,
    value_type: Option<SimpleType>,
    namespaces: &NamespaceContext,
) -> std::result::Result<TypedObject, String> {
    match value_type {
        Some(ty) => ty
            .parse(text, namespaces)
            .map(|values| TypedObject::new(text, values, Some(ty)))
            .map_err(|err| err.to_string()),
        None => Ok(TypedObject::untyped(text)),
    }
}
