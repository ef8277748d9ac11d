//! Key values collected for identity constraints
//!
//! A [`KeySequence`] is one row of a key table: one [`TypedObject`] per
//! field, filled in while the selected element's subtree is streamed.
//! Rows compare by value, so they can be used as hash set members.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::values::{AtomicValue, SimpleType};

/// A typed field value
///
/// `values` holds one item for atomic types and the items of a list
/// value otherwise. Untyped values are kept as a single string item.
#[derive(Debug, Clone)]
pub struct TypedObject {
    raw: String,
    values: Vec<AtomicValue>,
    value_type: Option<SimpleType>,
}

impl TypedObject {
    /// Wrap already parsed items
    pub fn new(raw: impl Into<String>, values: Vec<AtomicValue>, value_type: Option<SimpleType>) -> Self {
        Self {
            raw: raw.into(),
            values,
            value_type,
        }
    }

    /// An untyped value, compared as a string
    pub fn untyped(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let values = vec![AtomicValue::String(raw.clone())];
        Self {
            raw,
            values,
            value_type: None,
        }
    }

    /// The lexical form as found in the document
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed items
    pub fn values(&self) -> &[AtomicValue] {
        &self.values
    }

    /// The type the value was parsed with
    pub fn value_type(&self) -> Option<SimpleType> {
        self.value_type
    }

    /// Number of items
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Whether the value was a list
    pub fn is_list(&self) -> bool {
        self.value_type.map_or(false, |ty| ty.is_list)
    }
}

impl PartialEq for TypedObject {
    fn eq(&self, other: &Self) -> bool {
        self.dim() == other.dim()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(left, right)| left.key_eq(right))
    }
}

impl Eq for TypedObject {}

impl Hash for TypedObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dim().hash(state);
        for value in &self.values {
            value.key_hash(state);
        }
    }
}

impl fmt::Display for TypedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw.trim())
    }
}

/// A row of field values
#[derive(Debug, Clone)]
pub struct KeySequence {
    values: Vec<Option<TypedObject>>,
    line: u32,
    column: u32,
}

impl KeySequence {
    /// An empty row of `dim` fields for the element at `line`:`column`
    pub fn new(dim: usize, line: u32, column: u32) -> Self {
        Self {
            values: vec![None; dim],
            line,
            column,
        }
    }

    /// Number of fields
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Value of a field
    pub fn get(&self, index: usize) -> Option<&TypedObject> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Whether a field already has a value
    pub fn is_set(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Set a field; returns false if it already had a value
    pub fn set(&mut self, index: usize, value: TypedObject) -> bool {
        match self.values.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Whether every field has a value
    pub fn is_qualified(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// Line of the selected element
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Column of the selected element
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl PartialEq for KeySequence {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for KeySequence {}

impl Hash for KeySequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            match value {
                Some(value) => write!(f, "'{}'", value)?,
                None => write!(f, "''")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;
    use crate::validators::values::AtomicType;
    use std::collections::HashSet;

    fn typed(ty: impl Into<SimpleType>, raw: &str) -> TypedObject {
        let ty = ty.into();
        let values = ty.parse(raw, &NamespaceContext::new()).unwrap();
        TypedObject::new(raw, values, Some(ty))
    }

    fn row(values: Vec<TypedObject>) -> KeySequence {
        let mut ks = KeySequence::new(values.len(), 1, 1);
        for (index, value) in values.into_iter().enumerate() {
            assert!(ks.set(index, value));
        }
        ks
    }

    #[test]
    fn test_decimal_normalized_rows() {
        let one = row(vec![typed(AtomicType::Decimal, "1")]);
        let one_point_zero = row(vec![typed(AtomicType::Decimal, "1.0")]);
        assert_eq!(one, one_point_zero);

        let mut table = HashSet::new();
        table.insert(one);
        assert!(table.contains(&one_point_zero));
    }

    #[test]
    fn test_incomparable_types_are_unequal() {
        let decimal = row(vec![typed(AtomicType::Decimal, "1")]);
        let string = row(vec![typed(AtomicType::String, "1")]);
        let untyped = row(vec![TypedObject::untyped("1")]);
        assert_ne!(decimal, string);
        assert_ne!(decimal, untyped);
        assert_eq!(string, untyped);
    }

    #[test]
    fn test_single_item_list_equals_atomic() {
        let list = typed(SimpleType::list(AtomicType::Integer), " 5 ");
        let atomic = typed(AtomicType::Integer, "5");
        assert!(list.is_list());
        assert_eq!(list, atomic);

        let pair = typed(SimpleType::list(AtomicType::Integer), "5 6");
        assert_ne!(pair, atomic);
    }

    #[test]
    fn test_qualification() {
        let mut ks = KeySequence::new(2, 3, 7);
        assert!(!ks.is_qualified());
        assert!(ks.set(0, TypedObject::untyped("a")));
        assert!(!ks.set(0, TypedObject::untyped("b")));
        assert!(!ks.set(5, TypedObject::untyped("b")));
        assert!(!ks.is_qualified());
        assert!(ks.set(1, TypedObject::untyped("b")));
        assert!(ks.is_qualified());
        assert_eq!(ks.to_string(), "'a' 'b'");
        assert_eq!((ks.line(), ks.column()), (3, 7));
    }

    #[test]
    fn test_position_does_not_affect_equality() {
        let mut first = KeySequence::new(1, 1, 1);
        first.set(0, TypedObject::untyped("x"));
        let mut second = KeySequence::new(1, 9, 9);
        second.set(0, TypedObject::untyped("x"));
        assert_eq!(first, second);
    }
}
