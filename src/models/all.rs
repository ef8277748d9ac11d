//! Validator for `xs:all` groups
//!
//! Members may appear in any order, each at most once. The state only has
//! to remember which members were seen and how many of them were required.

use indexmap::IndexMap;
use std::sync::Arc;

use super::bitset::BitSet;
use super::positions::MatchedParticle;
use super::state::{Cursor, ValidationState};
use super::validator::{ContentError, ContentType, ContentValidation};
use crate::namespaces::QName;
use crate::validators::groups::ElementParticle;

/// Unordered content validator
#[derive(Debug, Clone)]
pub struct AllElementsContentValidator {
    elements: IndexMap<QName, usize>,
    particles: Vec<MatchedParticle>,
    required: BitSet,
    count_required: usize,
    content_type: ContentType,
    open: bool,
    emptiable: bool,
}

impl AllElementsContentValidator {
    /// Create a validator with no members
    ///
    /// `emptiable` tells whether the group as a whole may be absent
    /// (`minOccurs="0"` on the `xs:all`).
    pub fn new(content_type: ContentType, open: bool, emptiable: bool) -> Self {
        Self {
            elements: IndexMap::new(),
            particles: Vec::new(),
            required: BitSet::new(0),
            count_required: 0,
            content_type,
            open,
            emptiable,
        }
    }

    /// Add a member; returns false if a member with the same name exists
    pub fn add_element(&mut self, element: Arc<ElementParticle>, is_emptiable: bool) -> bool {
        if self.elements.contains_key(&element.name) {
            return false;
        }
        let index = self.particles.len();
        self.elements.insert(element.name.clone(), index);
        self.particles.push(MatchedParticle::Element(element));
        if !is_emptiable {
            self.required.set(index);
            self.count_required += 1;
        }
        true
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of members that must appear
    pub fn count_required(&self) -> usize {
        self.count_required
    }

    fn is_complete(&self, required: Option<usize>) -> bool {
        match required {
            Some(count) => count == self.count_required,
            None => self.emptiable || self.count_required == 0,
        }
    }
}

impl ContentValidation for AllElementsContentValidator {
    fn content_type(&self) -> ContentType {
        self.content_type
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_emptiable(&self) -> bool {
        self.emptiable || self.count_required == 0
    }

    fn init_validation(&self, state: &mut ValidationState) {
        let seen = match std::mem::take(&mut state.cursor) {
            Cursor::All { mut seen, .. } => {
                seen.clear_all();
                seen
            }
            _ => BitSet::new(self.particles.len()),
        };
        let has_matched = self.is_complete(None);
        state.reset(Cursor::All { seen, required: None }, has_matched);
    }

    fn validate_element(
        &self,
        name: &QName,
        state: &mut ValidationState,
    ) -> Result<Option<MatchedParticle>, ContentError> {
        if !matches!(state.cursor, Cursor::All { .. }) {
            self.init_validation(state);
        }

        let Some(&index) = self.elements.get(name) else {
            if self.open && state.has_matched {
                return Ok(None);
            }
            state.reject();
            return Err(ContentError::UnexpectedElement);
        };

        let Cursor::All { seen, required } = &mut state.cursor else {
            return Err(ContentError::UnexpectedElement);
        };
        if seen.get(index) {
            return Err(ContentError::DuplicateElement);
        }
        seen.set(index);

        let mut count = required.unwrap_or(0);
        if self.required.get(index) {
            count += 1;
        }
        *required = Some(count);

        state.has_matched = self.is_complete(Some(count));
        Ok(Some(self.particles[index].clone()))
    }

    fn complete_validation(&self, state: &ValidationState) -> bool {
        match &state.cursor {
            Cursor::All { required, .. } => self.is_complete(*required),
            _ => self.is_complete(None),
        }
    }

    fn expected_particles(&self, state: &ValidationState) -> Vec<MatchedParticle> {
        let seen = match &state.cursor {
            Cursor::All { seen, .. } => Some(seen),
            _ => None,
        };
        self.particles
            .iter()
            .enumerate()
            .filter(|(index, _)| seen.map_or(true, |seen| !seen.get(*index)))
            .map(|(_, particle)| particle.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::particles::Occurs;

    fn member(name: &str) -> Arc<ElementParticle> {
        Arc::new(ElementParticle::new(QName::local(name), Occurs::once()))
    }

    fn abc() -> AllElementsContentValidator {
        let mut validator = AllElementsContentValidator::new(ContentType::ElementOnly, false, false);
        assert!(validator.add_element(member("a"), false));
        assert!(validator.add_element(member("b"), false));
        assert!(validator.add_element(member("c"), true));
        validator
    }

    #[test]
    fn test_any_order() {
        let validator = abc();
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        assert!(!validator.complete_validation(&state));

        for name in ["c", "b", "a"] {
            assert!(validator.validate_element(&QName::local(name), &mut state).is_ok());
        }
        assert!(validator.complete_validation(&state));
    }

    #[test]
    fn test_optional_member_may_be_missing() {
        let validator = abc();
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        validator.validate_element(&QName::local("b"), &mut state).unwrap();
        validator.validate_element(&QName::local("a"), &mut state).unwrap();
        assert!(validator.complete_validation(&state));
        assert!(state.has_matched());
    }

    #[test]
    fn test_duplicate_and_unknown() {
        let validator = abc();
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        validator.validate_element(&QName::local("a"), &mut state).unwrap();

        let duplicate = validator.validate_element(&QName::local("a"), &mut state);
        assert_eq!(duplicate, Err(ContentError::DuplicateElement));
        assert_eq!(duplicate.unwrap_err().code(), -2);
        assert!(state.need_validate_children());

        let unknown = validator.validate_element(&QName::local("z"), &mut state);
        assert_eq!(unknown, Err(ContentError::UnexpectedElement));
        assert!(!state.need_validate_children());
    }

    #[test]
    fn test_emptiable_group() {
        let mut validator = AllElementsContentValidator::new(ContentType::ElementOnly, false, true);
        validator.add_element(member("a"), false);
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        assert!(validator.complete_validation(&state));

        // once started, the required members are due
        validator.validate_element(&QName::local("a"), &mut state).unwrap();
        assert!(validator.complete_validation(&state));

        let mut validator = AllElementsContentValidator::new(ContentType::ElementOnly, false, true);
        validator.add_element(member("a"), false);
        validator.add_element(member("b"), true);
        validator.init_validation(&mut state);
        validator.validate_element(&QName::local("b"), &mut state).unwrap();
        assert!(!validator.complete_validation(&state));
    }

    #[test]
    fn test_duplicate_member_declaration() {
        let mut validator = abc();
        assert!(!validator.add_element(member("a"), true));
        assert_eq!(validator.len(), 3);
        assert_eq!(validator.count_required(), 2);
    }

    #[test]
    fn test_expected_excludes_seen() {
        let validator = abc();
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        validator.validate_element(&QName::local("b"), &mut state).unwrap();
        assert_eq!(validator.expected_elements(&state), vec!["a", "c"]);
    }

    #[test]
    fn test_init_is_idempotent() {
        let validator = abc();
        let mut state = ValidationState::new();
        validator.init_validation(&mut state);
        let fresh = state.clone();
        validator.validate_element(&QName::local("a"), &mut state).unwrap();
        validator.init_validation(&mut state);
        assert_eq!(state, fresh);
    }
}
