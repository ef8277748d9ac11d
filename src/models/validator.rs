//! The content validator contract
//!
//! Four compiled strategies and a handful of trivial validators share one
//! protocol, driven by the caller once per element:
//!
//! 1. [`ContentValidation::init_validation`] when the element starts,
//! 2. [`ContentValidation::validate_element`] for every child element, in
//!    document order,
//! 3. [`ContentValidation::complete_validation`] when the element ends.
//!
//! Rejected children are reported as [`ContentError`] values, never as
//! [`crate::Error`]: the caller turns them into diagnostics (usually with
//! [`ContentValidation::expected_elements`]) and keeps validating siblings.

use std::fmt;
use thiserror::Error;

use super::all::AllElementsContentValidator;
use super::dfa::DfaContentValidator;
use super::nfa::NfaContentValidator;
use super::positions::MatchedParticle;
use super::range::RangeContentValidator;
use super::state::{Cursor, ValidationState};
use crate::namespaces::QName;

/// What an element's content may consist of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// No children, no text
    Empty,
    /// Text only
    TextOnly,
    /// Child elements, whitespace between them
    #[default]
    ElementOnly,
    /// Child elements interleaved with text
    Mixed,
}

impl ContentType {
    /// Whether character data is allowed between children
    pub fn accepts_text(&self) -> bool {
        matches!(self, Self::TextOnly | Self::Mixed)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::TextOnly => write!(f, "text only"),
            Self::ElementOnly => write!(f, "element only"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// A rejected child element
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentError {
    /// The child cannot appear at this point of the content
    #[error("element is not expected here")]
    UnexpectedElement,
    /// The child was already matched by a member of an all group
    #[error("element already appeared in the all group")]
    DuplicateElement,
}

impl ContentError {
    /// Numeric error code: -1 unexpected, -2 duplicate
    pub fn code(&self) -> i32 {
        match self {
            Self::UnexpectedElement => -1,
            Self::DuplicateElement => -2,
        }
    }
}

/// Protocol shared by every content validator
pub trait ContentValidation {
    /// Content type of the model
    fn content_type(&self) -> ContentType;

    /// Whether unknown trailing children are tolerated once the content is
    /// complete
    fn is_open(&self) -> bool {
        false
    }

    /// Whether the model accepts no children at all
    fn is_emptiable(&self) -> bool;

    /// Reset `state` to the start configuration
    fn init_validation(&self, state: &mut ValidationState);

    /// Consume one child element
    ///
    /// Returns the particle the child was attributed to, or `None` when the
    /// child was accepted without one (open content, `xs:any` content).
    fn validate_element(
        &self,
        name: &QName,
        state: &mut ValidationState,
    ) -> Result<Option<MatchedParticle>, ContentError>;

    /// Whether the children seen so far form valid content
    fn complete_validation(&self, state: &ValidationState) -> bool;

    /// Particles that could match the next child; does not change `state`
    fn expected_particles(&self, state: &ValidationState) -> Vec<MatchedParticle>;

    /// Names (or wildcard descriptions) of what could come next
    fn expected_elements(&self, state: &ValidationState) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for particle in self.expected_particles(state) {
            let name = particle.to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Add `particle` to `particles` unless the same particle is already there
pub(crate) fn push_unique(particles: &mut Vec<MatchedParticle>, particle: &MatchedParticle) {
    if !particles.contains(particle) {
        particles.push(particle.clone());
    }
}

/// Which strategy a [`ContentValidator`] uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    /// No content at all
    Empty,
    /// Text only
    TextOnly,
    /// Text, no children
    Mixed,
    /// Any children
    Any,
    /// Transition table
    Dfa,
    /// Position sets
    Nfa,
    /// Position sets with iteration counters
    Range,
    /// Unordered all group
    All,
}

/// A compiled content model
#[derive(Debug, Clone)]
pub enum ContentValidator {
    /// Rejects children and text
    Empty,
    /// Rejects children, accepts text
    TextOnly,
    /// Rejects children, accepts text (mixed content with no particles)
    Mixed,
    /// Accepts any children without attributing them
    Any,
    /// Deterministic model small enough for a transition table
    Dfa(DfaContentValidator),
    /// Model evaluated by position-set union
    Nfa(NfaContentValidator),
    /// Model with counted repetitions
    Range(RangeContentValidator),
    /// `xs:all` group
    All(AllElementsContentValidator),
}

impl ContentValidator {
    /// Strategy of this validator
    pub fn kind(&self) -> ValidatorKind {
        match self {
            Self::Empty => ValidatorKind::Empty,
            Self::TextOnly => ValidatorKind::TextOnly,
            Self::Mixed => ValidatorKind::Mixed,
            Self::Any => ValidatorKind::Any,
            Self::Dfa(_) => ValidatorKind::Dfa,
            Self::Nfa(_) => ValidatorKind::Nfa,
            Self::Range(_) => ValidatorKind::Range,
            Self::All(_) => ValidatorKind::All,
        }
    }

    /// Check a whole child sequence in one go
    pub fn accepts<'a>(&self, names: impl IntoIterator<Item = &'a QName>) -> bool {
        let mut state = ValidationState::new();
        self.init_validation(&mut state);
        for name in names {
            if self.validate_element(name, &mut state).is_err() {
                return false;
            }
        }
        self.complete_validation(&state)
    }

    fn as_compiled(&self) -> Option<&dyn ContentValidation> {
        match self {
            Self::Dfa(v) => Some(v),
            Self::Nfa(v) => Some(v),
            Self::Range(v) => Some(v),
            Self::All(v) => Some(v),
            Self::Empty | Self::TextOnly | Self::Mixed | Self::Any => None,
        }
    }
}

impl ContentValidation for ContentValidator {
    fn content_type(&self) -> ContentType {
        match self {
            Self::Empty => ContentType::Empty,
            Self::TextOnly => ContentType::TextOnly,
            Self::Mixed | Self::Any => ContentType::Mixed,
            compiled => compiled
                .as_compiled()
                .map_or(ContentType::ElementOnly, |v| v.content_type()),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Any => true,
            other => other.as_compiled().map_or(false, |v| v.is_open()),
        }
    }

    fn is_emptiable(&self) -> bool {
        self.as_compiled().map_or(true, |v| v.is_emptiable())
    }

    fn init_validation(&self, state: &mut ValidationState) {
        match self.as_compiled() {
            Some(v) => v.init_validation(state),
            None => state.reset(Cursor::Unstarted, true),
        }
    }

    fn validate_element(
        &self,
        name: &QName,
        state: &mut ValidationState,
    ) -> Result<Option<MatchedParticle>, ContentError> {
        match self {
            Self::Any => Ok(None),
            Self::Empty | Self::TextOnly | Self::Mixed => {
                state.reject();
                Err(ContentError::UnexpectedElement)
            }
            Self::Dfa(v) => v.validate_element(name, state),
            Self::Nfa(v) => v.validate_element(name, state),
            Self::Range(v) => v.validate_element(name, state),
            Self::All(v) => v.validate_element(name, state),
        }
    }

    fn complete_validation(&self, state: &ValidationState) -> bool {
        self.as_compiled()
            .map_or(true, |v| v.complete_validation(state))
    }

    fn expected_particles(&self, state: &ValidationState) -> Vec<MatchedParticle> {
        self.as_compiled()
            .map_or_else(Vec::new, |v| v.expected_particles(state))
    }

    fn expected_elements(&self, state: &ValidationState) -> Vec<String> {
        match self {
            Self::Any => vec!["##any".to_string()],
            other => other
                .as_compiled()
                .map_or_else(Vec::new, |v| v.expected_elements(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ContentError::UnexpectedElement.code(), -1);
        assert_eq!(ContentError::DuplicateElement.code(), -2);
        assert_eq!(
            ContentError::DuplicateElement.to_string(),
            "element already appeared in the all group"
        );
    }

    #[test]
    fn test_content_type_text() {
        assert!(ContentType::Mixed.accepts_text());
        assert!(ContentType::TextOnly.accepts_text());
        assert!(!ContentType::ElementOnly.accepts_text());
        assert!(!ContentType::Empty.accepts_text());
    }

    #[test]
    fn test_trivial_validators() {
        let a = QName::local("a");
        let mut state = ValidationState::new();

        for validator in [ContentValidator::Empty, ContentValidator::TextOnly, ContentValidator::Mixed] {
            validator.init_validation(&mut state);
            assert!(validator.complete_validation(&state));
            assert_eq!(
                validator.validate_element(&a, &mut state),
                Err(ContentError::UnexpectedElement)
            );
            assert!(!state.need_validate_children());
        }

        let any = ContentValidator::Any;
        any.init_validation(&mut state);
        assert_eq!(any.validate_element(&a, &mut state), Ok(None));
        assert!(any.complete_validation(&state));
        assert!(any.is_open());
        assert_eq!(any.kind(), ValidatorKind::Any);
        assert_eq!(ContentValidator::Empty.content_type(), ContentType::Empty);
    }
}
