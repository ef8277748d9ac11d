//! XSD particle occurrence bounds
//!
//! Every element, wildcard and model group in a content model carries a
//! `minOccurs`/`maxOccurs` pair. The content model builder turns each pair
//! into one of the regular-expression operators of the syntax tree, see
//! [`OccursShape`].
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#p

use crate::error::{ParseError, Result};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

/// How an occurrence range maps onto syntax tree operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccursShape {
    /// maxOccurs = 0: the particle contributes nothing
    Absent,
    /// (1, 1)
    Once,
    /// (0, 1) → `?`
    Optional,
    /// (0, unbounded) → `*`
    ZeroOrMore,
    /// (1, unbounded) → `+`
    OneOrMore,
    /// Any other bounds → counted repetition `{min,max}`
    Range {
        /// Lower bound
        min: u32,
        /// Upper bound (None = unbounded)
        max: Option<u32>,
    },
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Empty (0, 0)
    pub fn empty() -> Self {
        Self { min: 0, max: Some(0) }
    }

    /// Bounded range (min, max)
    pub fn range(min: u32, max: u32) -> Self {
        Self { min, max: Some(max) }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is empty (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if particle can have multiple occurrences
    pub fn is_multiple(&self) -> bool {
        !self.is_empty() && !self.is_single()
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// Classify the bounds into the operator the syntax tree uses
    pub fn shape(&self) -> OccursShape {
        match (self.min, self.max) {
            (_, Some(0)) => OccursShape::Absent,
            (1, Some(1)) => OccursShape::Once,
            (0, Some(1)) => OccursShape::Optional,
            (0, None) => OccursShape::ZeroOrMore,
            (1, None) => OccursShape::OneOrMore,
            (min, max) => OccursShape::Range { min, max },
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl std::fmt::Display for Occurs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "{{{},{}}}", self.min, max),
            None => write!(f, "{{{},unbounded}}", self.min),
        }
    }
}

/// Trait for XSD components that have particle semantics
pub trait Particle {
    /// Get the occurrence bounds
    fn occurs(&self) -> Occurs;

    /// Get minimum occurrences
    fn min_occurs(&self) -> u32 {
        self.occurs().min
    }

    /// Get maximum occurrences (None = unbounded)
    fn max_occurs(&self) -> Option<u32> {
        self.occurs().max
    }

    /// Check if this particle can be empty
    fn is_emptiable(&self) -> bool {
        self.occurs().is_emptiable()
    }
}

/// Parse minOccurs/maxOccurs from XML attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        match min_str.trim().parse::<u32>() {
            Ok(min) => occurs.min = min,
            Err(_) => {
                return Err(ParseError::new(
                    "minOccurs value is not a valid non-negative integer",
                )
                .into())
            }
        }
    }

    if let Some(max_str) = max_occurs {
        let max_str = max_str.trim();
        if max_str == "unbounded" {
            occurs.max = None;
        } else {
            match max_str.parse::<u32>() {
                Ok(max) => {
                    if occurs.min > max {
                        return Err(ParseError::new(
                            "maxOccurs must be 'unbounded' or greater than minOccurs",
                        )
                        .into());
                    }
                    occurs.max = Some(max);
                }
                Err(_) => {
                    return Err(ParseError::new(
                        "maxOccurs value must be a non-negative integer or 'unbounded'",
                    )
                    .into())
                }
            }
        }
    } else if occurs.min > 1 {
        return Err(ParseError::new("minOccurs must be lesser or equal than maxOccurs").into());
    }

    Ok(occurs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_presets() {
        assert_eq!(Occurs::once(), Occurs::new(1, Some(1)));
        assert_eq!(Occurs::optional(), Occurs::new(0, Some(1)));
        assert_eq!(Occurs::zero_or_more(), Occurs::new(0, None));
        assert_eq!(Occurs::one_or_more(), Occurs::new(1, None));
        assert_eq!(Occurs::empty(), Occurs::new(0, Some(0)));
        assert_eq!(Occurs::range(2, 4), Occurs::new(2, Some(4)));
    }

    #[test]
    fn test_occurs_predicates() {
        let optional = Occurs::optional();
        assert!(optional.is_emptiable());
        assert!(!optional.is_empty());
        assert!(optional.is_single());
        assert!(!optional.is_multiple());

        let unbounded = Occurs::zero_or_more();
        assert!(unbounded.is_emptiable());
        assert!(unbounded.is_multiple());

        let empty = Occurs::empty();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_occurs_counting() {
        let occurs = Occurs::new(2, Some(5));
        assert!(occurs.is_missing(1));
        assert!(!occurs.is_missing(2));
        assert!(!occurs.is_over(4));
        assert!(occurs.is_over(5));
        assert!(!Occurs::one_or_more().is_over(1_000_000));
    }

    #[test]
    fn test_occurs_shape() {
        assert_eq!(Occurs::empty().shape(), OccursShape::Absent);
        assert_eq!(Occurs::new(3, Some(0)).shape(), OccursShape::Absent);
        assert_eq!(Occurs::once().shape(), OccursShape::Once);
        assert_eq!(Occurs::optional().shape(), OccursShape::Optional);
        assert_eq!(Occurs::zero_or_more().shape(), OccursShape::ZeroOrMore);
        assert_eq!(Occurs::one_or_more().shape(), OccursShape::OneOrMore);
        assert_eq!(
            Occurs::range(2, 4).shape(),
            OccursShape::Range { min: 2, max: Some(4) }
        );
        assert_eq!(
            Occurs::new(2, None).shape(),
            OccursShape::Range { min: 2, max: None }
        );
        assert_eq!(
            Occurs::range(0, 3).shape(),
            OccursShape::Range { min: 0, max: Some(3) }
        );
    }

    #[test]
    fn test_occurs_display() {
        assert_eq!(Occurs::range(2, 4).to_string(), "{2,4}");
        assert_eq!(Occurs::one_or_more().to_string(), "{1,unbounded}");
    }

    #[test]
    fn test_parse_occurs_values() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(parse_occurs(Some("0"), Some("5")).unwrap(), Occurs::new(0, Some(5)));
        assert_eq!(
            parse_occurs(Some("1"), Some("unbounded")).unwrap(),
            Occurs::new(1, None)
        );
    }

    #[test]
    fn test_parse_occurs_errors() {
        assert!(parse_occurs(Some("abc"), None).is_err());
        assert!(parse_occurs(None, Some("abc")).is_err());
        assert!(parse_occurs(Some("5"), Some("3")).is_err());
        assert!(parse_occurs(Some("5"), None).is_err());
    }
}
