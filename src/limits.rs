//! Limits and constraints for content model compilation and matching
//!
//! These bounds keep adversarial schemas from exhausting memory or CPU:
//! the range validator caps its running position tuples, the DFA builder
//! gives up on oversized subset constructions, and the compilers refuse
//! absurdly deep particle trees or selector paths.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of running position tuples kept by the range validator
    pub max_running_positions: usize,

    /// Budget for the DFA transition table, counted as states × positions
    pub max_dfa_table_cells: usize,

    /// Maximum particle nesting depth accepted by the content model builder
    pub max_model_depth: usize,

    /// Maximum number of steps in a single selector/field path
    pub max_xpath_steps: usize,

    /// Maximum `maxOccurs` value that may be unrolled instead of counted
    pub max_unrolled_occurs: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_running_positions: 10000,
            max_dfa_table_cells: 8192,
            max_model_depth: 100,
            max_xpath_steps: 256,
            max_unrolled_occurs: 16,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_running_positions: 1000,
            max_dfa_table_cells: 2048,
            max_model_depth: 20,
            max_xpath_steps: 32,
            max_unrolled_occurs: 4,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_running_positions: 100000,
            max_dfa_table_cells: 1 << 20,
            max_model_depth: 1000,
            max_xpath_steps: 4096,
            max_unrolled_occurs: 256,
        }
    }

    /// Check if a particle nesting depth is within limits
    pub fn check_model_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_model_depth {
            Err(Error::LimitExceeded(format!(
                "content model depth {} exceeds maximum {}",
                depth, self.max_model_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of steps of a path is within limits
    pub fn check_xpath_steps(&self, steps: usize) -> Result<()> {
        if steps > self.max_xpath_steps {
            Err(Error::LimitExceeded(format!(
                "xpath with {} steps exceeds maximum {}",
                steps, self.max_xpath_steps
            )))
        } else {
            Ok(())
        }
    }

    /// Check whether a DFA with `states` states over `positions`
    /// positions still fits the table budget
    pub fn fits_dfa_table(&self, states: usize, positions: usize) -> bool {
        states.saturating_mul(positions.max(1)) <= self.max_dfa_table_cells
    }
}
