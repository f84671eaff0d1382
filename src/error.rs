//! Unified error handling for the trajectory heuristics.
//!
//! Degenerate input (single-record groups, zero-length windows) is resolved
//! locally with fallback values and never shows up here. What does show up is
//! missing input, bad parameters and internal-consistency faults.

use thiserror::Error;

/// Unified error type for trajectory heuristic operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    /// The table a heuristic needs has no records
    #[error("Empty dataset: no {table} records loaded")]
    EmptyDataset { table: String },

    /// A column used as input (typically a grouping key) is not populated
    #[error("Column '{column}' is unset on {missing} records")]
    MissingColumn { column: String, missing: usize },

    /// A position carries a non-finite or out-of-range coordinate
    #[error("Invalid coordinates on position {position_id}: ({latitude}, {longitude})")]
    InvalidCoordinates {
        position_id: i64,
        latitude: f64,
        longitude: f64,
    },

    /// A caller-supplied override is out of range
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// A clustering loop stopped making progress
    #[error(
        "{heuristic} did not converge after {iterations} iterations ({remaining} groups unassigned)"
    )]
    NonConvergence {
        heuristic: String,
        iterations: usize,
        remaining: usize,
    },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrajectoryError {
    pub(crate) fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        TrajectoryError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for trajectory heuristic operations.
pub type Result<T> = std::result::Result<T, TrajectoryError>;

/// Extension trait for converting Option to TrajectoryError.
pub trait OptionExt<T> {
    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrajectoryError::Internal {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrajectoryError::NonConvergence {
            heuristic: "edgedelta".to_string(),
            iterations: 4,
            remaining: 2,
        };
        assert!(err.to_string().contains("edgedelta"));
        assert!(err.to_string().contains("2 groups unassigned"));

        let err = TrajectoryError::EmptyDataset {
            table: "position".to_string(),
        };
        assert_eq!(err.to_string(), "Empty dataset: no position records loaded");

        let err = TrajectoryError::InvalidCoordinates {
            position_id: 3,
            latitude: 91.0,
            longitude: 9.0,
        };
        assert_eq!(err.to_string(), "Invalid coordinates on position 3: (91, 9)");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_internal("group lookup failed");
        assert!(matches!(result, Err(TrajectoryError::Internal { .. })));

        let some = Some(7).ok_or_internal("unreachable");
        assert_eq!(some, Ok(7));
    }
}
