//! Error types for protrusion tracking operations.

use std::fmt;

use thiserror::Error;

/// Result type for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Which snapshot a pairing position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingSide {
    /// The earlier snapshot whose identities are kept.
    Previous,
    /// The snapshot being relabeled.
    Current,
}

impl fmt::Display for PairingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Previous => f.write_str("previous"),
            Self::Current => f.write_str("current"),
        }
    }
}

/// Errors that can occur while tracking or removing protrusions.
///
/// Every operation that returns one of these leaves its inputs untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackingError {
    /// No free identity exists in the allocation range.
    #[error("no free protrusion identity in [{min_index}, {max_index}]")]
    RangeExhausted {
        /// Inclusive lower bound of the range.
        min_index: u32,
        /// Inclusive upper bound of the range.
        max_index: u32,
    },

    /// The statistics table disagrees with itself or with the label array.
    #[error("inconsistent statistics: {reason}")]
    InconsistentStatistics {
        /// What did not line up.
        reason: String,
    },

    /// The raw statistics do not match any known layout.
    #[error("unrecognized statistics layout (variables: {variables:?})")]
    UnknownSchema {
        /// Names of the variables that were supplied.
        variables: Vec<String>,
    },

    /// A pairing refers to a position outside a snapshot's label set.
    #[error("pairing position {position} out of bounds ({side} snapshot has {len} labels)")]
    InvalidPairing {
        /// The snapshot the position refers to.
        side: PairingSide,
        /// The offending position.
        position: usize,
        /// Number of labels in that snapshot.
        len: usize,
    },

    /// Two current protrusions were paired with the same previous protrusion.
    #[error("previous position {previous_position} is paired more than once")]
    DuplicatePairingTarget {
        /// The previous-snapshot position claimed twice.
        previous_position: usize,
    },

    /// A relabel would merge two protrusions under one identity.
    #[error("label {label} is already in use")]
    LabelInUse {
        /// The label that already exists.
        label: u32,
    },

    /// Label 0 is reserved for the base cell and cannot be assigned.
    #[error("label 0 is reserved for the base cell")]
    BackgroundLabel,
}

impl TrackingError {
    pub(crate) fn inconsistent(reason: impl Into<String>) -> Self {
        Self::InconsistentStatistics {
            reason: reason.into(),
        }
    }
}
