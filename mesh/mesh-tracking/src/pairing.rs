//! Correspondences between protrusions of consecutive snapshots.

use std::collections::BTreeMap;

use hashbrown::HashSet;

use crate::error::{PairingSide, TrackingError, TrackingResult};

/// Maps label-set positions of the current snapshot to positions in the
/// previous snapshot.
///
/// Positions index the ascending protrusion labels of each store (the
/// output of `unique_labels`). Current protrusions without an entry keep
/// their own identity.
///
/// # Example
///
/// ```
/// use mesh_tracking::Pairing;
///
/// let pairing: Pairing = [(0, 1), (2, 0)].into_iter().collect();
/// assert_eq!(pairing.previous_for(0), Some(1));
/// assert_eq!(pairing.previous_for(1), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pairing {
    entries: BTreeMap<usize, usize>,
}

impl Pairing {
    /// Create an empty pairing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pairing from previous-position → current-position entries.
    #[must_use]
    pub fn from_previous_keyed<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        entries
            .into_iter()
            .map(|(previous, current)| (current, previous))
            .collect()
    }

    /// Pair a current position with a previous position.
    ///
    /// Returns the previous position this current position was paired with,
    /// if any.
    pub fn insert(&mut self, current: usize, previous: usize) -> Option<usize> {
        self.entries.insert(current, previous)
    }

    /// Drop the pairing of a current position.
    pub fn remove(&mut self, current: usize) -> Option<usize> {
        self.entries.remove(&current)
    }

    /// Get the previous position paired with a current position.
    #[must_use]
    pub fn previous_for(&self, current: usize) -> Option<usize> {
        self.entries.get(&current).copied()
    }

    /// Get the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pairing is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(current, previous)` entries in ascending current position.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries.iter().map(|(&c, &p)| (c, p))
    }

    /// Check every position against the label counts of both snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidPairing`] for a position out of bounds
    /// and [`TrackingError::DuplicatePairingTarget`] if two current positions
    /// share one previous position.
    pub fn validate(&self, current_len: usize, previous_len: usize) -> TrackingResult<()> {
        let mut targets = HashSet::with_capacity(self.entries.len());
        for (current, previous) in self.iter() {
            if current >= current_len {
                return Err(TrackingError::InvalidPairing {
                    side: PairingSide::Current,
                    position: current,
                    len: current_len,
                });
            }
            if previous >= previous_len {
                return Err(TrackingError::InvalidPairing {
                    side: PairingSide::Previous,
                    position: previous,
                    len: previous_len,
                });
            }
            if !targets.insert(previous) {
                return Err(TrackingError::DuplicatePairingTarget {
                    previous_position: previous,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<(usize, usize)> for Pairing {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_keyed_is_inverted() {
        let pairing = Pairing::from_previous_keyed([(1, 0), (0, 2)]);
        assert_eq!(pairing.previous_for(0), Some(1));
        assert_eq!(pairing.previous_for(2), Some(0));
        assert_eq!(pairing.len(), 2);
    }

    #[test]
    fn insert_replaces() {
        let mut pairing = Pairing::new();
        assert_eq!(pairing.insert(0, 1), None);
        assert_eq!(pairing.insert(0, 2), Some(1));
        assert_eq!(pairing.remove(0), Some(2));
        assert!(pairing.is_empty());
    }

    #[test]
    fn validate_bounds() {
        let pairing: Pairing = [(0, 1)].into_iter().collect();
        assert!(pairing.validate(1, 2).is_ok());
        assert!(matches!(
            pairing.validate(0, 2),
            Err(TrackingError::InvalidPairing {
                side: PairingSide::Current,
                ..
            })
        ));
        assert!(matches!(
            pairing.validate(1, 1),
            Err(TrackingError::InvalidPairing {
                side: PairingSide::Previous,
                position: 1,
                len: 1
            })
        ));
    }

    #[test]
    fn validate_duplicate_target() {
        let pairing: Pairing = [(0, 1), (1, 1)].into_iter().collect();
        assert!(matches!(
            pairing.validate(2, 2),
            Err(TrackingError::DuplicatePairingTarget {
                previous_position: 1
            })
        ));
    }
}
