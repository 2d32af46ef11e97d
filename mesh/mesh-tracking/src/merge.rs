//! Cross-snapshot identity reconciliation.
//!
//! Each snapshot is segmented independently, so the same integer in two
//! snapshots says nothing about the protrusion behind it. Merging a
//! current snapshot into the identity space of the previous one happens in
//! two staged steps, and nothing is written until both are planned:
//!
//! 1. Every current label that also exists in the previous snapshot is
//!    renumbered to a fresh identity above the high-water mark.
//! 2. Every paired current protrusion takes the label of its previous
//!    partner. Pairing positions refer to the current label order captured
//!    before step 1, so a renumbered protrusion keeps its position.
//!
//! The combined plan is then applied to the current store as a single
//! simultaneous relabeling.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::allocator::IdentityAllocator;
use crate::config::TrackingConfig;
use crate::error::TrackingResult;
use crate::pairing::Pairing;
use crate::store::SegmentationStore;

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// High-water mark to pass to the next merge.
    pub min_index: u32,
    /// Colliding labels and the fresh identities they were given.
    pub renumbered: Vec<(u32, u32)>,
    /// Paired relabels as `(source, target)`, source after renumbering.
    pub paired: Vec<(u32, u32)>,
    /// Number of faces whose label changed.
    pub faces_relabeled: usize,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Merge: {} renumbered, {} paired, {} faces relabeled (min_index {})",
            self.renumbered.len(),
            self.paired.len(),
            self.faces_relabeled,
            self.min_index
        )
    }
}

/// Reconciles the identities of consecutive snapshots.
///
/// # Example
///
/// ```
/// use mesh_tracking::{
///     LabelMap, Pairing, SegmentationStore, TrackingConfig, TrackingMerger,
/// };
///
/// let previous = SegmentationStore::from_labels(LabelMap::from_labels(vec![5, 7, 0]));
/// let mut current = SegmentationStore::from_labels(LabelMap::from_labels(vec![5, 9, 0]));
///
/// let config = TrackingConfig::new().with_max_index(1_000).with_seed(1);
/// let mut merger = TrackingMerger::new(&config);
///
/// // Current position 0 (label 5) is previous position 1 (label 7).
/// let pairing: Pairing = [(0, 1)].into_iter().collect();
/// let report = merger.merge(&previous, &mut current, &pairing, 10).unwrap();
///
/// assert_eq!(current.unique_labels(), vec![7, 9]);
/// assert!(report.min_index >= 10);
/// ```
#[derive(Debug, Clone)]
pub struct TrackingMerger {
    allocator: IdentityAllocator,
    max_index: u32,
}

impl TrackingMerger {
    /// Create a merger from a tracking configuration.
    #[must_use]
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            allocator: IdentityAllocator::new(config),
            max_index: config.max_index,
        }
    }

    /// Inclusive upper bound for fresh identities.
    #[must_use]
    pub fn max_index(&self) -> u32 {
        self.max_index
    }

    /// Relabel `current` so its identities agree with `previous`.
    ///
    /// `min_index` is the high-water mark returned by the previous merge (or
    /// any lower bound for the first one); the returned report carries the
    /// updated mark, which is at least the input and at least every label
    /// now present in either store. Calls must follow snapshot order.
    ///
    /// # Errors
    ///
    /// - [`TrackingError::InvalidPairing`] or
    ///   [`TrackingError::DuplicatePairingTarget`] for a malformed pairing.
    /// - [`TrackingError::RangeExhausted`] if a collision cannot be given a
    ///   fresh identity in `[min_index, max_index]`.
    ///
    /// Each fresh identity becomes the lower bound for the next one, so every
    /// collision shrinks the remaining range by a uniformly random fraction.
    /// A few tens of collisions in one merge can exhaust even the default
    /// range; raise [`TrackingConfig::max_index`] for heavily overlapping
    /// snapshots.
    ///
    /// `current` is unchanged on error.
    ///
    /// [`TrackingError::InvalidPairing`]: crate::TrackingError::InvalidPairing
    /// [`TrackingError::DuplicatePairingTarget`]: crate::TrackingError::DuplicatePairingTarget
    /// [`TrackingError::RangeExhausted`]: crate::TrackingError::RangeExhausted
    pub fn merge(
        &mut self,
        previous: &SegmentationStore,
        current: &mut SegmentationStore,
        pairing: &Pairing,
        min_index: u32,
    ) -> TrackingResult<MergeReport> {
        let previous_labels = previous.unique_labels();
        let current_labels = current.unique_labels();
        pairing.validate(current_labels.len(), previous_labels.len())?;

        let previous_set: HashSet<u32> = previous_labels.iter().copied().collect();
        let mut used: HashSet<u32> = previous_set
            .iter()
            .chain(current_labels.iter())
            .copied()
            .collect();
        let mut min_index = min_index.max(used.iter().copied().max().unwrap_or(0));

        info!(
            previous = previous_labels.len(),
            current = current_labels.len(),
            pairs = pairing.len(),
            min_index,
            "Starting protrusion merge"
        );

        // Step 1: give colliding labels fresh identities, position by position.
        let mut resolved = current_labels.clone();
        let mut renumbered = Vec::new();
        for (position, &label) in current_labels.iter().enumerate() {
            if !previous_set.contains(&label) {
                continue;
            }
            let fresh = self.allocator.allocate(&used, min_index, self.max_index)?;
            debug!(label, fresh, "Renumbered colliding protrusion");
            resolved[position] = fresh;
            used.insert(fresh);
            min_index = fresh;
            renumbered.push((label, fresh));
        }

        // Step 2: paired positions take their previous partner's label.
        let mut targets = resolved.clone();
        let mut paired = Vec::with_capacity(pairing.len());
        for (current_position, previous_position) in pairing.iter() {
            let target = previous_labels[previous_position];
            paired.push((resolved[current_position], target));
            targets[current_position] = target;
        }

        let mapping: HashMap<u32, u32> = current_labels
            .iter()
            .zip(&targets)
            .filter(|(from, to)| from != to)
            .map(|(&from, &to)| (from, to))
            .collect();
        let faces_relabeled = current.relabel_many(&mapping)?;

        let report = MergeReport {
            min_index,
            renumbered,
            paired,
            faces_relabeled,
        };
        info!(
            renumbered = report.renumbered.len(),
            paired = report.paired.len(),
            faces = report.faces_relabeled,
            min_index = report.min_index,
            "Finished protrusion merge"
        );
        Ok(report)
    }
}
