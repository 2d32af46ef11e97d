//! Ordered tracking over a whole time series.
//!
//! [`TrackingSequence`] threads the high-water mark from one merge into the
//! next, so identities freshly allocated for snapshot *k* never reuse any
//! identity used by snapshots 1 to *k*. Labels that do not collide with the
//! immediately preceding snapshot pass through unchanged, so an unpaired
//! label may repeat a value last seen further back.

use tracing::info;

use crate::error::TrackingResult;
use crate::merge::{MergeReport, TrackingMerger};
use crate::pairing::Pairing;
use crate::store::SegmentationStore;

/// Snapshots processed so far, in temporal order.
///
/// # Example
///
/// ```
/// use mesh_tracking::{
///     LabelMap, Pairing, SegmentationStore, TrackingConfig, TrackingMerger, TrackingSequence,
/// };
///
/// let merger = TrackingMerger::new(&TrackingConfig::new().with_seed(3));
/// let first = SegmentationStore::from_labels(LabelMap::from_labels(vec![1, 2]));
/// let mut sequence = TrackingSequence::new(merger, first);
///
/// let second = SegmentationStore::from_labels(LabelMap::from_labels(vec![1, 2]));
/// let pairing: Pairing = [(0, 0), (1, 1)].into_iter().collect();
/// sequence.advance(second, &pairing).unwrap();
///
/// assert_eq!(sequence.len(), 2);
/// assert_eq!(sequence.latest().unique_labels(), vec![1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct TrackingSequence {
    merger: TrackingMerger,
    /// Every snapshot before `latest`, oldest first.
    history: Vec<SegmentationStore>,
    latest: SegmentationStore,
    min_index: u32,
}

impl TrackingSequence {
    /// Start a sequence from its first snapshot.
    ///
    /// The first snapshot keeps its labels; the high-water mark starts at
    /// its largest label.
    #[must_use]
    pub fn new(merger: TrackingMerger, first: SegmentationStore) -> Self {
        let min_index = first.unique_labels().last().copied().unwrap_or(0);
        Self {
            merger,
            history: Vec::new(),
            latest: first,
            min_index,
        }
    }

    /// Merge the next snapshot against the latest one and append it.
    ///
    /// # Errors
    ///
    /// Propagates any merge error; the sequence is unchanged on error.
    pub fn advance(
        &mut self,
        mut current: SegmentationStore,
        pairing: &Pairing,
    ) -> TrackingResult<MergeReport> {
        let report = self
            .merger
            .merge(&self.latest, &mut current, pairing, self.min_index)?;
        self.min_index = report.min_index;
        let previous = std::mem::replace(&mut self.latest, current);
        self.history.push(previous);
        info!(
            snapshot = self.len(),
            min_index = self.min_index,
            "Snapshot added to sequence"
        );
        Ok(report)
    }

    /// Current high-water mark.
    #[must_use]
    pub fn min_index(&self) -> u32 {
        self.min_index
    }

    /// The most recently added snapshot.
    #[must_use]
    pub fn latest(&self) -> &SegmentationStore {
        &self.latest
    }

    /// Mutable access to the latest snapshot, e.g. to commit a removal.
    ///
    /// Later merges pair against whatever this snapshot holds when
    /// [`advance`](Self::advance) is next called.
    pub fn latest_mut(&mut self) -> &mut SegmentationStore {
        &mut self.latest
    }

    /// All snapshots in temporal order.
    pub fn snapshots(&self) -> impl Iterator<Item = &SegmentationStore> {
        self.history.iter().chain(std::iter::once(&self.latest))
    }

    /// Get the number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len() + 1
    }

    /// Always `false`: a sequence holds at least its first snapshot.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Consume the sequence and return its snapshots, oldest first.
    #[must_use]
    pub fn into_snapshots(self) -> Vec<SegmentationStore> {
        let mut snapshots = self.history;
        snapshots.push(self.latest);
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use hashbrown::HashSet;

    use super::*;
    use crate::config::TrackingConfig;
    use crate::label_map::LabelMap;
    use crate::removal::{commit_selection, finalize_removal, RemovalSelection};

    fn store(labels: Vec<u32>) -> SegmentationStore {
        SegmentationStore::from_labels(LabelMap::from_labels(labels))
    }

    fn sequence(first: Vec<u32>) -> TrackingSequence {
        let config = TrackingConfig::new().with_max_index(u32::MAX).with_seed(5);
        let merger = TrackingMerger::new(&config);
        TrackingSequence::new(merger, store(first))
    }

    #[test]
    fn starts_at_largest_label() {
        let sequence = sequence(vec![0, 4, 9]);
        assert_eq!(sequence.min_index(), 9);
        assert_eq!(sequence.len(), 1);
        assert!(!sequence.is_empty());
    }

    #[test]
    fn identities_persist_across_snapshots() {
        let mut sequence = sequence(vec![1, 2, 0]);

        // Snapshot 2: label 2 is protrusion 1, label 1 is new.
        let pairing: Pairing = [(1, 0)].into_iter().collect();
        sequence.advance(store(vec![1, 2, 2]), &pairing).expect("advance");
        let second = sequence.latest().unique_labels();
        assert!(second.contains(&1));
        assert!(!second.contains(&2));
        let born = second.iter().copied().find(|&l| l != 1).expect("new identity");
        assert!(born > 2);

        // Snapshot 3: the newborn persists, protrusion 1 vanishes.
        let pairing: Pairing = [(0, 1)].into_iter().collect();
        sequence.advance(store(vec![1, 0, 0]), &pairing).expect("advance");
        assert_eq!(sequence.latest().unique_labels(), vec![born]);
        assert!(sequence.min_index() >= born);
    }

    #[test]
    fn fresh_identities_never_reuse_earlier_ones() {
        let mut sequence = sequence(vec![1, 2, 3]);
        let mut seen: HashSet<u32> = [1, 2, 3].into_iter().collect();
        for _ in 0..5 {
            let report = sequence
                .advance(store(vec![1, 2, 3]), &Pairing::new())
                .expect("advance");
            for &(_, fresh) in &report.renumbered {
                assert!(!seen.contains(&fresh), "identity {fresh} reused");
            }
            seen.extend(sequence.latest().unique_labels());
        }
    }

    #[test]
    fn labels_without_collision_pass_through() {
        let mut sequence = sequence(vec![1, 2]);
        sequence.advance(store(vec![1, 2]), &Pairing::new()).expect("advance");
        assert!(!sequence.latest().contains_label(1));

        // Snapshot 2 holds fresh identities only, so 1 and 2 are free again.
        let report = sequence
            .advance(store(vec![1, 2]), &Pairing::new())
            .expect("advance");
        assert!(report.renumbered.is_empty());
        assert_eq!(sequence.latest().unique_labels(), vec![1, 2]);
    }

    #[test]
    fn failed_advance_leaves_sequence_untouched() {
        let mut sequence = sequence(vec![1]);
        let pairing: Pairing = [(3, 0)].into_iter().collect();
        assert!(sequence.advance(store(vec![1]), &pairing).is_err());
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence.min_index(), 1);
        assert_eq!(sequence.latest().unique_labels(), vec![1]);
    }

    #[test]
    fn removal_on_latest_snapshot_feeds_next_merge() {
        let mut sequence = sequence(vec![1, 2, 0]);
        let pairing: Pairing = [(0, 0), (1, 1)].into_iter().collect();
        sequence.advance(store(vec![1, 2, 2]), &pairing).expect("advance");

        let mut selection = RemovalSelection::new();
        selection.mark(2);
        let report = commit_selection(sequence.latest_mut(), &mut selection);
        assert_eq!(report.faces_cleared, 2);
        assert_eq!(sequence.latest().unique_labels(), vec![1]);

        // The next merge sees only protrusion 1 in its predecessor.
        let pairing: Pairing = [(0, 0)].into_iter().collect();
        sequence.advance(store(vec![7, 0]), &pairing).expect("advance");
        assert_eq!(sequence.latest().unique_labels(), vec![1]);

        let removed: HashSet<u32> = [1].into_iter().collect();
        assert!(finalize_removal(sequence.latest_mut(), &removed).changed());
        assert_eq!(sequence.latest().label_count(), 0);
    }

    #[test]
    fn snapshots_stay_in_temporal_order() {
        let mut sequence = sequence(vec![1, 0]);
        let pairing: Pairing = [(0, 0)].into_iter().collect();
        sequence.advance(store(vec![0, 4]), &pairing).expect("advance");
        sequence.advance(store(vec![4, 4]), &pairing).expect("advance");

        let faces: Vec<Vec<u32>> = sequence
            .snapshots()
            .map(|s| s.labels().as_slice().to_vec())
            .collect();
        assert_eq!(faces, vec![vec![1, 0], vec![0, 1], vec![1, 1]]);

        let snapshots = sequence.into_snapshots();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].unique_labels(), vec![1]);
        assert_eq!(snapshots[2].labels().as_slice(), &[1, 1]);
    }
}
