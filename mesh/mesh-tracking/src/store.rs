//! Segmentation store: one snapshot's labels and statistics.
//!
//! A [`SegmentationStore`] owns a [`LabelMap`] and the [`StatisticsTable`]
//! that describes its protrusions, and keeps the two in agreement: the
//! table has exactly one row per protrusion label present on the faces.
//! Every mutation goes through the store and touches both structures or
//! neither.

use hashbrown::{HashMap, HashSet};

use crate::error::{TrackingError, TrackingResult};
use crate::label_map::{LabelMap, BACKGROUND};
use crate::statistics::{RawStatistics, StatisticsTable};

/// Labels and statistics of one segmented snapshot.
///
/// # Example
///
/// ```
/// use mesh_tracking::{LabelMap, SegmentationStore, StatisticsTable};
///
/// let labels = LabelMap::from_labels(vec![0, 2, 2, 5]);
/// let stats = StatisticsTable::new(vec![2, 5], [("volume".to_string(), vec![1.0, 4.0])]).unwrap();
/// let mut store = SegmentationStore::new(labels, stats).unwrap();
///
/// store.relabel(2, 7).unwrap();
/// assert_eq!(store.unique_labels(), vec![5, 7]);
/// assert_eq!(store.statistic(7, "volume"), Some(1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationStore {
    labels: LabelMap,
    statistics: StatisticsTable,
}

impl SegmentationStore {
    /// Pair a label map with its statistics.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InconsistentStatistics`] if the table rows do
    /// not match the map's protrusion labels one-to-one.
    pub fn new(labels: LabelMap, statistics: StatisticsTable) -> TrackingResult<Self> {
        statistics.check_labels(&labels.unique_labels())?;
        Ok(Self { labels, statistics })
    }

    /// Build a store from a per-face label array and raw statistics.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::UnknownSchema`] if the statistics layout is
    /// not recognized, or [`TrackingError::InconsistentStatistics`] if it
    /// does not match the labels.
    pub fn from_raw(labels: Vec<u32>, statistics: &RawStatistics) -> TrackingResult<Self> {
        Self::new(
            LabelMap::from_labels(labels),
            StatisticsTable::from_raw(statistics)?,
        )
    }

    /// Build a store with an index-only statistics table derived from the labels.
    #[must_use]
    pub fn from_labels(labels: LabelMap) -> Self {
        let statistics = StatisticsTable::index_only(labels.unique_labels());
        Self { labels, statistics }
    }

    /// Get the per-face labels.
    #[must_use]
    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Get the statistics table.
    #[must_use]
    pub fn statistics(&self) -> &StatisticsTable {
        &self.statistics
    }

    /// Get the number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.labels.face_count()
    }

    /// Get the number of protrusions.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.statistics.row_count()
    }

    /// Sorted protrusion labels, recomputed from the faces.
    #[must_use]
    pub fn unique_labels(&self) -> Vec<u32> {
        self.labels.unique_labels()
    }

    /// Check whether a protrusion label is present.
    #[must_use]
    pub fn contains_label(&self, label: u32) -> bool {
        self.statistics.contains_label(label)
    }

    /// All faces carrying a label.
    #[must_use]
    pub fn labels_with(&self, value: u32) -> Vec<usize> {
        self.labels.faces_with(value)
    }

    /// All faces in the base cell.
    #[must_use]
    pub fn background_faces(&self) -> Vec<usize> {
        self.labels.faces_with(BACKGROUND)
    }

    /// Face count of each protrusion.
    #[must_use]
    pub fn label_sizes(&self) -> HashMap<u32, usize> {
        self.labels.label_sizes()
    }

    /// One statistic of one protrusion.
    #[must_use]
    pub fn statistic(&self, label: u32, column: &str) -> Option<f64> {
        self.statistics.value(label, column)
    }

    /// Rename a protrusion on every face and in the statistics.
    ///
    /// Relabeling a label that is not present is a no-op. Returns the number
    /// of faces changed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::BackgroundLabel`] if `new_value` is 0 and
    /// [`TrackingError::LabelInUse`] if `new_value` is already a protrusion
    /// of this store.
    pub fn relabel(&mut self, old_value: u32, new_value: u32) -> TrackingResult<usize> {
        if old_value == new_value || !self.contains_label(old_value) {
            return Ok(0);
        }
        if new_value == BACKGROUND {
            return Err(TrackingError::BackgroundLabel);
        }
        if self.contains_label(new_value) {
            return Err(TrackingError::LabelInUse { label: new_value });
        }
        self.statistics.rename(old_value, new_value);
        Ok(self.labels.replace(old_value, new_value))
    }

    /// Apply a set of renames simultaneously.
    ///
    /// Every face and row is matched against the labels as they were before
    /// the call, so swaps and chains (`a → b`, `b → c`) never cascade.
    /// Returns the number of faces changed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::BackgroundLabel`] if any target is 0 and
    /// [`TrackingError::LabelInUse`] if two labels would end up sharing one
    /// value. Nothing is changed on error.
    pub fn relabel_many(&mut self, mapping: &HashMap<u32, u32>) -> TrackingResult<usize> {
        let mapping: HashMap<u32, u32> = mapping
            .iter()
            .filter(|&(from, to)| from != to && self.contains_label(*from))
            .map(|(&from, &to)| (from, to))
            .collect();
        if mapping.is_empty() {
            return Ok(0);
        }
        if mapping.values().any(|&to| to == BACKGROUND) {
            return Err(TrackingError::BackgroundLabel);
        }

        let mut result: HashSet<u32> = HashSet::with_capacity(self.label_count());
        for &label in self.statistics.index() {
            let to = mapping.get(&label).copied().unwrap_or(label);
            if !result.insert(to) {
                return Err(TrackingError::LabelInUse { label: to });
            }
        }

        self.statistics.remap(&mapping);
        Ok(self.labels.remap(&mapping))
    }

    /// Move the given protrusions to the base cell and drop their rows.
    ///
    /// Returns `(faces_cleared, rows_removed)`.
    pub(crate) fn clear_labels(&mut self, labels: &HashSet<u32>) -> (usize, usize) {
        let faces = self.labels.clear_labels(labels);
        let rows = self.statistics.remove_labels(labels);
        (faces, rows)
    }

    /// Split the store into its label map and statistics.
    #[must_use]
    pub fn into_parts(self) -> (LabelMap, StatisticsTable) {
        (self.labels, self.statistics)
    }
}
