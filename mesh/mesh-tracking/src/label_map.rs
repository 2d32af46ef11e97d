//! Per-face protrusion labels.
//!
//! A label map assigns each face of a mesh to a protrusion identity.
//! Label 0 is the base cell.

use hashbrown::{HashMap, HashSet};

/// Label value for faces that belong to the base cell.
pub const BACKGROUND: u32 = 0;

/// A map from face indices to protrusion labels.
///
/// # Example
///
/// ```
/// use mesh_tracking::LabelMap;
///
/// let map = LabelMap::from_labels(vec![0, 3, 3, 1, 0]);
/// assert_eq!(map.face_count(), 5);
/// assert_eq!(map.unique_labels(), vec![1, 3]);
/// assert_eq!(map.faces_with(3), vec![1, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    /// Label for each face (0 = base cell).
    labels: Vec<u32>,
}

impl LabelMap {
    /// Create a label map with every face in the base cell.
    #[must_use]
    pub fn new(face_count: usize) -> Self {
        Self {
            labels: vec![BACKGROUND; face_count],
        }
    }

    /// Wrap an existing per-face label array.
    #[must_use]
    pub fn from_labels(labels: Vec<u32>) -> Self {
        Self { labels }
    }

    /// Get the label of a face.
    ///
    /// Returns `None` if the face index is out of bounds.
    #[must_use]
    pub fn get(&self, face_idx: usize) -> Option<u32> {
        self.labels.get(face_idx).copied()
    }

    /// Get the number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.labels.len()
    }

    /// Check whether a label occurs on any face.
    #[must_use]
    pub fn contains(&self, label: u32) -> bool {
        self.labels.contains(&label)
    }

    /// Sorted distinct protrusion labels, excluding the base cell.
    #[must_use]
    pub fn unique_labels(&self) -> Vec<u32> {
        let unique: HashSet<u32> = self
            .labels
            .iter()
            .filter(|&&l| l != BACKGROUND)
            .copied()
            .collect();
        let mut labels: Vec<u32> = unique.into_iter().collect();
        labels.sort_unstable();
        labels
    }

    /// Get all face indices carrying a label.
    #[must_use]
    pub fn faces_with(&self, label: u32) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, l)| *l == label)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Get the number of faces for each protrusion label.
    #[must_use]
    pub fn label_sizes(&self) -> HashMap<u32, usize> {
        let mut sizes = HashMap::new();
        for &label in &self.labels {
            if label != BACKGROUND {
                *sizes.entry(label).or_insert(0) += 1;
            }
        }
        sizes
    }

    /// Reassign every face labelled `from` to `to`.
    ///
    /// Returns the number of faces changed.
    pub(crate) fn replace(&mut self, from: u32, to: u32) -> usize {
        let mut changed = 0;
        for label in &mut self.labels {
            if *label == from {
                *label = to;
                changed += 1;
            }
        }
        changed
    }

    /// Apply a whole relabeling in one pass.
    ///
    /// Each face is looked up once against the original labels, so a value
    /// produced by one entry is never matched by another.
    pub(crate) fn remap(&mut self, mapping: &HashMap<u32, u32>) -> usize {
        let mut changed = 0;
        for label in &mut self.labels {
            if let Some(&to) = mapping.get(label) {
                *label = to;
                changed += 1;
            }
        }
        changed
    }

    /// Move every face carrying one of `labels` to the base cell.
    ///
    /// Returns the number of faces cleared.
    pub(crate) fn clear_labels(&mut self, labels: &HashSet<u32>) -> usize {
        let mut cleared = 0;
        for label in &mut self.labels {
            if *label != BACKGROUND && labels.contains(label) {
                *label = BACKGROUND;
                cleared += 1;
            }
        }
        cleared
    }

    /// Get labels as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }

    /// Consume the map and return the per-face labels.
    #[must_use]
    pub fn into_labels(self) -> Vec<u32> {
        self.labels
    }
}

impl From<Vec<u32>> for LabelMap {
    fn from(labels: Vec<u32>) -> Self {
        Self::from_labels(labels)
    }
}
