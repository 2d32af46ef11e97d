//! Committing protrusion removals.
//!
//! Removal is collected in a [`RemovalSelection`] while the user decides,
//! then committed once with [`finalize_removal`]. Committing is the only
//! irreversible step in a store's lifecycle: removed faces join the base
//! cell and their statistics rows are dropped.

use std::fmt;

use hashbrown::HashSet;
use tracing::{debug, info};

use crate::label_map::BACKGROUND;
use crate::store::SegmentationStore;

/// Labels marked for removal but not yet committed.
///
/// # Example
///
/// ```
/// use mesh_tracking::RemovalSelection;
///
/// let mut selection = RemovalSelection::new();
/// selection.toggle(4);
/// selection.toggle(6);
/// selection.toggle(4);
///
/// assert!(selection.contains(6));
/// assert!(!selection.contains(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSelection {
    labels: HashSet<u32>,
}

impl RemovalSelection {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a label. Returns `true` if it was not already marked.
    pub fn mark(&mut self, label: u32) -> bool {
        self.labels.insert(label)
    }

    /// Unmark a label. Returns `true` if it was marked.
    pub fn unmark(&mut self, label: u32) -> bool {
        self.labels.remove(&label)
    }

    /// Flip a label's mark. Returns `true` if it is now marked.
    pub fn toggle(&mut self, label: u32) -> bool {
        if self.labels.remove(&label) {
            false
        } else {
            self.labels.insert(label)
        }
    }

    /// Check if a label is marked.
    #[must_use]
    pub fn contains(&self, label: u32) -> bool {
        self.labels.contains(&label)
    }

    /// Get the number of marked labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Unmark everything.
    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// Get the marked labels.
    #[must_use]
    pub fn labels(&self) -> &HashSet<u32> {
        &self.labels
    }
}

impl FromIterator<u32> for RemovalSelection {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a committed removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalReport {
    /// Faces moved to the base cell.
    pub faces_cleared: usize,
    /// Statistics rows deleted.
    pub rows_removed: usize,
}

impl RemovalReport {
    /// Check if anything was removed.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.faces_cleared > 0 || self.rows_removed > 0
    }
}

impl fmt::Display for RemovalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Removal: {} faces cleared, {} statistics rows removed",
            self.faces_cleared, self.rows_removed
        )
    }
}

/// Remove protrusions from a store.
///
/// Every face labelled with a value in `removed` joins the base cell, and
/// the matching statistics rows are deleted from every column. Labels that
/// are not present, and label 0, are ignored, so committing the same set
/// twice changes nothing the second time.
///
/// # Example
///
/// ```
/// use hashbrown::HashSet;
/// use mesh_tracking::{finalize_removal, LabelMap, SegmentationStore};
///
/// let mut store = SegmentationStore::from_labels(LabelMap::from_labels(vec![1, 2, 2, 0]));
/// let removed: HashSet<u32> = [2].into_iter().collect();
///
/// let report = finalize_removal(&mut store, &removed);
/// assert_eq!(report.faces_cleared, 2);
/// assert_eq!(store.unique_labels(), vec![1]);
/// ```
pub fn finalize_removal(store: &mut SegmentationStore, removed: &HashSet<u32>) -> RemovalReport {
    let present: HashSet<u32> = removed
        .iter()
        .copied()
        .filter(|&label| label != BACKGROUND && store.contains_label(label))
        .collect();
    if present.is_empty() {
        debug!(requested = removed.len(), "Nothing to remove");
        return RemovalReport {
            faces_cleared: 0,
            rows_removed: 0,
        };
    }

    let (faces_cleared, rows_removed) = store.clear_labels(&present);
    info!(
        protrusions = present.len(),
        faces = faces_cleared,
        rows = rows_removed,
        "Finalized protrusion removal"
    );
    RemovalReport {
        faces_cleared,
        rows_removed,
    }
}

/// Commit a selection, leaving it empty.
pub fn commit_selection(
    store: &mut SegmentationStore,
    selection: &mut RemovalSelection,
) -> RemovalReport {
    let report = finalize_removal(store, selection.labels());
    selection.clear();
    report
}
