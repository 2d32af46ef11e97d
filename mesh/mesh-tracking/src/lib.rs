//! Protrusion identity tracking for segmented triangle meshes.
//!
//! Each snapshot of a time series is segmented on its own: every face
//! carries a protrusion label (0 = base cell), and a statistics table holds
//! one row per protrusion. Because snapshots are segmented independently,
//! equal labels in two snapshots mean nothing. This crate reconciles them.
//!
//! # Overview
//!
//! - [`LabelMap`] - per-face protrusion labels
//! - [`StatisticsTable`] - per-protrusion statistics, read from
//!   [`RawStatistics`] in one of the known [`StatisticsSchema`] layouts
//! - [`SegmentationStore`] - labels and statistics of one snapshot, kept in
//!   agreement
//! - [`IdentityAllocator`] - fresh identities outside a used set
//! - [`TrackingMerger`] - relabels a snapshot into its predecessor's
//!   identity space using a [`Pairing`]
//! - [`finalize_removal`] - commits a [`RemovalSelection`]
//! - [`TrackingSequence`] - folds merges over a whole series
//!
//! # Quick Start
//!
//! ```
//! use hashbrown::HashSet;
//! use mesh_tracking::{
//!     finalize_removal, LabelMap, Pairing, SegmentationStore, TrackingConfig, TrackingMerger,
//! };
//!
//! let previous = SegmentationStore::from_labels(LabelMap::from_labels(vec![0, 5, 5, 7]));
//! let mut current = SegmentationStore::from_labels(LabelMap::from_labels(vec![5, 5, 9, 0]));
//!
//! let mut merger = TrackingMerger::new(&TrackingConfig::new().with_seed(42));
//! let pairing: Pairing = [(0, 1)].into_iter().collect();
//! let report = merger.merge(&previous, &mut current, &pairing, 0).unwrap();
//! assert_eq!(current.unique_labels(), vec![7, 9]);
//!
//! let removed: HashSet<u32> = [9].into_iter().collect();
//! finalize_removal(&mut current, &removed);
//! assert_eq!(current.unique_labels(), vec![7]);
//! # let _ = report;
//! ```
//!
//! # Ordering
//!
//! Merges must run in temporal order, feeding each report's `min_index`
//! into the next call. [`TrackingSequence`] does this bookkeeping.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod allocator;
mod config;
mod error;
mod label_map;
mod merge;
mod pairing;
mod removal;
mod sequence;
mod statistics;
mod store;

pub use allocator::IdentityAllocator;
pub use config::{TrackingConfig, MAX_PROTRUSIONS_INDEX};
pub use error::{PairingSide, TrackingError, TrackingResult};
pub use label_map::{LabelMap, BACKGROUND};
pub use merge::{MergeReport, TrackingMerger};
pub use pairing::Pairing;
pub use removal::{commit_selection, finalize_removal, RemovalReport, RemovalSelection};
pub use sequence::TrackingSequence;
pub use statistics::{
    RawStatistics, RawVariable, StatisticsSchema, StatisticsTable, BLEB_STATS_VARIABLE,
    INDEX_COLUMN, SURFACE_AREA_COLUMN, VOLUME_COLUMN,
};
pub use store::SegmentationStore;
