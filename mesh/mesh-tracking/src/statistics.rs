//! Per-protrusion statistics tables.
//!
//! A [`StatisticsTable`] holds one row per protrusion: an `index` column of
//! labels plus any number of named numeric columns of equal length. Rows
//! are addressed through an explicit label → row map so that relabeling
//! never depends on row order.
//!
//! Raw statistics are accepted in one of two known layouts, picked by
//! [`StatisticsSchema::detect`]:
//!
//! - [`StatisticsSchema::BlebStats`]: a `blebStats` variable with positional
//!   fields, as exported by the segmentation pipeline.
//! - [`StatisticsSchema::Tracked`]: plain named columns, as written back by
//!   [`StatisticsTable::to_raw`] after a tracking pass.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};

use crate::error::{TrackingError, TrackingResult};
use crate::label_map::BACKGROUND;

/// Name of the label column.
pub const INDEX_COLUMN: &str = "index";

/// Name of the volume column.
pub const VOLUME_COLUMN: &str = "volume";

/// Name of the surface area column.
pub const SURFACE_AREA_COLUMN: &str = "surface_area";

/// Variable holding positional protrusion statistics.
pub const BLEB_STATS_VARIABLE: &str = "blebStats";

const BLEB_INDEX_FIELD: usize = 0;
const BLEB_SURFACE_AREA_FIELD: usize = 3;
const BLEB_VOLUME_FIELD: usize = 11;

/// A single variable of raw statistics input.
#[derive(Debug, Clone, PartialEq)]
pub enum RawVariable {
    /// A struct of positional fields, each one value per protrusion.
    Fields(Vec<Vec<f64>>),
    /// A plain column, one value per protrusion.
    Column(Vec<f64>),
}

/// Raw statistics as named variables, before schema detection.
///
/// # Example
///
/// ```
/// use mesh_tracking::{RawStatistics, RawVariable, StatisticsSchema};
///
/// let mut raw = RawStatistics::new();
/// raw.insert("index", RawVariable::Column(vec![1.0, 2.0]));
/// raw.insert("volume", RawVariable::Column(vec![0.5, 0.7]));
///
/// assert_eq!(StatisticsSchema::detect(&raw).unwrap(), StatisticsSchema::Tracked);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatistics {
    variables: BTreeMap<String, RawVariable>,
}

impl RawStatistics {
    /// Create empty raw statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    pub fn insert(&mut self, name: impl Into<String>, variable: RawVariable) {
        self.variables.insert(name.into(), variable);
    }

    /// Get a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawVariable> {
        self.variables.get(name)
    }

    /// Get an iterator over variable names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Get an iterator over variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawVariable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn unknown(&self) -> TrackingError {
        TrackingError::UnknownSchema {
            variables: self.names().map(str::to_string).collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, RawVariable)> for RawStatistics {
    fn from_iter<I: IntoIterator<Item = (S, RawVariable)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The known raw statistics layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsSchema {
    /// Positional `blebStats` fields: index at 0, surface area at 3, volume at 11.
    BlebStats,
    /// Named columns including `index`.
    Tracked,
}

impl StatisticsSchema {
    /// Identify the layout of raw statistics.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::UnknownSchema`] if the input matches neither
    /// layout: no `blebStats` struct with enough fields and no plain
    /// `index` column, or a mix of structs and columns.
    pub fn detect(raw: &RawStatistics) -> TrackingResult<Self> {
        match raw.get(BLEB_STATS_VARIABLE) {
            Some(RawVariable::Fields(fields)) if fields.len() > BLEB_VOLUME_FIELD => {
                return Ok(Self::BlebStats);
            }
            Some(_) => return Err(raw.unknown()),
            None => {}
        }

        let all_columns = raw
            .iter()
            .all(|(_, v)| matches!(v, RawVariable::Column(_)));
        if all_columns && raw.get(INDEX_COLUMN).is_some() {
            Ok(Self::Tracked)
        } else {
            Err(raw.unknown())
        }
    }
}

/// Statistics for every protrusion of one snapshot.
///
/// # Example
///
/// ```
/// use mesh_tracking::StatisticsTable;
///
/// let table = StatisticsTable::new(
///     vec![4, 9],
///     [("volume".to_string(), vec![1.5, 2.5])],
/// ).unwrap();
///
/// assert_eq!(table.row_count(), 2);
/// assert_eq!(table.value(9, "volume"), Some(2.5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsTable {
    /// Protrusion label of each row.
    index: Vec<u32>,
    /// Named value columns, each aligned with `index`.
    columns: BTreeMap<String, Vec<f64>>,
    /// Row position of each label.
    rows: HashMap<u32, usize>,
}

impl StatisticsTable {
    /// Build a table from an index column and named value columns.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InconsistentStatistics`] if a column length
    /// differs from the index length, an index value is 0 or repeated, or a
    /// value column is named `index` or given twice.
    pub fn new<I>(index: Vec<u32>, columns: I) -> TrackingResult<Self>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut named = BTreeMap::new();
        for (name, values) in columns {
            if name == INDEX_COLUMN {
                return Err(TrackingError::inconsistent(
                    "value column may not be named 'index'",
                ));
            }
            if values.len() != index.len() {
                return Err(TrackingError::inconsistent(format!(
                    "column '{name}' has {} rows, index has {}",
                    values.len(),
                    index.len()
                )));
            }
            if named.insert(name.clone(), values).is_some() {
                return Err(TrackingError::inconsistent(format!(
                    "column '{name}' given twice"
                )));
            }
        }

        let mut rows = HashMap::with_capacity(index.len());
        for (row, &label) in index.iter().enumerate() {
            if label == BACKGROUND {
                return Err(TrackingError::inconsistent(format!(
                    "row {row} carries the base cell label"
                )));
            }
            if rows.insert(label, row).is_some() {
                return Err(TrackingError::inconsistent(format!(
                    "label {label} appears in more than one row"
                )));
            }
        }

        Ok(Self {
            index,
            columns: named,
            rows,
        })
    }

    /// Create a table with no rows and no value columns.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: BTreeMap::new(),
            rows: HashMap::new(),
        }
    }

    /// Build a table with an index column and no value columns.
    ///
    /// `index` must hold distinct non-zero labels, as
    /// [`LabelMap::unique_labels`](crate::LabelMap::unique_labels) returns.
    pub(crate) fn index_only(index: Vec<u32>) -> Self {
        debug_assert!(!index.contains(&BACKGROUND));
        let mut table = Self {
            index,
            columns: BTreeMap::new(),
            rows: HashMap::new(),
        };
        table.rebuild_rows();
        table
    }

    /// Build a table from raw statistics of any known layout.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::UnknownSchema`] for unrecognized input and
    /// [`TrackingError::InconsistentStatistics`] if the recognized input is
    /// malformed (non-integer labels, ragged columns).
    pub fn from_raw(raw: &RawStatistics) -> TrackingResult<Self> {
        match StatisticsSchema::detect(raw)? {
            StatisticsSchema::BlebStats => {
                let Some(RawVariable::Fields(fields)) = raw.get(BLEB_STATS_VARIABLE) else {
                    return Err(raw.unknown());
                };
                let index = labels_from_values(&fields[BLEB_INDEX_FIELD])?;
                Self::new(
                    index,
                    [
                        (
                            SURFACE_AREA_COLUMN.to_string(),
                            fields[BLEB_SURFACE_AREA_FIELD].clone(),
                        ),
                        (VOLUME_COLUMN.to_string(), fields[BLEB_VOLUME_FIELD].clone()),
                    ],
                )
            }
            StatisticsSchema::Tracked => {
                let mut index = Vec::new();
                let mut columns = Vec::new();
                for (name, variable) in raw.iter() {
                    let RawVariable::Column(values) = variable else {
                        return Err(raw.unknown());
                    };
                    if name == INDEX_COLUMN {
                        index = labels_from_values(values)?;
                    } else {
                        columns.push((name.to_string(), values.clone()));
                    }
                }
                Self::new(index, columns)
            }
        }
    }

    /// Convert back to raw statistics in the [`StatisticsSchema::Tracked`] layout.
    #[must_use]
    pub fn to_raw(&self) -> RawStatistics {
        let mut raw = RawStatistics::new();
        raw.insert(
            INDEX_COLUMN,
            RawVariable::Column(self.index.iter().map(|&l| f64::from(l)).collect()),
        );
        for (name, values) in &self.columns {
            raw.insert(name.clone(), RawVariable::Column(values.clone()));
        }
        raw
    }

    /// Get the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    /// Check if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get the label of every row, in row order.
    #[must_use]
    pub fn index(&self) -> &[u32] {
        &self.index
    }

    /// Get a value column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Get an iterator over value column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Get the row holding a label.
    #[must_use]
    pub fn row_of(&self, label: u32) -> Option<usize> {
        self.rows.get(&label).copied()
    }

    /// Check if a label has a row.
    #[must_use]
    pub fn contains_label(&self, label: u32) -> bool {
        self.rows.contains_key(&label)
    }

    /// Get one statistic of one protrusion.
    #[must_use]
    pub fn value(&self, label: u32, column: &str) -> Option<f64> {
        let row = self.row_of(label)?;
        self.columns.get(column)?.get(row).copied()
    }

    /// Check that the rows cover exactly the given labels.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InconsistentStatistics`] if the row count
    /// differs from the label count or a label has no row.
    pub fn check_labels(&self, labels: &[u32]) -> TrackingResult<()> {
        if labels.len() != self.index.len() {
            return Err(TrackingError::inconsistent(format!(
                "{} protrusion labels but {} statistics rows",
                labels.len(),
                self.index.len()
            )));
        }
        if let Some(missing) = labels.iter().find(|l| !self.rows.contains_key(*l)) {
            return Err(TrackingError::inconsistent(format!(
                "label {missing} has no statistics row"
            )));
        }
        Ok(())
    }

    /// Rename the row of `from` to `to`. Caller guarantees `to` is unused.
    pub(crate) fn rename(&mut self, from: u32, to: u32) {
        if let Some(row) = self.rows.remove(&from) {
            self.index[row] = to;
            self.rows.insert(to, row);
        }
    }

    /// Rename rows simultaneously. Caller guarantees the result is unique.
    pub(crate) fn remap(&mut self, mapping: &HashMap<u32, u32>) {
        for label in &mut self.index {
            if let Some(&to) = mapping.get(label) {
                *label = to;
            }
        }
        self.rebuild_rows();
    }

    /// Delete the rows of the given labels from every column.
    ///
    /// Returns the number of rows deleted.
    pub(crate) fn remove_labels(&mut self, labels: &HashSet<u32>) -> usize {
        let keep: Vec<bool> = self.index.iter().map(|l| !labels.contains(l)).collect();
        let removed = keep.iter().filter(|&&k| !k).count();
        if removed == 0 {
            return 0;
        }

        retain_rows(&mut self.index, &keep);
        for values in self.columns.values_mut() {
            retain_rows(values, &keep);
        }
        self.rebuild_rows();
        removed
    }

    fn rebuild_rows(&mut self) {
        self.rows = self
            .index
            .iter()
            .enumerate()
            .map(|(row, &label)| (label, row))
            .collect();
    }
}

impl Default for StatisticsTable {
    fn default() -> Self {
        Self::empty()
    }
}

fn retain_rows<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(true));
}

// Labels are stored as floats in exported statistics
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn labels_from_values(values: &[f64]) -> TrackingResult<Vec<u32>> {
    values
        .iter()
        .map(|&v| {
            if v.is_finite() && v.fract() == 0.0 && v >= 1.0 && v <= f64::from(u32::MAX) {
                Ok(v as u32)
            } else {
                Err(TrackingError::inconsistent(format!(
                    "index value {v} is not a positive integer label"
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bleb_fields(index: &[f64]) -> Vec<Vec<f64>> {
        let n = index.len();
        let mut fields: Vec<Vec<f64>> = (0..12)
            .map(|f| (0..n).map(|r| (f * 100 + r) as f64).collect())
            .collect();
        fields[0] = index.to_vec();
        fields
    }

    fn table() -> StatisticsTable {
        StatisticsTable::new(
            vec![3, 8, 5],
            [
                ("volume".to_string(), vec![1.0, 2.0, 3.0]),
                ("surface_area".to_string(), vec![10.0, 20.0, 30.0]),
            ],
        )
        .expect("valid table")
    }

    #[test]
    fn detect_bleb_stats() {
        let raw: RawStatistics = [(BLEB_STATS_VARIABLE, RawVariable::Fields(bleb_fields(&[1.0])))]
            .into_iter()
            .collect();
        assert_eq!(
            StatisticsSchema::detect(&raw).expect("known"),
            StatisticsSchema::BlebStats
        );
    }

    #[test]
    fn detect_short_bleb_stats_is_unknown() {
        let raw: RawStatistics = [(BLEB_STATS_VARIABLE, RawVariable::Fields(vec![vec![1.0]; 4]))]
            .into_iter()
            .collect();
        assert!(matches!(
            StatisticsSchema::detect(&raw),
            Err(TrackingError::UnknownSchema { .. })
        ));
    }

    #[test]
    fn detect_columns_without_index_is_unknown() {
        let raw: RawStatistics = [("volume", RawVariable::Column(vec![1.0]))]
            .into_iter()
            .collect();
        let err = StatisticsSchema::detect(&raw).unwrap_err();
        match err {
            TrackingError::UnknownSchema { variables } => assert_eq!(variables, vec!["volume"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn detect_mixed_layout_is_unknown() {
        let raw: RawStatistics = [
            ("index", RawVariable::Column(vec![1.0])),
            ("extra", RawVariable::Fields(vec![vec![1.0]])),
        ]
        .into_iter()
        .collect();
        assert!(StatisticsSchema::detect(&raw).is_err());
    }

    #[test]
    fn from_bleb_stats_picks_fields() {
        let raw: RawStatistics = [(
            BLEB_STATS_VARIABLE,
            RawVariable::Fields(bleb_fields(&[4.0, 2.0])),
        )]
        .into_iter()
        .collect();
        let table = StatisticsTable::from_raw(&raw).expect("valid");
        assert_eq!(table.index(), &[4, 2]);
        assert_relative_eq!(table.value(4, SURFACE_AREA_COLUMN).expect("row"), 300.0);
        assert_relative_eq!(table.value(2, VOLUME_COLUMN).expect("row"), 1101.0);
        assert_eq!(table.column_names().count(), 2);
    }

    #[test]
    fn tracked_round_trip() {
        let original = table();
        let restored = StatisticsTable::from_raw(&original.to_raw()).expect("valid");
        assert_eq!(restored, original);
    }

    #[test]
    fn non_integer_index_is_inconsistent() {
        let raw: RawStatistics = [("index", RawVariable::Column(vec![1.5]))]
            .into_iter()
            .collect();
        assert!(matches!(
            StatisticsTable::from_raw(&raw),
            Err(TrackingError::InconsistentStatistics { .. })
        ));
    }

    #[test]
    fn ragged_columns_are_inconsistent() {
        let result = StatisticsTable::new(vec![1, 2], [("volume".to_string(), vec![1.0])]);
        assert!(matches!(
            result,
            Err(TrackingError::InconsistentStatistics { .. })
        ));
    }

    #[test]
    fn duplicate_and_background_labels_are_inconsistent() {
        assert!(StatisticsTable::new(vec![1, 1], Vec::new()).is_err());
        assert!(StatisticsTable::new(vec![0], Vec::new()).is_err());
    }

    #[test]
    fn index_only_table_finds_rows() {
        let table = StatisticsTable::index_only(vec![2, 9, 4]);
        assert_eq!(table.row_of(4), Some(2));
        assert_eq!(table.column_names().count(), 0);
        assert_eq!(table, StatisticsTable::new(vec![2, 9, 4], Vec::new()).expect("valid"));
    }

    #[test]
    fn check_labels() {
        let table = table();
        assert!(table.check_labels(&[3, 5, 8]).is_ok());
        assert!(table.check_labels(&[3, 5]).is_err());
        assert!(table.check_labels(&[3, 5, 9]).is_err());
    }

    #[test]
    fn rename_keeps_row() {
        let mut table = table();
        table.rename(8, 80);
        assert_eq!(table.index(), &[3, 80, 5]);
        assert_eq!(table.row_of(80), Some(1));
        assert!(!table.contains_label(8));
        assert_relative_eq!(table.value(80, "volume").expect("row"), 2.0);
    }

    #[test]
    fn remap_is_simultaneous() {
        let mut table = table();
        let mapping: HashMap<u32, u32> = [(3, 8), (8, 3)].into_iter().collect();
        table.remap(&mapping);
        assert_eq!(table.index(), &[8, 3, 5]);
        assert_relative_eq!(table.value(3, "volume").expect("row"), 2.0);
    }

    #[test]
    fn remove_labels_keeps_columns_aligned() {
        let mut table = table();
        let removed: HashSet<u32> = [8, 42].into_iter().collect();
        assert_eq!(table.remove_labels(&removed), 1);
        assert_eq!(table.index(), &[3, 5]);
        assert_eq!(table.column("volume"), Some(&[1.0, 3.0][..]));
        assert_eq!(table.column("surface_area"), Some(&[10.0, 30.0][..]));
        assert_eq!(table.row_of(5), Some(1));
    }
}
