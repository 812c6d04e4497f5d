// Two-dimensional labeled numeric table: rows are players, columns are ages or
// career years, cells are (nullable) fantasy points.
//
// Storage is sparse: each row keeps only its non-null cells, while the table
// keeps the global set of column keys so an empty column still exists (and
// still yields a NaN median).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;

use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Column axes
// ---------------------------------------------------------------------------

/// Marker for what a table's column keys mean.
pub trait Axis {
    /// Column label used in long-form and series dumps.
    const LABEL: &'static str;
}

/// Columns are player ages in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age;

impl Axis for Age {
    const LABEL: &'static str = "Age";
}

/// Columns are career years, 1 being the first observed season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareerYear;

impl Axis for CareerYear {
    const LABEL: &'static str = "Career Year";
}

pub type AgeTable = Table<Age>;
pub type CareerYearTable = Table<CareerYear>;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One player's non-null cells, keyed by column.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub player: String,
    values: BTreeMap<u32, f64>,
}

impl PlayerRow {
    pub(crate) fn new(player: String, values: BTreeMap<u32, f64>) -> Self {
        PlayerRow { player, values }
    }

    pub fn get(&self, key: u32) -> Option<f64> {
        self.values.get(&key).copied()
    }

    /// Non-null cells in ascending column order.
    pub fn values(&self) -> &BTreeMap<u32, f64> {
        &self.values
    }

    /// Number of non-null cells.
    pub fn observed(&self) -> usize {
        self.values.len()
    }

    /// Largest non-null cell, or `None` for an all-null row.
    pub fn max(&self) -> Option<f64> {
        self.values.values().copied().reduce(f64::max)
    }

    /// Smallest column key holding a value.
    pub fn first_key(&self) -> Option<u32> {
        self.values.keys().next().copied()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Table<A> {
    columns: BTreeSet<u32>,
    rows: Vec<PlayerRow>,
    index: HashMap<String, usize>,
    _axis: PhantomData<A>,
}

impl<A> Default for Table<A> {
    fn default() -> Self {
        Table {
            columns: BTreeSet::new(),
            rows: Vec::new(),
            index: HashMap::new(),
            _axis: PhantomData,
        }
    }
}

impl<A> Table<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table with a fixed set of column keys.
    pub fn with_columns(columns: impl IntoIterator<Item = u32>) -> Self {
        Table {
            columns: columns.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Append a player row. Column keys not yet known are added to the table.
    ///
    /// `None` and NaN cells are treated as missing. Infinite values, a repeated
    /// column key within the row, and a repeated player are rejected.
    pub fn push_row(
        &mut self,
        player: impl Into<String>,
        cells: impl IntoIterator<Item = (u32, Option<f64>)>,
    ) -> Result<(), AnalysisError> {
        let player = player.into();
        if self.index.contains_key(&player) {
            return Err(AnalysisError::DuplicatePlayer { player });
        }

        let mut seen = BTreeSet::new();
        let mut values = BTreeMap::new();
        for (key, cell) in cells {
            if !seen.insert(key) {
                return Err(AnalysisError::DuplicateObservation { player, key });
            }
            self.columns.insert(key);
            match cell {
                Some(v) if v.is_infinite() => {
                    return Err(AnalysisError::NonFiniteValue { player, key });
                }
                Some(v) if !v.is_nan() => {
                    values.insert(key, v);
                }
                _ => {}
            }
        }

        self.index.insert(player.clone(), self.rows.len());
        self.rows.push(PlayerRow::new(player, values));
        Ok(())
    }

    /// Build from already-validated rows (unique players, finite values).
    pub(crate) fn from_parts(columns: BTreeSet<u32>, rows: Vec<PlayerRow>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.player.clone(), i))
            .collect();
        Table {
            columns,
            rows,
            index,
            _axis: PhantomData,
        }
    }

    /// Pivot long-form observations into a wide table. Rows come out sorted by
    /// player, columns are the keys that appear.
    ///
    /// Two observations for the same (player, key) are an integrity error,
    /// never a silent overwrite.
    pub fn from_observations(
        observations: impl IntoIterator<Item = LongFormObservation>,
    ) -> Result<Self, AnalysisError> {
        let mut by_player: BTreeMap<String, BTreeMap<u32, f64>> = BTreeMap::new();
        let mut columns = BTreeSet::new();
        for obs in observations {
            if !obs.value.is_finite() {
                return Err(AnalysisError::NonFiniteValue {
                    player: obs.player,
                    key: obs.key,
                });
            }
            let cells = by_player.entry(obs.player.clone()).or_default();
            if cells.insert(obs.key, obs.value).is_some() {
                return Err(AnalysisError::DuplicateObservation {
                    player: obs.player,
                    key: obs.key,
                });
            }
            columns.insert(obs.key);
        }

        let rows = by_player
            .into_iter()
            .map(|(player, values)| PlayerRow::new(player, values))
            .collect();
        Ok(Self::from_parts(columns, rows))
    }

    /// Column keys in ascending order.
    pub fn columns(&self) -> &BTreeSet<u32> {
        &self.columns
    }

    pub fn rows(&self) -> &[PlayerRow] {
        &self.rows
    }

    pub fn row(&self, player: &str) -> Option<&PlayerRow> {
        self.index.get(player).map(|&i| &self.rows[i])
    }

    pub fn get(&self, player: &str, key: u32) -> Option<f64> {
        self.row(player).and_then(|r| r.get(key))
    }

    /// Number of player rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Non-null values of one column, in row order.
    pub fn column_values(&self, key: u32) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(key)).collect()
    }

    /// Values at `a` and `b` for the players that have both, in row order.
    pub fn paired_values(&self, a: u32, b: u32) -> (Vec<f64>, Vec<f64>) {
        self.rows
            .iter()
            .filter_map(|r| Some((r.get(a)?, r.get(b)?)))
            .unzip()
    }

    /// Per-column median over non-null cells. Columns with no values map to NaN.
    pub fn column_medians(&self) -> ColumnSeries<A> {
        let values = self
            .columns
            .iter()
            .map(|&key| (key, median(&mut self.column_values(key))))
            .collect();
        ColumnSeries::new(values)
    }

    /// Unstack into one observation per non-null cell, ordered by column and
    /// then by row.
    pub fn to_long_form(&self) -> LongForm<A> {
        let observations = self
            .columns
            .iter()
            .flat_map(|&key| {
                self.rows.iter().filter_map(move |r| {
                    r.get(key).map(|value| LongFormObservation {
                        player: r.player.clone(),
                        key,
                        value,
                    })
                })
            })
            .collect();
        LongForm::new(observations)
    }
}

// ---------------------------------------------------------------------------
// Long form
// ---------------------------------------------------------------------------

/// A single (player, column key, value) triple. The value is never null.
#[derive(Debug, Clone, PartialEq)]
pub struct LongFormObservation {
    pub player: String,
    pub key: u32,
    pub value: f64,
}

/// Row-per-observation projection of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct LongForm<A> {
    observations: Vec<LongFormObservation>,
    _axis: PhantomData<A>,
}

impl<A> LongForm<A> {
    pub(crate) fn new(observations: Vec<LongFormObservation>) -> Self {
        LongForm {
            observations,
            _axis: PhantomData,
        }
    }

    pub fn observations(&self) -> &[LongFormObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn into_inner(self) -> Vec<LongFormObservation> {
        self.observations
    }
}

// ---------------------------------------------------------------------------
// Column series
// ---------------------------------------------------------------------------

/// A value per column key, ascending by key.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSeries<A> {
    values: BTreeMap<u32, f64>,
    _axis: PhantomData<A>,
}

impl<A> ColumnSeries<A> {
    pub(crate) fn new(values: BTreeMap<u32, f64>) -> Self {
        ColumnSeries {
            values,
            _axis: PhantomData,
        }
    }

    pub fn get(&self, key: u32) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<A: Axis> fmt::Display for ColumnSeries<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{} {key}: {value:.3}", A::LABEL)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Median of a slice (reorders it). Returns NaN for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
