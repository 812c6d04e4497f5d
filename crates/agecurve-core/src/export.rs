// Storage port: rendered tabular dumps and the traits used to read and write
// them by name.
//
// The pipeline never touches the filesystem. Callers hand in a `TableSource`
// for raw input and, when they want artifacts persisted, a `TableSink`.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

use thiserror::Error;

use crate::error::AnalysisError;
use crate::normalize::FilterParams;
use crate::position::Position;
use crate::significance::{PositionedSignificanceTable, SignificanceSeries};
use crate::table::{Axis, ColumnSeries, LongForm, Table};

/// Header of the row-label column in wide and long dumps.
pub const PLAYER_COLUMN: &str = "Player Name";
/// Header of the value column in long and series dumps.
pub const VALUE_COLUMN: &str = "Fantasy Points";

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A rendered table: a header plus string cells. Null cells are empty
/// strings and floats use shortest round-trip formatting, so rendering the
/// same data twice yields identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(header: Vec<String>) -> Self {
        Frame {
            header,
            rows: Vec::new(),
        }
    }
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

/// Render a derived structure as a tabular dump.
pub trait ToFrame {
    fn to_frame(&self) -> Frame;
}

impl<A> ToFrame for Table<A> {
    fn to_frame(&self) -> Frame {
        let mut header = vec![PLAYER_COLUMN.to_string()];
        header.extend(self.columns().iter().map(|k| k.to_string()));
        let mut frame = Frame::new(header);
        for row in self.rows() {
            let mut cells = vec![row.player.clone()];
            cells.extend(self.columns().iter().map(|&k| format_cell(row.get(k))));
            frame.rows.push(cells);
        }
        frame
    }
}

impl<A: Axis> ToFrame for ColumnSeries<A> {
    fn to_frame(&self) -> Frame {
        let mut frame = Frame::new(vec![A::LABEL.to_string(), VALUE_COLUMN.to_string()]);
        frame.rows = self
            .iter()
            .map(|(k, v)| vec![k.to_string(), format_cell(Some(v))])
            .collect();
        frame
    }
}

impl<A: Axis> ToFrame for LongForm<A> {
    fn to_frame(&self) -> Frame {
        let mut frame = Frame::new(vec![
            PLAYER_COLUMN.to_string(),
            A::LABEL.to_string(),
            VALUE_COLUMN.to_string(),
        ]);
        frame.rows = self
            .observations()
            .iter()
            .map(|o| vec![o.player.clone(), o.key.to_string(), format_cell(Some(o.value))])
            .collect();
        frame
    }
}

impl<A> ToFrame for SignificanceSeries<A> {
    fn to_frame(&self) -> Frame {
        let mut frame = Frame::new(vec!["Jump".to_string(), "p-value".to_string()]);
        frame.rows = self
            .iter()
            .map(|(j, p)| vec![j.to_string(), format_cell(Some(p))])
            .collect();
        frame
    }
}

impl<A> ToFrame for PositionedSignificanceTable<A> {
    fn to_frame(&self) -> Frame {
        let mut header = vec!["Position".to_string()];
        header.extend(self.jumps().iter().map(|j| j.to_string()));
        let mut frame = Frame::new(header);
        for (position, series) in self.rows() {
            let mut cells = vec![position.code().to_string()];
            cells.extend(self.jumps().iter().map(|&j| format_cell(series.get(j))));
            frame.rows.push(cells);
        }
        frame
    }
}

// ---------------------------------------------------------------------------
// Parsing raw wide dumps
// ---------------------------------------------------------------------------

/// Parse a column key. Integral floats ("22.0") are accepted.
fn parse_key(raw: &str) -> Result<u32, AnalysisError> {
    let raw = raw.trim();
    if let Ok(k) = raw.parse::<u32>() {
        return Ok(k);
    }
    match raw.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(AnalysisError::MalformedFrame(format!(
            "column header '{raw}' is not a non-negative integer"
        ))),
    }
}

impl<A> Table<A> {
    /// Parse a wide dump: first column is the player identifier, remaining
    /// header cells are integer column keys, empty cells are missing.
    pub fn from_frame(frame: &Frame) -> Result<Self, AnalysisError> {
        let Some((_, key_cells)) = frame.header.split_first() else {
            return Err(AnalysisError::MalformedFrame("empty header".into()));
        };

        let mut keys = Vec::with_capacity(key_cells.len());
        let mut seen = BTreeSet::new();
        for cell in key_cells {
            let key = parse_key(cell)?;
            if !seen.insert(key) {
                return Err(AnalysisError::MalformedFrame(format!(
                    "duplicate column key {key}"
                )));
            }
            keys.push(key);
        }

        let mut table = Table::with_columns(keys.iter().copied());
        for (line, row) in frame.rows.iter().enumerate() {
            if row.len() != frame.header.len() {
                return Err(AnalysisError::MalformedFrame(format!(
                    "row {} has {} cells, header has {}",
                    line + 1,
                    row.len(),
                    frame.header.len()
                )));
            }
            let player = row[0].trim();
            let mut cells = Vec::with_capacity(keys.len());
            for (&key, raw) in keys.iter().zip(&row[1..]) {
                let raw = raw.trim();
                let value = if raw.is_empty() {
                    None
                } else {
                    Some(raw.parse::<f64>().map_err(|_| {
                        AnalysisError::MalformedFrame(format!(
                            "player '{player}' column {key}: '{raw}' is not a number"
                        ))
                    })?)
                };
                cells.push((key, value));
            }
            table.push_row(player, cells)?;
        }
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Read named tabular dumps.
pub trait TableSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, name: &str) -> Result<Frame, Self::Error>;
}

/// Write named tabular dumps. Writing an existing name overwrites it.
pub trait TableSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn put(&mut self, name: &str, frame: &Frame) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
#[error("no table named '{name}'")]
pub struct MissingTable {
    pub name: String,
}

/// In-memory store implementing both ports.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Frame>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, frame: Frame) {
        self.tables.insert(name.into(), frame);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableSource for MemoryStore {
    type Error = MissingTable;

    fn get(&self, name: &str) -> Result<Frame, MissingTable> {
        self.tables.get(name).cloned().ok_or_else(|| MissingTable {
            name: name.to_string(),
        })
    }
}

impl TableSink for MemoryStore {
    type Error = Infallible;

    fn put(&mut self, name: &str, frame: &Frame) -> Result<(), Infallible> {
        self.tables.insert(name.to_string(), frame.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

/// Name of the raw per-position cache, e.g. `QB_age_fantasy_points.csv`.
pub fn raw_table_name(position: Position) -> String {
    format!("{}_age_fantasy_points.csv", position.code())
}

/// Every artifact the pipeline can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    NormalizedByAge,
    NormalizedByCareerYear,
    MedianByAge,
    MedianByCareerYear,
    UnstackedByAge,
    UnstackedByCareerYear,
    PValuesByAge,
    PValuesByCareerYear,
}

impl ArtifactKind {
    fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::NormalizedByAge => "normalized_fp_by_age",
            ArtifactKind::NormalizedByCareerYear => "normalized_fp_by_career_season",
            ArtifactKind::MedianByAge => "median_fp_by_age",
            ArtifactKind::MedianByCareerYear => "median_fp_by_career_season",
            ArtifactKind::UnstackedByAge => "unstacked_fp_by_age",
            ArtifactKind::UnstackedByCareerYear => "unstacked_fp_by_career_season",
            ArtifactKind::PValuesByAge => "p_values_by_age",
            ArtifactKind::PValuesByCareerYear => "p_values_by_career_season",
        }
    }

    /// Whether the name encodes filter parameters. The per-position p-value
    /// tables mix several parameter sets and use a fixed name.
    pub fn is_parameterized(&self) -> bool {
        !matches!(self, ArtifactKind::PValuesByAge | ArtifactKind::PValuesByCareerYear)
    }

    /// File name for this artifact, e.g.
    /// `normalized_fp_by_age_min_szn_3_fp_cutoff_75.csv`.
    pub fn file_name(&self, params: &FilterParams) -> String {
        if self.is_parameterized() {
            format!(
                "{}_min_szn_{}_fp_cutoff_{}.csv",
                self.stem(),
                params.min_years(),
                params.fp_cutoff()
            )
        } else {
            format!("{}.csv", self.stem())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
