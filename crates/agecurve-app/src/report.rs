// Batch report: runs the full per-position analysis and exports artifacts.
//
// For each position the raw age table is read from the source, normalized
// with that position's filters, reindexed by career year, summarized, and
// tested. Per-position artifacts go under a `{POS}/` prefix; the two
// positioned p-value tables go at the sink root.

use crate::config::Config;
use agecurve_core::career::to_career_year;
use agecurve_core::export::{raw_table_name, ArtifactKind};
use agecurve_core::significance::{
    adjacent_jump_tests, PositionedSignificanceTable, SignificanceSeries,
};
use agecurve_core::{
    normalize, Age, AgeTable, AnalysisError, ByPosition, CareerYear, FilterParams, Position,
    TableSink, TableSource, ToFrame,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::{info, warn};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read {name}: {source}")]
    Read { name: String, source: BoxError },

    #[error("failed to write {name}: {source}")]
    Write { name: String, source: BoxError },

    #[error("analysis failed for {scope}: {source}")]
    Analysis {
        scope: String,
        source: AnalysisError,
    },
}

impl ReportError {
    fn analysis(scope: impl Into<String>) -> impl FnOnce(AnalysisError) -> ReportError {
        let scope = scope.into();
        move |source| ReportError::Analysis { scope, source }
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// A jump whose p-value fell below the configured significance level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decline {
    pub jump: String,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    pub position: Position,
    pub min_years: usize,
    pub fp_cutoff: f64,
    pub players_raw: usize,
    pub players_retained: usize,
    pub ages: usize,
    pub career_years: usize,
    pub jumps_tested_by_age: usize,
    pub jumps_tested_by_career_year: usize,
    pub declines_by_age: Vec<Decline>,
    pub declines_by_career_year: Vec<Decline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub significance_level: f64,
    pub positions: Vec<PositionSummary>,
    /// Names of every artifact written, in write order.
    pub artifacts: Vec<String>,
}

/// Everything one position contributes to the run.
struct PositionRun {
    summary: PositionSummary,
    age_tests: SignificanceSeries<Age>,
    career_tests: SignificanceSeries<CareerYear>,
}

// ---------------------------------------------------------------------------
// Artifact writer
// ---------------------------------------------------------------------------

/// Wraps an optional sink; with no sink every write is a no-op.
struct Exporter<'a, K> {
    sink: Option<&'a mut K>,
    written: Vec<String>,
}

impl<K: TableSink> Exporter<'_, K> {
    fn put(&mut self, name: String, item: &impl ToFrame) -> Result<(), ReportError> {
        let Some(sink) = self.sink.as_deref_mut() else {
            return Ok(());
        };
        sink.put(&name, &item.to_frame())
            .map_err(|e| ReportError::Write {
                name: name.clone(),
                source: Box::new(e),
            })?;
        self.written.push(name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read and parse the raw `{POS}_age_fantasy_points.csv` table for every
/// position.
pub fn load_position_tables<S: TableSource>(source: &S) -> Result<ByPosition<AgeTable>, ReportError> {
    ByPosition::try_from_fn(|pos| {
        let name = raw_table_name(pos);
        let frame = source.get(&name).map_err(|e| ReportError::Read {
            name: name.clone(),
            source: Box::new(e),
        })?;
        let table = AgeTable::from_frame(&frame).map_err(ReportError::analysis(name))?;
        info!("Loaded {} {} players", table.len(), pos);
        Ok(table)
    })
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run every analysis for every position. Artifacts are written only when a
/// sink is given.
pub fn run<S: TableSource, K: TableSink>(
    source: &S,
    sink: Option<&mut K>,
    config: &Config,
) -> Result<RunSummary, ReportError> {
    let tables = load_position_tables(source)?;
    run_tables(&tables, sink, config)
}

/// Same as [`run`] for tables already in memory.
pub fn run_tables<K: TableSink>(
    tables: &ByPosition<AgeTable>,
    sink: Option<&mut K>,
    config: &Config,
) -> Result<RunSummary, ReportError> {
    let mut exporter = Exporter {
        sink,
        written: Vec::new(),
    };
    let alpha = config.significance_level;

    let runs = ByPosition::try_from_fn(|pos| {
        run_position(pos, tables.get(pos), config.filters.get(pos), alpha, &mut exporter)
    })?;

    let by_age = PositionedSignificanceTable::from_series(ByPosition::from_fn(|pos| {
        runs.get(pos).age_tests.clone()
    }));
    let by_career = PositionedSignificanceTable::from_series(ByPosition::from_fn(|pos| {
        runs.get(pos).career_tests.clone()
    }));
    let unused = FilterParams::default();
    exporter.put(ArtifactKind::PValuesByAge.file_name(&unused), &by_age)?;
    exporter.put(ArtifactKind::PValuesByCareerYear.file_name(&unused), &by_career)?;

    let positions: Vec<PositionSummary> = runs.iter().map(|(_, r)| r.summary.clone()).collect();

    info!(
        "Report complete: {} positions, {} artifacts written",
        positions.len(),
        exporter.written.len()
    );

    Ok(RunSummary {
        generated_at: Utc::now(),
        significance_level: alpha,
        positions,
        artifacts: exporter.written,
    })
}

fn run_position<K: TableSink>(
    pos: Position,
    table: &AgeTable,
    params: &FilterParams,
    alpha: f64,
    exporter: &mut Exporter<'_, K>,
) -> Result<PositionRun, ReportError> {
    let scope = pos.code();
    info!("Analyzing {} with {}", pos, params);

    let normalized = normalize(table, params);
    if normalized.is_empty() {
        warn!("{}: no players survive {}", pos, params);
    }
    let career = to_career_year(&normalized).map_err(ReportError::analysis(scope))?;
    let age_tests = adjacent_jump_tests(&normalized).map_err(ReportError::analysis(scope))?;
    let career_tests = adjacent_jump_tests(&career).map_err(ReportError::analysis(scope))?;

    let artifact = |kind: ArtifactKind| format!("{}/{}", scope, kind.file_name(params));
    exporter.put(artifact(ArtifactKind::NormalizedByAge), &normalized)?;
    exporter.put(artifact(ArtifactKind::NormalizedByCareerYear), &career)?;
    exporter.put(artifact(ArtifactKind::MedianByAge), &normalized.column_medians())?;
    exporter.put(artifact(ArtifactKind::MedianByCareerYear), &career.column_medians())?;
    exporter.put(artifact(ArtifactKind::UnstackedByAge), &normalized.to_long_form())?;
    exporter.put(artifact(ArtifactKind::UnstackedByCareerYear), &career.to_long_form())?;
    exporter.put(artifact(ArtifactKind::PValuesByAge), &age_tests)?;
    exporter.put(artifact(ArtifactKind::PValuesByCareerYear), &career_tests)?;

    let declines_by_age = declines(pos, "age", &age_tests, alpha);
    let declines_by_career_year = declines(pos, "career year", &career_tests, alpha);

    let summary = PositionSummary {
        position: pos,
        min_years: params.min_years(),
        fp_cutoff: params.fp_cutoff(),
        players_raw: table.len(),
        players_retained: normalized.len(),
        ages: normalized.columns().len(),
        career_years: career.columns().len(),
        jumps_tested_by_age: age_tests.len(),
        jumps_tested_by_career_year: career_tests.len(),
        declines_by_age,
        declines_by_career_year,
    };

    Ok(PositionRun {
        summary,
        age_tests,
        career_tests,
    })
}

fn declines<A>(
    pos: Position,
    axis: &str,
    series: &SignificanceSeries<A>,
    alpha: f64,
) -> Vec<Decline> {
    series
        .declines(alpha)
        .into_iter()
        .map(|(jump, p_value)| {
            info!("{} significant decline by {} at {} (p = {:.4})", pos, axis, jump, p_value);
            Decline {
                jump: jump.to_string(),
                p_value,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
