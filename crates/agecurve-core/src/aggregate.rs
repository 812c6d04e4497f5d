// Cross-player summaries: per-column medians and long-form projections.
//
// Every entry point takes the raw age table plus filter parameters and runs
// normalization (and career-year reindexing where relevant) itself.

use crate::career::normalized_by_career_year;
use crate::error::AnalysisError;
use crate::normalize::{normalize, FilterParams};
use crate::table::{Age, AgeTable, CareerYear, ColumnSeries, LongForm};

/// Median normalized fantasy points per age, ascending by age.
///
/// Missing cells are ignored; an age nobody in the filtered population
/// reached yields NaN.
pub fn median_by_age(table: &AgeTable, params: &FilterParams) -> ColumnSeries<Age> {
    normalize(table, params).column_medians()
}

/// Median normalized fantasy points per career year, ascending.
pub fn median_by_career_year(
    table: &AgeTable,
    params: &FilterParams,
) -> Result<ColumnSeries<CareerYear>, AnalysisError> {
    Ok(normalized_by_career_year(table, params)?.column_medians())
}

/// One row per (player, age, normalized points); nulls dropped.
pub fn unstack_by_age(table: &AgeTable, params: &FilterParams) -> LongForm<Age> {
    normalize(table, params).to_long_form()
}

/// One row per (player, career year, normalized points); nulls dropped.
pub fn unstack_by_career_year(
    table: &AgeTable,
    params: &FilterParams,
) -> Result<LongForm<CareerYear>, AnalysisError> {
    Ok(normalized_by_career_year(table, params)?.to_long_form())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
