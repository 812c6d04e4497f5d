// Age -> career-year reindexing.
//
// Career year 1 is the first age at which a player has a value in the
// *normalized* table, so filtering happens before the remap.

use std::collections::HashMap;

use crate::error::AnalysisError;
use crate::normalize::{normalize, FilterParams};
use crate::table::{AgeTable, CareerYearTable, LongFormObservation, Table};

/// Reindex a (normalized) age table by career year.
///
/// For each player, `career_year = age - min_age + 1`, with `min_age` taken
/// over that player's own non-null cells. The result is pivoted back to wide
/// form with rows sorted by player. A duplicate (player, career year) pair is
/// reported as an error.
pub fn to_career_year(table: &AgeTable) -> Result<CareerYearTable, AnalysisError> {
    let long = table.to_long_form().into_inner();

    let mut first_age: HashMap<&str, u32> = HashMap::new();
    for obs in &long {
        first_age
            .entry(obs.player.as_str())
            .and_modify(|a| *a = (*a).min(obs.key))
            .or_insert(obs.key);
    }

    let reindexed: Vec<LongFormObservation> = long
        .iter()
        .map(|obs| LongFormObservation {
            player: obs.player.clone(),
            key: obs.key - first_age[obs.player.as_str()] + 1,
            value: obs.value,
        })
        .collect();

    Table::from_observations(reindexed)
}

/// Normalize then reindex by career year.
pub fn normalized_by_career_year(
    table: &AgeTable,
    params: &FilterParams,
) -> Result<CareerYearTable, AnalysisError> {
    to_career_year(&normalize(table, params))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
