// Row filtering and rescaling of raw per-season fantasy-point totals.
//
// Each retained player's seasons are divided by that player's best season, so
// values read as "fraction of peak".

use std::fmt;

use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::table::{AgeTable, PlayerRow, Table};

// ---------------------------------------------------------------------------
// Filter parameters
// ---------------------------------------------------------------------------

/// Population filter applied before normalization.
///
/// `min_years` is the minimum number of non-null seasons a player needs;
/// `fp_cutoff` is the value a player's best season must strictly exceed.
/// The default (0, 0.0) keeps every player with a positive best season.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterParams {
    min_years: usize,
    fp_cutoff: f64,
}

impl FilterParams {
    /// Validate and build. Negative `min_years` and non-finite cutoffs are
    /// rejected rather than clamped.
    pub fn new(min_years: i64, fp_cutoff: f64) -> Result<Self, AnalysisError> {
        let min_years = usize::try_from(min_years).map_err(|_| AnalysisError::InvalidParameter {
            field: "min_years".into(),
            message: format!("must be >= 0, got {min_years}"),
        })?;
        if !fp_cutoff.is_finite() {
            return Err(AnalysisError::InvalidParameter {
                field: "fp_cutoff".into(),
                message: format!("must be finite, got {fp_cutoff}"),
            });
        }
        Ok(FilterParams {
            min_years,
            fp_cutoff,
        })
    }

    pub fn min_years(&self) -> usize {
        self.min_years
    }

    pub fn fp_cutoff(&self) -> f64 {
        self.fp_cutoff
    }
}

impl fmt::Display for FilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min_years={} fp_cutoff={}", self.min_years, self.fp_cutoff)
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Filter and rescale a raw age table.
///
/// Steps, in this order:
/// 1. Drop rows with fewer than `min_years` non-null cells.
/// 2. Drop rows whose maximum does not strictly exceed `fp_cutoff`.
/// 3. Divide every cell of a surviving row by the row maximum.
///
/// A negative maximum is still used as the divisor, which flips the ordering
/// within that row. A maximum of exactly zero cannot be rescaled and the row
/// is dropped. Column keys are kept even if every row holding them is gone.
/// An empty result is valid.
pub fn normalize(table: &AgeTable, params: &FilterParams) -> AgeTable {
    let initial = table.len();

    let seasoned: Vec<&PlayerRow> = table
        .rows()
        .iter()
        .filter(|r| r.observed() >= params.min_years)
        .collect();
    debug!(
        "Cut off {} players: did not play {} seasons",
        initial - seasoned.len(),
        params.min_years
    );

    let players_left = seasoned.len();
    let peaked: Vec<(&PlayerRow, f64)> = seasoned
        .into_iter()
        .filter_map(|r| {
            let max = r.max()?;
            (max > params.fp_cutoff).then_some((r, max))
        })
        .collect();
    debug!(
        "Cut off {} players: did not hit {} fantasy points",
        players_left - peaked.len(),
        params.fp_cutoff
    );

    let rows: Vec<PlayerRow> = peaked
        .into_iter()
        .filter_map(|(r, max)| {
            if max == 0.0 {
                warn!("dropping '{}': best season is 0 and cannot be rescaled", r.player);
                return None;
            }
            let values = r.values().iter().map(|(&k, &v)| (k, v / max)).collect();
            Some(PlayerRow::new(r.player.clone(), values))
        })
        .collect();
    debug!("Players Left: {}", rows.len());

    Table::from_parts(table.columns().clone(), rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
