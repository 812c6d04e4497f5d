// Paired significance testing between adjacent columns.
//
// For each adjacent pair of column keys (k, next) the players with values at
// both are compared with a one-sided paired t-test whose alternative is
// "value at k is greater than value at next", i.e. a decline.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

use crate::career::normalized_by_career_year;
use crate::error::AnalysisError;
use crate::normalize::{normalize, FilterParams};
use crate::position::{ByPosition, Position};
use crate::table::{Age, AgeTable, CareerYear, Table};

/// Fewest paired observations for which a test is attempted.
pub const MIN_PAIRED_OBSERVATIONS: usize = 2;

// ---------------------------------------------------------------------------
// Jump labels
// ---------------------------------------------------------------------------

/// An adjacent column pair, displayed as "from-to" (e.g. "24-25").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Jump {
    pub from: u32,
    pub to: u32,
}

impl Jump {
    pub fn new(from: u32, to: u32) -> Self {
        Jump { from, to }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for Jump {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AnalysisError::MalformedFrame(format!("invalid jump label '{s}'"));
        let (from, to) = s.trim().split_once('-').ok_or_else(bad)?;
        Ok(Jump {
            from: from.parse().map_err(|_| bad())?,
            to: to.parse().map_err(|_| bad())?,
        })
    }
}

// ---------------------------------------------------------------------------
// Paired t-test
// ---------------------------------------------------------------------------

/// Result of a one-sided ("greater") paired t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedTTest {
    pub n: usize,
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
}

/// One-sided paired t-test of H1: mean(first - second) > 0.
///
/// When every difference is identical the statistic is infinite (or NaN for
/// all-zero differences) and the p-value is 0, 1, or NaN accordingly.
pub fn paired_t_test_greater(first: &[f64], second: &[f64]) -> Result<PairedTTest, AnalysisError> {
    if first.len() != second.len() {
        return Err(AnalysisError::InvalidParameter {
            field: "samples".into(),
            message: format!("unequal lengths {} and {}", first.len(), second.len()),
        });
    }
    let n = first.len();
    if n < MIN_PAIRED_OBSERVATIONS {
        return Err(AnalysisError::InvalidParameter {
            field: "samples".into(),
            message: format!("need at least {MIN_PAIRED_OBSERVATIONS} pairs, got {n}"),
        });
    }

    let diffs: Vec<f64> = first.iter().zip(second).map(|(a, b)| a - b).collect();
    let nf = n as f64;
    let mean = diffs.iter().sum::<f64>() / nf;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    let df = nf - 1.0;

    if variance == 0.0 {
        let (statistic, p_value) = if mean > 0.0 {
            (f64::INFINITY, 0.0)
        } else if mean < 0.0 {
            (f64::NEG_INFINITY, 1.0)
        } else {
            (f64::NAN, f64::NAN)
        };
        return Ok(PairedTTest {
            n,
            statistic,
            df,
            p_value,
        });
    }

    let statistic = mean / (variance / nf).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| AnalysisError::Statistics(e.to_string()))?;
    Ok(PairedTTest {
        n,
        statistic,
        df,
        p_value: dist.sf(statistic),
    })
}

// ---------------------------------------------------------------------------
// Significance series
// ---------------------------------------------------------------------------

/// Test results keyed by jump. A jump is present only when at least two
/// players had values on both sides of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceSeries<A> {
    tests: BTreeMap<Jump, PairedTTest>,
    _axis: PhantomData<A>,
}

impl<A> Default for SignificanceSeries<A> {
    fn default() -> Self {
        SignificanceSeries {
            tests: BTreeMap::new(),
            _axis: PhantomData,
        }
    }
}

impl<A> SignificanceSeries<A> {
    /// p-value for a jump, if it was tested.
    pub fn get(&self, jump: Jump) -> Option<f64> {
        self.tests.get(&jump).map(|t| t.p_value)
    }

    /// p-value by "from-to" label.
    pub fn get_label(&self, label: &str) -> Option<f64> {
        label.parse().ok().and_then(|j| self.get(j))
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.get_label(label).is_some()
    }

    pub fn test(&self, jump: Jump) -> Option<&PairedTTest> {
        self.tests.get(&jump)
    }

    /// (jump, p-value) pairs in ascending jump order.
    pub fn iter(&self) -> impl Iterator<Item = (Jump, f64)> + '_ {
        self.tests.iter().map(|(&j, t)| (j, t.p_value))
    }

    pub fn jumps(&self) -> impl Iterator<Item = Jump> + '_ {
        self.tests.keys().copied()
    }

    /// Jumps whose decline is significant at `alpha`.
    pub fn declines(&self, alpha: f64) -> Vec<(Jump, f64)> {
        self.iter().filter(|&(_, p)| p < alpha).collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// Test every adjacent column pair of a table, in ascending key order.
pub fn adjacent_jump_tests<A>(table: &Table<A>) -> Result<SignificanceSeries<A>, AnalysisError> {
    let keys: Vec<u32> = table.columns().iter().copied().collect();
    let mut series = SignificanceSeries::default();
    for pair in keys.windows(2) {
        let jump = Jump::new(pair[0], pair[1]);
        let (before, after) = table.paired_values(jump.from, jump.to);
        if before.len() < MIN_PAIRED_OBSERVATIONS {
            debug!("skipping jump {jump}: {} paired observations", before.len());
            continue;
        }
        let test = paired_t_test_greater(&before, &after)?;
        series.tests.insert(jump, test);
    }
    Ok(series)
}

/// Paired decline tests between adjacent ages of the normalized table.
pub fn paired_test_by_age(
    table: &AgeTable,
    params: &FilterParams,
) -> Result<SignificanceSeries<Age>, AnalysisError> {
    adjacent_jump_tests(&normalize(table, params))
}

/// Paired decline tests between adjacent career years.
pub fn paired_test_by_career_year(
    table: &AgeTable,
    params: &FilterParams,
) -> Result<SignificanceSeries<CareerYear>, AnalysisError> {
    adjacent_jump_tests(&normalized_by_career_year(table, params)?)
}

// ---------------------------------------------------------------------------
// Per-position table
// ---------------------------------------------------------------------------

/// Per-position p-values stacked into rows (QB, RB, WR, TE) with one column
/// per jump that at least one position could test.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedSignificanceTable<A> {
    jumps: Vec<Jump>,
    rows: ByPosition<SignificanceSeries<A>>,
}

impl<A> PositionedSignificanceTable<A> {
    /// Stack per-position series. A jump becomes a column only if some
    /// position has a non-NaN p-value for it, so all-null columns are dropped.
    pub fn from_series(rows: ByPosition<SignificanceSeries<A>>) -> Self {
        let jumps: BTreeSet<Jump> = rows
            .iter()
            .flat_map(|(_, s)| s.iter().filter(|(_, p)| !p.is_nan()).map(|(j, _)| j))
            .collect();
        PositionedSignificanceTable {
            jumps: jumps.into_iter().collect(),
            rows,
        }
    }

    /// Column order: ascending jump.
    pub fn jumps(&self) -> &[Jump] {
        &self.jumps
    }

    pub fn row(&self, position: Position) -> &SignificanceSeries<A> {
        self.rows.get(position)
    }

    pub fn get(&self, position: Position, jump: Jump) -> Option<f64> {
        self.rows.get(position).get(jump)
    }

    pub fn rows(&self) -> impl Iterator<Item = (Position, &SignificanceSeries<A>)> {
        self.rows.iter()
    }
}

/// Run the age test for every position with its own filter parameters.
pub fn paired_test_by_age_and_position(
    tables: &ByPosition<AgeTable>,
    filters: &ByPosition<FilterParams>,
) -> Result<PositionedSignificanceTable<Age>, AnalysisError> {
    let series = ByPosition::try_from_fn(|p| paired_test_by_age(tables.get(p), filters.get(p)))?;
    Ok(PositionedSignificanceTable::from_series(series))
}

/// Run the career-year test for every position with its own filter parameters.
pub fn paired_test_by_career_year_and_position(
    tables: &ByPosition<AgeTable>,
    filters: &ByPosition<FilterParams>,
) -> Result<PositionedSignificanceTable<CareerYear>, AnalysisError> {
    let series =
        ByPosition::try_from_fn(|p| paired_test_by_career_year(tables.get(p), filters.get(p)))?;
    Ok(PositionedSignificanceTable::from_series(series))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    // -- jump labels --

    #[test]
    fn jump_label_roundtrip() {
        let j: Jump = "24-25".parse().unwrap();
        assert_eq!(j, Jump::new(24, 25));
        assert_eq!(j.to_string(), "24-25");
        assert!("24".parse::<Jump>().is_err());
        assert!("a-b".parse::<Jump>().is_err());
    }

    #[test]
    fn jumps_order_numerically() {
        assert!(Jump::new(9, 10) < Jump::new(10, 11));
    }

    // -- t-test --

    #[test]
    fn one_degree_of_freedom_matches_cauchy() {
        // diffs = [-0.5, 0.0]: mean -0.25, sd 0.3536, t = -1, df = 1.
        // For df = 1, P(T > -1) = 0.75 exactly.
        let t = paired_t_test_greater(&[0.5, 1.0 / 3.0], &[1.0, 1.0 / 3.0]).unwrap();
        assert_eq!(t.n, 2);
        assert!(approx_eq(t.statistic, -1.0, 1e-12));
        assert!(approx_eq(t.df, 1.0, 1e-12));
        assert!(approx_eq(t.p_value, 0.75, 1e-9));
    }

    #[test]
    fn two_degrees_of_freedom_closed_form() {
        // diffs = [1, 2, 3]: mean 2, sd 1, t = 2 * sqrt(3), df = 2.
        // For df = 2, sf(t) = 1/2 - t / (2 * sqrt(t^2 + 2)).
        let t = paired_t_test_greater(&[2.0, 3.0, 4.0], &[1.0, 1.0, 1.0]).unwrap();
        let stat = 2.0 * 3.0_f64.sqrt();
        let expected = 0.5 - stat / (2.0 * (stat * stat + 2.0).sqrt());
        assert!(approx_eq(t.statistic, stat, 1e-12));
        assert!(approx_eq(t.p_value, expected, 1e-9));
    }

    #[test]
    fn clear_decline_has_small_p_value() {
        let t = paired_t_test_greater(&[1.0, 0.9, 1.0, 0.95, 1.0], &[0.5, 0.6, 0.4, 0.55, 0.45])
            .unwrap();
        assert!(t.p_value < 0.001);
    }

    #[test]
    fn constant_differences_follow_sign() {
        let up = paired_t_test_greater(&[2.0, 3.0], &[1.0, 2.0]).unwrap();
        assert_eq!(up.p_value, 0.0);
        let down = paired_t_test_greater(&[1.0, 2.0], &[2.0, 3.0]).unwrap();
        assert_eq!(down.p_value, 1.0);
        let flat = paired_t_test_greater(&[1.0, 2.0], &[1.0, 2.0]).unwrap();
        assert!(flat.p_value.is_nan());
    }

    #[test]
    fn too_few_or_mismatched_samples_rejected() {
        assert!(paired_t_test_greater(&[1.0], &[0.5]).is_err());
        assert!(paired_t_test_greater(&[1.0, 2.0], &[0.5]).is_err());
    }

    // -- adjacent jumps --

    fn raw() -> AgeTable {
        let mut t = AgeTable::new();
        t.push_row("A", [(22, Some(10.0)), (23, Some(20.0))]).unwrap();
        t.push_row("B", [(22, Some(5.0)), (23, Some(5.0)), (24, Some(15.0))])
            .unwrap();
        t.push_row("C", [(23, Some(8.0))]).unwrap();
        t
    }

    #[test]
    fn jumps_with_one_pair_are_omitted() {
        let series = paired_test_by_age(&raw(), &FilterParams::new(2, 0.0).unwrap()).unwrap();
        assert_eq!(series.len(), 1);
        assert!(series.contains_label("22-23"));
        assert!(!series.contains_label("23-24"));
        assert!(approx_eq(series.get_label("22-23").unwrap(), 0.75, 1e-9));
    }

    #[test]
    fn non_consecutive_columns_are_still_adjacent() {
        let mut t = AgeTable::new();
        t.push_row("A", [(30, Some(1.0)), (32, Some(0.5))]).unwrap();
        t.push_row("B", [(30, Some(1.0)), (32, Some(0.7))]).unwrap();
        let series = adjacent_jump_tests(&t).unwrap();
        assert!(series.contains_label("30-32"));
    }

    #[test]
    fn career_year_jump_tests_the_filtered_columns() {
        // Career-year columns 1..=3. Only "x" and "y" have both 2 and 3, and
        // "z" has 1 and 2 only. The 2-3 test must use exactly x's and y's
        // values at years 2 and 3, not columns shifted by the row filter.
        let mut t = AgeTable::new();
        t.push_row("x", [(22, Some(4.0)), (23, Some(10.0)), (24, Some(6.0))])
            .unwrap();
        t.push_row("y", [(25, Some(5.0)), (26, Some(10.0)), (27, Some(2.0))])
            .unwrap();
        t.push_row("z", [(21, Some(10.0)), (22, Some(9.0))]).unwrap();
        let series = paired_test_by_career_year(&t, &FilterParams::default()).unwrap();

        let expected = paired_t_test_greater(&[1.0, 1.0], &[0.6, 0.2]).unwrap();
        assert!(approx_eq(series.get_label("2-3").unwrap(), expected.p_value, 1e-12));
    }

    #[test]
    fn declines_filter_by_alpha() {
        let mut t = AgeTable::new();
        for (name, late) in [("a", 0.5), ("b", 0.4), ("c", 0.6), ("d", 0.45)] {
            t.push_row(name, [(28, Some(1.0)), (29, Some(late))]).unwrap();
        }
        let series = adjacent_jump_tests(&t).unwrap();
        assert_eq!(series.declines(0.05).len(), 1);
        assert!(series.declines(1e-12).is_empty());
    }

    // -- per-position table --

    #[test]
    fn positioned_table_drops_untested_jumps() {
        let mut qb = AgeTable::new();
        qb.push_row("q1", [(30, Some(1.0)), (31, Some(0.8))]).unwrap();
        qb.push_row("q2", [(30, Some(0.9)), (31, Some(1.0))]).unwrap();
        // 35 is a column but only one QB has 34 and 35
        qb.push_row("q3", [(34, Some(1.0)), (35, Some(0.2))]).unwrap();

        let mut rb = AgeTable::new();
        rb.push_row("r1", [(24, Some(1.0)), (25, Some(0.5))]).unwrap();
        rb.push_row("r2", [(24, Some(1.0)), (25, Some(0.6))]).unwrap();

        let tables = ByPosition {
            qb,
            rb,
            wr: AgeTable::new(),
            te: AgeTable::new(),
        };
        let table =
            paired_test_by_age_and_position(&tables, &ByPosition::default()).unwrap();

        assert_eq!(table.jumps(), &[Jump::new(24, 25), Jump::new(30, 31)]);
        assert!(table.get(Position::Quarterback, Jump::new(30, 31)).is_some());
        assert!(table.get(Position::Quarterback, Jump::new(24, 25)).is_none());
        assert!(table.get(Position::RunningBack, Jump::new(24, 25)).is_some());
        assert!(table.row(Position::WideReceiver).is_empty());
        assert_eq!(table.rows().count(), 4);
    }

    #[test]
    fn positioned_table_drops_all_nan_jumps() {
        // both players flat at their peak: zero differences, NaN p-value
        let flat = || {
            let mut t = AgeTable::new();
            t.push_row("a", [(24, Some(1.0)), (25, Some(1.0))]).unwrap();
            t.push_row("b", [(24, Some(1.0)), (25, Some(1.0))]).unwrap();
            t
        };
        let tables = ByPosition::from_fn(|_| flat());
        let table =
            paired_test_by_age_and_position(&tables, &ByPosition::default()).unwrap();

        assert!(table.row(Position::Quarterback).get(Jump::new(24, 25)).unwrap().is_nan());
        assert!(table.jumps().is_empty());

        // one position with a real result keeps the column for everyone
        let mut mixed = ByPosition::from_fn(|_| flat());
        mixed.rb = AgeTable::new();
        mixed.rb.push_row("r1", [(24, Some(1.0)), (25, Some(0.5))]).unwrap();
        mixed.rb.push_row("r2", [(24, Some(1.0)), (25, Some(0.7))]).unwrap();
        let table =
            paired_test_by_age_and_position(&mixed, &ByPosition::default()).unwrap();
        assert_eq!(table.jumps(), &[Jump::new(24, 25)]);
        assert!(table.get(Position::Quarterback, Jump::new(24, 25)).unwrap().is_nan());
    }

    #[test]
    fn per_position_filters_are_applied() {
        let mut qb = AgeTable::new();
        qb.push_row("q1", [(30, Some(10.0)), (31, Some(8.0))]).unwrap();
        qb.push_row("q2", [(30, Some(100.0)), (31, Some(90.0))]).unwrap();
        qb.push_row("q3", [(30, Some(200.0)), (31, Some(150.0))]).unwrap();
        let tables = ByPosition {
            qb: qb.clone(),
            rb: qb.clone(),
            wr: qb.clone(),
            te: qb,
        };
        let mut filters = ByPosition::<FilterParams>::default();
        // QB cutoff removes two of three players, leaving a single pair
        filters.qb = FilterParams::new(0, 150.0).unwrap();

        let table = paired_test_by_age_and_position(&tables, &filters).unwrap();
        assert!(table.get(Position::Quarterback, Jump::new(30, 31)).is_none());
        assert!(table.get(Position::TightEnd, Jump::new(30, 31)).is_some());
        assert_eq!(table.jumps(), &[Jump::new(30, 31)]);
    }
}
