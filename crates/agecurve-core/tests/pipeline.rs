// End-to-end tests of the normalization, aggregation, and significance
// pipeline through the crate's public API.

use agecurve_core::aggregate::{median_by_age, median_by_career_year, unstack_by_age};
use agecurve_core::career::{normalized_by_career_year, to_career_year};
use agecurve_core::export::{ArtifactKind, MemoryStore, TableSink, TableSource, ToFrame};
use agecurve_core::significance::{
    paired_test_by_age, paired_test_by_age_and_position, paired_test_by_career_year,
    paired_test_by_career_year_and_position,
};
use agecurve_core::{normalize, AgeTable, ByPosition, FilterParams, Position};

// ===========================================================================
// Helpers
// ===========================================================================

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn params(min_years: i64, fp_cutoff: f64) -> FilterParams {
    FilterParams::new(min_years, fp_cutoff).unwrap()
}

/// The three-player example: A plays 22-23, B plays 22-24, C only 23.
fn three_players() -> AgeTable {
    let mut t = AgeTable::new();
    t.push_row("A", [(22, Some(10.0)), (23, Some(20.0)), (24, None)])
        .unwrap();
    t.push_row("B", [(22, Some(5.0)), (23, Some(5.0)), (24, Some(15.0))])
        .unwrap();
    t.push_row("C", [(22, None), (23, Some(8.0)), (24, None)])
        .unwrap();
    t
}

/// Deterministic pseudo-random league: 60 players, ages 21-36, careers of
/// varying length and scoring, some negative seasons.
fn synthetic_league() -> AgeTable {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut t = AgeTable::with_columns(21..=36);
    for i in 0..60 {
        let start = 21 + (next() % 8) as u32;
        let length = 1 + (next() % 10) as u32;
        let peak = 20.0 + (next() % 300) as f64;
        let cells: Vec<(u32, Option<f64>)> = (start..(start + length).min(37))
            .map(|age| {
                let roll = next() % 20;
                let value = if roll == 0 {
                    None
                } else if roll == 1 {
                    Some(-((next() % 10) as f64))
                } else {
                    Some(peak * (roll as f64) / 20.0)
                };
                (age, value)
            })
            .collect();
        t.push_row(format!("player-{i}"), cells).unwrap();
    }
    t
}

// ===========================================================================
// Worked example
// ===========================================================================

#[test]
fn three_player_example_end_to_end() {
    let raw = three_players();
    let p = params(2, 0.0);

    let normalized = normalize(&raw, &p);
    assert_eq!(normalized.len(), 2);
    assert!(normalized.row("C").is_none());
    assert!(approx_eq(normalized.get("A", 22).unwrap(), 0.5, 1e-12));
    assert_eq!(normalized.get("A", 23), Some(1.0));
    assert!(approx_eq(normalized.get("B", 22).unwrap(), 0.333, 1e-3));
    assert!(approx_eq(normalized.get("B", 23).unwrap(), 0.333, 1e-3));
    assert_eq!(normalized.get("B", 24), Some(1.0));

    let medians = median_by_age(&raw, &p);
    assert!(approx_eq(medians.get(22).unwrap(), 0.417, 1e-3));
    assert!(approx_eq(medians.get(23).unwrap(), 0.667, 1e-3));
    assert_eq!(medians.get(24), Some(1.0));

    let tests = paired_test_by_age(&raw, &p).unwrap();
    assert_eq!(tests.len(), 1);
    let jump = tests.test("22-23".parse().unwrap()).unwrap();
    assert_eq!(jump.n, 2);
    assert!(jump.p_value > 0.0 && jump.p_value < 1.0);
    // only B has both 23 and 24
    assert!(!tests.contains_label("23-24"));
}

#[test]
fn significance_omitted_when_only_one_pair() {
    let mut t = AgeTable::new();
    t.push_row("solo", [(24, Some(10.0)), (25, Some(8.0))]).unwrap();
    t.push_row("young", [(23, Some(10.0)), (24, Some(9.0))]).unwrap();
    t.push_row("old", [(25, Some(10.0)), (26, Some(4.0))]).unwrap();
    let series = paired_test_by_age(&t, &FilterParams::default()).unwrap();
    assert!(!series.contains_label("24-25"));
    assert!(series.is_empty());
}

// ===========================================================================
// Properties over a synthetic league
// ===========================================================================

#[test]
fn normalization_rescales_each_row_by_its_max() {
    let raw = synthetic_league();
    for min_years in [0, 2, 4] {
        let normalized = normalize(&raw, &params(min_years, 0.0));
        for row in normalized.rows() {
            let original = raw.row(&row.player).unwrap();
            let max = original.max().unwrap();
            assert_eq!(row.max(), Some(1.0), "{} not peaked at 1.0", row.player);
            for (&age, &value) in row.values() {
                let expected = original.get(age).unwrap() / max;
                assert!(approx_eq(value, expected, 1e-12));
                assert!(value <= 1.0);
            }
        }
    }
}

#[test]
fn raising_min_years_never_adds_rows() {
    let raw = synthetic_league();
    let counts: Vec<usize> = (0..=10)
        .map(|m| normalize(&raw, &params(m, 0.0)).len())
        .collect();
    assert!(counts.windows(2).all(|w| w[1] <= w[0]), "{counts:?}");
    assert!(counts[0] > counts[10]);
}

#[test]
fn every_career_starts_at_year_one() {
    let raw = synthetic_league();
    let career = normalized_by_career_year(&raw, &params(1, 10.0)).unwrap();
    assert!(!career.is_empty());
    for row in career.rows() {
        assert_eq!(row.first_key(), Some(1), "{}", row.player);
    }
}

#[test]
fn career_reindex_preserves_observation_count() {
    let raw = synthetic_league();
    let normalized = normalize(&raw, &params(3, 0.0));
    let career = to_career_year(&normalized).unwrap();
    assert_eq!(
        normalized.to_long_form().len(),
        career.to_long_form().len()
    );
    assert_eq!(normalized.len(), career.len());
}

#[test]
fn medians_are_bounded_by_normalized_cells() {
    let raw = synthetic_league();
    let p = params(2, 25.0);
    let normalized = normalize(&raw, &p);
    let floor = unstack_by_age(&raw, &p)
        .observations()
        .iter()
        .map(|o| o.value)
        .fold(f64::INFINITY, f64::min);

    for (age, median) in median_by_age(&raw, &p).iter() {
        if normalized.column_values(age).is_empty() {
            assert!(median.is_nan());
        } else {
            assert!(median >= floor && median <= 1.0, "age {age}: {median}");
        }
    }
    for (_, median) in median_by_career_year(&raw, &p).unwrap().iter() {
        assert!(median >= floor && median <= 1.0);
    }
}

#[test]
fn p_values_are_probabilities_or_nan() {
    let raw = synthetic_league();
    let p = params(2, 0.0);
    let by_age = paired_test_by_age(&raw, &p).unwrap();
    let by_career = paired_test_by_career_year(&raw, &p).unwrap();
    assert!(!by_age.is_empty());
    assert!(!by_career.is_empty());
    for (_, pv) in by_age.iter().chain(by_career.iter()) {
        assert!(pv.is_nan() || (0.0..=1.0).contains(&pv));
    }
}

// ===========================================================================
// Positions and export
// ===========================================================================

#[test]
fn positioned_tables_cover_all_positions() {
    let league = synthetic_league();
    let tables = ByPosition {
        qb: league.clone(),
        rb: three_players(),
        wr: league.clone(),
        te: AgeTable::new(),
    };
    let mut filters = ByPosition::<FilterParams>::default();
    filters.rb = params(2, 0.0);

    let by_age = paired_test_by_age_and_position(&tables, &filters).unwrap();
    assert_eq!(by_age.rows().count(), 4);
    assert!(by_age.row(Position::TightEnd).is_empty());
    assert_eq!(by_age.row(Position::RunningBack).len(), 1);
    // every column has at least one tested position
    for &jump in by_age.jumps() {
        assert!(by_age.rows().any(|(_, s)| s.get(jump).is_some()));
    }

    let by_career = paired_test_by_career_year_and_position(&tables, &filters).unwrap();
    assert!(by_career.jumps().iter().all(|j| j.from >= 1));
}

#[test]
fn exported_artifacts_are_reproducible() {
    let raw = synthetic_league();
    let p = params(2, 0.0);
    let mut first = MemoryStore::new();
    let mut second = MemoryStore::new();
    for store in [&mut first, &mut second] {
        let name = ArtifactKind::NormalizedByAge.file_name(&p);
        store.put(&name, &normalize(&raw, &p).to_frame()).unwrap();
    }
    let name = ArtifactKind::NormalizedByAge.file_name(&p);
    assert_eq!(first.get(&name).unwrap(), second.get(&name).unwrap());

    let reparsed = AgeTable::from_frame(&first.get(&name).unwrap()).unwrap();
    assert_eq!(reparsed, normalize(&raw, &p));
}
