// Offensive skill positions and a fixed per-position container.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fantasy-relevant offensive positions covered by the age-curve analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
}

impl Position {
    /// All positions in report order.
    pub const ALL: [Position; 4] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
    ];

    /// Parse a two-letter position code ("QB", "rb", ...).
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            _ => None,
        }
    }

    /// Two-letter position code.
    pub fn code(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// ByPosition
// ---------------------------------------------------------------------------

/// One value per position. Every position is always present, so lookups
/// cannot miss and defaults are resolved once at construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ByPosition<T> {
    pub qb: T,
    pub rb: T,
    pub wr: T,
    pub te: T,
}

impl<T> ByPosition<T> {
    /// Build by calling `f` once per position.
    pub fn from_fn(mut f: impl FnMut(Position) -> T) -> Self {
        ByPosition {
            qb: f(Position::Quarterback),
            rb: f(Position::RunningBack),
            wr: f(Position::WideReceiver),
            te: f(Position::TightEnd),
        }
    }

    /// Fallible variant of `from_fn`; stops at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(Position) -> Result<T, E>) -> Result<Self, E> {
        Ok(ByPosition {
            qb: f(Position::Quarterback)?,
            rb: f(Position::RunningBack)?,
            wr: f(Position::WideReceiver)?,
            te: f(Position::TightEnd)?,
        })
    }

    pub fn get(&self, position: Position) -> &T {
        match position {
            Position::Quarterback => &self.qb,
            Position::RunningBack => &self.rb,
            Position::WideReceiver => &self.wr,
            Position::TightEnd => &self.te,
        }
    }

    /// Iterate in report order (QB, RB, WR, TE).
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        Position::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
