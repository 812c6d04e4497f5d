// Library root: age-curve and career-curve statistics over per-season
// fantasy-point tables.
//
// Pipeline: raw table -> normalize -> (career-year reindex) -> medians,
// long-form projections, and paired significance tests. Nothing in this
// crate touches the filesystem; persistence goes through the `export` ports.

pub mod aggregate;
pub mod career;
pub mod error;
pub mod export;
pub mod normalize;
pub mod position;
pub mod significance;
pub mod table;

pub use error::AnalysisError;
pub use export::{Frame, MemoryStore, TableSink, TableSource, ToFrame};
pub use normalize::{normalize, FilterParams};
pub use position::{ByPosition, Position};
pub use table::{Age, AgeTable, CareerYear, CareerYearTable, Table};
