// Error type shared by every pipeline stage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid parameter `{field}`: {message}")]
    InvalidParameter { field: String, message: String },

    #[error("duplicate player row: {player}")]
    DuplicatePlayer { player: String },

    #[error("duplicate observation for player '{player}' at column {key}")]
    DuplicateObservation { player: String, key: u32 },

    #[error("non-finite value for player '{player}' at column {key}")]
    NonFiniteValue { player: String, key: u32 },

    #[error("malformed table dump: {0}")]
    MalformedFrame(String),

    #[error("statistics error: {0}")]
    Statistics(String),
}
