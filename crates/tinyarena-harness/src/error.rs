//! Harness error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("arena: {0}")]
    Arena(#[from] tinyarena_core::ArenaError),
    #[error("no fixture JSON files found in {0}")]
    NoFixtures(String),
    #[error("no fixture case named `{0}`")]
    UnknownCase(String),
    #[error("unknown storm kind `{0}`")]
    UnknownStorm(String),
    #[error("invalid seed `{0}`")]
    InvalidSeed(String),
    #[error("log line is missing required field `{0}`")]
    MissingField(&'static str),
}
