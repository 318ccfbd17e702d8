//! Session error types

use puzzle_core::TreeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Puzzle API error: {0}")]
    Api(String),
}
