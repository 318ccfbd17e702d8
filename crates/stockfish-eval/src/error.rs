//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn Stockfish: {0}")]
    Spawn(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Stockfish exited")]
    Exited,
}
