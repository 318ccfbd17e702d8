//! Stockfish-backed local evaluation for puzzle sessions.

pub mod engine;
pub mod error;
pub mod evaluator;

pub use engine::{default_threads, EngineSettings, StockfishEngine};
pub use error::EngineError;
pub use evaluator::{StockfishEvaluator, StockfishFactory};
