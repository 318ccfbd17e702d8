//! Trainer configuration from environment variables.

use std::env;

use puzzle_session::{SessionConfig, SessionError};
use stockfish_eval::{default_threads, EngineSettings};

#[derive(Clone, Debug)]
pub struct TrainerConfig {
    pub api_url: String,
    pub engine: EngineSettings,
    pub session: SessionConfig,
}

impl TrainerConfig {
    pub fn from_env() -> Result<Self, SessionError> {
        let api_url = env::var("PUZZLE_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        if api_url.is_empty() {
            return Err(SessionError::Config("PUZZLE_API_URL must not be empty"));
        }

        let engine = EngineSettings {
            path: env::var("STOCKFISH_PATH")
                .unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string()),
            threads: env::var("STOCKFISH_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_threads),
            hash_mb: env::var("STOCKFISH_HASH_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
        };
        if engine.threads == 0 {
            return Err(SessionError::Config("STOCKFISH_THREADS must be positive"));
        }

        Ok(Self {
            api_url,
            engine,
            session: SessionConfig::from_env()?,
        })
    }
}
