//! Session timing and evaluation settings, read from environment variables.

use std::env;
use std::time::Duration;

use crate::error::SessionError;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Delay before jumping from the setup move to the puzzle start
    pub initial_jump_delay: Duration,

    /// Delay before "view solution" becomes available
    pub solution_reveal_delay: Duration,

    /// Delay before a wrong move is taken back
    pub revert_delay: Duration,

    /// Delay before the opponent reply is played
    pub reply_delay: Duration,

    /// Minimum interval between legal-destination requests
    pub dests_throttle: Duration,

    /// Minimum interval between evaluation restarts
    pub ceval_throttle: Duration,

    /// Minimum interval between votes
    pub vote_throttle: Duration,

    /// Number of principal variations requested from the engine
    pub multi_pv: u32,

    /// Target search depth
    pub max_depth: u32,

    /// Whether local evaluation starts enabled
    pub ceval_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_jump_delay: Duration::from_millis(500),
            solution_reveal_delay: Duration::from_millis(5000),
            revert_delay: Duration::from_millis(500),
            reply_delay: Duration::from_millis(500),
            dests_throttle: Duration::from_millis(800),
            ceval_throttle: Duration::from_millis(800),
            vote_throttle: Duration::from_millis(1000),
            multi_pv: 3,
            max_depth: 18,
            ceval_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, SessionError> {
        let defaults = Self::default();

        let config = Self {
            initial_jump_delay: millis_var("PUZZLE_INITIAL_JUMP_MS")
                .unwrap_or(defaults.initial_jump_delay),
            solution_reveal_delay: millis_var("PUZZLE_SOLUTION_REVEAL_MS")
                .unwrap_or(defaults.solution_reveal_delay),
            revert_delay: millis_var("PUZZLE_REVERT_MS").unwrap_or(defaults.revert_delay),
            reply_delay: millis_var("PUZZLE_REPLY_MS").unwrap_or(defaults.reply_delay),
            dests_throttle: millis_var("PUZZLE_DESTS_THROTTLE_MS")
                .unwrap_or(defaults.dests_throttle),
            ceval_throttle: millis_var("PUZZLE_CEVAL_THROTTLE_MS")
                .unwrap_or(defaults.ceval_throttle),
            vote_throttle: millis_var("PUZZLE_VOTE_THROTTLE_MS")
                .unwrap_or(defaults.vote_throttle),
            multi_pv: env::var("PUZZLE_MULTI_PV")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.multi_pv),
            max_depth: env::var("PUZZLE_MAX_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_depth),
            ceval_enabled: env::var("PUZZLE_CEVAL_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ceval_enabled),
        };

        if !(1..=5).contains(&config.multi_pv) {
            return Err(SessionError::Config("PUZZLE_MULTI_PV must be between 1 and 5"));
        }
        if config.max_depth == 0 {
            return Err(SessionError::Config("PUZZLE_MAX_DEPTH must be positive"));
        }

        Ok(config)
    }
}

fn millis_var(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
