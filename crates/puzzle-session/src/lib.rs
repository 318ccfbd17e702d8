//! Puzzle session engine: classifies attempted moves against a hidden
//! solution and coordinates the legality oracle, the evaluation engine and
//! the puzzle API around a path-addressed move tree.

pub mod auto_shapes;
pub mod ceval;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod dests_loader;
pub mod driver;
pub mod error;
pub mod oracle;
pub mod scheduler;
pub mod state;
pub mod throttle;

pub use ceval::{CevalCoordinator, EvalEvent, EvalOpts, EvalWork, Evaluator, EvaluatorFactory};
pub use classifier::{Outcome, PuzzleClassifier, Verdict};
pub use collaborators::{
    BoardConfig, Collaborators, DestsReply, DestsRequest, Inbound, InboxSender, MemoryPreferences,
    MoveRequest, Oracle, Preferences, PuzzleApi, SessionEvent, Sound,
};
pub use config::SessionConfig;
pub use controller::{GameOver, SessionController};
pub use driver::UserAction;
pub use error::SessionError;
pub use oracle::LocalOracle;
pub use state::{Feedback, Mode, SessionState};
