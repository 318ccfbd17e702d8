//! Interaction state owned by the session controller.

use puzzle_core::puzzle::Round;
use puzzle_core::TreePath;
use serde::{Deserialize, Serialize};
use shakmaty::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Solving; the first mistake costs the round.
    Play,
    /// Solving after a mistake; the result is already sent.
    Try,
    /// Free exploration with the engine.
    View,
}

/// Message shown to the user about the last move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Init,
    Play,
    #[serde(alias = "bad")]
    Fail,
    Good,
    Win,
    Retry,
    End,
}

/// Move queued before it was legal to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Premove {
    pub orig: Square,
    pub dest: Square,
}

/// Pawn move waiting for the promotion role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionIntent {
    pub orig: Square,
    pub dest: Square,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub mode: Mode,
    pub path: TreePath,
    pub initial_path: TreePath,
    pub mainline: TreePath,
    pub last_feedback: Feedback,
    pub can_view_solution: bool,
    pub result_sent: bool,
    pub just_played: Option<Square>,
    pub loading: bool,
    pub round: Option<Round>,
    pub voted: Option<bool>,
    pub vote_in_flight: bool,
    pub premove: Option<Premove>,
    pub promotion: Option<PromotionIntent>,
    pub threat_mode: bool,
    pub auto_scroll_requested: bool,
}

impl SessionState {
    pub fn new(initial_path: TreePath, mainline: TreePath) -> Self {
        Self {
            mode: Mode::Play,
            path: initial_path.init(),
            initial_path,
            mainline,
            last_feedback: Feedback::Init,
            can_view_solution: false,
            result_sent: false,
            just_played: None,
            loading: false,
            round: None,
            voted: None,
            vote_in_flight: false,
            premove: None,
            promotion: None,
            threat_mode: false,
            auto_scroll_requested: false,
        }
    }
}
