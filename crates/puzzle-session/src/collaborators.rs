//! Interfaces to the services the session talks to, and the messages that
//! flow between them and the controller.
//!
//! Outgoing requests are fire-and-forget. Every reply comes back as an
//! [`Inbound`] message on the session inbox, so all tree mutation happens on
//! the driver's single timeline.

use futures::future::BoxFuture;
use puzzle_core::puzzle::{PuzzlePayload, RoundResponse, VoteResponse};
use puzzle_core::{Dests, GameNode, Opening, TreePath};
use shakmaty::{Color, Role, Square};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auto_shapes::Shape;
use crate::ceval::EvalEvent;
use crate::error::SessionError;

/// Move submitted to the legality oracle, to be appended at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub orig: Square,
    pub dest: Square,
    pub promotion: Option<Role>,
    /// Position the move is played from.
    pub fen: String,
    pub path: TreePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestsRequest {
    pub fen: String,
    pub path: TreePath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestsReply {
    pub path: TreePath,
    pub dests: Dests,
    pub opening: Option<Opening>,
}

/// Move-legality service.
pub trait Oracle: Send {
    fn send_move(&mut self, req: MoveRequest);
    fn send_dests(&mut self, req: DestsRequest);
}

/// HTTP side of the trainer: results, next puzzle, votes.
pub trait PuzzleApi: Send + Sync {
    fn submit_round(
        &self,
        puzzle_id: &str,
        win: bool,
    ) -> BoxFuture<'static, Result<RoundResponse, SessionError>>;

    fn next_puzzle(&self) -> BoxFuture<'static, Result<PuzzlePayload, SessionError>>;

    fn vote(&self, puzzle_id: &str, up: bool)
        -> BoxFuture<'static, Result<VoteResponse, SessionError>>;
}

/// Persistent user markers.
pub trait Preferences: Send + Sync {
    fn has_ever_voted(&self) -> bool;
    fn mark_ever_voted(&self);
}

/// Preferences kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    ever_voted: AtomicBool,
}

impl Preferences for MemoryPreferences {
    fn has_ever_voted(&self) -> bool {
        self.ever_voted.load(Ordering::Relaxed)
    }

    fn mark_ever_voted(&self) {
        self.ever_voted.store(true, Ordering::Relaxed);
    }
}

/// Replies and notifications entering the session.
#[derive(Debug, Clone)]
pub enum Inbound {
    Node { node: GameNode, path: TreePath },
    Dests(DestsReply),
    OracleError(String),
    Eval(EvalEvent),
    EvalCrash(String),
    /// Replies carry the id of the puzzle they were requested for.
    Round { puzzle_id: String, response: RoundResponse },
    Vote { puzzle_id: String, response: VoteResponse },
    Puzzle(Box<PuzzlePayload>),
    ApiError(String),
}

pub type InboxSender = mpsc::UnboundedSender<Inbound>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Move,
    Capture,
    Check,
}

/// Interactive board configuration for the current node.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub fen: String,
    pub orientation: Color,
    pub turn_color: Color,
    /// Side allowed to move pieces, if any.
    pub movable_color: Option<Color>,
    pub dests: Dests,
    pub premovable: bool,
    pub check: bool,
    pub last_move: Option<(Square, Square)>,
}

/// Signals for the view layer. Never awaited.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Redraw,
    Board(BoardConfig),
    Sound(Sound),
    AutoShapes(Vec<Shape>),
    ClearSelection,
    CancelPremove,
    /// A promotion role has to be chosen for this move.
    PromotionPrompt { orig: Square, dest: Square },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Everything the controller needs from the outside world.
pub struct Collaborators {
    pub oracle: Box<dyn Oracle>,
    pub api: Arc<dyn PuzzleApi>,
    pub evaluators: Box<dyn crate::ceval::EvaluatorFactory>,
    pub preferences: Arc<dyn Preferences>,
    pub inbox: InboxSender,
    pub events: EventSender,
}
