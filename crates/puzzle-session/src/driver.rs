//! Event loop that owns the controller.

use puzzle_core::TreePath;
use shakmaty::{Role, Square};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::collaborators::Inbound;
use crate::controller::SessionController;

/// Input from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Move {
        orig: Square,
        dest: Square,
        capture: bool,
    },
    Promote(Role),
    CancelPromotion,
    Premove {
        orig: Square,
        dest: Square,
    },
    Jump(TreePath),
    Prev,
    Next,
    First,
    Last,
    ViewSolution,
    NextPuzzle,
    Vote(bool),
    ToggleCeval,
    ToggleThreatMode,
    PlayBestMove,
    PlayUci(String),
    VisibilityChanged,
    Quit,
}

pub fn dispatch(controller: &mut SessionController, action: UserAction) {
    debug!(?action, "user action");
    match action {
        UserAction::Move {
            orig,
            dest,
            capture,
        } => controller.user_move(orig, dest, capture),
        UserAction::Promote(role) => controller.finish_promotion(role),
        UserAction::CancelPromotion => controller.cancel_promotion(),
        UserAction::Premove { orig, dest } => controller.set_premove(orig, dest),
        UserAction::Jump(path) => controller.user_jump(path),
        UserAction::Prev => controller.prev(),
        UserAction::Next => controller.next(),
        UserAction::First => controller.first(),
        UserAction::Last => controller.last(),
        UserAction::ViewSolution => controller.view_solution(),
        UserAction::NextPuzzle => controller.next_puzzle(),
        UserAction::Vote(up) => controller.vote(up),
        UserAction::ToggleCeval => controller.toggle_ceval(),
        UserAction::ToggleThreatMode => controller.toggle_threat_mode(),
        UserAction::PlayBestMove => controller.play_best_move(),
        UserAction::PlayUci(uci) => controller.play_uci(&uci),
        UserAction::VisibilityChanged => controller.visibility_changed(),
        UserAction::Quit => {}
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Run the session until the user quits or the action channel closes.
/// Returns the controller for inspection.
pub async fn run(
    mut controller: SessionController,
    mut inbox: mpsc::UnboundedReceiver<Inbound>,
    mut actions: mpsc::UnboundedReceiver<UserAction>,
) -> SessionController {
    loop {
        let deadline = controller.next_deadline();
        tokio::select! {
            Some(msg) = inbox.recv() => controller.handle(msg),
            action = actions.recv() => match action {
                None | Some(UserAction::Quit) => break,
                Some(action) => dispatch(&mut controller, action),
            },
            _ = sleep_until_deadline(deadline) => controller.run_due(),
        }
    }
    info!(puzzle_id = %controller.puzzle().id, "Session closed");
    controller.shutdown();
    controller
}
