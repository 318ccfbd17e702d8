//! In-process legality oracle backed by shakmaty.

use puzzle_core::uci::{node_id, position_from_fen};
use puzzle_core::{Dests, GameNode, TreeError};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use tracing::{debug, warn};

use crate::collaborators::{DestsReply, DestsRequest, Inbound, InboxSender, MoveRequest, Oracle};

/// Answers move and dests requests immediately by posting to the inbox.
pub struct LocalOracle {
    inbox: InboxSender,
}

impl LocalOracle {
    pub fn new(inbox: InboxSender) -> Self {
        Self { inbox }
    }

    fn post(&self, msg: Inbound) {
        if self.inbox.send(msg).is_err() {
            debug!("session inbox closed, dropping oracle reply");
        }
    }
}

impl Oracle for LocalOracle {
    fn send_move(&mut self, req: MoveRequest) {
        match play_move(&req) {
            Ok(node) => self.post(Inbound::Node {
                node,
                path: req.path,
            }),
            Err(e) => {
                warn!(path = %req.path, error = %e, "Rejected move");
                self.post(Inbound::OracleError(e.to_string()));
            }
        }
    }

    fn send_dests(&mut self, req: DestsRequest) {
        match position_from_fen(&req.fen) {
            Ok(pos) => self.post(Inbound::Dests(DestsReply {
                path: req.path,
                dests: Dests::from_position(&pos),
                opening: None,
            })),
            Err(e) => {
                warn!(path = %req.path, error = %e, "Dests request failed");
                self.post(Inbound::OracleError(e.to_string()));
            }
        }
    }
}

/// Play the requested move and build the resulting node.
pub fn play_move(req: &MoveRequest) -> Result<GameNode, TreeError> {
    let mut pos = position_from_fen(&req.fen)?;
    let uci = UciMove::Normal {
        from: req.orig,
        to: req.dest,
        promotion: req.promotion,
    };
    let mv = uci
        .to_move(&pos)
        .map_err(|_| TreeError::InvalidUci(uci.to_string()))?;

    let mut san = San::from_move(&pos, mv.clone()).to_string();
    let played = mv.to_uci(CastlingMode::Standard).to_string();
    pos.play_unchecked(mv);

    if pos.is_checkmate() {
        san.push('#');
    } else if pos.is_check() {
        san.push('+');
    }

    let mut node = GameNode::root(Fen::from_position(&pos, EnPassantMode::Legal).to_string(), ply_of(&pos));
    node.id = node_id(&played)?;
    node.uci = Some(played);
    node.san = Some(san);
    node.check = pos.is_check();
    node.dests = Some(Dests::from_position(&pos));
    Ok(node)
}

/// Half-move index of a position, from its move counter and side to move.
fn ply_of(pos: &Chess) -> u32 {
    let full = pos.fullmoves().get().saturating_sub(1);
    full * 2 + u32::from(pos.turn() == Color::Black)
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_core::TreePath;
    use shakmaty::{Role, Square};
    use tokio::sync::mpsc;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn request(fen: &str, orig: Square, dest: Square, promotion: Option<Role>) -> MoveRequest {
        MoveRequest {
            orig,
            dest,
            promotion,
            fen: fen.into(),
            path: TreePath::root(),
        }
    }

    #[test]
    fn test_plays_legal_move() {
        let node = play_move(&request(START, Square::E2, Square::E4, None)).unwrap();
        assert_eq!(node.uci.as_deref(), Some("e2e4"));
        assert_eq!(node.san.as_deref(), Some("e4"));
        assert_eq!(node.ply, 1);
        assert!(node.fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert!(node.dests.as_ref().unwrap().contains(Square::E7, Square::E5));
    }

    #[test]
    fn test_rejects_illegal_move() {
        assert!(play_move(&request(START, Square::E2, Square::E5, None)).is_err());
    }

    #[test]
    fn test_castle_from_king_takes_rook() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let node = play_move(&request(fen, Square::E1, Square::H1, None)).unwrap();
        assert_eq!(node.uci.as_deref(), Some("e1g1"));
        assert_eq!(node.san.as_deref(), Some("O-O"));
    }

    #[test]
    fn test_promotion_and_check_suffix() {
        let fen = "7k/P7/8/8/8/8/8/K7 w - - 0 1";
        let node = play_move(&request(fen, Square::A7, Square::A8, Some(Role::Queen))).unwrap();
        assert_eq!(node.uci.as_deref(), Some("a7a8q"));
        assert_eq!(node.san.as_deref(), Some("a8=Q+"));
        assert!(node.check);
    }

    #[test]
    fn test_replies_arrive_on_inbox() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut oracle = LocalOracle::new(tx);
        oracle.send_dests(DestsRequest {
            fen: START.into(),
            path: TreePath::root(),
        });
        oracle.send_move(request(START, Square::E2, Square::E5, None));
        assert!(matches!(rx.try_recv(), Ok(Inbound::Dests(r)) if r.dests.get(Square::G1).is_some()));
        assert!(matches!(rx.try_recv(), Ok(Inbound::OracleError(_))));
    }
}
