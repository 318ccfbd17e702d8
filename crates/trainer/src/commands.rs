//! Terminal command parsing.

use puzzle_core::uci::decompose_uci;
use puzzle_core::TreePath;
use puzzle_session::UserAction;
use shakmaty::Role;

pub const HELP: &str = "\
commands:
  e2e4 / e7e8q     play a move (uci)
  q r b n / cancel answer a promotion prompt
  premove e2e4     queue a move for your next turn
  prev next first last
  jump <path>      go to a tree path
  solution         view the solution
  next-puzzle      load another puzzle
  up / down        vote
  ceval threat     toggle engine / threat mode
  best             play the engine's best move
  refresh          redraw the board
  quit";

/// Parse one input line. `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<UserAction> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let arg = words.next();
    let action = match (head, arg) {
        ("prev", None) => UserAction::Prev,
        ("next", None) => UserAction::Next,
        ("first", None) => UserAction::First,
        ("last", None) => UserAction::Last,
        ("solution", None) => UserAction::ViewSolution,
        ("next-puzzle", None) => UserAction::NextPuzzle,
        ("up", None) => UserAction::Vote(true),
        ("down", None) => UserAction::Vote(false),
        ("ceval", None) => UserAction::ToggleCeval,
        ("threat", None) => UserAction::ToggleThreatMode,
        ("best", None) => UserAction::PlayBestMove,
        ("refresh", None) => UserAction::VisibilityChanged,
        ("quit" | "exit", None) => UserAction::Quit,
        ("q", None) => UserAction::Promote(Role::Queen),
        ("r", None) => UserAction::Promote(Role::Rook),
        ("b", None) => UserAction::Promote(Role::Bishop),
        ("n", None) => UserAction::Promote(Role::Knight),
        ("cancel", None) => UserAction::CancelPromotion,
        ("jump", Some(path)) => UserAction::Jump(TreePath::parse(path).ok()?),
        ("premove", Some(uci)) => {
            let m = decompose_uci(uci).ok()?;
            UserAction::Premove {
                orig: m.orig,
                dest: m.dest,
            }
        }
        (uci, None) => {
            let m = decompose_uci(uci).ok()?;
            if m.promotion.is_some() {
                UserAction::PlayUci(m.to_uci())
            } else {
                UserAction::Move {
                    orig: m.orig,
                    dest: m.dest,
                    capture: false,
                }
            }
        }
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Square;

    #[test]
    fn test_parse_moves() {
        assert_eq!(
            parse_command("e2e4"),
            Some(UserAction::Move {
                orig: Square::E2,
                dest: Square::E4,
                capture: false
            })
        );
        assert_eq!(parse_command("e7e8q"), Some(UserAction::PlayUci("e7e8q".into())));
        assert_eq!(
            parse_command("premove g1f3"),
            Some(UserAction::Premove {
                orig: Square::G1,
                dest: Square::F3
            })
        );
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_command("  solution "), Some(UserAction::ViewSolution));
        assert_eq!(parse_command("down"), Some(UserAction::Vote(false)));
        assert_eq!(parse_command("quit"), Some(UserAction::Quit));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command("prev now"), None);
    }

    #[test]
    fn test_parse_promotion_answers() {
        assert_eq!(parse_command("q"), Some(UserAction::Promote(Role::Queen)));
        assert_eq!(parse_command(" n "), Some(UserAction::Promote(Role::Knight)));
        assert_eq!(parse_command("cancel"), Some(UserAction::CancelPromotion));
        assert_eq!(parse_command("k"), None);
    }
}
