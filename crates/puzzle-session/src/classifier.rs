//! Checks the moves played since the puzzle start against the solution.

use puzzle_core::uci::{normalize_castle, played_by, san_is_castle};
use puzzle_core::{GameNode, PuzzleTag, TreePath};
use shakmaty::Color;

use crate::state::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Fail,
    Retry,
    Win,
    /// Correct so far; the opponent answers with this UCI move.
    ContinueWith(String),
}

/// Verdict plus the tag the controller should write on the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,
    pub tag: Option<PuzzleTag>,
}

#[derive(Debug, Clone)]
pub struct PuzzleClassifier {
    solution: Vec<String>,
    color: Color,
}

impl PuzzleClassifier {
    pub fn new(solution: Vec<String>, color: Color) -> Self {
        Self { solution, color }
    }

    pub fn solution(&self) -> &[String] {
        &self.solution
    }

    /// Classify the node at the end of `nodes` (root first, ending at `path`).
    /// Returns `None` when no verdict applies.
    pub fn classify(
        &self,
        mode: Mode,
        path: &TreePath,
        initial_path: &TreePath,
        nodes: &[&GameNode],
    ) -> Option<Outcome> {
        if mode == Mode::View || !path.contains(initial_path) {
            return None;
        }
        let segment = nodes.get(initial_path.size() + 1..)?;
        let last = segment.last()?;
        let by_user = played_by(last.ply) == self.color;

        for (i, node) in segment.iter().enumerate() {
            let played = played_uci(node);
            let expected = self.solution.get(i).map(String::as_str);
            if expected != Some(played) {
                let verdict = if PuzzleTag::sorts_last(node.puzzle) {
                    Verdict::Retry
                } else {
                    Verdict::Fail
                };
                // A diverging opponent move never happens through the
                // scheduled reply; only the user's moves are judged.
                if !by_user {
                    return None;
                }
                let tag = match verdict {
                    Verdict::Retry => PuzzleTag::Retry,
                    _ => PuzzleTag::Fail,
                };
                return Some(Outcome {
                    verdict,
                    tag: Some(tag),
                });
            }
        }

        if segment.len() >= self.solution.len() {
            return Some(Outcome {
                verdict: Verdict::Win,
                tag: by_user.then_some(PuzzleTag::Good),
            });
        }
        if !by_user {
            return None;
        }
        Some(Outcome {
            verdict: Verdict::ContinueWith(self.solution[segment.len()].clone()),
            tag: Some(PuzzleTag::Good),
        })
    }
}

fn played_uci(node: &GameNode) -> &str {
    let uci = node.uci.as_deref().unwrap_or_default();
    match node.san.as_deref() {
        Some(san) if san_is_castle(san) => normalize_castle(uci),
        _ => uci,
    }
}
