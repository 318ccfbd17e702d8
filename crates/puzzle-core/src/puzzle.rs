//! Puzzle payload and solution handling.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shakmaty::Color;

use crate::error::TreeError;
use crate::node::{GameNode, PuzzleTag};
use crate::path::TreePath;
use crate::tree::MoveTree;
use crate::uci::played_by;

/// Everything needed to start a puzzle session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzlePayload {
    pub game: PuzzleGame,
    pub puzzle: PuzzleData,
    #[serde(default)]
    pub user: Option<UserData>,
}

/// Moves played before the puzzle starts, root first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleGame {
    pub tree_parts: Vec<GameNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleData {
    pub id: String,
    /// Side the solver plays.
    #[serde(with = "color_name")]
    pub color: Color,
    /// Solution line, rooted at the first solver move.
    pub branch: GameNode,
    #[serde(default)]
    pub vote: i32,
    #[serde(default)]
    pub rating: Option<i32>,
}

impl PuzzleData {
    /// UCI moves of the solution, following the first child at each step.
    pub fn solution_line(&self) -> Vec<String> {
        let mut line = Vec::new();
        let mut node = Some(&self.branch);
        while let Some(n) = node {
            match &n.uci {
                Some(uci) => line.push(uci.clone()),
                None => break,
            }
            node = n.mainline_child();
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub rating: i32,
    /// Recent rounds as (puzzle id, rating diff, rating).
    #[serde(default)]
    pub recent: Vec<(String, i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub rating_diff: i32,
    pub win: bool,
}

/// Reply to a result submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResponse {
    #[serde(default)]
    pub user: Option<UserData>,
    #[serde(default)]
    pub round: Option<Round>,
    #[serde(default)]
    pub voted: Option<bool>,
}

/// Reply to a vote: the updated tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub vote: i32,
}

/// Merge the solution branch under `initial_path`, tagging the solver's
/// moves as good.
pub fn merge_solution(
    tree: &mut MoveTree,
    initial_path: &TreePath,
    branch: &GameNode,
    color: Color,
) -> Result<TreePath, TreeError> {
    let mut solution = branch.clone();
    tag_solver_moves(&mut solution, color);
    tree.merge_at(solution, initial_path)
}

fn tag_solver_moves(node: &mut GameNode, color: Color) {
    if played_by(node.ply) == color {
        node.puzzle = Some(PuzzleTag::Good);
    }
    for child in &mut node.children {
        tag_solver_moves(child, color);
    }
}

mod color_name {
    use super::*;

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(match color {
            Color::White => "white",
            Color::Black => "black",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        match String::deserialize(d)?.as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(serde::de::Error::custom(format!("unknown color: {other}"))),
        }
    }
}
