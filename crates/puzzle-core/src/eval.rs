//! Engine evaluation records stored on tree nodes.

use serde::{Deserialize, Serialize};

/// One principal variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvLine {
    /// Moves in UCI notation.
    pub moves: Vec<String>,
    /// Centipawns from white's point of view.
    pub cp: Option<i32>,
    /// Mate in N (positive = white mates).
    pub mate: Option<i32>,
}

/// Evaluation of a single position, as streamed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEval {
    pub fen: String,
    /// Depth reached so far.
    pub depth: u32,
    /// Depth the search is aiming for.
    pub max_depth: u32,
    pub nodes: u64,
    pub millis: u64,
    /// Lines ordered best first.
    pub pvs: Vec<PvLine>,
}

impl ClientEval {
    /// First move of the best line.
    pub fn best(&self) -> Option<&str> {
        self.pvs.first()?.moves.first().map(String::as_str)
    }

    pub fn cp(&self) -> Option<i32> {
        self.pvs.first()?.cp
    }

    pub fn mate(&self) -> Option<i32> {
        self.pvs.first()?.mate
    }

    /// Whether `incoming` may replace `stored`: neither the reached depth nor
    /// the target depth may go down.
    pub fn accepts(stored: Option<&ClientEval>, incoming: &ClientEval) -> bool {
        match stored {
            None => true,
            Some(s) => incoming.depth >= s.depth && incoming.max_depth >= s.max_depth,
        }
    }
}
