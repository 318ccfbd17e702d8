//! Game tree node.

use serde::{Deserialize, Serialize};

use crate::dests::Dests;
use crate::eval::ClientEval;
use crate::path::NodeId;

/// Outcome tag written on nodes checked against the solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleTag {
    Good,
    Fail,
    Retry,
}

impl PuzzleTag {
    /// Fail and retry branches sort after everything else.
    pub fn sorts_last(tag: Option<PuzzleTag>) -> bool {
        matches!(tag, Some(PuzzleTag::Fail | PuzzleTag::Retry))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub eco: String,
    pub name: String,
}

/// One ply of the puzzle tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameNode {
    #[serde(default)]
    pub id: NodeId,
    pub ply: u32,
    pub fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uci: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dests: Option<Dests>,
    #[serde(default)]
    pub check: bool,
    #[serde(default)]
    pub children: Vec<GameNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle: Option<PuzzleTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceval: Option<ClientEval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat: Option<ClientEval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<Opening>,
}

impl GameNode {
    /// Root node for a position.
    pub fn root(fen: impl Into<String>, ply: u32) -> Self {
        Self {
            id: NodeId::root(),
            ply,
            fen: fen.into(),
            uci: None,
            san: None,
            dests: None,
            check: false,
            children: Vec::new(),
            puzzle: None,
            ceval: None,
            threat: None,
            opening: None,
        }
    }

    pub fn child(&self, id: &NodeId) -> Option<&GameNode> {
        self.children.iter().find(|c| &c.id == id)
    }

    pub fn child_mut(&mut self, id: &NodeId) -> Option<&mut GameNode> {
        self.children.iter_mut().find(|c| &c.id == id)
    }

    /// Main line continuation.
    pub fn mainline_child(&self) -> Option<&GameNode> {
        self.children.first()
    }

    /// Dests are known and empty.
    pub fn is_terminal(&self) -> bool {
        self.dests.as_ref().is_some_and(Dests::is_empty)
    }
}
