//! Puzzle tree data model: paths, nodes, evaluation records and the
//! path-addressed move tree shared by the session engine.

pub mod dests;
pub mod error;
pub mod eval;
pub mod node;
pub mod path;
pub mod puzzle;
pub mod tree;
pub mod uci;

pub use dests::Dests;
pub use error::TreeError;
pub use eval::{ClientEval, PvLine};
pub use node::{GameNode, Opening, PuzzleTag};
pub use path::{NodeId, TreePath};
pub use tree::MoveTree;
