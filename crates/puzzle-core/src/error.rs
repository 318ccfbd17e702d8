//! Tree and notation error types

use thiserror::Error;

use crate::path::TreePath;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Path not found: {0:?}")]
    PathNotFound(TreePath),

    #[error("Tree has no root node")]
    EmptyTree,

    #[error("Node {id} at {path:?} already exists with a different position")]
    PositionMismatch { path: TreePath, id: String },

    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Invalid UCI move: {0}")]
    InvalidUci(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
}
