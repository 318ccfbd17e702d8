//! Path-addressed, append-only move tree.
//!
//! Nodes are only ever added. Lookups walk child ids from the root, so they
//! cost O(depth) and survive sibling reordering. Mutations requested by
//! asynchronous replies go through [`MoveTree::update_at`], which quietly does
//! nothing when the path is gone.

use crate::dests::Dests;
use crate::error::TreeError;
use crate::node::{GameNode, Opening, PuzzleTag};
use crate::path::TreePath;

#[derive(Debug, Clone, PartialEq)]
pub struct MoveTree {
    root: GameNode,
}

impl MoveTree {
    pub fn new(root: GameNode) -> Self {
        Self { root }
    }

    /// Rebuild a single line from the payload's node list (root first).
    pub fn reconstruct(parts: Vec<GameNode>) -> Result<Self, TreeError> {
        let mut rev = parts.into_iter().rev();
        let mut node = rev.next().ok_or(TreeError::EmptyTree)?;
        for mut parent in rev {
            parent.children.insert(0, node);
            node = parent;
        }
        Ok(Self { root: node })
    }

    pub fn root(&self) -> &GameNode {
        &self.root
    }

    pub fn node_at(&self, path: &TreePath) -> Result<&GameNode, TreeError> {
        let mut node = &self.root;
        for id in path.ids() {
            node = node
                .child(&id)
                .ok_or_else(|| TreeError::PathNotFound(path.clone()))?;
        }
        Ok(node)
    }

    fn node_at_mut(&mut self, path: &TreePath) -> Option<&mut GameNode> {
        let mut node = &mut self.root;
        for id in path.ids() {
            node = node.child_mut(&id)?;
        }
        Some(node)
    }

    pub fn contains_path(&self, path: &TreePath) -> bool {
        self.node_at(path).is_ok()
    }

    /// Nodes from the root down to `path`, inclusive.
    pub fn node_list(&self, path: &TreePath) -> Result<Vec<&GameNode>, TreeError> {
        let mut node = &self.root;
        let mut list = vec![node];
        for id in path.ids() {
            node = node
                .child(&id)
                .ok_or_else(|| TreeError::PathNotFound(path.clone()))?;
            list.push(node);
        }
        Ok(list)
    }

    /// Append `node` under the node at `at` and return the child's path.
    ///
    /// A child reached by the same move is reused instead of duplicated; its
    /// missing dests are filled from the incoming node. Reuse with a
    /// different position is rejected.
    pub fn add_node(&mut self, node: GameNode, at: &TreePath) -> Result<TreePath, TreeError> {
        let child_path = at.join(&node.id);
        let parent = self
            .node_at_mut(at)
            .ok_or_else(|| TreeError::PathNotFound(at.clone()))?;
        match parent.child_mut(&node.id) {
            Some(existing) => {
                if existing.fen != node.fen {
                    return Err(TreeError::PositionMismatch {
                        path: at.clone(),
                        id: node.id.to_string(),
                    });
                }
                if existing.dests.is_none() {
                    existing.dests = node.dests;
                }
            }
            None => parent.children.push(node),
        }
        Ok(child_path)
    }

    /// Apply `f` to the node at `path`. Returns false (and does nothing) when
    /// the path does not resolve.
    pub fn update_at<F>(&mut self, path: &TreePath, f: F) -> bool
    where
        F: FnOnce(&mut GameNode),
    {
        match self.node_at_mut(path) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    pub fn add_dests(&mut self, path: &TreePath, dests: Dests, opening: Option<Opening>) -> bool {
        self.update_at(path, |node| {
            node.dests = Some(dests);
            if opening.is_some() {
                node.opening = opening;
            }
        })
    }

    /// Path obtained by following the first child from the root.
    pub fn mainline_path(&self) -> TreePath {
        self.mainline_path_while(|_| true)
    }

    /// Mainline nodes, root included.
    pub fn mainline_nodes(&self) -> Vec<&GameNode> {
        let mut nodes = vec![&self.root];
        let mut node = &self.root;
        while let Some(child) = node.mainline_child() {
            nodes.push(child);
            node = child;
        }
        nodes
    }

    /// Longest mainline prefix whose nodes (after the root) satisfy `pred`.
    pub fn mainline_path_while<P>(&self, pred: P) -> TreePath
    where
        P: Fn(&GameNode) -> bool,
    {
        let nodes = self.mainline_nodes();
        let ids = nodes
            .iter()
            .skip(1)
            .take_while(|n| pred(n))
            .map(|n| &n.id);
        TreePath::from_ids(ids)
    }

    /// Stable-sort the children at `path` so fail/retry branches come last.
    pub fn reorder_children(&mut self, path: &TreePath, recursive: bool) -> bool {
        self.update_at(path, |node| reorder(node, recursive))
    }

    /// Merge `subtree` as a child of the node at `at`, recursively by id.
    /// Incoming puzzle tags win; dests only fill gaps.
    pub fn merge_at(&mut self, subtree: GameNode, at: &TreePath) -> Result<TreePath, TreeError> {
        let child_path = at.join(&subtree.id);
        let parent = self
            .node_at_mut(at)
            .ok_or_else(|| TreeError::PathNotFound(at.clone()))?;
        merge_child(parent, subtree);
        Ok(child_path)
    }
}

fn reorder(node: &mut GameNode, recursive: bool) {
    node.children
        .sort_by_key(|c| PuzzleTag::sorts_last(c.puzzle));
    if recursive {
        for child in &mut node.children {
            reorder(child, true);
        }
    }
}

fn merge_child(parent: &mut GameNode, incoming: GameNode) {
    match parent.child_mut(&incoming.id) {
        Some(existing) => {
            if incoming.puzzle.is_some() {
                existing.puzzle = incoming.puzzle;
            }
            if existing.dests.is_none() {
                existing.dests = incoming.dests;
            }
            for grandchild in incoming.children {
                merge_child(existing, grandchild);
            }
        }
        None => parent.children.push(incoming),
    }
}
