//! Tree addressing.
//!
//! Every node carries a two-character id derived from the move that reached
//! it; a path is the concatenation of ids from the root. Ids are compared by
//! identity, so a path stays valid when siblings are reordered.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TreeError;

/// Two-character node identifier. The root uses the empty id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id of the root node.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Build an id from exactly two characters (or none, for the root).
    pub fn new(id: impl Into<String>) -> Result<Self, TreeError> {
        let id = id.into();
        match id.chars().count() {
            0 | 2 => Ok(Self(id)),
            _ => Err(TreeError::InvalidNodeId(id)),
        }
    }

    pub(crate) fn from_chars(a: char, b: char) -> Self {
        let mut s = String::with_capacity(2);
        s.push(a);
        s.push(b);
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a node: the ids along the way from the root, concatenated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(String);

impl TreePath {
    /// The root path (empty).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse a path, checking that it splits into whole ids.
    pub fn parse(path: &str) -> Result<Self, TreeError> {
        if path.chars().count() % 2 != 0 {
            return Err(TreeError::InvalidNodeId(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    /// Path built from a root-to-node list.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a NodeId>) -> Self {
        Self(ids.into_iter().map(NodeId::as_str).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of ids (the depth of the addressed node).
    pub fn size(&self) -> usize {
        self.0.chars().count() / 2
    }

    /// Child path reached through `id`.
    pub fn join(&self, id: &NodeId) -> Self {
        let mut s = String::with_capacity(self.0.len() + id.0.len());
        s.push_str(&self.0);
        s.push_str(&id.0);
        Self(s)
    }

    /// Parent path. The root is its own parent.
    pub fn init(&self) -> Self {
        let mut ids: Vec<NodeId> = self.ids().collect();
        ids.pop();
        Self::from_ids(&ids)
    }

    /// Last id of the path, `None` at the root.
    pub fn last(&self) -> Option<NodeId> {
        self.ids().last()
    }

    /// Iterate over the ids from the root down.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        let chars: Vec<char> = self.0.chars().collect();
        (0..chars.len() / 2).map(move |i| NodeId::from_chars(chars[i * 2], chars[i * 2 + 1]))
    }

    /// True when `other` is a prefix of (or equal to) this path.
    pub fn contains(&self, other: &TreePath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Prefix made of the first `n` ids.
    pub fn take(&self, n: usize) -> Self {
        let ids: Vec<NodeId> = self.ids().take(n).collect();
        Self::from_ids(&ids)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn test_join_and_init() {
        let p = TreePath::root().join(&id("ab")).join(&id("cd"));
        assert_eq!(p.as_str(), "abcd");
        assert_eq!(p.size(), 2);
        assert_eq!(p.init().as_str(), "ab");
        assert_eq!(p.init().init(), TreePath::root());
        assert_eq!(TreePath::root().init(), TreePath::root());
        assert_eq!(p.last(), Some(id("cd")));
    }

    #[test]
    fn test_contains_is_prefix() {
        let a = TreePath::parse("ab").unwrap();
        let abcd = TreePath::parse("abcd").unwrap();
        assert!(abcd.contains(&a));
        assert!(abcd.contains(&abcd));
        assert!(!a.contains(&abcd));
        assert!(a.contains(&TreePath::root()));
    }

    #[test]
    fn test_multibyte_ids() {
        // promotion ids can go past ASCII
        let p = TreePath::root().join(&NodeId::from_chars('a', '\u{82}'));
        assert_eq!(p.size(), 1);
        assert_eq!(p.init(), TreePath::root());
    }

    #[test]
    fn test_rejects_odd_lengths() {
        assert!(NodeId::new("abc").is_err());
        assert!(TreePath::parse("abc").is_err());
    }
}
