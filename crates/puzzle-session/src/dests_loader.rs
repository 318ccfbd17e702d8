//! Lazy legal-destination loading.

use std::collections::HashMap;
use std::time::Duration;

use puzzle_core::{MoveTree, TreePath};
use tokio::time::Instant;
use tracing::debug;

use crate::collaborators::{DestsReply, DestsRequest};
use crate::throttle::{Admission, Throttle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestsDecision {
    Send(DestsRequest),
    /// Throttled; run [`DestsLoader::fire_pending`] at this instant.
    Defer(Instant),
    Skip,
}

#[derive(Debug)]
pub struct DestsLoader {
    throttle: Throttle,
    window: Duration,
    in_flight: HashMap<TreePath, Instant>,
}

impl DestsLoader {
    pub fn new(window: Duration) -> Self {
        Self {
            throttle: Throttle::new(window),
            window,
            in_flight: HashMap::new(),
        }
    }

    fn build(
        &mut self,
        tree: &MoveTree,
        path: &TreePath,
        initial_path: &TreePath,
        now: Instant,
    ) -> Option<DestsRequest> {
        if !path.contains(initial_path) {
            return None;
        }
        let node = tree.node_at(path).ok()?;
        if node.dests.is_some() {
            return None;
        }
        if let Some(sent) = self.in_flight.get(path) {
            if now < *sent + self.window {
                return None;
            }
        }
        Some(DestsRequest {
            fen: node.fen.clone(),
            path: path.clone(),
        })
    }

    /// Decide whether dests for `path` should be requested now.
    pub fn request(
        &mut self,
        tree: &MoveTree,
        path: &TreePath,
        initial_path: &TreePath,
        now: Instant,
    ) -> DestsDecision {
        if self.build(tree, path, initial_path, now).is_none() {
            return DestsDecision::Skip;
        }
        match self.throttle.admit(now) {
            Admission::Now => match self.build(tree, path, initial_path, now) {
                Some(req) => {
                    self.in_flight.insert(path.clone(), now);
                    debug!(path = %req.path, "requesting dests");
                    DestsDecision::Send(req)
                }
                None => DestsDecision::Skip,
            },
            Admission::Deferred(at) => DestsDecision::Defer(at),
            Admission::Coalesced => DestsDecision::Skip,
        }
    }

    /// Trailing call: re-evaluate against the (possibly changed) current path.
    pub fn fire_pending(
        &mut self,
        tree: &MoveTree,
        path: &TreePath,
        initial_path: &TreePath,
        now: Instant,
    ) -> Option<DestsRequest> {
        if !self.throttle.fire_pending(now) {
            return None;
        }
        let req = self.build(tree, path, initial_path, now)?;
        self.in_flight.insert(path.clone(), now);
        debug!(path = %req.path, "requesting dests (trailing)");
        Some(req)
    }

    /// Store a reply. Returns false when the path no longer resolves.
    pub fn merge(&mut self, tree: &mut MoveTree, reply: DestsReply) -> bool {
        self.in_flight.remove(&reply.path);
        tree.add_dests(&reply.path, reply.dests, reply.opening)
    }

    pub fn reset(&mut self) {
        self.throttle.reset();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_core::uci::node_id;
    use puzzle_core::{Dests, GameNode};

    const MS: Duration = Duration::from_millis(1);

    fn tree() -> (MoveTree, TreePath) {
        let mut tree = MoveTree::new(GameNode::root("root", 0));
        let mut child = GameNode::root("after-e4", 1);
        child.id = node_id("e2e4").unwrap();
        child.uci = Some("e2e4".into());
        let path = tree.add_node(child, &TreePath::root()).unwrap();
        (tree, path)
    }

    #[test]
    fn test_requests_once_per_window() {
        let (tree, path) = tree();
        let initial = TreePath::root();
        let mut loader = DestsLoader::new(800 * MS);
        let now = Instant::now();
        match loader.request(&tree, &path, &initial, now) {
            DestsDecision::Send(req) => assert_eq!(req.fen, "after-e4"),
            other => panic!("unexpected {other:?}"),
        }
        // same path in flight: no duplicate even after the throttle window
        assert_eq!(loader.request(&tree, &path, &initial, now + 10 * MS), DestsDecision::Skip);
    }

    #[test]
    fn test_skips_known_dests_and_paths_before_start() {
        let (mut tree, path) = tree();
        let mut loader = DestsLoader::new(800 * MS);
        let now = Instant::now();
        assert_eq!(loader.request(&tree, &TreePath::root(), &path, now), DestsDecision::Skip);

        tree.add_dests(&path, Dests::default(), None);
        assert_eq!(loader.request(&tree, &path, &TreePath::root(), now), DestsDecision::Skip);
    }

    #[test]
    fn test_throttled_request_is_deferred_and_fired() {
        let (tree, path) = tree();
        let root = TreePath::root();
        let mut loader = DestsLoader::new(800 * MS);
        let now = Instant::now();
        assert!(matches!(loader.request(&tree, &root, &root, now), DestsDecision::Send(_)));
        assert_eq!(
            loader.request(&tree, &path, &root, now + 100 * MS),
            DestsDecision::Defer(now + 800 * MS)
        );
        let req = loader.fire_pending(&tree, &path, &root, now + 800 * MS).unwrap();
        assert_eq!(req.path, path);
        assert!(loader.fire_pending(&tree, &path, &root, now + 900 * MS).is_none());
    }

    #[test]
    fn test_merge_into_stale_path() {
        let (mut tree, _) = tree();
        let mut loader = DestsLoader::new(800 * MS);
        let stale = TreePath::parse("zzzz").unwrap();
        let reply = DestsReply {
            path: stale,
            dests: Dests::default(),
            opening: None,
        };
        assert!(!loader.merge(&mut tree, reply));
    }
}
