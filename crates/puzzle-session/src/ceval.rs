//! Local evaluation coordinator.
//!
//! Wraps an external evaluator that streams results for a path. Results are
//! merged into the tree by path with the depth rule from
//! [`ClientEval::accepts`]; results for paths that no longer exist are dropped.

use puzzle_core::{ClientEval, GameNode, MoveTree, TreePath};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::collaborators::InboxSender;
use crate::config::SessionConfig;
use crate::throttle::{Admission, Throttle};

/// Settings an evaluator is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOpts {
    pub multi_pv: u32,
    pub max_depth: u32,
    pub variant: String,
    /// Engine availability on this host.
    pub possible: bool,
    /// Reduced-capability mode used after a crash.
    pub failsafe: bool,
}

/// One analysis job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalWork {
    pub path: TreePath,
    pub initial_fen: String,
    /// UCI moves from the initial position to the analysed node.
    pub moves: Vec<String>,
    pub current_fen: String,
    pub ply: u32,
    pub threat_mode: bool,
    pub multi_pv: u32,
    pub max_depth: u32,
}

impl EvalWork {
    /// Build a job from the root-to-node list of the analysed path.
    pub fn from_nodes(
        path: TreePath,
        nodes: &[&GameNode],
        threat_mode: bool,
        opts: &EvalOpts,
    ) -> Option<Self> {
        let first = nodes.first()?;
        let last = nodes.last()?;
        Some(Self {
            path,
            initial_fen: first.fen.clone(),
            moves: nodes.iter().skip(1).filter_map(|n| n.uci.clone()).collect(),
            current_fen: last.fen.clone(),
            ply: last.ply,
            threat_mode,
            multi_pv: if threat_mode { 1 } else { opts.multi_pv },
            max_depth: opts.max_depth,
        })
    }
}

/// A streamed result.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalEvent {
    pub path: TreePath,
    pub threat_mode: bool,
    pub eval: ClientEval,
}

pub trait Evaluator: Send {
    fn start(&mut self, work: EvalWork);
    fn stop(&mut self);
    fn destroy(&mut self);
}

/// Creates evaluators; results and crashes are posted to the given inbox.
pub trait EvaluatorFactory: Send {
    fn create(&self, opts: &EvalOpts, inbox: InboxSender) -> Box<dyn Evaluator>;

    /// Whether a failsafe instance can be created after a crash.
    fn supports_failsafe(&self) -> bool {
        true
    }
}

pub struct CevalCoordinator {
    factory: Box<dyn EvaluatorFactory>,
    inbox: InboxSender,
    evaluator: Option<Box<dyn Evaluator>>,
    opts: EvalOpts,
    enabled: bool,
    running: bool,
    throttle: Throttle,
}

impl CevalCoordinator {
    pub fn new(factory: Box<dyn EvaluatorFactory>, inbox: InboxSender, config: &SessionConfig) -> Self {
        let opts = EvalOpts {
            multi_pv: config.multi_pv,
            max_depth: config.max_depth,
            variant: "standard".to_string(),
            possible: true,
            failsafe: false,
        };
        let mut coordinator = Self {
            factory,
            inbox,
            evaluator: None,
            opts,
            enabled: config.ceval_enabled,
            running: false,
            throttle: Throttle::new(config.ceval_throttle),
        };
        coordinator.instantiate(false);
        coordinator
    }

    /// Replace the evaluator with a fresh one.
    pub fn instantiate(&mut self, failsafe: bool) {
        self.destroy();
        self.opts.failsafe = failsafe;
        self.evaluator = Some(self.factory.create(&self.opts, self.inbox.clone()));
    }

    pub fn opts(&self) -> &EvalOpts {
        &self.opts
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_failsafe(&self) -> bool {
        self.opts.failsafe
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.stop();
        }
    }

    /// Throttle gate for starts.
    pub fn admit_start(&mut self, now: Instant) -> Admission {
        self.throttle.admit(now)
    }

    pub fn fire_pending_start(&mut self, now: Instant) -> bool {
        self.throttle.fire_pending(now)
    }

    pub fn start(&mut self, work: EvalWork) {
        if !self.enabled || !self.opts.possible {
            return;
        }
        if let Some(evaluator) = self.evaluator.as_mut() {
            debug!(path = %work.path, threat = work.threat_mode, "ceval start");
            evaluator.start(work);
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        if let Some(evaluator) = self.evaluator.as_mut() {
            evaluator.stop();
        }
        self.running = false;
    }

    pub fn destroy(&mut self) {
        if let Some(mut evaluator) = self.evaluator.take() {
            evaluator.destroy();
        }
        self.running = false;
    }

    /// Handle an evaluator crash. Returns true when a failsafe instance was
    /// created and the caller should restart analysis.
    pub fn on_crash(&mut self, reason: &str) -> bool {
        warn!(reason, "Local eval failed");
        self.running = false;
        if self.opts.failsafe || !self.factory.supports_failsafe() {
            warn!("Local eval not recoverable");
            return false;
        }
        warn!("Retrying in failsafe mode");
        self.instantiate(true);
        true
    }
}

/// Merge a streamed result into its node. Returns true when it was stored.
/// Results for another position at the same path are dropped.
pub fn merge_eval(tree: &mut MoveTree, event: &EvalEvent) -> bool {
    let mut stored = false;
    tree.update_at(&event.path, |node| {
        if board_part(&node.fen) != board_part(&event.eval.fen) {
            return;
        }
        let slot = if event.threat_mode {
            &mut node.threat
        } else {
            &mut node.ceval
        };
        if ClientEval::accepts(slot.as_ref(), &event.eval) {
            *slot = Some(event.eval.clone());
            stored = true;
        }
    });
    stored
}

/// Piece placement field of a fen. Threat searches flip the side to move,
/// so only the placement is compared.
fn board_part(fen: &str) -> &str {
    fen.split(' ').next().unwrap_or(fen)
}
