#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use puzzle_core::puzzle::{PuzzleData, PuzzleGame, PuzzlePayload, Round, RoundResponse, VoteResponse};
use puzzle_core::uci::decompose_uci;
use puzzle_core::{GameNode, TreePath};
use puzzle_session::ceval::{EvalOpts, EvalWork, Evaluator, EvaluatorFactory};
use puzzle_session::oracle::play_move;
use puzzle_session::{
    Collaborators, InboxSender, Inbound, LocalOracle, MemoryPreferences, MoveRequest, PuzzleApi,
    SessionConfig, SessionController, SessionError, SessionEvent,
};
use shakmaty::Color;
use tokio::sync::mpsc;

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Node reached by playing `uci` from `fen`, without dests (as delivered by
/// the puzzle API).
pub fn node_after(fen: &str, uci: &str) -> GameNode {
    let m = decompose_uci(uci).unwrap_or_else(|e| panic!("bad uci {uci}: {e}"));
    let mut node = play_move(&MoveRequest {
        orig: m.orig,
        dest: m.dest,
        promotion: m.promotion,
        fen: fen.to_string(),
        path: TreePath::root(),
    })
    .unwrap_or_else(|e| panic!("illegal {uci}: {e}"));
    node.dests = None;
    node
}

/// Puzzle starting from the initial position after `setup` moves, with the
/// solver playing `color` and the given solution line.
pub fn payload(id: &str, setup: &[&str], solution: &[&str], color: Color) -> PuzzlePayload {
    let mut parts = vec![GameNode::root(START, 0)];
    for uci in setup {
        let fen = parts.last().map(|n| n.fen.clone()).unwrap_or_default();
        parts.push(node_after(&fen, uci));
    }

    let mut fen = parts.last().map(|n| n.fen.clone()).unwrap_or_default();
    let mut line = Vec::new();
    for uci in solution {
        let node = node_after(&fen, uci);
        fen = node.fen.clone();
        line.push(node);
    }
    let mut branch = line.pop().expect("empty solution");
    while let Some(mut parent) = line.pop() {
        parent.children.push(branch);
        branch = parent;
    }

    PuzzlePayload {
        game: PuzzleGame { tree_parts: parts },
        puzzle: PuzzleData {
            id: id.to_string(),
            color,
            branch,
            vote: 0,
            rating: Some(1500),
        },
        user: None,
    }
}

/// 1.Nf3 Nc6 setup; white solves with e4, black answers e5.
pub fn short_puzzle() -> PuzzlePayload {
    payload("short", &["g1f3", "b8c6"], &["e2e4", "e7e5"], Color::White)
}

/// Same setup with a longer line: e4 e5 d4.
pub fn long_puzzle() -> PuzzlePayload {
    payload("long", &["g1f3", "b8c6"], &["e2e4", "e7e5", "d2d4"], Color::White)
}

// ---------------------------------------------------------------------------
// Fake puzzle API
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeApi {
    pub rounds: Mutex<Vec<(String, bool)>>,
    pub votes: Mutex<Vec<(String, bool)>>,
    pub puzzles: Mutex<Vec<PuzzlePayload>>,
    /// Delay before round and vote replies resolve.
    pub latency: Mutex<Duration>,
}

impl FakeApi {
    fn delayed<T: Send + 'static>(&self, value: T) -> BoxFuture<'static, Result<T, SessionError>> {
        let latency = *self.latency.lock().unwrap();
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(value)
        }
        .boxed()
    }
}

impl PuzzleApi for FakeApi {
    fn submit_round(
        &self,
        puzzle_id: &str,
        win: bool,
    ) -> BoxFuture<'static, Result<RoundResponse, SessionError>> {
        self.rounds.lock().unwrap().push((puzzle_id.to_string(), win));
        let response = RoundResponse {
            user: None,
            round: Some(Round {
                rating_diff: if win { 8 } else { -8 },
                win,
            }),
            voted: None,
        };
        self.delayed(response)
    }

    fn next_puzzle(&self) -> BoxFuture<'static, Result<PuzzlePayload, SessionError>> {
        let next = self.puzzles.lock().unwrap().pop();
        async move { next.ok_or_else(|| SessionError::Api("no more puzzles".into())) }.boxed()
    }

    fn vote(&self, puzzle_id: &str, up: bool) -> BoxFuture<'static, Result<VoteResponse, SessionError>> {
        self.votes.lock().unwrap().push((puzzle_id.to_string(), up));
        let vote = if up { 1 } else { -1 };
        self.delayed(VoteResponse { vote })
    }
}

// ---------------------------------------------------------------------------
// Fake evaluator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Created { failsafe: bool },
    Start { path: TreePath, threat_mode: bool },
    Stop,
    Destroy,
}

pub type EngineLog = Arc<Mutex<Vec<EngineCall>>>;

struct FakeEvaluator(EngineLog);

impl Evaluator for FakeEvaluator {
    fn start(&mut self, work: EvalWork) {
        self.0.lock().unwrap().push(EngineCall::Start {
            path: work.path,
            threat_mode: work.threat_mode,
        });
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().push(EngineCall::Stop);
    }

    fn destroy(&mut self) {
        self.0.lock().unwrap().push(EngineCall::Destroy);
    }
}

pub struct FakeEvaluatorFactory(pub EngineLog);

impl EvaluatorFactory for FakeEvaluatorFactory {
    fn create(&self, opts: &EvalOpts, _inbox: InboxSender) -> Box<dyn Evaluator> {
        self.0.lock().unwrap().push(EngineCall::Created {
            failsafe: opts.failsafe,
        });
        Box::new(FakeEvaluator(self.0.clone()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub ctrl: SessionController,
    pub inbox: mpsc::UnboundedReceiver<Inbound>,
    pub inbox_tx: InboxSender,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub api: Arc<FakeApi>,
    pub engine: EngineLog,
    pub config: SessionConfig,
}

impl Harness {
    pub fn new(payload: PuzzlePayload) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let api = Arc::new(FakeApi::default());
        let engine: EngineLog = Arc::default();
        let config = SessionConfig::default();
        let collaborators = Collaborators {
            oracle: Box::new(LocalOracle::new(inbox_tx.clone())),
            api: api.clone(),
            evaluators: Box::new(FakeEvaluatorFactory(engine.clone())),
            preferences: Arc::new(MemoryPreferences::default()),
            inbox: inbox_tx.clone(),
            events: events_tx,
        };
        let ctrl = SessionController::new(payload, collaborators, config.clone())
            .expect("valid payload");
        Self {
            ctrl,
            inbox,
            inbox_tx,
            events,
            api,
            engine,
            config,
        }
    }

    /// Deliver every queued reply, including ones produced while handling.
    pub fn pump(&mut self) {
        while let Ok(msg) = self.inbox.try_recv() {
            self.ctrl.handle(msg);
        }
    }

    /// Let spawned API tasks finish, then deliver their replies.
    pub async fn settle(&mut self) {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        self.pump();
    }

    /// Move the clock forward and run whatever became due.
    pub async fn advance(&mut self, by: Duration) {
        tokio::time::advance(by).await;
        self.ctrl.run_due();
        self.pump();
    }

    /// Wait out the initial jump and load the first dests.
    pub async fn start(&mut self) {
        let delay = self.config.initial_jump_delay;
        self.advance(delay).await;
    }

    pub fn play(&mut self, uci: &str) {
        let m = decompose_uci(uci).expect("valid uci");
        self.ctrl.user_move(m.orig, m.dest, false);
        self.pump();
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }

    pub fn engine_calls(&self) -> Vec<EngineCall> {
        self.engine.lock().unwrap().clone()
    }

    pub fn rounds(&self) -> Vec<(String, bool)> {
        self.api.rounds.lock().unwrap().clone()
    }

    pub fn current_uci(&self) -> Option<String> {
        self.ctrl.node().uci.clone()
    }
}
