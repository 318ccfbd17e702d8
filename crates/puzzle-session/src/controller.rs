//! Puzzle session controller.
//!
//! Owns the move tree and the interaction state of one puzzle at a time.
//! Every method runs on the driver's timeline; collaborator replies come back
//! through [`SessionController::handle`] and delayed effects through
//! [`SessionController::run_due`].

use std::sync::Arc;

use futures::future::BoxFuture;
use puzzle_core::puzzle::{merge_solution, PuzzleData, PuzzlePayload, RoundResponse, UserData};
use puzzle_core::uci::{
    decompose_uci, last_move, position_from_fen, san_gives_check, san_is_capture, turn_at,
};
use puzzle_core::{Dests, GameNode, MoveTree, PuzzleTag, TreePath};
use shakmaty::{Position, Rank, Role, Square};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auto_shapes::{self, ShapeContext};
use crate::ceval::{merge_eval, CevalCoordinator, EvalEvent, EvalWork};
use crate::classifier::{Outcome, PuzzleClassifier, Verdict};
use crate::collaborators::{
    BoardConfig, Collaborators, DestsReply, EventSender, InboxSender, Inbound, MoveRequest,
    Oracle, Preferences, PuzzleApi, SessionEvent, Sound,
};
use crate::config::SessionConfig;
use crate::dests_loader::{DestsDecision, DestsLoader};
use crate::error::SessionError;
use crate::scheduler::{Scheduler, Task};
use crate::state::{Feedback, Mode, Premove, PromotionIntent, SessionState};
use crate::throttle::{Admission, Throttle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOver {
    Checkmate,
    Draw,
}

/// Per-puzzle data rebuilt on every load.
struct Loaded {
    tree: MoveTree,
    state: SessionState,
    puzzle: PuzzleData,
    user: Option<UserData>,
    classifier: PuzzleClassifier,
}

impl Loaded {
    fn from_payload(payload: PuzzlePayload) -> Result<Self, SessionError> {
        let tree = MoveTree::reconstruct(payload.game.tree_parts)?;
        let initial_path = tree.mainline_path();
        let mainline = initial_path.clone();
        let classifier =
            PuzzleClassifier::new(payload.puzzle.solution_line(), payload.puzzle.color);
        Ok(Self {
            tree,
            state: SessionState::new(initial_path, mainline),
            puzzle: payload.puzzle,
            user: payload.user,
            classifier,
        })
    }
}

pub struct SessionController {
    config: SessionConfig,
    tree: MoveTree,
    state: SessionState,
    puzzle: PuzzleData,
    user: Option<UserData>,
    classifier: PuzzleClassifier,
    dests: DestsLoader,
    ceval: CevalCoordinator,
    scheduler: Scheduler,
    vote_throttle: Throttle,
    pending_vote: Option<bool>,
    oracle: Box<dyn Oracle>,
    api: Arc<dyn PuzzleApi>,
    preferences: Arc<dyn Preferences>,
    inbox: InboxSender,
    events: EventSender,
}

impl SessionController {
    /// Build a controller and start a session on `payload`.
    pub fn new(
        payload: PuzzlePayload,
        collaborators: Collaborators,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let loaded = Loaded::from_payload(payload)?;
        let Collaborators {
            oracle,
            api,
            evaluators,
            preferences,
            inbox,
            events,
        } = collaborators;

        let mut controller = Self {
            dests: DestsLoader::new(config.dests_throttle),
            ceval: CevalCoordinator::new(evaluators, inbox.clone(), &config),
            scheduler: Scheduler::new(),
            vote_throttle: Throttle::new(config.vote_throttle),
            pending_vote: None,
            config,
            tree: loaded.tree,
            state: loaded.state,
            puzzle: loaded.puzzle,
            user: loaded.user,
            classifier: loaded.classifier,
            oracle,
            api,
            preferences,
            inbox,
            events,
        };
        controller.start_session();
        Ok(controller)
    }

    /// Replace the current puzzle. Pending tasks from the previous one are
    /// cancelled.
    pub fn initiate(&mut self, payload: PuzzlePayload) -> Result<(), SessionError> {
        let loaded = Loaded::from_payload(payload)?;
        self.tree = loaded.tree;
        self.state = loaded.state;
        self.puzzle = loaded.puzzle;
        self.user = loaded.user;
        self.classifier = loaded.classifier;
        self.start_session();
        Ok(())
    }

    fn start_session(&mut self) {
        let cancelled = self.scheduler.clear();
        if cancelled > 0 {
            debug!(cancelled, "Cancelled tasks from previous puzzle");
        }
        self.dests.reset();
        self.vote_throttle.reset();
        self.pending_vote = None;

        let now = Instant::now();
        self.scheduler
            .schedule(now + self.config.initial_jump_delay, Task::InitialJump);
        self.scheduler
            .schedule(now + self.config.solution_reveal_delay, Task::RevealSolution);

        self.emit(SessionEvent::AutoShapes(Vec::new()));
        self.show_ground();
        self.ceval.instantiate(false);

        info!(
            puzzle_id = %self.puzzle.id,
            initial_path = %self.state.initial_path,
            solution_len = self.classifier.solution().len(),
            "Puzzle loaded"
        );
    }

    /// Tear down the evaluator and drop pending tasks.
    pub fn shutdown(&mut self) {
        self.scheduler.clear();
        self.ceval.destroy();
    }

    // ---- accessors ----

    pub fn tree(&self) -> &MoveTree {
        &self.tree
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn puzzle(&self) -> &PuzzleData {
        &self.puzzle
    }

    pub fn user(&self) -> Option<&UserData> {
        self.user.as_ref()
    }

    pub fn ceval(&self) -> &CevalCoordinator {
        &self.ceval
    }

    pub fn threat_mode(&self) -> bool {
        self.state.threat_mode
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Node at the current path.
    pub fn node(&self) -> &GameNode {
        self.tree
            .node_at(&self.state.path)
            .unwrap_or_else(|_| self.tree.root())
    }

    fn initial_node(&self) -> &GameNode {
        self.tree
            .node_at(&self.state.initial_path)
            .unwrap_or_else(|_| self.tree.root())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn redraw(&self) {
        self.emit(SessionEvent::Redraw);
    }

    // ---- board ----

    /// Interactive board settings for the current node.
    pub fn board_config(&self) -> BoardConfig {
        let node = self.node();
        let color = turn_at(node.ply);
        let solver = self.puzzle.color;

        let (mut movable_color, dests) = if self.state.mode == Mode::View || color == solver {
            let dests = node.dests.clone().unwrap_or_default();
            ((!dests.is_empty()).then_some(color), dests)
        } else {
            (None, Dests::default())
        };
        let mut turn_color = color;
        let mut premovable = false;

        if node.ply >= self.initial_node().ply {
            if node.dests.is_none() && !node.check {
                // premove while dests are loading
                turn_color = !color;
                movable_color = Some(color);
                premovable = true;
            } else if self.state.mode != Mode::View && color != solver {
                movable_color = Some(solver);
                premovable = true;
            }
        }

        BoardConfig {
            fen: node.fen.clone(),
            orientation: solver,
            turn_color,
            movable_color,
            dests,
            premovable,
            check: node.check,
            last_move: last_move(node.uci.as_deref()),
        }
    }

    fn show_ground(&mut self) {
        self.emit(SessionEvent::Board(self.board_config()));
        if self.node().dests.is_none() {
            self.get_dests();
        }
    }

    fn get_dests(&mut self) {
        let now = Instant::now();
        match self
            .dests
            .request(&self.tree, &self.state.path, &self.state.initial_path, now)
        {
            DestsDecision::Send(req) => self.oracle.send_dests(req),
            DestsDecision::Defer(at) => self.scheduler.schedule(at, Task::FetchDests),
            DestsDecision::Skip => {}
        }
    }

    // ---- user moves ----

    /// A piece was moved on the board. Pawn moves to the last rank wait for
    /// [`SessionController::finish_promotion`].
    pub fn user_move(&mut self, orig: Square, dest: Square, capture: bool) {
        self.state.just_played = Some(orig);
        self.emit(SessionEvent::Sound(if capture {
            Sound::Capture
        } else {
            Sound::Move
        }));
        if needs_promotion(&self.node().fen, orig, dest) {
            self.state.promotion = Some(PromotionIntent { orig, dest });
            self.emit(SessionEvent::PromotionPrompt { orig, dest });
            return;
        }
        self.send_move(orig, dest, None);
    }

    pub fn finish_promotion(&mut self, role: Role) {
        if let Some(intent) = self.state.promotion.take() {
            self.send_move(intent.orig, intent.dest, Some(role));
        }
    }

    pub fn cancel_promotion(&mut self) {
        if self.state.promotion.take().is_some() {
            self.emit(SessionEvent::Board(self.board_config()));
        }
    }

    fn send_move(&mut self, orig: Square, dest: Square, promotion: Option<Role>) {
        let req = MoveRequest {
            orig,
            dest,
            promotion,
            fen: self.node().fen.clone(),
            path: self.state.path.clone(),
        };
        debug!(path = %req.path, %orig, %dest, "sending move");
        self.oracle.send_move(req);
    }

    pub fn set_premove(&mut self, orig: Square, dest: Square) {
        self.state.premove = Some(Premove { orig, dest });
    }

    /// Replay a queued premove once it is the solver's turn and dests are known.
    fn play_premove(&mut self) {
        let Some(premove) = self.state.premove else {
            return;
        };
        let node = self.node();
        let Some(dests) = node.dests.as_ref() else {
            return;
        };
        if self.state.mode != Mode::View && turn_at(node.ply) != self.puzzle.color {
            return;
        }
        let legal = dests.contains(premove.orig, premove.dest);
        let capture = is_capture(&node.fen, premove.dest);

        self.state.premove = None;
        if !legal {
            debug!(orig = %premove.orig, dest = %premove.dest, "dropping illegal premove");
            self.emit(SessionEvent::CancelPremove);
            return;
        }
        self.user_move(premove.orig, premove.dest, capture);
    }

    pub fn play_uci(&mut self, uci: &str) {
        match decompose_uci(uci) {
            Ok(m) => self.send_move(m.orig, m.dest, m.promotion),
            Err(e) => warn!(uci, error = %e, "Cannot play move"),
        }
    }

    /// Best move known for the next mainline node, if evaluated.
    pub fn next_node_best(&self) -> Option<String> {
        let child = self.node().mainline_child()?;
        child.ceval.as_ref()?.best().map(str::to_string)
    }

    pub fn play_best_move(&mut self) {
        let uci = self.next_node_best().or_else(|| {
            self.node()
                .ceval
                .as_ref()
                .and_then(|e| e.best())
                .map(str::to_string)
        });
        if let Some(uci) = uci {
            self.play_uci(&uci);
        }
    }

    // ---- replies ----

    /// Dispatch a collaborator reply.
    pub fn handle(&mut self, msg: Inbound) {
        match msg {
            Inbound::Node { node, path } => self.add_node(node, path),
            Inbound::Dests(reply) => self.add_dests(reply),
            Inbound::OracleError(reason) => {
                warn!(reason, "Oracle rejected request");
                self.show_ground();
                self.redraw();
            }
            Inbound::Eval(event) => self.on_eval(event),
            Inbound::EvalCrash(reason) => self.on_eval_crash(&reason),
            Inbound::Round { puzzle_id, response } => {
                if self.is_current_puzzle(&puzzle_id) {
                    self.on_round(response);
                }
            }
            Inbound::Vote { puzzle_id, response } => {
                if self.is_current_puzzle(&puzzle_id) {
                    self.puzzle.vote = response.vote;
                    self.state.vote_in_flight = false;
                    self.redraw();
                }
            }
            Inbound::Puzzle(payload) => {
                self.state.round = None;
                self.state.loading = false;
                if let Err(e) = self.initiate(*payload) {
                    warn!(error = %e, "Invalid puzzle payload");
                }
                self.redraw();
            }
            Inbound::ApiError(reason) => {
                debug!(reason, "api request failed");
                self.state.loading = false;
                self.state.vote_in_flight = false;
                self.redraw();
            }
        }
    }

    fn is_current_puzzle(&self, puzzle_id: &str) -> bool {
        if puzzle_id != self.puzzle.id {
            debug!(
                stale = puzzle_id,
                current = %self.puzzle.id,
                "reply for previous puzzle dropped"
            );
            return false;
        }
        true
    }

    fn add_node(&mut self, node: GameNode, path: TreePath) {
        let new_path = match self.tree.add_node(node, &path) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path, error = %e, "Cannot add node");
                return;
            }
        };
        self.jump(new_path);
        self.redraw();
        self.play_premove();

        let nodes = self.tree.node_list(&self.state.path).unwrap_or_default();
        let outcome = self.classifier.classify(
            self.state.mode,
            &self.state.path,
            &self.state.initial_path,
            &nodes,
        );
        if let Some(outcome) = outcome {
            self.apply_outcome(outcome);
        }
        self.tree.reorder_children(&path, false);
        self.state.mainline = self.tree.mainline_path();
        self.redraw();
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        if let Some(tag) = outcome.tag {
            self.tree
                .update_at(&self.state.path, |n| n.puzzle = Some(tag));
        }
        debug!(path = %self.state.path, verdict = ?outcome.verdict, "classified move");
        match outcome.verdict {
            Verdict::Fail => {
                self.state.last_feedback = Feedback::Fail;
                self.revert_user_move();
                if self.state.mode == Mode::Play {
                    self.state.can_view_solution = true;
                    self.state.mode = Mode::Try;
                    self.send_result(false);
                }
            }
            Verdict::Retry => {
                self.state.last_feedback = Feedback::Retry;
                self.revert_user_move();
            }
            Verdict::Win => {
                if self.state.mode != Mode::View {
                    if self.state.mode == Mode::Play {
                        self.send_result(true);
                    }
                    self.state.last_feedback = Feedback::Win;
                    self.state.mode = Mode::View;
                    self.show_ground();
                    self.start_ceval();
                }
            }
            Verdict::ContinueWith(uci) => {
                self.state.last_feedback = Feedback::Good;
                match decompose_uci(&uci) {
                    Ok(m) => {
                        let req = MoveRequest {
                            orig: m.orig,
                            dest: m.dest,
                            promotion: m.promotion,
                            fen: self.node().fen.clone(),
                            path: self.state.path.clone(),
                        };
                        self.scheduler.schedule(
                            Instant::now() + self.config.reply_delay,
                            Task::OpponentReply(req),
                        );
                    }
                    Err(e) => warn!(uci, error = %e, "Invalid solution move"),
                }
            }
        }
    }

    fn revert_user_move(&mut self) {
        self.scheduler.schedule(
            Instant::now() + self.config.revert_delay,
            Task::RevertUserMove(self.state.path.clone()),
        );
    }

    fn add_dests(&mut self, reply: DestsReply) {
        let is_current = reply.path == self.state.path;
        let path = reply.path.clone();
        if !self.dests.merge(&mut self.tree, reply) {
            debug!(path = %path, "dests for unknown path dropped");
            return;
        }
        if is_current {
            self.show_ground();
            if self.game_over().is_some() {
                self.ceval.stop();
            }
        }
        self.play_premove();
    }

    fn on_eval(&mut self, event: EvalEvent) {
        if merge_eval(&mut self.tree, &event) && event.path == self.state.path {
            self.set_auto_shapes();
            self.redraw();
        }
    }

    fn on_eval_crash(&mut self, reason: &str) {
        if self.ceval.on_crash(reason) {
            self.start_ceval();
        }
    }

    fn on_round(&mut self, res: RoundResponse) {
        if let Some(round) = &res.round {
            info!(
                puzzle_id = %self.puzzle.id,
                win = round.win,
                rating_diff = round.rating_diff,
                "Round recorded"
            );
        }
        self.user = res.user;
        self.state.round = res.round;
        self.state.voted = res.voted;
        self.redraw();
    }

    // ---- navigation ----

    fn jump(&mut self, path: TreePath) {
        let path_changed = path != self.state.path;
        self.state.path = path;
        self.show_ground();
        if path_changed {
            let node = self.node();
            let san = node.san.clone().unwrap_or_default();
            match node.uci.as_deref() {
                None => self.emit(SessionEvent::Sound(Sound::Move)),
                Some(uci) => {
                    let own_move = self
                        .state
                        .just_played
                        .is_some_and(|sq| uci.starts_with(&sq.to_string()));
                    if !own_move {
                        self.emit(SessionEvent::Sound(if san_is_capture(&san) {
                            Sound::Capture
                        } else {
                            Sound::Move
                        }));
                    }
                }
            }
            if san_gives_check(&san) {
                self.emit(SessionEvent::Sound(Sound::Check));
            }
            self.state.threat_mode = false;
            self.ceval.stop();
            self.start_ceval();
        }
        self.state.promotion = None;
        self.state.just_played = None;
        self.state.auto_scroll_requested = true;
    }

    /// Navigate to `path` on user request.
    pub fn user_jump(&mut self, path: TreePath) {
        if !self.tree.contains_path(&path) {
            debug!(path = %path, "ignoring jump to unknown path");
            return;
        }
        self.emit(SessionEvent::ClearSelection);
        self.jump(path);
    }

    pub fn prev(&mut self) {
        if !self.state.path.is_root() {
            self.user_jump(self.state.path.init());
        }
    }

    pub fn next(&mut self) {
        if let Some(child) = self.node().mainline_child() {
            let path = self.state.path.join(&child.id);
            self.user_jump(path);
        }
    }

    pub fn first(&mut self) {
        self.user_jump(TreePath::root());
    }

    /// Jump to the end of the line continuing from the current node.
    pub fn last(&mut self) {
        let mut path = self.state.path.clone();
        let mut node = self.node();
        while let Some(child) = node.mainline_child() {
            path = path.join(&child.id);
            node = child;
        }
        self.user_jump(path);
    }

    // ---- solution and results ----

    pub fn view_solution(&mut self) {
        if !self.state.can_view_solution || self.state.mode == Mode::View {
            return;
        }
        self.send_result(false);
        self.state.mode = Mode::View;
        let initial_path = self.state.initial_path.clone();
        if let Err(e) = merge_solution(
            &mut self.tree,
            &initial_path,
            &self.puzzle.branch,
            self.puzzle.color,
        ) {
            warn!(error = %e, "Cannot merge solution");
        }
        self.tree.reorder_children(&initial_path, true);
        self.state.mainline = self.tree.mainline_path();

        let next = self
            .node()
            .mainline_child()
            .filter(|c| c.puzzle == Some(PuzzleTag::Good))
            .map(|c| c.id.clone());
        match next {
            Some(id) => self.user_jump(self.state.path.join(&id)),
            None => {
                let before_good = self
                    .tree
                    .mainline_path_while(|n| n.puzzle != Some(PuzzleTag::Good));
                let first_child = self
                    .tree
                    .node_at(&before_good)
                    .ok()
                    .and_then(GameNode::mainline_child)
                    .map(|c| c.id.clone());
                if let Some(id) = first_child {
                    self.user_jump(before_good.join(&id));
                }
            }
        }

        self.state.last_feedback = Feedback::End;
        self.state.auto_scroll_requested = true;
        self.redraw();
        self.start_ceval();
    }

    /// Submit the round result, at most once per session.
    fn send_result(&mut self, win: bool) {
        if self.state.result_sent {
            return;
        }
        self.state.result_sent = true;
        info!(puzzle_id = %self.puzzle.id, win, "Submitting result");
        let request = self.api.submit_round(&self.puzzle.id, win);
        let puzzle_id = self.puzzle.id.clone();
        self.spawn_api(request, move |response| Inbound::Round { puzzle_id, response });
    }

    pub fn next_puzzle(&mut self) {
        self.ceval.stop();
        self.state.loading = true;
        self.redraw();
        let request = self.api.next_puzzle();
        self.spawn_api(request, |p| Inbound::Puzzle(Box::new(p)));
    }

    pub fn vote(&mut self, up: bool) {
        match self.vote_throttle.admit(Instant::now()) {
            Admission::Now => self.send_vote(up),
            Admission::Deferred(at) => {
                self.pending_vote = Some(up);
                self.scheduler.schedule(at, Task::Vote);
            }
            Admission::Coalesced => self.pending_vote = Some(up),
        }
    }

    fn send_vote(&mut self, up: bool) {
        if self.state.vote_in_flight {
            debug!("vote already in flight");
            return;
        }
        self.preferences.mark_ever_voted();
        self.state.voted = Some(up);
        self.state.vote_in_flight = true;
        let request = self.api.vote(&self.puzzle.id, up);
        let puzzle_id = self.puzzle.id.clone();
        self.spawn_api(request, move |response| Inbound::Vote { puzzle_id, response });
    }

    pub fn has_ever_voted(&self) -> bool {
        self.preferences.has_ever_voted()
    }

    fn spawn_api<T, F>(&self, request: BoxFuture<'static, Result<T, SessionError>>, wrap: F)
    where
        T: Send + 'static,
        F: FnOnce(T) -> Inbound + Send + 'static,
    {
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let msg = match request.await {
                Ok(value) => wrap(value),
                Err(e) => {
                    warn!(error = %e, "Puzzle API request failed");
                    Inbound::ApiError(e.to_string())
                }
            };
            let _ = inbox.send(msg);
        });
    }

    /// Key for the recent-puzzles view.
    pub fn recent_hash(&self) -> String {
        let mut hash = self.puzzle.id.clone();
        if let Some(user) = &self.user {
            for (id, _, _) in &user.recent {
                hash.push_str(id);
            }
        }
        hash
    }

    // ---- evaluation ----

    pub fn game_over(&self) -> Option<GameOver> {
        let node = self.node();
        if !node.is_terminal() {
            return None;
        }
        Some(if node.check {
            GameOver::Checkmate
        } else {
            GameOver::Draw
        })
    }

    pub fn can_use_ceval(&self) -> bool {
        self.state.mode == Mode::View && self.game_over().is_none()
    }

    fn start_ceval(&mut self) {
        if !self.ceval.enabled() || !self.can_use_ceval() {
            return;
        }
        match self.ceval.admit_start(Instant::now()) {
            Admission::Now => self.do_start_ceval(),
            Admission::Deferred(at) => self.scheduler.schedule(at, Task::StartCeval),
            Admission::Coalesced => {}
        }
    }

    fn do_start_ceval(&mut self) {
        let work = self.tree.node_list(&self.state.path).ok().and_then(|nodes| {
            EvalWork::from_nodes(
                self.state.path.clone(),
                &nodes,
                self.state.threat_mode,
                self.ceval.opts(),
            )
        });
        if let Some(work) = work {
            self.ceval.start(work);
        }
    }

    fn set_auto_shapes(&self) {
        let shapes = if self.state.mode == Mode::View {
            let best = self.next_node_best();
            auto_shapes::compute(ShapeContext {
                node: self.node(),
                ceval_enabled: self.ceval.enabled(),
                threat_mode: self.state.threat_mode,
                multi_pv: self.ceval.opts().multi_pv,
                next_node_best: best.as_deref(),
            })
        } else {
            Vec::new()
        };
        self.emit(SessionEvent::AutoShapes(shapes));
    }

    pub fn toggle_ceval(&mut self) {
        self.ceval.toggle();
        self.set_auto_shapes();
        self.start_ceval();
        if !self.ceval.enabled() {
            self.state.threat_mode = false;
        }
        self.state.auto_scroll_requested = true;
        self.redraw();
    }

    /// Not available while in check.
    pub fn toggle_threat_mode(&mut self) {
        if self.node().check {
            return;
        }
        if !self.ceval.enabled() {
            self.ceval.toggle();
        }
        if !self.ceval.enabled() {
            return;
        }
        self.state.threat_mode = !self.state.threat_mode;
        self.set_auto_shapes();
        self.start_ceval();
        self.redraw();
    }

    /// The view became visible again; re-sync the board on the next tick.
    pub fn visibility_changed(&mut self) {
        self.scheduler.schedule(Instant::now(), Task::Resync);
    }

    // ---- scheduled tasks ----

    /// Run every task that is due.
    pub fn run_due(&mut self) {
        let now = Instant::now();
        for task in self.scheduler.take_due(now) {
            self.run_task(task, now);
        }
    }

    fn run_task(&mut self, task: Task, now: Instant) {
        match task {
            Task::InitialJump => {
                self.jump(self.state.initial_path.clone());
                self.redraw();
            }
            Task::RevealSolution => {
                self.state.can_view_solution = true;
                self.redraw();
            }
            Task::RevertUserMove(path) => {
                self.state.premove = None;
                self.emit(SessionEvent::CancelPremove);
                self.user_jump(path.init());
                self.redraw();
            }
            Task::OpponentReply(req) => self.oracle.send_move(req),
            Task::FetchDests => {
                if let Some(req) = self.dests.fire_pending(
                    &self.tree,
                    &self.state.path,
                    &self.state.initial_path,
                    now,
                ) {
                    self.oracle.send_dests(req);
                }
            }
            Task::StartCeval => {
                if self.ceval.fire_pending_start(now)
                    && self.ceval.enabled()
                    && self.can_use_ceval()
                {
                    self.do_start_ceval();
                }
            }
            Task::Vote => {
                if self.vote_throttle.fire_pending(now) {
                    if let Some(up) = self.pending_vote.take() {
                        self.send_vote(up);
                    }
                }
            }
            Task::Resync => self.jump(self.state.path.clone()),
        }
    }
}

fn needs_promotion(fen: &str, orig: Square, dest: Square) -> bool {
    let Ok(pos) = position_from_fen(fen) else {
        return false;
    };
    pos.board().role_at(orig) == Some(Role::Pawn)
        && matches!(dest.rank(), Rank::First | Rank::Eighth)
}

fn is_capture(fen: &str, dest: Square) -> bool {
    position_from_fen(fen)
        .map(|pos| pos.board().piece_at(dest).is_some())
        .unwrap_or(false)
}
