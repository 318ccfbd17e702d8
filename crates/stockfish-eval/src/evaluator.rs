//! Streaming evaluator backed by a Stockfish process.
//!
//! Each evaluator owns one engine task. Commands go in over a channel; every
//! principal-variation update is posted to the session inbox as an
//! [`Inbound::Eval`], with scores normalized to white's point of view.

use std::time::Instant;

use puzzle_core::{ClientEval, PvLine, TreePath};
use puzzle_session::ceval::{EvalEvent, EvalOpts, EvalWork, Evaluator, EvaluatorFactory};
use puzzle_session::collaborators::{InboxSender, Inbound};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{null_move_fen, parse_info, white_to_move, EngineSettings, StockfishEngine};
use crate::error::EngineError;

#[derive(Debug)]
enum EngineCommand {
    Start(EvalWork),
    Stop,
    Quit,
}

/// Handle to a running engine task.
pub struct StockfishEvaluator {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl StockfishEvaluator {
    fn send(&self, cmd: EngineCommand) {
        if self.commands.send(cmd).is_err() {
            debug!("engine task gone, command dropped");
        }
    }
}

impl Evaluator for StockfishEvaluator {
    fn start(&mut self, work: EvalWork) {
        self.send(EngineCommand::Start(work));
    }

    fn stop(&mut self) {
        self.send(EngineCommand::Stop);
    }

    fn destroy(&mut self) {
        self.send(EngineCommand::Quit);
    }
}

/// Spawns one Stockfish process per evaluator.
#[derive(Debug, Clone)]
pub struct StockfishFactory {
    settings: EngineSettings,
}

impl StockfishFactory {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

impl EvaluatorFactory for StockfishFactory {
    fn create(&self, opts: &EvalOpts, inbox: InboxSender) -> Box<dyn Evaluator> {
        let settings = if opts.failsafe {
            self.settings.failsafe()
        } else {
            self.settings.clone()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            if let Err(e) = run_engine(settings, rx, inbox.clone()).await {
                warn!(error = %e, "Stockfish evaluator crashed");
                let _ = inbox.send(Inbound::EvalCrash(e.to_string()));
            }
        });
        Box::new(StockfishEvaluator { commands: tx })
    }
}

/// Search in progress.
struct Search {
    path: TreePath,
    threat_mode: bool,
    fen: String,
    white_to_move: bool,
    max_depth: u32,
    pvs: Vec<Option<PvLine>>,
    started: Instant,
}

impl Search {
    fn new(work: &EvalWork) -> Self {
        let fen = if work.threat_mode {
            null_move_fen(&work.current_fen)
        } else {
            work.current_fen.clone()
        };
        Self {
            path: work.path.clone(),
            threat_mode: work.threat_mode,
            white_to_move: white_to_move(&fen),
            fen,
            max_depth: work.max_depth,
            pvs: vec![None; work.multi_pv.max(1) as usize],
            started: Instant::now(),
        }
    }

    /// Record an info line. Returns the updated evaluation once the best
    /// line is known.
    fn update(&mut self, line: &str) -> Option<ClientEval> {
        let info = parse_info(line)?;
        let idx = info.multipv.checked_sub(1)? as usize;
        let sign = if self.white_to_move { 1 } else { -1 };
        *self.pvs.get_mut(idx)? = Some(PvLine {
            moves: info.pv,
            cp: info.cp.map(|c| c * sign),
            mate: info.mate.map(|m| m * sign),
        });
        let pvs: Vec<PvLine> = self.pvs.iter().map_while(Clone::clone).collect();
        if pvs.is_empty() {
            return None;
        }
        Some(ClientEval {
            fen: self.fen.clone(),
            depth: info.depth,
            max_depth: self.max_depth,
            nodes: info.nodes,
            millis: if info.millis > 0 {
                info.millis
            } else {
                self.started.elapsed().as_millis() as u64
            },
            pvs,
        })
    }
}

async fn begin(engine: &mut StockfishEngine, work: &EvalWork) -> Result<Search, EngineError> {
    let search = Search::new(work);
    engine
        .send(&format!("setoption name MultiPV value {}", search.pvs.len()))
        .await?;
    if work.threat_mode || work.moves.is_empty() {
        engine.send(&format!("position fen {}", search.fen)).await?;
    } else {
        engine
            .send(&format!(
                "position fen {} moves {}",
                work.initial_fen,
                work.moves.join(" ")
            ))
            .await?;
    }
    engine.send(&format!("go depth {}", work.max_depth)).await?;
    debug!(path = %work.path, threat = work.threat_mode, "search started");
    Ok(search)
}

async fn run_engine(
    settings: EngineSettings,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    inbox: InboxSender,
) -> Result<(), EngineError> {
    let mut engine = StockfishEngine::new(&settings).await?;
    info!(path = %settings.path, threads = settings.threads, hash_mb = settings.hash_mb, "Stockfish ready");

    let mut current: Option<Search> = None;
    // Work to start once the engine acknowledges a stop with `bestmove`.
    let mut queued: Option<EvalWork> = None;
    let mut stopping = false;

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                None | Some(EngineCommand::Quit) => break,
                Some(EngineCommand::Stop) => {
                    queued = None;
                    if current.is_some() && !stopping {
                        engine.send("stop").await?;
                        stopping = true;
                    }
                }
                Some(EngineCommand::Start(work)) => {
                    if current.is_some() {
                        queued = Some(work);
                        if !stopping {
                            engine.send("stop").await?;
                            stopping = true;
                        }
                    } else {
                        current = Some(begin(&mut engine, &work).await?);
                    }
                }
            },
            line = engine.next_line() => {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.starts_with("bestmove") {
                    debug!(line = trimmed, "SF >");
                    current = None;
                    stopping = false;
                    if let Some(work) = queued.take() {
                        current = Some(begin(&mut engine, &work).await?);
                    }
                } else if !stopping {
                    if let Some(search) = current.as_mut() {
                        if let Some(eval) = search.update(trimmed) {
                            let event = EvalEvent {
                                path: search.path.clone(),
                                threat_mode: search.threat_mode,
                                eval,
                            };
                            if inbox.send(Inbound::Eval(event)).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    engine.quit().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(threat_mode: bool, multi_pv: u32) -> EvalWork {
        EvalWork {
            path: TreePath::root(),
            initial_fen: "startpos".into(),
            moves: vec![],
            current_fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1".into(),
            ply: 1,
            threat_mode,
            multi_pv,
            max_depth: 18,
        }
    }

    #[test]
    fn test_scores_are_normalized_to_white() {
        let mut search = Search::new(&work(false, 1));
        let eval = search
            .update("info depth 10 multipv 1 score cp 25 nodes 1000 time 5 pv e7e5 g1f3")
            .unwrap();
        assert_eq!(eval.depth, 10);
        assert_eq!(eval.max_depth, 18);
        assert_eq!(eval.cp(), Some(-25));
        assert_eq!(eval.best(), Some("e7e5"));
    }

    #[test]
    fn test_threat_mode_searches_null_move_position() {
        let mut search = Search::new(&work(true, 1));
        assert!(search.fen.contains(" w KQkq - "));
        let eval = search
            .update("info depth 8 multipv 1 score mate 2 nodes 10 time 1 pv d1h5")
            .unwrap();
        assert_eq!(eval.mate(), Some(2));
    }

    #[test]
    fn test_multi_pv_lines_fill_in_order() {
        let mut search = Search::new(&work(false, 2));
        assert!(search
            .update("info depth 5 multipv 2 score cp 0 nodes 1 time 1 pv d7d5")
            .is_none());
        let eval = search
            .update("info depth 5 multipv 1 score cp 10 nodes 2 time 1 pv e7e5")
            .unwrap();
        assert_eq!(eval.pvs.len(), 2);
        assert_eq!(eval.best(), Some("e7e5"));
        assert!(search.update("info depth 5 multipv 3 score cp 0 pv a7a6").is_none());
    }
}
