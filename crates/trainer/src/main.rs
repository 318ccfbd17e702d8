//! Terminal puzzle trainer.
//!
//! Fetches puzzles from the configured API, checks moves with the local
//! rules oracle and analyses finished puzzles with Stockfish.

mod api;
mod commands;
mod config;

use std::sync::Arc;

use puzzle_session::{
    driver, Collaborators, LocalOracle, MemoryPreferences, PuzzleApi, SessionController,
    SessionEvent, Sound,
};
use stockfish_eval::StockfishFactory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::HttpPuzzleApi;
use crate::commands::{parse_command, HELP};
use crate::config::TrainerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = TrainerConfig::from_env()?;
    info!(api_url = %config.api_url, stockfish_path = %config.engine.path, "Config loaded");

    let api = Arc::new(HttpPuzzleApi::new(config.api_url.clone())?);
    let payload = api.next_puzzle().await?;

    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (actions_tx, actions_rx) = mpsc::unbounded_channel();

    let collaborators = Collaborators {
        oracle: Box::new(LocalOracle::new(inbox_tx.clone())),
        api,
        evaluators: Box::new(StockfishFactory::new(config.engine.clone())),
        preferences: Arc::new(MemoryPreferences::default()),
        inbox: inbox_tx,
        events: events_tx,
    };
    let controller = SessionController::new(payload, collaborators, config.session.clone())?;

    tokio::spawn(print_events(events_rx));
    tokio::spawn(async move {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(action) => {
                        if actions_tx.send(action).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("unknown command: {}", line.trim()),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    let controller = driver::run(controller, inbox_rx, actions_rx).await;
    let state = controller.state();
    info!(
        puzzle_id = %controller.puzzle().id,
        mode = ?state.mode,
        feedback = ?state.last_feedback,
        "Bye"
    );
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Board(board) => {
                let to_move = match board.movable_color {
                    Some(color) if !board.premovable => format!("{color:?} to move"),
                    Some(color) => format!("{color:?} may premove"),
                    None => "waiting".to_string(),
                };
                println!("{}  [{to_move}]{}", board.fen, if board.check { " check" } else { "" });
            }
            SessionEvent::Sound(Sound::Check) => println!("check!"),
            SessionEvent::PromotionPrompt { orig, dest } => {
                println!("promotion {orig}{dest}: answer q, r, b or n (or cancel)")
            }
            SessionEvent::AutoShapes(shapes) if !shapes.is_empty() => {
                let arrows: Vec<String> = shapes
                    .iter()
                    .map(|s| format!("{}{} ({:?})", s.orig, s.dest, s.brush))
                    .collect();
                println!("arrows: {}", arrows.join(", "));
            }
            _ => {}
        }
    }
}
