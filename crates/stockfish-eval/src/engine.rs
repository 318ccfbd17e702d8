//! Stockfish process wrapper using the UCI protocol (async I/O)

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use tracing::debug;

use crate::error::EngineError;

/// Process-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub path: String,
    pub threads: u32,
    pub hash_mb: u32,
}

impl EngineSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            threads: default_threads(),
            hash_mb: 256,
        }
    }

    /// Minimal settings used after a crash.
    pub fn failsafe(&self) -> Self {
        Self {
            path: self.path.clone(),
            threads: 1,
            hash_mb: 16,
        }
    }
}

/// All cores but one, at least one.
pub fn default_threads() -> u32 {
    num_cpus::get().saturating_sub(1).max(1) as u32
}

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(settings: &EngineSettings) -> Result<Self, EngineError> {
        let mut process = Command::new(&settings.path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            lines: BufReader::new(stdout).lines(),
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine
            .send(&format!("setoption name Threads value {}", settings.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", settings.hash_mb))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    pub async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Stockfish(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Next output line. Cancel-safe, so it can sit in a `select!`.
    pub async fn next_line(&mut self) -> Result<String, EngineError> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(EngineError::Exited),
            Err(e) => Err(EngineError::Stockfish(format!(
                "Failed to read from Stockfish: {e}"
            ))),
        }
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            let line = self.next_line().await?;
            let trimmed = line.trim();
            debug!(line = trimmed, "SF >");
            if trimmed == expected {
                return Ok(());
            }
        }
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
    }
}

/// Parsed `info ... pv ...` line. Scores are from the side to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: u32,
    /// 1-based line index.
    pub multipv: u32,
    pub cp: Option<i32>,
    pub mate: Option<i32>,
    pub nodes: u64,
    pub millis: u64,
    pub pv: Vec<String>,
}

/// Parse an info line carrying a principal variation.
pub fn parse_info(line: &str) -> Option<InfoLine> {
    if !line.starts_with("info") || !line.contains(" pv ") {
        return None;
    }
    Some(InfoLine {
        depth: field_after(line, "depth")?,
        multipv: parse_multipv_index(line).unwrap_or(1),
        cp: parse_cp(line),
        mate: parse_mate(line),
        nodes: field_after(line, "nodes").unwrap_or(0),
        millis: field_after(line, "time").unwrap_or(0),
        pv: parse_pv(line),
    })
}

/// Value following the first `key` token.
fn field_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let mut parts = line.split_whitespace();
    parts.by_ref().find(|p| *p == key)?;
    parts.next()?.parse().ok()
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    field_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    field_after(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    field_after(line, "multipv")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip_while(|p| *p != "pv")
        .skip(1)
        .take_while(|p| !p.starts_with("bmc") && *p != "string")
        .map(str::to_string)
        .collect()
}

/// Same position with the other side to move and no en passant square.
/// Used to ask "what does the opponent threaten?".
pub fn null_move_fen(fen: &str) -> String {
    let parts: Vec<&str> = fen.split(' ').collect();
    if parts.len() < 4 {
        return fen.to_string();
    }
    let side = if parts[1] == "w" { "b" } else { "w" };
    let halfmove = parts.get(4).copied().unwrap_or("0");
    let fullmove = parts.get(5).copied().unwrap_or("1");
    format!("{} {side} {} - {halfmove} {fullmove}", parts[0], parts[2])
}

/// Whether white is to move in `fen`.
pub fn white_to_move(fen: &str) -> bool {
    fen.split(' ').nth(1) != Some("b")
}
