//! An [`Engine`] backed by an external process speaking UCI over stdin/stdout.

use std::{process::Stdio, str::FromStr, time::Duration};

use async_trait::async_trait;
use shakmaty::{fen::Fen, uci::Uci, Chess, EnPassantMode, Move};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
    time::timeout,
};
use tracing::{debug, trace, warn};

use crate::{config::EngineConfig, difficulty::SearchLimit, error::EngineError, Engine};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a `stop` may take to produce the overdue `bestmove`.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    bestmove_grace: Duration,
    /// Set once the output stream can no longer be trusted to line up with
    /// our requests. Every later search fails with `Disconnected`.
    unusable: bool,
}

impl UciEngine {
    /// Start the process and wait for `uciok` and `readyok`.
    pub async fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: config.path.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Handshake("no stdin handle".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Handshake("no stdout handle".into()))?;

        let mut engine = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            bestmove_grace: config.bestmove_grace,
            unusable: false,
        };
        match timeout(HANDSHAKE_TIMEOUT, engine.handshake()).await {
            Ok(Ok(())) => Ok(engine),
            Ok(Err(why)) => {
                engine.kill().await;
                Err(EngineError::Handshake(why.to_string()))
            }
            Err(_) => {
                engine.kill().await;
                Err(EngineError::Handshake(format!(
                    "no reply within {HANDSHAKE_TIMEOUT:?}"
                )))
            }
        }
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.read_until(|line| line == "uciok").await?;
        self.send("isready").await?;
        self.read_until(|line| line == "readyok").await?;
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        trace!(command, "engine <");
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Skip lines until one satisfies `done`, and return it.
    async fn read_until(&mut self, done: impl Fn(&str) -> bool) -> Result<String, EngineError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await?
                .ok_or(EngineError::Disconnected)?;
            let line = line.trim();
            trace!(line, "engine >");
            if done(line) {
                return Ok(line.to_string());
            }
        }
    }

    /// Stop an overdue search and swallow its `bestmove`, so the next request
    /// does not read it as its own answer.
    async fn abandon_search(&mut self) -> Result<(), EngineError> {
        self.send("stop").await?;
        match timeout(STOP_TIMEOUT, self.read_until(is_bestmove)).await {
            Ok(line) => {
                let line = line?;
                debug!(%line, "discarded overdue answer");
                Ok(())
            }
            Err(_) => Err(EngineError::Timeout(STOP_TIMEOUT)),
        }
    }

    async fn kill(&mut self) {
        if let Err(why) = self.child.kill().await {
            warn!(%why, "could not kill engine process");
        }
    }
}

fn is_bestmove(line: &str) -> bool {
    line == "bestmove" || line.starts_with("bestmove ")
}

/// The move of a `bestmove <move> [ponder <move>]` line.
fn parse_bestmove(line: &str) -> Result<Uci, EngineError> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("bestmove"), Some(m)) => match Uci::from_str(m) {
            Ok(Uci::Null) | Err(_) => Err(EngineError::Protocol(line.to_string())),
            Ok(uci) => Ok(uci),
        },
        _ => Err(EngineError::Protocol(line.to_string())),
    }
}

fn go_command(limit: &SearchLimit) -> String {
    match limit.depth {
        Some(depth) => format!("go movetime {} depth {depth}", limit.movetime_millis()),
        None => format!("go movetime {}", limit.movetime_millis()),
    }
}

#[async_trait]
impl Engine for UciEngine {
    async fn best_move(
        &mut self,
        position: &Chess,
        limit: SearchLimit,
    ) -> Result<Move, EngineError> {
        if self.unusable {
            return Err(EngineError::Disconnected);
        }
        let fen = Fen::from_position(position.clone(), EnPassantMode::Legal);
        let deadline = limit.time + self.bestmove_grace;
        let searched = async {
            self.send(&format!("position fen {fen}")).await?;
            self.send(&go_command(&limit)).await?;
            timeout(deadline, self.read_until(is_bestmove)).await.ok().transpose()
        }
        .await;

        let line = match searched {
            Ok(Some(line)) => line,
            Ok(None) => {
                warn!(?deadline, "engine overran its budget, stopping the search");
                if let Err(why) = self.abandon_search().await {
                    warn!(%why, "engine ignored stop, giving up on it");
                    self.unusable = true;
                    self.kill().await;
                }
                return Err(EngineError::Timeout(deadline));
            }
            Err(why) => {
                self.unusable = true;
                return Err(why);
            }
        };
        let uci = parse_bestmove(&line)?;
        debug!(%uci, "engine answered");
        uci.to_move(position)
            .map_err(|_| EngineError::IllegalSuggestion(uci))
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        // A dead engine cannot be asked to quit; reaping it below is enough.
        if let Err(why) = self.send("quit").await {
            debug!(%why, "engine gone before quit");
        }
        match timeout(QUIT_TIMEOUT, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!(%status, "engine exited");
                Ok(())
            }
            Err(_) => {
                warn!("engine ignored quit, killing it");
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}
