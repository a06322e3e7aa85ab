use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use shakmaty::Color;

use crate::difficulty::Difficulty;

/// Play chess in the terminal against a UCI engine.
#[derive(Parser, Debug, Clone)]
#[command(name = "chess-tui", version)]
pub struct Args {
    /// Path to a UCI engine binary.
    #[arg(long, env = "CHESS_TUI_ENGINE", default_value = "stockfish")]
    pub engine: PathBuf,

    /// Extra argument passed to the engine binary (repeatable).
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Bot level from 1 (easy) to 10 (hard). Prompted for when omitted.
    #[arg(long)]
    pub level: Option<Difficulty>,

    /// Depth ceiling for every engine search, on top of the time budget.
    #[arg(long)]
    pub depth: Option<u32>,

    /// Side the human plays.
    #[arg(long, value_enum, default_value_t = Side::White)]
    pub play_as: Side,

    /// Write a JSON record of the game here when it ends.
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Continue the game stored in a JSON record written by `--save`.
    #[arg(long, value_name = "PATH")]
    pub resume: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// How long past its `movetime` an engine may take before it counts as hung.
pub const DEFAULT_BESTMOVE_GRACE: Duration = Duration::from_secs(10);

/// How to start the engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    pub depth: Option<u32>,
    pub bestmove_grace: Duration,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            depth: None,
            bestmove_grace: DEFAULT_BESTMOVE_GRACE,
        }
    }

    pub fn bestmove_grace(mut self, grace: Duration) -> Self {
        self.bestmove_grace = grace;
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            path: self.engine.clone(),
            args: self.engine_args.clone(),
            depth: self.depth,
            bestmove_grace: DEFAULT_BESTMOVE_GRACE,
        }
    }
}
