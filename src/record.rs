use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use shakmaty::{uci::Uci, CastlingMode, Chess, Color};

use crate::{
    difficulty::Difficulty,
    error::{MoveError, RecordError},
    game::GameSession,
};

/// What is kept of a game once it ends.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameRecord {
    /// Position the game started from.
    #[serde(with = "crate::chess_serde::position_serde")]
    pub start: Chess,

    /// Every move played, in coordinate notation.
    #[serde(with = "crate::chess_serde::moves_serde")]
    pub moves: Vec<Uci>,

    /// Bot level the game was played at.
    pub level: u8,

    /// `"white"` or `"black"`.
    pub human: String,

    /// `1-0`, `0-1`, `1/2-1/2`, or `*` when the game was left unfinished.
    pub result: String,

    /// How the game ended, when it ended on the board.
    pub termination: Option<String>,
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

impl GameRecord {
    pub fn new(game: &GameSession, difficulty: Difficulty, human: Color) -> Self {
        let outcome = game.outcome();
        let result = match outcome.and_then(|o| o.winner) {
            Some(Color::White) => "1-0",
            Some(Color::Black) => "0-1",
            None if outcome.is_some() => "1/2-1/2",
            None => "*",
        };
        GameRecord {
            start: game.start().clone(),
            moves: game
                .history()
                .iter()
                .map(|m| m.to_uci(CastlingMode::Standard))
                .collect(),
            level: difficulty.level(),
            human: color_name(human).to_string(),
            result: result.to_string(),
            termination: outcome.map(|o| o.termination.to_string()),
        }
    }

    /// Play the recorded moves again from the recorded start.
    pub fn replay(&self) -> Result<GameSession, MoveError> {
        let mut game = GameSession::from_position(self.start.clone());
        for uci in &self.moves {
            let m = uci
                .to_move(game.position())
                .map_err(|_| MoveError::Illegal(uci.to_string()))?;
            game.apply_move(&m)?;
        }
        Ok(game)
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a record written by [`Self::save`].
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn difficulty(&self) -> Result<Difficulty, RecordError> {
        Ok(Difficulty::new(self.level)?)
    }

    pub fn human_side(&self) -> Result<Color, RecordError> {
        match self.human.as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(RecordError::Side(other.to_string())),
        }
    }
}
