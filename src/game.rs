//! The board of a single game and the rules-facing operations on it.
//!
//! Rules themselves (legality, notation, mate and stalemate) come from
//! `shakmaty`. What lives here is the bookkeeping a bare position cannot do:
//! move history, repetition counts and the result of the game.

use std::{collections::HashMap, fmt, fmt::Write as _, str::FromStr};

use shakmaty::{
    fen::Fen,
    san::{SanError, SanPlus},
    CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Rank, Role, Square,
};
use tracing::debug;

use crate::error::MoveError;

/// Halfmoves without capture or pawn move after which the game is drawn.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;
const FIVEFOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FivefoldRepetition,
    SeventyFiveMoveRule,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient material",
            Termination::FivefoldRepetition => "fivefold repetition",
            Termination::SeventyFiveMoveRule => "seventy-five-move rule",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    /// `None` for a draw.
    pub winner: Option<Color>,
    pub termination: Termination,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.winner {
            Some(Color::White) => write!(f, "1-0 ({})", self.termination),
            Some(Color::Black) => write!(f, "0-1 ({})", self.termination),
            None => write!(f, "1/2-1/2 ({})", self.termination),
        }
    }
}

/// Human name of a piece kind, as used in hints.
pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// Identifies a position for repetition purposes: placement, side to move,
/// castling rights and en passant, without the move counters.
fn repetition_key(position: &Chess) -> String {
    let fen = Fen::from_position(position.clone(), EnPassantMode::Legal).to_string();
    fen.split(' ').take(4).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct GameSession {
    start: Chess,
    position: Chess,
    history: Vec<Move>,
    repetitions: HashMap<String, u32>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    /// A game from the standard starting position.
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    pub fn from_position(start: Chess) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(repetition_key(&start), 1);
        Self {
            position: start.clone(),
            start,
            history: Vec::new(),
            repetitions,
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn start(&self) -> &Chess {
        &self.start
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Moves played so far, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn ply_count(&self) -> usize {
        self.history.len()
    }

    /// Play `m` if it is legal here and return its algebraic notation. An
    /// illegal move leaves the game untouched.
    ///
    /// Whoever owns the suggestion cache must clear it after every `Ok`.
    pub fn apply_move(&mut self, m: &Move) -> Result<String, MoveError> {
        if !self.position.is_legal(m) {
            return Err(MoveError::Illegal(self.to_coordinate(m)));
        }
        let san = self.to_algebraic(m);
        self.position.play_unchecked(m);
        self.history.push(m.clone());
        *self
            .repetitions
            .entry(repetition_key(&self.position))
            .or_insert(0) += 1;
        debug!(ply = self.history.len(), %san, "move applied");
        Ok(san)
    }

    /// Read a move in algebraic notation (`e4`, `Nbd7`, `O-O`, `e8=Q+`) in the
    /// context of the current position.
    pub fn parse_algebraic(&self, text: &str) -> Result<Move, MoveError> {
        let text = text.trim();
        let san = SanPlus::from_str(text).map_err(|_| MoveError::Malformed(text.to_string()))?;
        san.san.to_move(&self.position).map_err(|why| match why {
            SanError::AmbiguousSan => MoveError::Ambiguous(text.to_string()),
            _ => MoveError::Illegal(text.to_string()),
        })
    }

    /// Algebraic notation of `m`, which must be legal in the current position.
    pub fn to_algebraic(&self, m: &Move) -> String {
        SanPlus::from_move(self.position.clone(), m).to_string()
    }

    pub fn to_coordinate(&self, m: &Move) -> String {
        m.to_uci(CastlingMode::Standard).to_string()
    }

    fn repetition_count(&self) -> u32 {
        self.repetitions
            .get(&repetition_key(&self.position))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// The result, once the game is over.
    pub fn outcome(&self) -> Option<GameOutcome> {
        let pos = &self.position;
        if pos.is_checkmate() {
            return Some(GameOutcome {
                winner: Some(!pos.turn()),
                termination: Termination::Checkmate,
            });
        }
        let termination = if pos.is_stalemate() {
            Termination::Stalemate
        } else if pos.is_insufficient_material() {
            Termination::InsufficientMaterial
        } else if pos.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES {
            Termination::SeventyFiveMoveRule
        } else if self.repetition_count() >= FIVEFOLD {
            Termination::FivefoldRepetition
        } else {
            return None;
        };
        Some(GameOutcome {
            winner: None,
            termination,
        })
    }

    /// Text diagram of the board, rank 8 on top, `.` for empty squares.
    pub fn render_board(&self) -> String {
        let board = self.position.board();
        let mut out = String::new();
        for rank in (0..8).rev() {
            let _ = write!(out, "{}", rank + 1);
            for file in 0..8 {
                let square = Square::from_coords(File::new(file), Rank::new(rank));
                let c = board.piece_at(square).map_or('.', |piece| piece.char());
                out.push(' ');
                out.push(c);
            }
            out.push('\n');
        }
        out.push_str("  a b c d e f g h");
        out
    }
}
