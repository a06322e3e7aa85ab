//! Error types shared by the game session, the advisor and the engine process.

use std::{io, path::PathBuf, time::Duration};

use shakmaty::uci::Uci;

/// Why a piece of user-entered move text could not be turned into a move.
///
/// All three are recoverable: the position is left untouched and the user is
/// asked again, with guidance that depends on the variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// More than one legal move matches; the user has to name the file or rank
    /// the piece comes from.
    #[error("ambiguous move `{0}`")]
    Ambiguous(String),

    /// Well-formed, but not legal in the current position.
    #[error("illegal move `{0}`")]
    Illegal(String),

    /// Not algebraic notation at all.
    #[error("malformed move `{0}`")]
    Malformed(String),
}

/// Failures of the external engine.
///
/// Returned by [`crate::advisor::AdvisorySession::initialize`] it means the
/// session never started. Returned by a move request it means no suggestion is
/// available for that request; the session itself carries on.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not start engine `{path}`: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("engine did not complete the UCI handshake: {0}")]
    Handshake(String),

    #[error("engine i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("engine closed its output")]
    Disconnected,

    #[error("engine gave no answer within {0:?}")]
    Timeout(Duration),

    #[error("unexpected engine reply `{0}`")]
    Protocol(String),

    /// The engine answered with a move that is not legal in the position it was given.
    #[error("engine suggested illegal move `{0}`")]
    IllegalSuggestion(Uci),

    #[error("engine session is closed")]
    Closed,
}

/// Rejected difficulty input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("level {0} is outside 1-10")]
    OutOfRange(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("could not access game record: {0}")]
    Io(#[from] io::Error),

    #[error("could not encode game record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recorded moves do not replay: {0}")]
    Replay(#[from] MoveError),

    #[error("recorded level is invalid: {0}")]
    Level(#[from] LevelError),

    #[error("recorded side `{0}` is neither white nor black")]
    Side(String),
}
