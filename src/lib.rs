pub mod advisor;
pub mod chess_serde;
pub mod cli;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod game;
pub mod record;
pub mod uci;

use async_trait::async_trait;
use difficulty::SearchLimit;
use error::EngineError;
use shakmaty::{Chess, Move};

pub use shakmaty;

/// Something that can be asked for the best move in a position.
///
/// In production this is an external UCI process ([`uci::UciEngine`]), but the
/// advisor only relies on this trait, so tests can script the answers.
///
/// The lifecycle seen by an implementation is:
///
/// 1. The engine is created and ready to answer.
/// 2. [`Engine::best_move`] is called any number of times, never concurrently.
/// 3. [`Engine::quit`] is called once, after which the engine is not used again.
///
/// ## Positions
/// Every request carries the full [`Chess`] position, so an engine never needs
/// to remember earlier requests. The returned move must be legal in `position`;
/// implementations are expected to check that themselves and answer with
/// [`EngineError::IllegalSuggestion`] otherwise.
#[async_trait]
pub trait Engine: Send {
    /// Search `position` within `limit` and return the move the engine would play.
    ///
    /// This suspends the caller while the engine thinks, for up to `limit.time`.
    async fn best_move(
        &mut self,
        position: &Chess,
        limit: SearchLimit,
    ) -> Result<Move, EngineError>;

    /// Ask the engine to shut down.
    async fn quit(&mut self) -> Result<(), EngineError>;
}
