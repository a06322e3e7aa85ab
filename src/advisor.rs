//! The advisor: the single owner of the engine, and the suggestion cache in front of it.
//!
//! Every engine request made during a game goes through [`AdvisorySession`].
//! The last suggestion is kept in an [`AdvisoryCache`] so that a move computed
//! for a hint or a "play" request is not searched a second time. Applying any
//! move to the board must be followed by [`AdvisorySession::invalidate_cache`],
//! since the old suggestion belongs to a position that no longer exists.

use std::time::Duration;

use shakmaty::{Chess, Move, Role};
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    difficulty::{Difficulty, SearchLimit},
    error::EngineError,
    uci::UciEngine,
    Engine,
};

/// Time ceiling for hints and "play" suggestions, whatever the difficulty.
pub const SUGGESTION_TIME: Duration = Duration::from_secs(5);

/// A slot for at most one engine suggestion, valid for the current position only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvisoryCache {
    slot: Option<Move>,
}

impl AdvisoryCache {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn peek(&self) -> Option<&Move> {
        self.slot.as_ref()
    }

    /// Replace whatever was cached with `m`.
    pub fn store(&mut self, m: Move) {
        self.slot = Some(m);
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

pub struct AdvisorySession<E> {
    /// `None` once the session has been closed.
    engine: Option<E>,
    cache: AdvisoryCache,
    difficulty: Difficulty,
    depth: Option<u32>,
    requests: u64,
}

impl AdvisorySession<UciEngine> {
    /// Start the engine process described by `config`.
    ///
    /// A failure here is final: there is no engine to talk to, and no game
    /// should be started.
    pub async fn initialize(
        config: &EngineConfig,
        difficulty: Difficulty,
    ) -> Result<Self, EngineError> {
        let engine = UciEngine::spawn(config).await?;
        info!(engine = %config.path.display(), level = difficulty.level(), "engine ready");
        Ok(Self::new(engine, difficulty).with_depth(config.depth))
    }
}

impl<E: Engine> AdvisorySession<E> {
    pub fn new(engine: E, difficulty: Difficulty) -> Self {
        Self {
            engine: Some(engine),
            cache: AdvisoryCache::new(),
            difficulty,
            depth: None,
            requests: 0,
        }
    }

    /// Cap every request at `depth` plies in addition to its time budget.
    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn cache(&self) -> &AdvisoryCache {
        &self.cache
    }

    /// Number of searches sent to the engine so far.
    pub fn requests_issued(&self) -> u64 {
        self.requests
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    #[cfg(test)]
    fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Run a search on `position`, bypassing the cache.
    ///
    /// Uses `time_limit` when given, otherwise the difficulty's think time.
    pub async fn request_move(
        &mut self,
        position: &Chess,
        time_limit: Option<Duration>,
    ) -> Result<Move, EngineError> {
        let engine = self.engine.as_mut().ok_or(EngineError::Closed)?;
        let limit = SearchLimit {
            time: time_limit.unwrap_or_else(|| self.difficulty.think_time()),
            depth: self.depth,
        };
        self.requests += 1;
        debug!(?limit, request = self.requests, "requesting engine move");
        engine.best_move(position, limit).await
    }

    /// The cached suggestion, unless `recalculate` is set or there is none, in
    /// which case a fresh search (at the difficulty's think time) replaces it.
    ///
    /// The bot's own turn always passes `recalculate = true`, so a hint shown
    /// to the human is never replayed as the bot's answer.
    pub async fn get_cached_or_compute(
        &mut self,
        position: &Chess,
        recalculate: bool,
    ) -> Result<Move, EngineError> {
        self.cached_or_search(position, recalculate, None).await
    }

    /// Suggestion for the "play" command.
    ///
    /// Same cache contract as [`Self::get_cached_or_compute`] without
    /// recalculation, but a miss is searched under [`SUGGESTION_TIME`].
    pub async fn play_for_me(&mut self, position: &Chess) -> Result<Move, EngineError> {
        self.cached_or_search(position, false, Some(SUGGESTION_TIME)).await
    }

    /// Which kind of piece the best move moves. The move itself stays cached.
    pub async fn get_hint(&mut self, position: &Chess) -> Result<Role, EngineError> {
        self.cached_or_search(position, false, Some(SUGGESTION_TIME))
            .await
            .map(|m| m.role())
    }

    async fn cached_or_search(
        &mut self,
        position: &Chess,
        recalculate: bool,
        time_limit: Option<Duration>,
    ) -> Result<Move, EngineError> {
        if !recalculate {
            if let Some(m) = self.cache.peek() {
                debug!(?m, "suggestion cache hit");
                return Ok(m.clone());
            }
        }
        let m = self.request_move(position, time_limit).await?;
        self.cache.store(m.clone());
        Ok(m)
    }

    /// Forget the cached suggestion. Call after every move applied to the board.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    /// Shut the engine down. Closing an already closed session does nothing.
    pub async fn close(&mut self) -> Result<(), EngineError> {
        self.cache.clear();
        let Some(mut engine) = self.engine.take() else {
            return Ok(());
        };
        info!(requests = self.requests, "closing engine");
        let result = engine.quit().await;
        if let Err(why) = &result {
            warn!(%why, "engine did not quit cleanly");
        }
        result
    }
}
