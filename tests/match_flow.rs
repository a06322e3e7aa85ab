use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chess_tui::{
    advisor::AdvisorySession,
    cli::{prompt_level, Ending, Match, Turn, RETRY_PROMPT},
    difficulty::{Difficulty, SearchLimit},
    error::EngineError,
    game::{GameOutcome, Termination},
    Engine,
};
use shakmaty::{uci::Uci, Chess, Color, Move, Position};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Plays scripted UCI moves, then the first legal move. Counters are shared so
/// they can be read after the match has closed the engine.
#[derive(Clone, Default)]
struct Scripted {
    answers: Arc<Mutex<VecDeque<&'static str>>>,
    requests: Arc<AtomicUsize>,
    quits: Arc<AtomicUsize>,
    /// Searches left that run out of time before answering.
    timeouts: Arc<AtomicUsize>,
    fail: bool,
}

impl Scripted {
    fn answering(moves: &[&'static str]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(moves.iter().copied().collect())),
            ..Self::default()
        }
    }

    fn slow(timeouts: usize) -> Self {
        Self {
            timeouts: Arc::new(AtomicUsize::new(timeouts)),
            ..Self::default()
        }
    }

    fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for Scripted {
    async fn best_move(
        &mut self,
        position: &Chess,
        _: SearchLimit,
    ) -> Result<Move, EngineError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::Disconnected);
        }
        let overran = self
            .timeouts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if overran {
            return Err(EngineError::Timeout(Duration::from_secs(1)));
        }
        let scripted = self.answers.lock().unwrap().pop_front();
        match scripted {
            Some(text) => {
                let uci = Uci::from_str(text).unwrap();
                uci.to_move(position)
                    .map_err(|_| EngineError::IllegalSuggestion(uci))
            }
            None => Ok(position.legal_moves()[0].clone()),
        }
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn new_match(engine: Scripted, human: Color) -> Match<Scripted> {
    let advisor = AdvisorySession::new(engine, Difficulty::new(4).unwrap());
    Match::new(advisor, human)
}

async fn run(game: &mut Match<Scripted>, script: &str) -> (Ending, String) {
    let mut input = BufReader::new(script.as_bytes()).lines();
    let mut out = Vec::new();
    let summary = game.run(&mut input, &mut out).await.unwrap();
    (summary.ending, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn human_move_then_bot_reply() {
    let engine = Scripted::answering(&["e7e5"]);
    let mut game = new_match(engine.clone(), Color::White);

    let (ending, out) = run(&mut game, "e4\nexit\n").await;

    assert_eq!(ending, Ending::Exited);
    assert!(out.contains("Your move: e4 (e2e4)"), "{out}");
    assert!(out.contains("Bot played: e5 (e7e5)"), "{out}");
    assert!(out.contains("Thanks for playing! Goodbye!"));
    assert_eq!(game.game().ply_count(), 2);
    assert!(game.advisor().cache().is_empty());
    assert_eq!(engine.requests(), 1);
    assert_eq!(engine.quits(), 1);
    assert_eq!(game.turn(), Turn::Finished);
}

#[tokio::test]
async fn hint_names_only_the_piece_and_keeps_the_turn() {
    let engine = Scripted::answering(&["g1f3"]);
    let mut game = new_match(engine.clone(), Color::White);

    let (_, out) = run(&mut game, "help\nhelp\nexit\n").await;

    assert_eq!(out.matches("Hint: move a knight.").count(), 2, "{out}");
    assert!(!out.contains("g1f3"), "the hint must not reveal the move: {out}");
    assert_eq!(engine.requests(), 1, "second hint is a cache hit");
    assert_eq!(game.game().ply_count(), 0);
}

#[tokio::test]
async fn played_suggestion_is_not_searched_again() {
    let engine = Scripted::answering(&["e2e4", "c7c5"]);
    let mut game = new_match(engine.clone(), Color::White);

    let (_, out) = run(&mut game, "play\nhelp\ne4\nexit\n").await;

    assert!(out.contains("Suggested move: e4 (e2e4)"), "{out}");
    assert!(out.contains("Hint: move a pawn."), "{out}");
    assert!(out.contains("Bot played: c5 (c7c5)"), "{out}");
    // One search for the suggestion (reused by the hint), one for the bot.
    assert_eq!(engine.requests(), 2);
}

#[tokio::test]
async fn suggestion_after_a_move_is_fresh() {
    let engine = Scripted::answering(&["e2e4", "e7e5", "g1f3"]);
    let mut game = new_match(engine.clone(), Color::White);

    let (_, out) = run(&mut game, "play\nd4\nplay\nexit\n").await;

    assert!(out.contains("Suggested move: e4 (e2e4)"), "{out}");
    assert!(out.contains("Suggested move: Nf3 (g1f3)"), "{out}");
    assert_eq!(engine.requests(), 3);
}

#[tokio::test]
async fn bad_input_reprompts_without_touching_the_board() {
    let engine = Scripted::default();
    let mut game = new_match(engine.clone(), Color::White);

    let (_, out) = run(&mut game, "e5\nzz9\n\nO-O\nexit\n").await;

    assert_eq!(out.matches("Illegal move! Try again.").count(), 2, "{out}");
    assert!(out.contains("Invalid move format! Try again."), "{out}");
    assert_eq!(game.game().ply_count(), 0);
    assert_eq!(engine.requests(), 0);
}

#[tokio::test]
async fn lost_engine_ends_the_match() {
    let engine = Scripted::broken();
    let mut game = new_match(engine.clone(), Color::White);

    let (ending, out) = run(&mut game, "help\nplay\ne4\n").await;

    assert!(out.contains("Error getting hint"), "{out}");
    assert!(out.contains("Could not get best move"), "{out}");
    assert!(out.contains("Could not get the bot's move"), "{out}");
    assert!(!out.contains(RETRY_PROMPT), "a lost engine cannot retry: {out}");
    assert!(out.contains("Game abandoned"), "{out}");
    assert_eq!(ending, Ending::EngineFailed);
    assert_eq!(game.game().ply_count(), 1);
    assert_eq!(engine.quits(), 1);
}

#[tokio::test]
async fn bot_that_ran_out_of_time_can_try_again() {
    let engine = Scripted::slow(1);
    let mut game = new_match(engine.clone(), Color::White);

    let (ending, out) = run(&mut game, "e4\n\nexit\n").await;

    assert!(out.contains("Could not get the bot's move"), "{out}");
    assert_eq!(out.matches(RETRY_PROMPT).count(), 1, "{out}");
    assert!(out.contains("Bot played:"), "{out}");
    assert_eq!(ending, Ending::Exited);
    assert_eq!(game.game().ply_count(), 2);
    assert_eq!(game.game().turn(), Color::White);
    assert_eq!(engine.requests(), 2);
}

#[tokio::test]
async fn human_can_leave_instead_of_waiting_for_the_bot() {
    let engine = Scripted::slow(5);
    let mut game = new_match(engine.clone(), Color::White);

    let (ending, out) = run(&mut game, "e4\nexit\n").await;

    assert!(out.contains(RETRY_PROMPT), "{out}");
    assert!(out.contains("Thanks for playing! Goodbye!"), "{out}");
    assert!(!out.contains("Game abandoned"), "{out}");
    assert_eq!(ending, Ending::Exited);
    assert_eq!(game.game().ply_count(), 1);
    assert_eq!(engine.requests(), 1);
    assert_eq!(engine.quits(), 1);
}

#[tokio::test]
async fn illegal_bot_move_is_reported_and_retried() {
    // `e2e4` is a white move, offered while black is to play.
    let engine = Scripted::answering(&["e2e4", "e7e5"]);
    let mut game = new_match(engine.clone(), Color::White);

    let (ending, out) = run(&mut game, "d4\n\nexit\n").await;

    assert!(out.contains("Could not get the bot's move"), "{out}");
    assert!(out.contains("Bot played: e5 (e7e5)"), "{out}");
    assert_eq!(ending, Ending::Exited);
    assert_eq!(game.game().ply_count(), 2);
}

#[tokio::test]
async fn bot_delivers_mate() {
    let engine = Scripted::answering(&["e7e5", "d8h4"]);
    let mut game = new_match(engine.clone(), Color::White);

    let (ending, out) = run(&mut game, "f3\ng4\n").await;

    assert_eq!(
        ending,
        Ending::Outcome(GameOutcome {
            winner: Some(Color::Black),
            termination: Termination::Checkmate,
        })
    );
    assert!(out.contains("Bot played: Qh4# (d8h4)"), "{out}");
    assert!(out.contains("Game over! Bot won by checkmate."), "{out}");
    assert_eq!(engine.quits(), 1);
}

#[tokio::test]
async fn human_mates_the_bot() {
    let engine = Scripted::answering(&["f2f3", "g2g4"]);
    let mut game = new_match(engine.clone(), Color::Black);

    let (_, out) = run(&mut game, "e5\nQh4#\n").await;

    assert!(out.contains("Game over! You won by checkmate."), "{out}");
    assert!(game.game().position().is_checkmate());
}

#[tokio::test]
async fn end_of_input_closes_the_engine() {
    let engine = Scripted::default();
    let mut game = new_match(engine.clone(), Color::Black);

    let (ending, _) = run(&mut game, "").await;

    assert_eq!(ending, Ending::Exited);
    assert_eq!(game.game().ply_count(), 1, "the bot opens when the human is black");
    assert_eq!(engine.quits(), 1);
    assert!(game.advisor().is_closed());
}

#[tokio::test]
async fn level_prompt_insists_on_one_to_ten() {
    let mut input = BufReader::new(&b"abc\n0\n11\n 7 \n"[..]).lines();
    let mut out = Vec::new();

    let level = prompt_level(&mut input, &mut out).await.unwrap();

    let out = String::from_utf8(out).unwrap();
    assert_eq!(level.map(Difficulty::level), Some(7));
    assert_eq!(out.matches("Enter a valid number.").count(), 1);
    assert_eq!(out.matches("Enter a number between 1 and 10.").count(), 2);

    let mut empty = BufReader::new(&b""[..]).lines();
    assert_eq!(prompt_level(&mut empty, &mut Vec::new()).await.unwrap(), None);
}
