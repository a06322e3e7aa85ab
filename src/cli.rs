//! The terminal game loop.
//!
//! [`Match`] ties one [`GameSession`] to one [`AdvisorySession`] and walks the
//! turn state machine:
//!
//! ```text
//! AwaitingHumanMove --legal move--> AwaitingBotMove --bot move--> AwaitingHumanMove ...
//!         |                                 |
//!         +--- exit / game over ---> Finished <--- game over / engine lost
//! ```
//!
//! "help" and "play" are answered without leaving `AwaitingHumanMove`. When
//! the bot fails to move but its engine is still alive, the human is asked
//! whether to let it try again.
//! Input and output are plain streams so the loop can be scripted.

use std::io::{self, Write};

use shakmaty::{CastlingMode, Color, Move};
use tokio::io::{AsyncBufRead, Lines};
use tracing::{debug, error, warn};

use crate::{
    advisor::AdvisorySession,
    difficulty::Difficulty,
    error::{EngineError, LevelError, MoveError},
    game::{role_name, GameOutcome, GameSession},
    record::GameRecord,
    Engine,
};

pub const MOVE_PROMPT: &str =
    "Enter your move (e.g., 'e4', 'Nf3'), or ask for 'help', 'play', or 'exit': ";

pub const RETRY_PROMPT: &str = "Press enter to let the bot try again, or type 'exit': ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    AwaitingHumanMove,
    AwaitingBotMove,
    Finished,
}

/// Why a match stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// The game ended on the board.
    Outcome(GameOutcome),
    /// The human typed `exit` or closed the input.
    Exited,
    /// The engine is gone, so the bot can no longer move.
    EngineFailed,
}

#[derive(Debug, Clone)]
pub struct MatchSummary {
    pub ending: Ending,
    pub record: GameRecord,
}

pub fn print_welcome<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Welcome to Chess TUI!")?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  - 'help': get a hint")?;
    writeln!(out, "  - 'play': ask the bot which move it would play for you")?;
    writeln!(out, "  - 'exit': quit the game")?;
    writeln!(out)?;
    writeln!(out, "Move notation examples (SAN):")?;
    writeln!(out, "  - Basic moves: e4, Nf3, Bc4")?;
    writeln!(out, "  - Captures: Bxe5, exd5")?;
    writeln!(out, "  - Check: Qh5+")?;
    writeln!(out, "  - Checkmate: Qxf7#")?;
    writeln!(out, "  - Castling: O-O (kingside) or O-O-O (queenside)")?;
    writeln!(out, "  - Promotion: e8=Q")?;
    writeln!(
        out,
        "  - Disambiguation: Rae1 (rook from a-file), Nbd7 (knight from b-file)"
    )?;
    writeln!(
        out,
        "    Use file (a-h) or rank (1-8) to specify which piece to move"
    )
}

/// Ask for the bot level until a valid one is entered. `None` if input ends first.
pub async fn prompt_level<R, W>(
    input: &mut Lines<R>,
    out: &mut W,
) -> io::Result<Option<Difficulty>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Select bot level (1-10, where 1 = easy, 10 = hard):")?;
    loop {
        write!(out, "Level: ")?;
        out.flush()?;
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match line.parse::<Difficulty>() {
            Ok(difficulty) => return Ok(Some(difficulty)),
            Err(LevelError::NotANumber(_)) => writeln!(out, "Enter a valid number.")?,
            Err(LevelError::OutOfRange(_)) => writeln!(out, "Enter a number between 1 and 10.")?,
        }
    }
}

fn guidance(why: &MoveError) -> &'static str {
    match why {
        MoveError::Ambiguous(_) => {
            "Ambiguous move! Be more specific (e.g., 'Rae1' for rook from a-file, 'Rhe1' for rook from h-file)"
        }
        MoveError::Illegal(_) => "Illegal move! Try again.",
        MoveError::Malformed(_) => "Invalid move format! Try again.",
    }
}

pub struct Match<E> {
    game: GameSession,
    advisor: AdvisorySession<E>,
    human: Color,
    turn: Turn,
}

impl<E: Engine> Match<E> {
    pub fn new(advisor: AdvisorySession<E>, human: Color) -> Self {
        Self::with_game(GameSession::new(), advisor, human)
    }

    /// A match continuing from an existing game.
    pub fn with_game(game: GameSession, advisor: AdvisorySession<E>, human: Color) -> Self {
        let mut this = Self {
            game,
            advisor,
            human,
            turn: Turn::Finished,
        };
        this.next_turn();
        this
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn advisor(&self) -> &AdvisorySession<E> {
        &self.advisor
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    /// Apply `m` and drop the now stale suggestion. Returns the move in
    /// algebraic notation.
    pub fn apply(&mut self, m: &Move) -> Result<String, MoveError> {
        let san = self.game.apply_move(m)?;
        self.advisor.invalidate_cache();
        Ok(san)
    }

    fn next_turn(&mut self) {
        self.turn = if self.game.is_terminal() {
            Turn::Finished
        } else if self.game.turn() == self.human {
            Turn::AwaitingHumanMove
        } else {
            Turn::AwaitingBotMove
        };
        debug!(turn = ?self.turn, ply = self.game.ply_count(), "turn");
    }

    /// Play until the game ends, the human leaves, or the engine is lost.
    ///
    /// The engine is closed before this returns, whichever way the match ends.
    pub async fn run<R, W>(
        &mut self,
        input: &mut Lines<R>,
        out: &mut W,
    ) -> io::Result<MatchSummary>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let ending = self.play(input, out).await;
        self.turn = Turn::Finished;
        if let Err(why) = self.advisor.close().await {
            warn!(%why, "engine shutdown failed");
        }
        let ending = ending?;
        self.announce(ending, out)?;
        Ok(MatchSummary {
            ending,
            record: GameRecord::new(&self.game, self.advisor.difficulty(), self.human),
        })
    }

    async fn play<R, W>(&mut self, input: &mut Lines<R>, out: &mut W) -> io::Result<Ending>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(out, "{}", self.game.render_board())?;
        loop {
            match self.turn {
                Turn::AwaitingHumanMove => {
                    write!(out, "{MOVE_PROMPT}")?;
                    out.flush()?;
                    let Some(line) = input.next_line().await? else {
                        writeln!(out)?;
                        return Ok(Ending::Exited);
                    };
                    let command = line.trim();
                    match command.to_ascii_lowercase().as_str() {
                        "" => continue,
                        "help" => self.hint(out).await?,
                        "play" => self.suggest(out).await?,
                        "exit" => {
                            writeln!(out, "Thanks for playing! Goodbye!")?;
                            return Ok(Ending::Exited);
                        }
                        _ => self.human_move(command, out)?,
                    }
                }
                Turn::AwaitingBotMove => match self.bot_move(out).await? {
                    Ok(()) => {}
                    Err(EngineError::Closed | EngineError::Disconnected) => {
                        return Ok(Ending::EngineFailed);
                    }
                    Err(_) => {
                        write!(out, "{RETRY_PROMPT}")?;
                        out.flush()?;
                        match input.next_line().await? {
                            None => {
                                writeln!(out)?;
                                return Ok(Ending::Exited);
                            }
                            Some(line) if line.trim().eq_ignore_ascii_case("exit") => {
                                writeln!(out, "Thanks for playing! Goodbye!")?;
                                return Ok(Ending::Exited);
                            }
                            Some(_) => continue,
                        }
                    }
                },
                Turn::Finished => {
                    return Ok(self.game.outcome().map_or(Ending::Exited, Ending::Outcome));
                }
            }
            if let Some(outcome) = self.game.outcome() {
                return Ok(Ending::Outcome(outcome));
            }
        }
    }

    async fn hint<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Getting hint...")?;
        match self.advisor.get_hint(self.game.position()).await {
            Ok(role) => writeln!(out, "Hint: move a {}.", role_name(role)),
            Err(why) => {
                warn!(%why, "hint failed");
                writeln!(out, "Error getting hint: {why}")
            }
        }
    }

    async fn suggest<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Using best calculated move...")?;
        match self.advisor.play_for_me(self.game.position()).await {
            Ok(m) => writeln!(
                out,
                "Suggested move: {} ({})",
                self.game.to_algebraic(&m),
                self.game.to_coordinate(&m)
            ),
            Err(why) => {
                warn!(%why, "suggestion failed");
                writeln!(out, "Could not get best move: {why}")
            }
        }
    }

    fn human_move<W: Write>(&mut self, text: &str, out: &mut W) -> io::Result<()> {
        let applied = self.game.parse_algebraic(text).and_then(|m| {
            let uci = self.game.to_coordinate(&m);
            self.apply(&m).map(|san| (san, uci))
        });
        match applied {
            Ok((san, uci)) => {
                writeln!(out, "Your move: {san} ({uci})")?;
                writeln!(out, "{}", self.game.render_board())?;
                self.next_turn();
            }
            Err(why) => {
                debug!(%why, "move rejected");
                writeln!(out, "{}", guidance(&why))?;
            }
        }
        Ok(())
    }

    /// The inner error says why the bot did not move; it has already been
    /// shown to the human.
    async fn bot_move<W: Write>(&mut self, out: &mut W) -> io::Result<Result<(), EngineError>> {
        writeln!(out, "Bot is thinking...")?;
        let played = self
            .advisor
            .get_cached_or_compute(self.game.position(), true)
            .await
            .and_then(|m| {
                let uci = self.game.to_coordinate(&m);
                self.apply(&m)
                    .map(|san| (san, uci))
                    .map_err(|_| EngineError::IllegalSuggestion(m.to_uci(CastlingMode::Standard)))
            });
        let (san, uci) = match played {
            Ok(played) => played,
            Err(why) => {
                error!(%why, "bot move failed");
                writeln!(out, "Could not get the bot's move: {why}")?;
                return Ok(Err(why));
            }
        };
        writeln!(out, "Bot played: {san} ({uci})")?;
        writeln!(out, "{}", self.game.render_board())?;
        self.next_turn();
        if self.turn == Turn::AwaitingHumanMove {
            writeln!(out, "Your turn!")?;
        }
        Ok(Ok(()))
    }

    fn announce<W: Write>(&self, ending: Ending, out: &mut W) -> io::Result<()> {
        match ending {
            Ending::Outcome(outcome) => {
                let verdict = match outcome.winner {
                    Some(winner) if winner == self.human => "You won",
                    Some(_) => "Bot won",
                    None => "Draw",
                };
                writeln!(out, "Game over! {verdict} by {}.", outcome.termination)
            }
            Ending::EngineFailed => writeln!(out, "Game abandoned: the bot's engine is gone."),
            Ending::Exited => Ok(()),
        }
    }
}
