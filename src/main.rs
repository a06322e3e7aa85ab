use anyhow::Context;
use chess_tui::{
    advisor::AdvisorySession,
    cli::{print_welcome, prompt_level, Match},
    config::Args,
    record::GameRecord,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never land in the middle of the board.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();

    let resumed = match &args.resume {
        Some(path) => {
            let record = GameRecord::load(path)
                .with_context(|| format!("loading game record from {}", path.display()))?;
            info!(plies = record.moves.len(), "resuming game");
            Some((record.replay()?, record.human_side()?, record.difficulty()?))
        }
        None => None,
    };

    let difficulty = match (args.level, &resumed) {
        (Some(level), _) => level,
        (None, Some((_, _, recorded))) => *recorded,
        (None, None) => match prompt_level(&mut input, &mut out).await? {
            Some(level) => level,
            None => return Ok(()),
        },
    };

    let advisor = match AdvisorySession::initialize(&args.engine_config(), difficulty).await {
        Ok(advisor) => advisor,
        Err(why) => {
            error!(%why, "engine initialization failed");
            anyhow::bail!("Failed to initialize chess engine: {why}. Exiting...");
        }
    };

    print_welcome(&mut out)?;
    let mut game = match resumed {
        Some((session, human, _)) => Match::with_game(session, advisor, human),
        None => Match::new(advisor, args.play_as.into()),
    };
    let summary = game.run(&mut input, &mut out).await?;
    info!(ending = ?summary.ending, plies = summary.record.moves.len(), "match over");

    if let Some(path) = &args.save {
        summary
            .record
            .save(path)
            .with_context(|| format!("saving game record to {}", path.display()))?;
        println!("Game saved to {}", path.display());
    }
    Ok(())
}
