use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use expectimax_2048::engine::{Board, Move};
use expectimax_2048::expectimax::{Expectimax, ExpectimaxConfig, ExpectimaxParallel};
use expectimax_2048::game::Game;

#[derive(Parser, Debug)]
#[command(name = "expectimax-2048", version, about = "Play 2048 headlessly with an expectimax policy")]
struct Args {
    /// Seed for tile spawns (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many moves
    #[arg(long, value_name = "N")]
    max_moves: Option<u64>,
    /// Use the rayon-parallel search
    #[arg(long)]
    parallel: bool,
    /// JSON search config (cutoffs, tie_break, par_thresholds)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the board every N moves (0 disables)
    #[arg(long, value_name = "N", default_value_t = 0)]
    print_every: u64,
    /// Only print the final summary
    #[arg(short, long)]
    quiet: bool,
}

enum Policy {
    Seq(Expectimax),
    Par(ExpectimaxParallel),
}

impl Policy {
    fn best_move(&mut self, board: Board) -> Option<Move> {
        match self {
            Policy::Seq(ex) => ex.best_move(board),
            Policy::Par(ex) => ex.best_move(board),
        }
    }

    fn nodes(&self) -> u64 {
        match self {
            Policy::Seq(ex) => ex.last_stats().nodes,
            Policy::Par(ex) => ex.last_stats().nodes,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => ExpectimaxConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExpectimaxConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, parallel = args.parallel, ?cfg, "starting game");

    let mut policy = if args.parallel {
        Policy::Par(ExpectimaxParallel::with_config(cfg))
    } else {
        Policy::Seq(Expectimax::with_config(cfg))
    };
    let mut game = Game::new(seed);
    let start = Instant::now();
    let mut total_states: u64 = 0;
    let mut peak_states: u64 = 0;

    if !args.quiet {
        println!("{}", game.board());
    }
    while args.max_moves.map_or(true, |limit| game.moves() < limit) {
        let Some(dir) = policy.best_move(game.board()) else {
            tracing::info!(highest_tile = game.board().highest_tile(), "no legal move left");
            break;
        };
        game.apply(dir);
        let nodes = policy.nodes();
        total_states = total_states.saturating_add(nodes);
        peak_states = peak_states.max(nodes);
        tracing::debug!(%dir, score = game.score(), nodes, "move applied");
        if !args.quiet && args.print_every > 0 && game.moves() % args.print_every == 0 {
            println!("move {} ({}) score {}\n{}", game.moves(), dir, game.score(), game.board());
        }
    }

    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    if !args.quiet {
        println!("{}", game.board());
    }
    println!(
        "Moves: {} | moves/sec: {:.1} | score: {} | highest tile: {} | states: {} (peak {})",
        game.moves(),
        game.moves() as f64 / elapsed,
        game.score(),
        game.board().highest_tile(),
        total_states,
        peak_states
    );
    Ok(())
}
