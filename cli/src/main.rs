//! # 2048 Search CLI
//!
//! Headless driver for the search engines: plays episodes of 2048 with a
//! configurable policy (random, MCTS, or Expectimax) and reports aggregate
//! statistics in a parseable format.

use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use search_2048_core::expectimax::Expectimax;
use search_2048_core::heuristic::CompositeHeuristic;
use search_2048_core::mcts::Mcts;
use search_2048_core::{Board, Move, SearchError};

#[derive(Parser, Debug)]
#[command(name = "search-2048-cli")]
#[command(author, version, about = "Run search-driven 2048 simulations")]
struct Args {
    /// Number of episodes to run
    #[arg(short, long, default_value = "1")]
    episodes: u32,

    /// Random seed for deterministic runs
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Maximum steps per episode (0 = unlimited)
    #[arg(short, long, default_value = "10000")]
    max_steps: u32,

    /// Policy for move selection
    #[arg(short, long, value_enum, default_value = "expectimax")]
    policy: Policy,

    /// MCTS: tree iterations per move
    #[arg(long, default_value = "200")]
    iterations: u32,

    /// MCTS: rollout depth bound
    #[arg(long, default_value = "16")]
    rollout_depth: u32,

    /// Expectimax: search depth bound
    #[arg(long, default_value = "3")]
    depth: u32,

    /// Show the board after each move
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Random valid moves
    Random,
    /// Monte-Carlo tree search
    Mcts,
    /// Depth-bounded expectimax
    Expectimax,
}

/// A per-episode move picker.
enum Player {
    Random,
    Mcts(Mcts<CompositeHeuristic>),
    Expectimax(Expectimax<CompositeHeuristic>),
}

impl Player {
    fn for_episode(args: &Args, episode_seed: u64) -> Player {
        match args.policy {
            Policy::Random => Player::Random,
            Policy::Mcts => Player::Mcts(
                Mcts::new(args.iterations, args.rollout_depth, CompositeHeuristic::default())
                    .with_seed(episode_seed.wrapping_add(1000)),
            ),
            Policy::Expectimax => {
                Player::Expectimax(Expectimax::new(args.depth, CompositeHeuristic::default()))
            }
        }
    }

    fn pick(&mut self, board: &Board, rng: &mut SmallRng) -> Option<Move> {
        match self {
            Player::Random => select_random_move(board, rng),
            Player::Mcts(engine) => report_search(engine.search(board)),
            Player::Expectimax(engine) => report_search(engine.search(board)),
        }
    }
}

fn report_search(result: Result<Move, SearchError>) -> Option<Move> {
    match result {
        Ok(mv) => Some(mv),
        Err(SearchError::NoAvailableMoves) => None,
        Err(err) => {
            eprintln!("search failed: {err}");
            None
        }
    }
}

/// Pick a uniformly random legal move.
fn select_random_move(board: &Board, rng: &mut SmallRng) -> Option<Move> {
    let moves = board.available_moves();
    if moves.is_empty() {
        None
    } else {
        Some(moves[rng.gen_range(0..moves.len())])
    }
}

fn tile_mass(board: &Board) -> u64 {
    board.grid().iter().flatten().map(|&v| v as u64).sum()
}

fn main() {
    let args = Args::parse();
    run_headless(&args);
}

fn run_headless(args: &Args) {
    let mut masses: Vec<u64> = Vec::with_capacity(args.episodes as usize);
    let mut max_tiles: Vec<u32> = Vec::with_capacity(args.episodes as usize);
    let mut total_mass: u64 = 0;
    let mut max_tile_overall: u32 = 0;

    // Separate RNG for random-policy move selection
    let mut action_rng = SmallRng::seed_from_u64(args.seed.wrapping_add(1000));

    for episode in 0..args.episodes {
        let episode_seed = args.seed.wrapping_add(episode as u64);
        let mut board = Board::fresh(episode_seed);
        let mut player = Player::for_episode(args, episode_seed);
        let mut steps = 0;

        while !board.is_terminal() && (args.max_steps == 0 || steps < args.max_steps) {
            let mv = match player.pick(&board, &mut action_rng) {
                Some(mv) => mv,
                None => break,
            };
            board.step(mv);
            steps += 1;

            if args.verbose {
                println!("Episode {} Step {}: {:?}", episode + 1, steps, mv);
                print!("{}", board);
            }
        }

        let mass = tile_mass(&board);
        let max_tile = board.max_tile();

        masses.push(mass);
        max_tiles.push(max_tile);
        total_mass += mass;
        max_tile_overall = max_tile_overall.max(max_tile);

        if args.verbose {
            println!(
                "Episode {}: Mass={}, MaxTile={}, Steps={}",
                episode + 1,
                mass,
                max_tile,
                steps
            );
        }
    }

    // Compute statistics
    let avg_mass = total_mass as f64 / args.episodes.max(1) as f64;
    masses.sort();
    let median_mass = if masses.is_empty() {
        0.0
    } else if masses.len() % 2 == 0 {
        (masses[masses.len() / 2 - 1] + masses[masses.len() / 2]) as f64 / 2.0
    } else {
        masses[masses.len() / 2] as f64
    };

    // Count max-tile distribution
    let mut tile_counts = std::collections::HashMap::new();
    for tile in &max_tiles {
        *tile_counts.entry(*tile).or_insert(0u32) += 1;
    }

    // Output results in parseable format
    println!("=== Simulation Results ===");
    println!("episodes={}", args.episodes);
    println!("policy={:?}", args.policy);
    println!("seed={}", args.seed);
    println!("max_steps={}", args.max_steps);
    println!("avg_mass={:.2}", avg_mass);
    println!("median_mass={:.2}", median_mass);
    println!("min_mass={}", masses.first().unwrap_or(&0));
    println!("max_mass={}", masses.last().unwrap_or(&0));
    println!("max_tile_overall={}", max_tile_overall);

    let mut tile_list: Vec<_> = tile_counts.iter().collect();
    tile_list.sort_by_key(|&(tile, _)| *tile);
    print!("tile_distribution=");
    for (i, (tile, count)) in tile_list.iter().enumerate() {
        if i > 0 {
            print!(",");
        }
        print!("{}:{}", tile, count);
    }
    println!();
}
