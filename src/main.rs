use clap::{Parser, ValueEnum};
use sisyphus::{
    describe, new_board, precompute, solve, Config, Described, MovesVsPushes, SearchDirection,
};
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    Forward,
    Backward,
    Both,
}

impl From<Direction> for SearchDirection {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Forward => SearchDirection::Forward,
            Direction::Backward => SearchDirection::Backward,
            Direction::Both => SearchDirection::Both,
        }
    }
}

struct LevelStats {
    solved: bool,
    moves: u32,
    elapsed_ms: u128,
}

fn solve_level(
    level_text: &str,
    level_num: usize,
    config: &Config,
    print_solution: bool,
) -> Result<LevelStats, String> {
    let board = new_board(level_text).map_err(|e| format!("level {}: {}", level_num, e))?;
    let tables = precompute(&board, config);

    let log_progress = |report: sisyphus::ProgressReport| {
        log::debug!(
            "level {}: {} nodes, depth {}, {} ms",
            level_num,
            report.nodes_visited,
            report.current_depth,
            report.elapsed_ms
        );
    };

    let start = Instant::now();
    let verdict = solve(&board, &tables, config, None, Some(log_progress))
        .map_err(|e| format!("level {}: {}", level_num, e))?;
    let elapsed_ms = start.elapsed().as_millis();

    let (solved_char, moves, solved) = match &verdict {
        sisyphus::Verdict::Solved { moves, .. } => ('Y', *moves, true),
        sisyphus::Verdict::ProvenUnsolvable { .. } => ('X', 0, false),
        sisyphus::Verdict::BudgetExhausted { .. } => ('N', 0, false),
        sisyphus::Verdict::Cancelled => ('C', 0, false),
    };

    let described = describe(&verdict);
    let detail = match &described {
        Described::Solution { pushes, .. } => format!("{} pushes", pushes),
        Described::Reason(reason) => reason.clone(),
    };

    println!(
        "level: {:<3}  solved: {}  moves: {:<5}  elapsed: {} ms  ({})",
        level_num, solved_char, moves, elapsed_ms, detail
    );

    if print_solution {
        if let Described::Solution { lurd, .. } = &described {
            println!("  lurd: {}", lurd);
        }
    }

    Ok(LevelStats {
        solved,
        moves,
        elapsed_ms,
    })
}

#[derive(Parser)]
#[command(name = "sisyphus")]
#[command(about = "A Sokoban solver", long_about = None)]
struct Args {
    /// Path to the levels file (XSB format, `;`-separated)
    #[arg(value_name = "FILE")]
    levels_file: String,

    /// Level number to solve (1-indexed), or start of range
    #[arg(value_name = "LEVEL")]
    level_start: usize,

    /// Optional end of level range (inclusive, 1-indexed)
    #[arg(value_name = "LEVEL_END")]
    level_end: Option<usize>,

    /// Print the solution's LURD move string
    #[arg(short, long)]
    print_solution: bool,

    /// Maximum number of nodes to explore before giving up
    #[arg(short = 'n', long, default_value = "5000000")]
    max_nodes: usize,

    /// Wall-clock budget per level, in milliseconds (unbounded if omitted)
    #[arg(long)]
    wall_clock_millis: Option<u64>,

    /// Search direction
    #[arg(short = 'd', long, value_enum, default_value = "both")]
    direction: Direction,

    /// Disable freeze deadlock detection
    #[arg(long, default_value = "false")]
    no_freeze: bool,

    /// Disable simple dead-square pruning
    #[arg(long, default_value = "false")]
    no_simple: bool,

    /// Disable PI-corral pruning
    #[arg(long, default_value = "false")]
    no_corral: bool,

    /// Disable bipartite-matching deadlock detection
    #[arg(long, default_value = "false")]
    no_bipartite: bool,

    /// Disable closed-diagonal deadlock detection
    #[arg(long, default_value = "false")]
    no_closed_diagonal: bool,

    /// Node budget for the bounded corral-discharge search (0 = unbounded)
    #[arg(long, default_value = "10000")]
    corral_discharge_max_nodes: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let levels = match sisyphus::levels::Levels::from_file(&args.levels_file) {
        Ok(levels) => levels,
        Err(e) => {
            eprintln!("Error loading levels: {}", e);
            std::process::exit(1);
        }
    };

    let level_end = args.level_end.unwrap_or(args.level_start);
    let num_levels = level_end - args.level_start + 1;

    if args.level_start == 0 {
        eprintln!("Error: level numbers must be at least 1");
        std::process::exit(1);
    }
    if level_end < args.level_start {
        eprintln!("Error: level end must be >= level start");
        std::process::exit(1);
    }
    if level_end > levels.len() {
        eprintln!(
            "Error: level {} not found (file contains {} levels)",
            level_end,
            levels.len()
        );
        std::process::exit(1);
    }
    if args.print_solution && num_levels > 1 {
        eprintln!("Error: solution printing only supported when solving a single level");
        std::process::exit(1);
    }

    let config = Config {
        detect_simple: !args.no_simple,
        detect_freeze: !args.no_freeze,
        detect_corral: !args.no_corral,
        detect_bipartite: !args.no_bipartite,
        detect_closed_diagonal: !args.no_closed_diagonal,
        direction: args.direction.into(),
        max_pushes: u32::MAX,
        max_nodes: args.max_nodes,
        wall_clock_millis: args.wall_clock_millis,
        moves_vs_pushes: MovesVsPushes::PushesFirst,
        corral_discharge_max_nodes: args.corral_discharge_max_nodes,
    };

    let mut total_solved = 0;
    let mut total_moves = 0u64;
    let mut total_time_ms = 0u128;

    for level_num in args.level_start..=level_end {
        let level_text = levels.get(level_num - 1).unwrap().to_string();
        match solve_level(&level_text, level_num, &config, args.print_solution) {
            Ok(stats) => {
                if stats.solved {
                    total_solved += 1;
                }
                total_moves += stats.moves as u64;
                total_time_ms += stats.elapsed_ms;
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    if num_levels > 1 {
        println!("---");
        println!(
            "solved: {:>3}/{:<3}        moves: {:<6}  elapsed: {} ms",
            total_solved, num_levels, total_moves, total_time_ms
        );
    }
}
