use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plo_equity::canonical::{normalize, normalize_dependent};
use plo_equity::cards::{format_cards, parse_cards};
use plo_equity::config::SimulationConfig;
use plo_equity::display::{
    cards_display, equity_bar, mapping_table, print_error, print_section, print_success,
    rankings_table, result_table,
};
use plo_equity::equity::{EquityQuery, SimulationEngine};
use plo_equity::error::{PloError, PloResult};
use plo_equity::hand_evaluator::HOLE_CARDS;
use plo_equity::observer::TracingObserver;
use plo_equity::rank_cache::RankCache;
use plo_equity::ranker::{canonical_hole_hands, dedup_canonical, rank_hole_hands, save_csv, HoleHand};

#[derive(Parser)]
#[command(
    name = "plo",
    version = "1.0.0",
    about = "Pot-Limit Omaha equity: suit canonicalization, hand ranks and adaptive Monte-Carlo simulation."
)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Simulation knobs shared by `equity` and `rank-holes`. Flags override the
/// config file, which overrides the defaults.
#[derive(Args)]
struct SimulationArgs {
    /// JSON simulation config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Worker threads (1 runs on the main thread)
    #[arg(short = 't', long)]
    threads: Option<usize>,
    /// RNG seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,
    /// Trials per worker batch
    #[arg(long)]
    batch_size: Option<u64>,
    /// Minimum trials before stopping
    #[arg(long)]
    min_trials: Option<u64>,
    /// Maximum standard deviation of the win rate
    #[arg(long)]
    max_sigma: Option<f64>,
    /// Maximum 95% confidence half-width
    #[arg(long)]
    max_half_width: Option<f64>,
    /// Rank table to load instead of generating one
    #[arg(long)]
    table: Option<PathBuf>,
}

impl SimulationArgs {
    fn config(&self) -> PloResult<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(min_trials) = self.min_trials {
            config.stopping.min_trials = min_trials;
        }
        if let Some(max_sigma) = self.max_sigma {
            config.stopping.max_sigma = max_sigma;
        }
        if let Some(max_half_width) = self.max_half_width {
            config.stopping.max_half_width = max_half_width;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate hero's win rate against known or random opponents
    Equity {
        /// Hero hole cards (e.g., KsKh8d7c)
        hero: String,
        /// Opponent hole cards; none means one random opponent
        opponents: Vec<String>,
        #[command(flatten)]
        sim: SimulationArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Canonicalize cards, optionally relative to a reference hand
    Normalize {
        /// Cards to canonicalize (e.g., AsKdKcQh)
        cards: String,
        /// Reference hand whose mapping is applied to CARDS
        #[arg(long)]
        against: Option<String>,
    },
    /// Look up the strength rank of five cards
    Rank {
        /// Five cards (e.g., AsKsQsJsTs)
        cards: String,
        /// Rank table to load instead of generating one
        #[arg(long)]
        table: Option<PathBuf>,
    },
    /// Generate the five-card rank table and write it to a file
    GenerateTable {
        /// Output path
        out: PathBuf,
    },
    /// Rank starting hands by win rate against a random opponent
    RankHoles {
        /// Hands to rank
        hands: Vec<String>,
        /// Rank every canonical starting hand
        #[arg(long)]
        all: bool,
        /// Show only the top N
        #[arg(short, long)]
        limit: Option<usize>,
        /// Write the full ranking as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        #[command(flatten)]
        sim: SimulationArgs,
    },
}

pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = dispatch(cli.command) {
        print_error(&e.to_string());
        std::process::exit(if e.is_input_error() { 2 } else { 1 });
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn dispatch(command: Commands) -> PloResult<()> {
    match command {
        Commands::Equity {
            hero,
            opponents,
            sim,
            json,
        } => cmd_equity(&hero, &opponents, &sim, json),
        Commands::Normalize { cards, against } => cmd_normalize(&cards, against.as_deref()),
        Commands::Rank { cards, table } => cmd_rank(&cards, table),
        Commands::GenerateTable { out } => cmd_generate_table(out),
        Commands::RankHoles {
            hands,
            all,
            limit,
            csv,
            sim,
        } => cmd_rank_holes(&hands, all, limit, csv, &sim),
    }
}

enum CacheSource {
    Loaded(RankCache),
    Shared,
}

impl CacheSource {
    fn open(table: Option<&PathBuf>) -> PloResult<CacheSource> {
        match table {
            Some(path) => {
                info!(path = %path.display(), "loading rank table");
                Ok(CacheSource::Loaded(RankCache::load(path)?))
            }
            None => Ok(CacheSource::Shared),
        }
    }

    fn cache(&self) -> &RankCache {
        match self {
            CacheSource::Loaded(cache) => cache,
            CacheSource::Shared => RankCache::shared(),
        }
    }
}

fn cmd_equity(hero: &str, opponents: &[String], sim: &SimulationArgs, json: bool) -> PloResult<()> {
    let query = EquityQuery::parse(hero, opponents)?;
    let config = sim.config()?;
    let source = CacheSource::open(sim.table.as_ref())?;
    let engine = SimulationEngine::new(source.cache(), config)?;

    if !json {
        println!();
        let versus = if query.has_random_opponent() {
            "a random hand".dimmed().to_string()
        } else {
            query
                .opponents()
                .iter()
                .map(|o| cards_display(o))
                .collect::<Vec<_>>()
                .join(" vs ")
        };
        println!("  {} vs {}", cards_display(query.hero()), versus);
        println!(
            "  Simulating on {} thread(s), batches of {}...\n",
            config.threads.max(1).to_string().bold(),
            config.batch_size
        );
    }

    let result = engine.run_observed(&query, &TracingObserver)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    println!("  Hero: {}", equity_bar(result.win_rate, 30));
    println!();
    println!("{}", result_table(&result));
    println!("  {}", "Ties count as losses.".dimmed());
    Ok(())
}

fn cmd_normalize(cards: &str, against: Option<&str>) -> PloResult<()> {
    match against {
        None => {
            let normalized = normalize(&parse_cards(cards)?);
            print_section("Canonical", &cards_display(&normalized.cards));
            println!("  {}", format_cards(&normalized.cards).bold());
            println!("\n{}", mapping_table(&normalized.mapping));
        }
        Some(reference) => {
            let reference = normalize(&parse_cards(reference)?);
            let relative = normalize_dependent(&reference.mapping, &parse_cards(cards)?);
            print_section("Reference", &format_cards(&reference.cards));
            print_section("Canonical", &cards_display(&relative));
            println!("  {}", format_cards(&relative).bold());
        }
    }
    Ok(())
}

fn cmd_rank(cards: &str, table: Option<PathBuf>) -> PloResult<()> {
    let source = CacheSource::open(table.as_ref())?;
    let parsed = parse_cards(cards)?;
    let rank = source.cache().rank_cards(&parsed)?;
    println!();
    println!("  {}  rank {} of {}", cards_display(&parsed), rank.to_string().bold(), source.cache().worst_rank());
    Ok(())
}

fn cmd_generate_table(out: PathBuf) -> PloResult<()> {
    let cache = RankCache::generate();
    cache.save(&out)?;
    print_success(&format!(
        "Wrote {} hands ({} distinct ranks) to {}",
        cache.len(),
        cache.worst_rank(),
        out.display()
    ));
    Ok(())
}

fn cmd_rank_holes(
    hands: &[String],
    all: bool,
    limit: Option<usize>,
    csv: Option<PathBuf>,
    sim: &SimulationArgs,
) -> PloResult<()> {
    let hands: Vec<HoleHand> = if all {
        canonical_hole_hands()
    } else {
        if hands.is_empty() {
            return Err(PloError::InvalidValue(
                "give at least one hand or pass --all".to_string(),
            ));
        }
        let parsed = hands
            .iter()
            .map(|h| {
                let cards = parse_cards(h)?;
                let query = EquityQuery::new(&cards, &[])?;
                Ok::<HoleHand, PloError>(*query.hero())
            })
            .collect::<PloResult<Vec<HoleHand>>>()?;
        dedup_canonical(&parsed)
    };

    let config = sim.config()?;
    let source = CacheSource::open(sim.table.as_ref())?;
    let engine = SimulationEngine::new(source.cache(), config)?;
    println!(
        "\n  Ranking {} canonical hand(s) of {} cards against a random opponent...",
        hands.len().to_string().bold(),
        HOLE_CARDS
    );

    let rankings = rank_hole_hands(&engine, &hands, &TracingObserver)?;
    let shown = &rankings[..limit.unwrap_or(rankings.len()).min(rankings.len())];
    println!("\n{}", rankings_table(shown));

    if let Some(path) = csv {
        save_csv(&rankings, &path)?;
        print_success(&format!("Ranking written to {}", path.display()));
    }
    Ok(())
}
