//! Grapevine binary
//!
//! Reachability counting and expected-length estimation for gossip
//! protocols, with optional CSV/JSON export of per-level results.

mod cli;
mod export;

use std::error::Error;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grapevine_canonical::CanonicalForm;
use grapevine_engine::{Engine, ShipMode};
use grapevine_estimate::{avg_branching, expected_length};

use cli::{Cli, Commands, CountArgs, EstimateArgs};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grapevine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Count(args) => run_count(args),
        Commands::Estimate(args) => run_estimate(args),
    }
}

fn run_count(args: CountArgs) -> Result<(), Box<dyn Error>> {
    let mut engine = Engine::new(args.protocol);
    if args.heuristic {
        engine = engine.with_canonical_form(CanonicalForm::heuristic_for(args.protocol));
    }
    if args.keys_only {
        engine = engine.with_ship_mode(ShipMode::KeysOnly)?;
    }

    let workers = args.workers.unwrap_or_else(default_workers);
    let mode = if args.serial { "serial" } else { "parallel" };
    tracing::info!(
        protocol = %args.protocol,
        n = args.n,
        depth = args.depth,
        workers,
        batch = args.batch_size,
        mode,
        "run starting"
    );

    let started = Instant::now();
    let res = if args.serial {
        engine.bfs(args.n, args.depth)?
    } else {
        engine.bfs_parallel(args.n, args.depth, workers, args.batch_size, args.verbose)?
    };
    let elapsed = started.elapsed();

    let per_level = res.per_level();
    println!("reachable_count: {}", res.reachable_count);
    println!("transitions    : {}", res.transitions);
    println!("branching      : {:.2}", avg_branching(res.transitions, res.reachable_count));
    println!("per_level      : {per_level:?}");
    println!("elapsed        : {:.2}s", elapsed.as_secs_f64());

    // Exports: an explicit prefix enables the base files; --dump-layers
    // without one falls back to a timestamped prefix under ./runs/.
    let prefix = match (&args.out_prefix, args.dump_layers) {
        (Some(prefix), _) => Some(prefix.clone()),
        (None, true) => {
            let prefix = default_prefix(&args);
            tracing::info!(prefix = %prefix.display(), "--out-prefix not set, using default");
            Some(prefix)
        }
        (None, false) => None,
    };

    if let Some(prefix) = prefix {
        let meta = export::RunMeta {
            protocol: args.protocol,
            n: args.n,
            max_depth: args.depth,
            workers,
            batch_size: args.batch_size,
            serial: args.serial,
        };
        let csv_path = export::write_per_level_csv(&prefix, &per_level)?;
        tracing::info!(path = %csv_path.display(), "saved per-level counts");
        let meta_path = export::write_meta_json(&prefix, &meta, &res, &per_level)?;
        tracing::info!(path = %meta_path.display(), "saved run metadata");
        if args.dump_layers {
            let layers_path = export::write_layers_csv(&prefix, &res)?;
            tracing::info!(path = %layers_path.display(), "saved layer keys");
        }
    }

    Ok(())
}

fn run_estimate(args: EstimateArgs) -> Result<(), Box<dyn Error>> {
    let stats = expected_length(args.protocol, args.n, args.runs, args.max_steps, args.seed)?;
    println!(
        "{}  n={}  runs={}  E[length] ≈ {:.2} ± {:.2}",
        args.protocol, args.n, stats.runs, stats.mean, stats.stdev
    );
    Ok(())
}

// Leave one core for the orchestrating thread.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

fn default_prefix(args: &CountArgs) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!(
        "runs/{}_n{}_d{}_{ts}",
        args.protocol, args.n, args.depth
    ))
}
