//! CLI argument definitions: top-level `Cli` struct and subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use grapevine_model::{Protocol, MAX_AGENTS};

#[derive(Parser)]
#[command(name = "grapevine")]
#[command(about = "Count reachable gossip knowledge-distributions up to relabeling")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Breadth-first reachability count per protocol and depth
    Count(CountArgs),
    /// Monte-Carlo estimate of calls needed until everyone is an expert
    Estimate(EstimateArgs),
}

#[derive(Args)]
pub struct CountArgs {
    /// Protocol to evaluate (ANY, CO, LNS, TOK, SPI, ATK)
    #[arg(short, long, default_value = "ANY", value_parser = parse_protocol)]
    pub protocol: Protocol,

    /// Number of agents (at most 16)
    #[arg(long, default_value_t = 6, value_parser = agent_count)]
    pub n: usize,

    /// Max BFS depth (0 reports just the initial layer)
    #[arg(short, long, default_value_t = 12)]
    pub depth: usize,

    /// Worker pool size (default: available cores minus one)
    #[arg(short, long, value_parser = positive_usize)]
    pub workers: Option<usize>,

    /// Frontier items per task batch for parallel expansion
    #[arg(long, default_value_t = 128, value_parser = positive_usize)]
    pub batch_size: usize,

    /// Run the serial reference BFS instead of the worker pool
    #[arg(long)]
    pub serial: bool,

    /// Ship bare canonical keys to the workers (ANY only)
    #[arg(long)]
    pub keys_only: bool,

    /// Use the heuristic canonical form: much faster, but counts are
    /// not guaranteed to match the exact form
    #[arg(long)]
    pub heuristic: bool,

    /// Print per-level progress
    #[arg(long)]
    pub verbose: bool,

    /// Path prefix for exports (creates <prefix>_per_level.csv and
    /// <prefix>_meta.json)
    #[arg(long)]
    pub out_prefix: Option<PathBuf>,

    /// Additionally save every canonical key as <prefix>_layers.csv
    /// (may be large)
    #[arg(long)]
    pub dump_layers: bool,
}

#[derive(Args)]
pub struct EstimateArgs {
    /// Protocol to walk under (ANY, CO, LNS, TOK, SPI)
    #[arg(short, long, default_value = "ANY", value_parser = parse_protocol)]
    pub protocol: Protocol,

    /// Number of agents (at most 16)
    #[arg(long, default_value_t = 5, value_parser = agent_count)]
    pub n: usize,

    /// Number of random walks
    #[arg(long, default_value_t = 10_000, value_parser = positive_usize)]
    pub runs: usize,

    /// Per-walk step cap
    #[arg(long, default_value_t = 1000, value_parser = positive_usize)]
    pub max_steps: usize,

    /// RNG seed, for reproducible estimates
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn parse_protocol(s: &str) -> Result<Protocol, String> {
    s.parse::<Protocol>().map_err(|e| e.to_string())
}

fn positive_usize(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        Ok(_) => Err("must be a positive integer".into()),
        Err(e) => Err(e.to_string()),
    }
}

// The bitmask sets hold at most MAX_AGENTS members; reject larger n
// here rather than deep in a run.
fn agent_count(s: &str) -> Result<usize, String> {
    let n = positive_usize(s)?;
    if n > MAX_AGENTS {
        return Err(format!("at most {MAX_AGENTS} agents are supported"));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_defaults_parse() {
        let cli = Cli::try_parse_from(["grapevine", "count"]).unwrap();
        let Commands::Count(args) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.protocol, Protocol::Any);
        assert_eq!(args.n, 6);
        assert!(!args.serial);
        assert!(!args.keys_only);
    }

    #[test]
    fn unknown_protocol_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["grapevine", "count", "-p", "BOGUS"]).is_err());
    }

    #[test]
    fn zero_sized_flags_are_rejected() {
        assert!(Cli::try_parse_from(["grapevine", "count", "--n", "0"]).is_err());
        assert!(Cli::try_parse_from(["grapevine", "count", "--batch-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["grapevine", "estimate", "--runs", "0"]).is_err());
    }

    #[test]
    fn agent_counts_past_the_bitmask_limit_are_rejected() {
        assert!(Cli::try_parse_from(["grapevine", "count", "--n", "17"]).is_err());
        assert!(Cli::try_parse_from(["grapevine", "estimate", "--n", "17"]).is_err());
        assert!(Cli::try_parse_from(["grapevine", "count", "--n", "16"]).is_ok());
    }

    #[test]
    fn estimate_flags_parse() {
        let cli = Cli::try_parse_from([
            "grapevine", "estimate", "-p", "TOK", "--n", "5", "--runs", "100", "--seed", "7",
        ])
        .unwrap();
        let Commands::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.protocol, Protocol::Tok);
        assert_eq!(args.runs, 100);
        assert_eq!(args.seed, 7);
    }
}
