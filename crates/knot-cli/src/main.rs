#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "knot: typed relation inference for work-tracking records",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (pretty, text, json). Defaults to pretty on a TTY.
    #[arg(long, global = true, value_name = "FORMAT")]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file to load instead of the usual lookup.
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Inference",
        about = "Infer relations between objects",
        long_about = "Run every enabled stage (explicit links, duplicates, similarity \
                      fusion, document filter, contrastive judging) and print the edges.",
        after_help = "EXAMPLES:\n    # Infer relations from a JSON array\n    knot infer --objects objects.json\n\n    # Use embeddings and keep only strong similarity edges\n    knot infer -i objects.jsonl -e embeddings.json --type similar_to --min-confidence 0.6\n\n    # Emit machine-readable output\n    knot infer -i objects.json --format json"
    )]
    Infer(cmd::infer::InferArgs),

    #[command(
        next_help_heading = "Inference",
        about = "Summarize inferred relations",
        long_about = "Run the pipeline and report edge counts by type and source.",
        after_help = "EXAMPLES:\n    # Count edges\n    knot stats --objects objects.json\n\n    # Emit machine-readable output\n    knot stats -i objects.json --json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        next_help_heading = "Configuration",
        about = "Inspect or check configuration",
        after_help = "EXAMPLES:\n    # Show effective settings\n    knot config show\n\n    # Check a config file\n    knot --config knot.toml config validate"
    )]
    Config(cmd::config::ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("KNOT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "knot=debug,info"
        } else {
            "knot=info,warn"
        })
    });

    let format = env::var("KNOT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let loaded = cmd::config::load(cli.config.as_deref(), output)?;
    let inference = &loaded.config.inference;

    match cli.command {
        Commands::Infer(ref args) => cmd::infer::run_infer(args, inference, output),
        Commands::Stats(ref args) => cmd::stats::run_stats(args, inference, output),
        Commands::Config(ref args) => cmd::config::run_config(args, &loaded, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use knot_core::RelationType;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn infer_parses_filters() {
        let cli = Cli::parse_from([
            "knot",
            "infer",
            "--objects",
            "objects.json",
            "--type",
            "similar_to",
            "--type",
            "duplicate-of",
            "--min-confidence",
            "0.6",
        ]);
        let Commands::Infer(args) = cli.command else {
            panic!("expected infer");
        };
        assert_eq!(args.input.objects, PathBuf::from("objects.json"));
        assert_eq!(
            args.types,
            vec![RelationType::SimilarTo, RelationType::DuplicateOf]
        );
        assert_eq!(args.min_confidence, Some(0.6));
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from([
            "knot", "stats", "-i", "o.jsonl", "--format", "json", "--config", "k.toml",
        ]);
        assert!(matches!(cli.command, Commands::Stats(_)));
        assert_eq!(cli.format, Some(OutputMode::Json));
        assert_eq!(cli.config, Some(PathBuf::from("k.toml")));
    }

    #[test]
    fn json_shorthand_resolves_to_json() {
        let cli = Cli::parse_from(["knot", "--json", "config", "show"]);
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn infer_requires_objects() {
        assert!(Cli::try_parse_from(["knot", "infer"]).is_err());
    }
}
