use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nlp_harness::harness::parse::{run, ParserTesterConfig, TestMode};
use nlp_harness::ParserType;

/// Trains a parser on the Penn treebank and reports labeled bracket scores
#[derive(Parser, Debug)]
struct Args {
    /// Root directory of the treebank's .mrg files, the working directory by default
    #[clap(long)]
    path: Option<PathBuf>,
    /// Evaluate on the final test section instead of the validation section
    #[clap(action, long)]
    test: bool,
    #[clap(long, default_value = "1000")]
    max_train_length: usize,
    #[clap(long, default_value = "40")]
    max_test_length: usize,
    /// Print every guess and gold tree (the default)
    #[clap(action, long, overrides_with = "quiet")]
    verbose: bool,
    /// Print only the final scores
    #[clap(action, long, overrides_with = "verbose")]
    quiet: bool,
    #[clap(long, value_enum, default_value = "baseline")]
    parser_type: ParserType,
    /// Train and test on a handful of sentences of at most three words
    #[clap(action, long)]
    sanity_check: bool,
}

fn main() -> anyhow::Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let Args {
        path,
        test,
        max_train_length,
        max_test_length,
        verbose,
        quiet,
        parser_type,
        sanity_check,
    } = Args::parse();

    let config = ParserTesterConfig {
        base_path: path,
        test_mode: if test {
            TestMode::Test
        } else {
            TestMode::Validate
        },
        max_train_length,
        max_test_length,
        verbose: verbose || !quiet,
        parser_type,
        sanity_check,
    };
    run(&config, &mut io::stdout().lock())?;
    Ok(())
}
