use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nlp_harness::harness::lm::{run, LmTesterConfig};
use nlp_harness::mt::DecoderConfig;
use nlp_harness::LmType;

/// Trains a language model and reports the BLEU score of the phrase-based decoder using it
#[derive(Parser, Debug)]
struct Args {
    /// Directory with the training, phrase table, test and weights files
    #[clap(long, default_value = ".")]
    path: PathBuf,
    #[clap(long, value_enum, default_value = "unigram")]
    lm_type: LmType,
    /// ARPA file read by the `arpa` language model
    #[clap(long)]
    arpa_file: Option<PathBuf>,
    /// Decode only the first N test sentences
    #[clap(long)]
    max_num_test: Option<usize>,
    /// Do not print the individual translations
    #[clap(action, long)]
    noprint: bool,
    /// Use the small sanity_ files
    #[clap(action, long)]
    sanity_check: bool,
    /// Check counts and normalization of the language model before decoding
    #[clap(action, long)]
    spot_check: bool,
    #[clap(long, default_value = "100")]
    beam_size: usize,
    #[clap(long, default_value = "5")]
    distortion_limit: usize,
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
        lm_type,
        arpa_file,
        max_num_test,
        noprint,
        sanity_check,
        spot_check,
        beam_size,
        distortion_limit,
    } = Args::parse();

    let config = LmTesterConfig {
        base_path: path,
        lm_type,
        arpa_file,
        max_num_test,
        print_translations: !noprint,
        sanity_check,
        spot_check,
        decoder: DecoderConfig {
            beam_size,
            distortion_limit,
        },
    };
    run(&config, &mut io::stdout().lock())?;
    Ok(())
}
