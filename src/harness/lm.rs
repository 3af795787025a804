use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::lm::spot_check::run_spot_checks;
use crate::lm::LmType;
use crate::mapping::StringIndexer;
use crate::memory::log_memory_usage;
use crate::mt::bleu::{format_double, BleuScore};
use crate::mt::decoder::{extract_english, BeamDecoder, Decoder, DecoderConfig};
use crate::mt::phrase_table::PhraseTable;
use crate::mt::weights::Weights;
use crate::reader::{read_sentence_collection, resolve_corpus_file};
use crate::Error;

const SANITY_PREFIX: &str = "sanity_";
const TRAINING_FILE: &str = "training.en.gz";
const PHRASE_TABLE_FILE: &str = "phrasetable.txt.gz";
const TEST_FRENCH_FILE: &str = "test.fr";
const TEST_ENGLISH_FILE: &str = "test.en";
const WEIGHTS_FILE: &str = "weights.txt";

const MAX_PHRASE_SIZE: usize = 5;
const MAX_TRANSLATIONS: usize = 30;
const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone)]
pub struct LmTesterConfig {
    pub base_path: PathBuf,
    pub lm_type: LmType,
    /// Model file of [LmType::Arpa]
    pub arpa_file: Option<PathBuf>,
    /// Decode at most this many test sentences, all of them if None
    pub max_num_test: Option<usize>,
    pub print_translations: bool,
    /// Use the small `sanity_` corpora
    pub sanity_check: bool,
    pub spot_check: bool,
    pub decoder: DecoderConfig,
}

impl Default for LmTesterConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            lm_type: LmType::Unigram,
            arpa_file: None,
            max_num_test: None,
            print_translations: true,
            sanity_check: false,
            spot_check: false,
            decoder: DecoderConfig::default(),
        }
    }
}

impl LmTesterConfig {
    fn corpus_file(&self, name: &str) -> PathBuf {
        let prefix = if self.sanity_check { SANITY_PREFIX } else { "" };
        resolve_corpus_file(&self.base_path, &format!("{prefix}{name}"))
    }
}

#[derive(Debug, Clone)]
pub struct LmTestReport {
    /// Corpus BLEU of the decoded sentences
    pub bleu: BleuScore,
    pub sentences: usize,
    /// None if spot checks were not requested
    pub spot_checks_passed: Option<bool>,
}

/// Trains a language model, plugs it into the decoder and scores the test translations
///
/// The report goes to `out`, progress to the log.
pub fn run(config: &LmTesterConfig, out: &mut impl Write) -> Result<LmTestReport, Error> {
    let num_test = config
        .max_num_test
        .map_or_else(|| "all".to_string(), |n| n.to_string());
    writeln!(out, "Using base path: {}", config.base_path.display())?;
    writeln!(out, "Using lmType: {}", config.lm_type)?;
    writeln!(out, "Decoding {num_test} sentences.")?;
    if config.sanity_check {
        writeln!(out, "Only doing sanity check.")?;
    }

    let factory = config.lm_type.factory(config.arpa_file.clone())?;
    let training = if config.lm_type.needs_training_data() {
        let path = config.corpus_file(TRAINING_FILE);
        tracing::info!("reading training sentences from {}", path.display());
        read_sentence_collection(&path)?
    } else {
        vec![]
    };
    let mut indexer = StringIndexer::new();
    let model = factory.new_language_model(&training, &mut indexer)?;
    drop(training);
    tracing::info!("built {} language model", config.lm_type);

    let spot_checks_passed = if config.spot_check {
        Some(run_spot_checks(
            model.as_ref(),
            &mut indexer,
            config.sanity_check,
            out,
        )?)
    } else {
        None
    };

    let weights = Weights::read_weights_file(config.base_path.join(WEIGHTS_FILE))?;
    let mut phrase_table = PhraseTable::new(MAX_PHRASE_SIZE, MAX_TRANSLATIONS);
    phrase_table.read_from_file(config.corpus_file(PHRASE_TABLE_FILE), &weights, &mut indexer)?;
    let decoder = BeamDecoder::new(
        &phrase_table,
        model.as_ref(),
        &indexer,
        &weights,
        config.decoder,
    );
    log_memory_usage();

    let french = read_sentence_collection(config.corpus_file(TEST_FRENCH_FILE))?;
    let english = read_sentence_collection(config.corpus_file(TEST_ENGLISH_FILE))?;
    if french.len() != english.len() {
        tracing::warn!(
            french = french.len(),
            english = english.len(),
            "test corpora differ in length, extra sentences are ignored"
        );
    }

    writeln!(out, "Decoding {num_test} test sentences")?;
    let start = Instant::now();
    let limit = config.max_num_test.unwrap_or(usize::MAX);
    let mut scores = vec![];
    for (sent, (input, reference)) in french.iter().zip(&english).take(limit).enumerate() {
        if (sent + 1) % PROGRESS_INTERVAL == 0 {
            tracing::info!("On sentence {}", sent + 1);
        }
        let hypothesis = extract_english(&decoder.decode(input));
        if config.print_translations {
            writeln!(out, "Input:\t\t{}", input.join(" "))?;
            writeln!(out, "Hypothesis\t{}", hypothesis.join(" "))?;
            writeln!(out, "Reference:\t{}", reference.join(" "))?;
        }
        scores.push(BleuScore::new(&hypothesis, reference));
    }
    writeln!(
        out,
        "Decoding took {}s",
        format_double(start.elapsed().as_secs_f64())
    )?;

    let bleu = BleuScore::aggregate(&scores);
    writeln!(out, "BLEU score on test data was {bleu}")?;
    Ok(LmTestReport {
        bleu,
        sentences: scores.len(),
        spot_checks_passed,
    })
}
