use std::io::{self, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::parser::eval::{LabeledConstituentEval, PrfScore};
use crate::parser::{Parser, ParserType};
use crate::reader::treebank::read_trees;
use crate::tree::{PennTreeRenderer, StandardTreeNormalizer, Tree, TreeTransformer};
use crate::Error;

const TRAIN_SECTIONS: RangeInclusive<u32> = 200..=2199;
const SANITY_TRAIN_SECTIONS: RangeInclusive<u32> = 200..=299;
const VALIDATION_SECTIONS: RangeInclusive<u32> = 2200..=2299;
const TEST_SECTIONS: RangeInclusive<u32> = 2300..=2399;
const SANITY_MAX_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Section 22
    Validate,
    /// Section 23, the final test set
    Test,
}

#[derive(Debug, Clone)]
pub struct ParserTesterConfig {
    /// Treebank root, the working directory if None
    pub base_path: Option<PathBuf>,
    pub test_mode: TestMode,
    pub max_train_length: usize,
    pub max_test_length: usize,
    pub verbose: bool,
    pub parser_type: ParserType,
    /// Train on a single section of very short sentences
    pub sanity_check: bool,
}

impl Default for ParserTesterConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            test_mode: TestMode::Validate,
            max_train_length: 1000,
            max_test_length: 40,
            verbose: true,
            parser_type: ParserType::Baseline,
            sanity_check: false,
        }
    }
}

/// Trains the configured parser on the treebank and reports labeled bracket scores
pub fn run(config: &ParserTesterConfig, out: &mut impl Write) -> Result<PrfScore, Error> {
    let base_path = config.base_path.as_deref().unwrap_or_else(|| Path::new("."));
    let (train_sections, max_train_length, max_test_length) = if config.sanity_check {
        (SANITY_TRAIN_SECTIONS, SANITY_MAX_LENGTH, SANITY_MAX_LENGTH)
    } else {
        (
            TRAIN_SECTIONS,
            config.max_train_length,
            config.max_test_length,
        )
    };

    write_settings(config, max_train_length, max_test_length, out)?;

    write!(out, "Loading training trees (sections 2-21) ... ")?;
    let train_trees = read_normalized_trees(base_path, train_sections, max_train_length)?;
    writeln!(out, "done. ({} trees)", train_trees.len())?;

    let test_trees = match config.test_mode {
        TestMode::Validate => {
            write!(out, "Loading validation trees (section 22) ... ")?;
            read_normalized_trees(base_path, VALIDATION_SECTIONS, max_test_length)?
        }
        TestMode::Test => {
            write!(out, "Loading test trees (section 23) ... ")?;
            read_normalized_trees(base_path, TEST_SECTIONS, max_test_length)?
        }
    };
    writeln!(out, "done. ({} trees)", test_trees.len())?;

    let parser = config.parser_type.factory().new_parser(&train_trees);
    Ok(test_parser(parser.as_ref(), &test_trees, config.verbose, out)?)
}

fn write_settings(
    config: &ParserTesterConfig,
    max_train_length: usize,
    max_test_length: usize,
    out: &mut impl Write,
) -> io::Result<()> {
    if let Some(path) = &config.base_path {
        writeln!(out, "Using base path: {}", path.display())?;
    }
    match config.test_mode {
        TestMode::Validate => writeln!(out, "Testing on validation data.")?,
        TestMode::Test => writeln!(out, "Testing on final test data.")?,
    }
    writeln!(out, "Maximum length for training sentences: {max_train_length}")?;
    writeln!(out, "Maximum length for test sentences: {max_test_length}")?;
    writeln!(out, "Using parserType: {}", config.parser_type)
}

/// Reads the files of `sections`, normalizes their trees and drops those longer than `max_length`
pub fn read_normalized_trees(
    base: &Path,
    sections: RangeInclusive<u32>,
    max_length: usize,
) -> Result<Vec<Tree<String>>, Error> {
    let normalizer = StandardTreeNormalizer;
    let trees = read_trees(base, *sections.start(), *sections.end())?;
    let read = trees.len();
    let normalized = trees
        .iter()
        .filter_map(|tree| normalizer.transform_tree(tree))
        .filter(|tree| tree.yield_len() <= max_length)
        .collect::<Vec<_>>();
    tracing::debug!(
        "kept {} of {read} trees from sections {sections:?}",
        normalized.len()
    );
    Ok(normalized)
}

/// Parses the yield of every gold tree and scores the guesses
pub fn test_parser(
    parser: &dyn Parser,
    trees: &[Tree<String>],
    verbose: bool,
    out: &mut impl Write,
) -> io::Result<PrfScore> {
    let mut eval = LabeledConstituentEval::default();
    for gold in trees {
        let sentence = gold.terminal_yield();
        let guess = parser.best_parse(&sentence);
        let score = eval.evaluate(&guess, gold);
        if verbose {
            writeln!(out, "Guess:\n{}", PennTreeRenderer::render(&guess))?;
            writeln!(out, "Gold:\n{}", PennTreeRenderer::render(gold))?;
            score.write("[Current]", out)?;
        }
    }
    eval.display(out)?;
    Ok(eval.average())
}
