pub mod harness;
pub mod lm;
pub mod mapping;
pub mod math;
pub mod memory;
pub mod mt;
pub mod parser;
pub mod reader;
pub mod tree;

pub use lm::{LanguageModelFactory, LmType, NgramLanguageModel};
pub use mapping::{BidirectionalMapping, StringIndexer};
pub use parser::{Parser, ParserFactory, ParserType};
pub use tree::Tree;

use mt::phrase_table::PhraseTableError;
use mt::weights::WeightsError;
use reader::arpa::ArpaReadError;
use reader::treebank::TreeReadError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("An IO error occurred: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reading the arpa file failed: {0}")]
    Arpa(#[from] ArpaReadError),
    #[error("Reading the treebank failed: {0}")]
    Treebank(#[from] TreeReadError),
    #[error("Reading the phrase table failed: {0}")]
    PhraseTable(#[from] PhraseTableError),
    #[error("Reading the weights file failed: {0}")]
    Weights(#[from] WeightsError),
    #[error("Building the ngram index failed: {0}")]
    Fst(#[from] fst::Error),
    #[error("The vocabulary has {size} entries but word ids are limited to {max}")]
    VocabularyTooLarge { size: usize, max: usize },
    #[error("The {0} language model needs an arpa file, pass --arpa-file")]
    MissingArpaFile(&'static str),
}
