use std::fmt;
use std::path::PathBuf;

use crate::mapping::StringIndexer;
use crate::Error;

mod arpa;
mod kneser_ney;
pub mod spot_check;
mod stub;
mod unigram;

pub use arpa::{ArpaLanguageModel, ArpaLanguageModelFactory};
pub use kneser_ney::{KneserNeyTrigramLanguageModel, KneserNeyTrigramLanguageModelFactory};
pub use stub::{StubLanguageModel, StubLanguageModelFactory};
pub use unigram::{EmpiricalUnigramLanguageModel, EmpiricalUnigramLanguageModelFactory};

/// Sentence start symbol, only ever observed as context
pub const START: &str = "<s>";
/// Sentence end symbol
pub const STOP: &str = "</s>";

/// An ngram language model over word ids of a [StringIndexer]
pub trait NgramLanguageModel {
    /// Longest ngram the model conditions on
    fn order(&self) -> usize;

    /// Natural log of P(ngram[to - 1] | ngram[from..to - 1])
    ///
    /// Models use at most the last [NgramLanguageModel::order] words of the slice. Word ids the
    /// model never saw must not panic, they are scored as unknown words.
    fn ngram_log_probability(&self, ngram: &[u32], from: usize, to: usize) -> f64;

    /// How often `ngram` occurred in the training data, 0 if unknown or not tracked.
    fn count(&self, ngram: &[u32]) -> u64;
}

pub trait LanguageModelFactory {
    /// Trains (or loads) a model
    ///
    /// Training words are interned in `indexer`, the caller keeps using the same indexer for
    /// everything that talks to the model afterwards.
    fn new_language_model(
        &self,
        training: &[Vec<String>],
        indexer: &mut StringIndexer,
    ) -> Result<Box<dyn NgramLanguageModel>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LmType {
    Stub,
    Unigram,
    Trigram,
    Arpa,
}

impl LmType {
    pub fn factory(
        &self,
        arpa_file: Option<PathBuf>,
    ) -> Result<Box<dyn LanguageModelFactory>, Error> {
        Ok(match self {
            LmType::Stub => Box::new(StubLanguageModelFactory),
            LmType::Unigram => Box::new(EmpiricalUnigramLanguageModelFactory),
            LmType::Trigram => Box::new(KneserNeyTrigramLanguageModelFactory::default()),
            LmType::Arpa => Box::new(ArpaLanguageModelFactory::new(
                arpa_file.ok_or(Error::MissingArpaFile("ARPA"))?,
            )),
        })
    }

    /// ARPA models come pre-trained, reading the training corpus is wasted work for them.
    pub fn needs_training_data(&self) -> bool {
        !matches!(self, LmType::Arpa)
    }
}

impl fmt::Display for LmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LmType::Stub => "STUB",
            LmType::Unigram => "UNIGRAM",
            LmType::Trigram => "TRIGRAM",
            LmType::Arpa => "ARPA",
        };
        f.write_str(name)
    }
}

/// The last `order` words of `ngram[from..to]`
pub(crate) fn trailing_window(ngram: &[u32], from: usize, to: usize, order: usize) -> &[u32] {
    let slice = &ngram[from..to];
    &slice[slice.len().saturating_sub(order)..]
}

#[cfg(test)]
mod test {
    use super::{trailing_window, LmType};
    use crate::Error;

    #[test]
    fn window_is_clipped_to_order() {
        let ngram = [1, 2, 3, 4, 5];
        assert_eq!(trailing_window(&ngram, 0, 5, 3), &[3, 4, 5]);
        assert_eq!(trailing_window(&ngram, 1, 3, 3), &[2, 3]);
        assert_eq!(trailing_window(&ngram, 0, 0, 3), &[] as &[u32]);
    }

    #[test]
    fn arpa_factory_needs_a_file() {
        match LmType::Arpa.factory(None) {
            Ok(_) => panic!("an arpa factory without a file should not exist"),
            Err(err) => assert!(matches!(err, Error::MissingArpaFile(_))),
        }
        assert!(LmType::Trigram.factory(None).is_ok());
        assert_eq!(LmType::Trigram.to_string(), "TRIGRAM");
    }
}
