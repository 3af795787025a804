use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::mapping::StringIndexer;
use crate::reader::arpa::{read_arpa, ArpaFileSections, IntVocabProcessor, ProbBackoff};
use crate::reader::open_corpus;
use crate::Error;

use super::{trailing_window, LanguageModelFactory, NgramLanguageModel};

const UNK: &str = "<unk>";
/// log10 probability ARPA tooling conventionally assigns to impossible events
const ARPA_FLOOR: f32 = -99.0;

/// Byte key of an ngram in the index, fixed width big-endian ids
fn ngram_key(ngram: &[u32]) -> Vec<u8> {
    ngram.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// Backoff language model read from an ARPA file
///
/// All ngrams of all orders live in one [fst::Map] from their byte key to an index into
/// `scores`. Scoring follows the usual backoff recursion in log10 space
/// `p(w | h) = bo(h) + p(w | h')` until an ngram is found and converts the result to natural
/// log at the end.
pub struct ArpaLanguageModel {
    order: usize,
    index: fst::Map<Vec<u8>>,
    scores: Vec<ProbBackoff>,
    unk_log_prob: f32,
}

impl ArpaLanguageModel {
    pub fn from_file(path: &Path, indexer: &mut StringIndexer) -> Result<Self, Error> {
        let ArpaFileSections {
            counts,
            backoffs,
            no_backoff,
        } = read_arpa(open_corpus(path)?, IntVocabProcessor(&mut *indexer))?;
        let order = counts.order().get();

        let entries = backoffs
            .into_iter()
            .flatten()
            .map(|ngram| (ngram_key(&ngram.ngram), ngram.prob_backoff))
            .chain(no_backoff.into_iter().map(|ngram| {
                (
                    ngram_key(&ngram.ngram),
                    ProbBackoff {
                        log_prob: ngram.log_prob,
                        backoff: 0.0,
                    },
                )
            }))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .collect::<Vec<_>>();

        let index = fst::Map::from_iter(
            entries
                .iter()
                .enumerate()
                .map(|(idx, (key, _))| (key.as_slice(), idx as u64)),
        )?;
        let scores = entries.into_iter().map(|(_, score)| score).collect::<Vec<_>>();
        tracing::info!(
            "loaded arpa model of order {order} with {} ngrams from {}",
            scores.len(),
            path.display()
        );

        let mut model = Self {
            order,
            index,
            scores,
            unk_log_prob: ARPA_FLOOR,
        };
        if let Some(unk) = indexer.index_of(UNK) {
            if let Some(score) = model.lookup(&[unk]) {
                model.unk_log_prob = score.log_prob;
            }
        }
        Ok(model)
    }

    fn lookup(&self, ngram: &[u32]) -> Option<ProbBackoff> {
        self.index
            .get(ngram_key(ngram))
            .map(|idx| self.scores[idx as usize])
    }

    /// log10 P(ngram[n-1] | ngram[..n-1]), `ngram` is not longer than the model order
    pub fn log10_prob(&self, ngram: &[u32]) -> f32 {
        let n = ngram.len();
        let mut backoff = 0f32;
        for start in 0..n {
            if let Some(score) = self.lookup(&ngram[start..]) {
                return backoff + score.log_prob;
            }
            if start + 1 < n {
                backoff += self
                    .lookup(&ngram[start..n - 1])
                    .map_or(0.0, |score| score.backoff);
            }
        }
        backoff + self.unk_log_prob
    }
}

impl NgramLanguageModel for ArpaLanguageModel {
    fn order(&self) -> usize {
        self.order
    }

    fn ngram_log_probability(&self, ngram: &[u32], from: usize, to: usize) -> f64 {
        let window = trailing_window(ngram, from, to, self.order);
        if window.is_empty() {
            return 0.0;
        }
        self.log10_prob(window) as f64 * std::f64::consts::LN_10
    }

    fn count(&self, _ngram: &[u32]) -> u64 {
        0
    }
}

pub struct ArpaLanguageModelFactory {
    path: PathBuf,
}

impl ArpaLanguageModelFactory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LanguageModelFactory for ArpaLanguageModelFactory {
    fn new_language_model(
        &self,
        _training: &[Vec<String>],
        indexer: &mut StringIndexer,
    ) -> Result<Box<dyn NgramLanguageModel>, Error> {
        Ok(Box::new(ArpaLanguageModel::from_file(&self.path, indexer)?))
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use approx::assert_abs_diff_eq;

    use super::{ArpaLanguageModel, ARPA_FLOOR};
    use crate::lm::NgramLanguageModel;
    use crate::mapping::StringIndexer;
    use crate::Error;

    fn load() -> (ArpaLanguageModel, StringIndexer) {
        let mut indexer = StringIndexer::new();
        let model =
            ArpaLanguageModel::from_file(&PathBuf::from("test_data/arpa/small.arpa"), &mut indexer)
                .expect("should exist");
        (model, indexer)
    }

    #[test]
    fn scores_known_ngrams() {
        let (model, indexer) = load();
        let id = |w: &str| indexer.index_of(w).unwrap();
        assert_eq!(model.order(), 3);
        assert_abs_diff_eq!(model.log10_prob(&[id("<s>"), id("the"), id("dog")]), -0.05);
        assert_abs_diff_eq!(model.log10_prob(&[id("the"), id("dog"), id("barks")]), -0.15);
        assert_abs_diff_eq!(model.log10_prob(&[id("dog")]), -0.7);
    }

    #[test]
    fn backs_off() {
        let (model, indexer) = load();
        let id = |w: &str| indexer.index_of(w).unwrap();
        // "<s> dog" is not in the model, its backoff is 0
        assert_abs_diff_eq!(model.log10_prob(&[id("<s>"), id("dog"), id("barks")]), -0.4);
        assert_abs_diff_eq!(
            model.log10_prob(&[id("the"), id("barks")]),
            -0.3 + -0.9,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(model.log10_prob(&[id("dog"), id("barks"), id("the")]), -0.5);
    }

    #[test]
    fn unknown_words_hit_the_floor() {
        let (model, mut indexer) = load();
        let the = indexer.index_of("the").unwrap();
        let cat = indexer.add_and_get_index("cat");
        assert_abs_diff_eq!(
            model.log10_prob(&[the, cat]),
            -0.3 + ARPA_FLOOR,
            epsilon = 1e-4
        );
    }

    #[test]
    fn natural_log_interface() {
        let (model, indexer) = load();
        let id = |w: &str| indexer.index_of(w).unwrap();
        let ngram = [id("dog"), id("<s>"), id("the"), id("dog")];
        assert_abs_diff_eq!(
            model.ngram_log_probability(&ngram, 0, 4),
            -0.05 * std::f64::consts::LN_10,
            epsilon = 1e-6
        );
        assert_eq!(model.count(&[id("dog")]), 0);
    }

    #[test]
    fn missing_file() {
        let mut indexer = StringIndexer::new();
        match ArpaLanguageModel::from_file(&PathBuf::from("no-file-to-be-found"), &mut indexer) {
            Ok(_) => panic!("There should be no file called 'no-file-to-be-found' around here."),
            Err(err) => assert!(matches!(err, Error::FileNotFound(_))),
        }
    }
}
