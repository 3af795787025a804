use crate::mapping::StringIndexer;
use crate::Error;

use super::{LanguageModelFactory, NgramLanguageModel, STOP};

/// Maximum likelihood unigram model
///
/// Every token and one STOP per sentence is counted. P(w) = c(w) / (N + 1), words never seen
/// in training get a pseudo count of 1 so that they stay scorable.
#[derive(Debug)]
pub struct EmpiricalUnigramLanguageModel {
    word_counts: Vec<u64>,
    total: u64,
}

impl EmpiricalUnigramLanguageModel {
    pub fn train(training: &[Vec<String>], indexer: &mut StringIndexer) -> Self {
        let stop = indexer.add_and_get_index(STOP) as usize;
        let mut word_counts = vec![];
        let mut total = 0u64;
        let mut observe = |idx: usize| {
            if idx >= word_counts.len() {
                word_counts.resize(idx + 1, 0);
            }
            word_counts[idx] += 1;
            total += 1;
        };
        for sentence in training {
            for word in sentence {
                observe(indexer.add_and_get_index(word) as usize);
            }
            observe(stop);
        }
        tracing::debug!("unigram model saw {total} tokens");
        Self { word_counts, total }
    }

    fn word_count(&self, word: u32) -> u64 {
        self.word_counts.get(word as usize).copied().unwrap_or(0)
    }
}

impl NgramLanguageModel for EmpiricalUnigramLanguageModel {
    fn order(&self) -> usize {
        1
    }

    fn ngram_log_probability(&self, ngram: &[u32], from: usize, to: usize) -> f64 {
        if to <= from {
            return 0.0;
        }
        let count = self.word_count(ngram[to - 1]).max(1);
        (count as f64 / (self.total as f64 + 1.0)).ln()
    }

    fn count(&self, ngram: &[u32]) -> u64 {
        match ngram {
            [word] => self.word_count(*word),
            _ => 0,
        }
    }
}

pub struct EmpiricalUnigramLanguageModelFactory;

impl LanguageModelFactory for EmpiricalUnigramLanguageModelFactory {
    fn new_language_model(
        &self,
        training: &[Vec<String>],
        indexer: &mut StringIndexer,
    ) -> Result<Box<dyn NgramLanguageModel>, Error> {
        Ok(Box::new(EmpiricalUnigramLanguageModel::train(
            training, indexer,
        )))
    }
}
