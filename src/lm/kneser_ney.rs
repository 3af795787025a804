use std::collections::HashMap;

use crate::mapping::{BidirectionalMapping, StringIndexer};
use crate::Error;

use super::{trailing_window, LanguageModelFactory, NgramLanguageModel, START, STOP};

const WORD_BITS: u32 = 21;
/// Word ids are packed three to a `u64`
pub const MAX_VOCABULARY: usize = 1 << WORD_BITS;
/// ln probability of a word the model has never seen, in any context
pub const UNSEEN_LOG_PROB: f64 = -20.0;

fn pack2(v: u32, w: u32) -> u64 {
    ((v as u64) << WORD_BITS) | w as u64
}

fn pack3(u: u32, v: u32, w: u32) -> u64 {
    ((u as u64) << (2 * WORD_BITS)) | pack2(v, w)
}

#[derive(Debug, Default, Clone, Copy)]
struct ContextStats {
    /// c(u v .)
    total: u64,
    /// N1+(u v .)
    types: u32,
}

/// Interpolated Kneser-Ney trigram model
///
/// Sentences are padded as `<s> <s> w_1 .. w_n </s>`. The highest order interpolates
/// discounted trigram counts with the bigram level, the bigram level interpolates discounted
/// continuation counts N1+(. v w) with the unigram continuation distribution
/// N1+(. w) / N1+(. .). Every observed bigram has a left neighbour thanks to the padding,
/// so each conditional distribution sums to one over the training vocabulary minus `<s>`.
#[derive(Debug)]
pub struct KneserNeyTrigramLanguageModel {
    discount: f64,
    unigram_counts: Vec<u64>,
    bigram_counts: HashMap<u64, u32>,
    trigram_counts: HashMap<u64, u32>,
    /// N1+(. w)
    unigram_continuation: Vec<u32>,
    /// N1+(. .)
    bigram_types: u64,
    /// N1+(. v w)
    bigram_continuation: HashMap<u64, u32>,
    /// N1+(. v .)
    middle_types: Vec<u32>,
    /// N1+(v .)
    following_types: Vec<u32>,
    contexts: HashMap<u64, ContextStats>,
}

impl KneserNeyTrigramLanguageModel {
    pub fn train(
        training: &[Vec<String>],
        indexer: &mut StringIndexer,
        discount: f64,
    ) -> Result<Self, Error> {
        let start = indexer.add_and_get_index(START);
        let stop = indexer.add_and_get_index(STOP);

        let mut bigram_counts: HashMap<u64, u32> = HashMap::new();
        let mut trigram_counts: HashMap<u64, u32> = HashMap::new();
        let mut unigram_counts: Vec<u64> = vec![];
        let mut padded = vec![];
        for (n, sentence) in training.iter().enumerate() {
            padded.clear();
            padded.extend([start, start]);
            padded.extend(sentence.iter().map(|w| indexer.add_and_get_index(w)));
            padded.push(stop);
            if indexer.len() > MAX_VOCABULARY {
                return Err(Error::VocabularyTooLarge {
                    size: indexer.len(),
                    max: MAX_VOCABULARY,
                });
            }
            if unigram_counts.len() < indexer.len() {
                unigram_counts.resize(indexer.len(), 0);
            }
            for window in padded.windows(3) {
                let (u, v, w) = (window[0], window[1], window[2]);
                unigram_counts[w as usize] += 1;
                *bigram_counts.entry(pack2(v, w)).or_default() += 1;
                *trigram_counts.entry(pack3(u, v, w)).or_default() += 1;
            }
            if (n + 1) % 1_000_000 == 0 {
                tracing::info!("counted ngrams of {} sentences", n + 1);
            }
        }
        let vocab = indexer.len();
        unigram_counts.resize(vocab, 0);
        tracing::info!(
            "trigram model: {vocab} words, {} bigrams, {} trigrams",
            bigram_counts.len(),
            trigram_counts.len()
        );

        let mut model = Self {
            discount,
            unigram_counts,
            bigram_counts,
            trigram_counts,
            unigram_continuation: vec![0; vocab],
            bigram_types: 0,
            bigram_continuation: HashMap::new(),
            middle_types: vec![0; vocab],
            following_types: vec![0; vocab],
            contexts: HashMap::new(),
        };
        model.collect_continuations();
        Ok(model)
    }

    fn collect_continuations(&mut self) {
        let mask = (1u64 << WORD_BITS) - 1;
        for (&key, &count) in &self.trigram_counts {
            let (u, v, w) = (key >> (2 * WORD_BITS), (key >> WORD_BITS) & mask, key & mask);
            *self.bigram_continuation.entry(pack2(v as u32, w as u32)).or_default() += 1;
            self.middle_types[v as usize] += 1;
            let stats = self.contexts.entry(pack2(u as u32, v as u32)).or_default();
            stats.total += count as u64;
            stats.types += 1;
        }
        for &key in self.bigram_counts.keys() {
            let (v, w) = (key >> WORD_BITS, key & mask);
            self.unigram_continuation[w as usize] += 1;
            self.following_types[v as usize] += 1;
            self.bigram_types += 1;
        }
    }

    fn vocab_size(&self) -> usize {
        self.unigram_counts.len()
    }

    fn known(&self, word: u32) -> bool {
        (word as usize) < self.vocab_size()
    }

    fn unigram_prob(&self, w: u32) -> Option<f64> {
        let continuation = *self.unigram_continuation.get(w as usize)?;
        if continuation == 0 || self.bigram_types == 0 {
            return None;
        }
        Some(continuation as f64 / self.bigram_types as f64)
    }

    fn bigram_prob(&self, v: u32, w: u32) -> Option<f64> {
        let lower = self.unigram_prob(w)?;
        let middle = self.middle_types.get(v as usize).copied().unwrap_or(0);
        if middle == 0 {
            return Some(lower);
        }
        let middle = middle as f64;
        let continuation = if self.known(v) {
            self.bigram_continuation
                .get(&pack2(v, w))
                .copied()
                .unwrap_or(0)
        } else {
            0
        };
        let following = self.following_types[v as usize] as f64;
        Some(
            (continuation as f64 - self.discount).max(0.0) / middle
                + self.discount * following / middle * lower,
        )
    }

    fn trigram_prob(&self, u: u32, v: u32, w: u32) -> Option<f64> {
        let lower = self.bigram_prob(v, w)?;
        if !self.known(u) || !self.known(v) {
            return Some(lower);
        }
        let stats = match self.contexts.get(&pack2(u, v)) {
            Some(stats) => *stats,
            None => return Some(lower),
        };
        let count = self
            .trigram_counts
            .get(&pack3(u, v, w))
            .copied()
            .unwrap_or(0) as f64;
        let total = stats.total as f64;
        Some(
            (count - self.discount).max(0.0) / total
                + self.discount * stats.types as f64 / total * lower,
        )
    }
}

impl NgramLanguageModel for KneserNeyTrigramLanguageModel {
    fn order(&self) -> usize {
        3
    }

    fn ngram_log_probability(&self, ngram: &[u32], from: usize, to: usize) -> f64 {
        let prob = match *trailing_window(ngram, from, to, 3) {
            [] => return 0.0,
            [w] => self.unigram_prob(w),
            [v, w] => self.bigram_prob(v, w),
            [u, v, w] => self.trigram_prob(u, v, w),
            _ => unreachable!("window is at most three words"),
        };
        prob.map_or(UNSEEN_LOG_PROB, f64::ln)
    }

    fn count(&self, ngram: &[u32]) -> u64 {
        if !ngram.iter().all(|w| self.known(*w)) {
            return 0;
        }
        match *ngram {
            [w] => self.unigram_counts[w as usize],
            [v, w] => self.bigram_counts.get(&pack2(v, w)).copied().unwrap_or(0) as u64,
            [u, v, w] => self
                .trigram_counts
                .get(&pack3(u, v, w))
                .copied()
                .unwrap_or(0) as u64,
            _ => 0,
        }
    }
}

pub struct KneserNeyTrigramLanguageModelFactory {
    pub discount: f64,
}

impl Default for KneserNeyTrigramLanguageModelFactory {
    fn default() -> Self {
        Self { discount: 0.75 }
    }
}

impl LanguageModelFactory for KneserNeyTrigramLanguageModelFactory {
    fn new_language_model(
        &self,
        training: &[Vec<String>],
        indexer: &mut StringIndexer,
    ) -> Result<Box<dyn NgramLanguageModel>, Error> {
        Ok(Box::new(KneserNeyTrigramLanguageModel::train(
            training,
            indexer,
            self.discount,
        )?))
    }
}
