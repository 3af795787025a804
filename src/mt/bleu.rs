use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

pub const MAX_NGRAM: usize = 4;

/// BLEU sufficient statistics
///
/// A score built from a single hypothesis/reference pair holds the clipped ngram matches of
/// that pair, [BleuScore::aggregate] sums the statistics of many pairs. The score is only ever
/// computed from the sums, corpus BLEU is not the mean of sentence BLEU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BleuScore {
    matches: [u64; MAX_NGRAM],
    totals: [u64; MAX_NGRAM],
    hypothesis_length: u64,
    reference_length: u64,
}

fn ngram_counts<T: Eq + Hash>(words: &[T], n: usize) -> HashMap<&[T], u64> {
    let mut counts = HashMap::new();
    if n == 0 {
        return counts;
    }
    for ngram in words.windows(n) {
        *counts.entry(ngram).or_insert(0) += 1;
    }
    counts
}

impl BleuScore {
    pub fn new<T: Eq + Hash>(hypothesis: &[T], reference: &[T]) -> Self {
        let mut score = Self {
            hypothesis_length: hypothesis.len() as u64,
            reference_length: reference.len() as u64,
            ..Default::default()
        };
        for n in 1..=MAX_NGRAM {
            let hyp = ngram_counts(hypothesis, n);
            let reference = ngram_counts(reference, n);
            score.totals[n - 1] = hyp.values().sum();
            score.matches[n - 1] = hyp
                .iter()
                .map(|(ngram, count)| (*count).min(reference.get(ngram).copied().unwrap_or(0)))
                .sum();
        }
        score
    }

    pub fn aggregate<'a>(scores: impl IntoIterator<Item = &'a BleuScore>) -> Self {
        scores.into_iter().fold(Self::default(), |mut acc, score| {
            for n in 0..MAX_NGRAM {
                acc.matches[n] += score.matches[n];
                acc.totals[n] += score.totals[n];
            }
            acc.hypothesis_length += score.hypothesis_length;
            acc.reference_length += score.reference_length;
            acc
        })
    }

    /// Modified ngram precision for ngram length `n` in `1..=4`
    pub fn precision(&self, n: usize) -> f64 {
        let total = self.totals[n - 1];
        if total == 0 {
            return 0.0;
        }
        self.matches[n - 1] as f64 / total as f64
    }

    pub fn brevity_penalty(&self) -> f64 {
        if self.hypothesis_length == 0 {
            return 0.0;
        }
        let ratio = self.reference_length as f64 / self.hypothesis_length as f64;
        (1.0 - ratio).min(0.0).exp()
    }

    /// BLEU in `[0, 1]`
    pub fn score(&self) -> f64 {
        let mut log_precision = 0.0;
        for n in 1..=MAX_NGRAM {
            let precision = self.precision(n);
            if precision == 0.0 {
                return 0.0;
            }
            log_precision += precision.ln();
        }
        self.brevity_penalty() * (log_precision / MAX_NGRAM as f64).exp()
    }
}

pub fn format_double(value: f64) -> String {
    format!("{value:.3}")
}

impl fmt::Display for BleuScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (precisions {:.1}/{:.1}/{:.1}/{:.1}, BP={}, hyp_len={}, ref_len={})",
            format_double(100.0 * self.score()),
            100.0 * self.precision(1),
            100.0 * self.precision(2),
            100.0 * self.precision(3),
            100.0 * self.precision(4),
            format_double(self.brevity_penalty()),
            self.hypothesis_length,
            self.reference_length
        )
    }
}
