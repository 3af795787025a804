use std::io::{self, Write};

use crate::math::log_add;
use crate::mapping::{BidirectionalMapping, StringIndexer};

use super::{NgramLanguageModel, START};

/// Expected counts in the full (non-sanity) assignment training data
const FULL_DATA_COUNTS: &[(&[&str], u64)] = &[
    (&["the"], 19_880_264),
    (&["in", "terms", "of"], 31_257),
    (&["romanian", "independent", "society"], 30),
    (&["XXXtotally", "XXXunseen", "XXXtrigram"], 0),
];

const CONTEXTS: &[&[&str]] = &[&["in", "terms"], &["romanian", "independent"], &["the"]];

const NORMALIZATION_TOLERANCE: f64 = 0.001;

/// Compares the training count of `words` with `expected`, reports to `out`.
pub fn spot_check_count(
    model: &dyn NgramLanguageModel,
    indexer: &mut StringIndexer,
    words: &[&str],
    expected: u64,
    out: &mut impl Write,
) -> io::Result<bool> {
    let ngram = indexer.index_all(words);
    let count = model.count(&ngram);
    if count != expected {
        tracing::warn!(?words, count, expected, "count mismatch");
        writeln!(
            out,
            "ERROR: Count does not match expected count {count} != {expected} for {words:?}"
        )?;
        Ok(false)
    } else {
        writeln!(
            out,
            "Count matches expected count {count} = {expected} for {words:?}"
        )?;
        Ok(true)
    }
}

/// Log-sums P(w | context) over every indexed word except START
pub fn context_mass(
    model: &dyn NgramLanguageModel,
    indexer: &StringIndexer,
    context: &[u32],
) -> f64 {
    let start = indexer.index_of(START);
    let mut ngram = context.to_vec();
    ngram.push(0);
    let last = ngram.len() - 1;
    let mut total = f64::NEG_INFINITY;
    for word in 0..indexer.len() as u32 {
        if Some(word) == start {
            continue;
        }
        ngram[last] = word;
        total = log_add(
            total,
            model.ngram_log_probability(&ngram, 0, ngram.len()),
        );
    }
    total
}

/// Checks that the conditional distribution after `context` sums to one, reports to `out`.
pub fn spot_check_context_normalizes(
    model: &dyn NgramLanguageModel,
    indexer: &mut StringIndexer,
    context: &[&str],
    out: &mut impl Write,
) -> io::Result<bool> {
    let ids = indexer.index_all(context);
    let total = context_mass(model, indexer, &ids);
    if total.abs() > NORMALIZATION_TOLERANCE {
        tracing::warn!(?context, mass = total.exp(), "distribution does not normalize");
        writeln!(
            out,
            "WARNING: Distribution for context {context:?} does not normalize correctly, sums to {}",
            total.exp()
        )?;
        Ok(false)
    } else {
        writeln!(
            out,
            "Distribution for context {context:?} normalizes correctly, sums to {}",
            total.exp()
        )?;
        Ok(true)
    }
}

/// Runs the fixed battery of checks, counts only against the full data set.
///
/// Returns whether every check passed.
pub fn run_spot_checks(
    model: &dyn NgramLanguageModel,
    indexer: &mut StringIndexer,
    sanity_check: bool,
    out: &mut impl Write,
) -> io::Result<bool> {
    writeln!(out, "Performing spot checks...")?;
    let mut passed = true;
    if !sanity_check {
        for (words, expected) in FULL_DATA_COUNTS {
            passed &= spot_check_count(model, indexer, words, *expected, out)?;
        }
    }
    for context in CONTEXTS {
        passed &= spot_check_context_normalizes(model, indexer, context, out)?;
    }
    writeln!(out, "Spot checks completed")?;
    Ok(passed)
}

#[cfg(test)]
mod test {
    use super::{run_spot_checks, spot_check_context_normalizes, spot_check_count};
    use crate::lm::{
        EmpiricalUnigramLanguageModel, KneserNeyTrigramLanguageModel, StubLanguageModel,
    };
    use crate::mapping::StringIndexer;

    fn corpus() -> Vec<Vec<String>> {
        ["in terms of the law", "the romanian independent society", "in terms of cost"]
            .iter()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn trigram_model_passes_sanity_checks() {
        let mut indexer = StringIndexer::new();
        let model = KneserNeyTrigramLanguageModel::train(&corpus(), &mut indexer, 0.75).unwrap();
        let mut out = vec![];
        assert!(run_spot_checks(&model, &mut indexer, true, &mut out).unwrap());
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("normalizes correctly"), "{report}");
        assert!(!report.contains("WARNING"), "{report}");
    }

    #[test]
    fn counts_are_compared() {
        let mut indexer = StringIndexer::new();
        let model = KneserNeyTrigramLanguageModel::train(&corpus(), &mut indexer, 0.75).unwrap();
        let mut out = vec![];
        assert!(spot_check_count(&model, &mut indexer, &["in", "terms", "of"], 2, &mut out).unwrap());
        assert!(!spot_check_count(&model, &mut indexer, &["the"], 3, &mut out).unwrap());
        let report = String::from_utf8(out).unwrap();
        assert!(report.starts_with("Count matches expected count 2 = 2"), "{report}");
        assert!(report.contains("ERROR: Count does not match expected count 2 != 3"));
    }

    #[test]
    fn unnormalized_models_are_flagged() {
        let mut indexer = StringIndexer::new();
        let unigram = EmpiricalUnigramLanguageModel::train(&corpus(), &mut indexer);
        let mut out = vec![];
        // unigram probabilities sum to N / (N + 1)
        assert!(!spot_check_context_normalizes(&unigram, &mut indexer, &["the"], &mut out).unwrap());
        // the stub gives every word probability one
        assert!(!spot_check_context_normalizes(&StubLanguageModel, &mut indexer, &["the"], &mut out).unwrap());
    }

    #[test]
    fn full_mode_checks_counts() {
        let mut indexer = StringIndexer::new();
        let model = KneserNeyTrigramLanguageModel::train(&corpus(), &mut indexer, 0.75).unwrap();
        let mut out = vec![];
        // the counts of the full training data cannot match a three sentence corpus
        assert!(!run_spot_checks(&model, &mut indexer, false, &mut out).unwrap());
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains(
            "ERROR: Count does not match expected count 2 != 19880264 for [\"the\"]"
        ));
        assert!(report.contains(
            "ERROR: Count does not match expected count 2 != 31257 for [\"in\", \"terms\", \"of\"]"
        ));
        assert!(report.contains(
            "Count matches expected count 0 = 0 for [\"XXXtotally\", \"XXXunseen\", \"XXXtrigram\"]"
        ));
        assert!(report.contains("normalizes correctly"), "{report}");
        assert!(report.ends_with("Spot checks completed\n"));
    }
}
