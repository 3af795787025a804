use std::{fs, io::BufReader};

use approx::assert_abs_diff_eq;
use itertools::Itertools;

use crate::mapping::{BidirectionalMapping, StringIndexer};

use super::{
    read_arpa, ArpaReadError, ArpaReader, IntVocabProcessor, NGramProcessor, ProbBackoff,
    ProbBackoffNgram, ProbNgram,
};

/// Keeps ngrams as space joined strings
struct StringProcessor;

impl NGramProcessor for StringProcessor {
    type Output = String;

    fn process_ngram<'a>(&mut self, mut pieces: impl Iterator<Item = &'a str>) -> Self::Output {
        pieces.join(" ")
    }
}

fn open(path: &str) -> BufReader<fs::File> {
    BufReader::new(fs::File::open(path).unwrap())
}

fn compare_expectation(thing: ProbBackoff, expectation: ProbBackoff) {
    assert_abs_diff_eq!(thing.backoff, expectation.backoff);
    assert_abs_diff_eq!(thing.log_prob, expectation.log_prob);
}

fn check_probbackoff_for_order(
    thing: &[ProbBackoffNgram<String>],
    expectation: &[(&str, f32, f32)],
) {
    assert_eq!(thing.len(), expectation.len());
    thing
        .iter()
        .zip(expectation.iter())
        .for_each(|(a, (ngram, log_prob, backoff))| {
            compare_expectation(
                a.prob_backoff,
                ProbBackoff {
                    log_prob: *log_prob,
                    backoff: *backoff,
                },
            );
            assert_eq!(&a.ngram, ngram);
        })
}

fn check_prob_for_order(thing: &[ProbNgram<String>], expectation: &[(&str, f32)]) {
    assert_eq!(thing.len(), expectation.len());
    thing
        .iter()
        .zip(expectation.iter())
        .for_each(|(a, (ngram, log_prob))| {
            assert_abs_diff_eq!(a.log_prob, *log_prob);
            assert_eq!(&a.ngram, ngram);
        })
}

#[test]
fn test_reads() {
    let sections = read_arpa(open("test_data/arpa/small.arpa"), StringProcessor).unwrap();
    assert_eq!(sections.backoffs.len(), 2);

    check_probbackoff_for_order(
        &sections.backoffs[0],
        &[
            ("<s>", -1.0, -0.5),
            ("the", -0.5, -0.3),
            ("dog", -0.7, -0.2),
            ("barks", -0.9, 0.0),
            ("</s>", -0.6, 0.0),
        ],
    );
    check_probbackoff_for_order(
        &sections.backoffs[1],
        &[
            ("<s> the", -0.3, -0.1),
            ("the dog", -0.2, -0.4),
            ("dog barks", -0.4, 0.0),
            ("barks </s>", -0.1, 0.0),
        ],
    );
    check_prob_for_order(
        &sections.no_backoff,
        &[("<s> the dog", -0.05), ("the dog barks", -0.15)],
    );
}

#[test]
fn test_header() {
    let reader = ArpaReader::new(open("test_data/arpa/small.arpa"), StringProcessor).unwrap();
    assert_eq!(reader.order().get(), 3);
    let cardinalities = reader
        .counts()
        .iter()
        .map(|c| c.cardinality)
        .collect::<Vec<_>>();
    assert_eq!(cardinalities, vec![5, 4, 2]);
}

#[test]
fn test_int_vocab() {
    let mut indexer = StringIndexer::new();
    indexer.add_and_get_index("dog");
    let sections =
        read_arpa(open("test_data/arpa/small.arpa"), IntVocabProcessor(&mut indexer)).unwrap();
    // "dog" keeps the id it had before reading
    assert_eq!(sections.backoffs[0][2].ngram, vec![0]);
    assert_eq!(sections.no_backoff[1].ngram, vec![2, 0, 3]);
    assert_eq!(indexer.len(), 5);
}

#[test]
fn test_no_data_header() {
    match ArpaReader::new(open("test_data/arpa/arpa_no_data_header.arpa"), StringProcessor) {
        Ok(_) => panic!("returned Ok when it should have been `Err(DataHeaderMissing)`"),
        Err(err) => assert!(matches!(err, ArpaReadError::DataHeaderMissing)),
    }
}

#[test]
fn test_no_ngram_counts() {
    match ArpaReader::new(open("test_data/arpa/arpa_no_counts.arpa"), StringProcessor) {
        Ok(_) => panic!("returned Ok when it should have been `Err(NgramCountsMissing)`"),
        Err(err) => assert!(matches!(err, ArpaReadError::NgramCountsMissing)),
    }
}

#[test]
fn test_wrong_section_header() {
    match read_arpa(open("test_data/arpa/arpa_wrong_section.arpa"), StringProcessor) {
        Ok(_) => panic!("returned Ok for a file with a skipped section"),
        Err(err) => assert!(
            matches!(err, ArpaReadError::NGramSectionHeaderMismatch(ref got, ref expected) if got == "\\3-grams:" && expected == "\\2-grams:"),
            "{err}"
        ),
    }
}

#[test]
fn test_short_section() {
    match read_arpa(open("test_data/arpa/arpa_short_section.arpa"), StringProcessor) {
        Ok(_) => panic!("returned Ok for a section with missing rows"),
        Err(err) => assert!(matches!(err, ArpaReadError::NgramCountsMismatch), "{err}"),
    }
}
