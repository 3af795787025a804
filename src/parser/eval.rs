use std::collections::HashSet;
use std::io::{self, Write};

use crate::reader::treebank::ROOT_LABEL;
use crate::tree::Tree;

/// Tags whose words do not count as positions
pub const PUNCTUATION_TAGS: [&str; 5] = ["''", "``", ".", ":", ","];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LabeledConstituent {
    label: String,
    start: usize,
    end: usize,
}

/// Precision, recall, F1 and exact match of one or many parses, as fractions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrfScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub exact: f64,
}

impl PrfScore {
    fn new(correct: f64, guessed: f64, gold: f64, exact: f64) -> Self {
        let precision = if guessed > 0.0 { correct / guessed } else { 0.0 };
        let recall = if gold > 0.0 { correct / gold } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            exact,
        }
    }

    /// `<prefix> P: .. R: .. F1: .. EX: ..` in percent, truncated to two decimals
    pub fn write(&self, prefix: &str, out: &mut impl Write) -> io::Result<()> {
        let percent = |value: f64| (10_000.0 * value).trunc() / 100.0;
        writeln!(
            out,
            "{prefix} P: {:.2} R: {:.2} F1: {:.2} EX: {:.2}",
            percent(self.precision),
            percent(self.recall),
            percent(self.f1),
            percent(self.exact)
        )
    }
}

/// Labeled bracket scoring
///
/// A tree is reduced to the set of its phrasal constituents as (label, start, end), where
/// positions skip words tagged as punctuation and constituents with an ignored label (the root)
/// are left out. Totals are micro averages over all evaluated sentences.
#[derive(Debug)]
pub struct LabeledConstituentEval {
    labels_to_ignore: HashSet<String>,
    punctuation_tags: HashSet<String>,
    correct: f64,
    guessed: f64,
    gold: f64,
    exact: usize,
    total: usize,
}

impl Default for LabeledConstituentEval {
    fn default() -> Self {
        Self::new([ROOT_LABEL], PUNCTUATION_TAGS)
    }
}

impl LabeledConstituentEval {
    pub fn new<'a>(
        labels_to_ignore: impl IntoIterator<Item = &'a str>,
        punctuation_tags: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            labels_to_ignore: labels_to_ignore.into_iter().map(str::to_string).collect(),
            punctuation_tags: punctuation_tags.into_iter().map(str::to_string).collect(),
            correct: 0.0,
            guessed: 0.0,
            gold: 0.0,
            exact: 0,
            total: 0,
        }
    }

    fn constituents(&self, tree: &Tree<String>) -> HashSet<LabeledConstituent> {
        let mut set = HashSet::new();
        self.collect(tree, 0, &mut set);
        set
    }

    /// Adds the constituents below `tree` starting at `start`, returns the number of positions
    fn collect(
        &self,
        tree: &Tree<String>,
        start: usize,
        set: &mut HashSet<LabeledConstituent>,
    ) -> usize {
        if tree.is_leaf() {
            return 1;
        }
        if tree.is_preterminal() {
            return usize::from(!self.punctuation_tags.contains(tree.label()));
        }
        let mut end = start;
        for child in tree.children() {
            end += self.collect(child, end, set);
        }
        if !self.labels_to_ignore.contains(tree.label()) {
            set.insert(LabeledConstituent {
                label: tree.label().clone(),
                start,
                end,
            });
        }
        end - start
    }

    /// Scores `guess` against `gold` and adds it to the totals
    pub fn evaluate(&mut self, guess: &Tree<String>, gold: &Tree<String>) -> PrfScore {
        let guessed = self.constituents(guess);
        let gold = self.constituents(gold);
        let correct = guessed.intersection(&gold).count() as f64;
        let exact = correct == guessed.len() as f64 && correct == gold.len() as f64;

        self.correct += correct;
        self.guessed += guessed.len() as f64;
        self.gold += gold.len() as f64;
        self.exact += usize::from(exact);
        self.total += 1;
        PrfScore::new(
            correct,
            guessed.len() as f64,
            gold.len() as f64,
            if exact { 1.0 } else { 0.0 },
        )
    }

    /// Micro averaged score over everything evaluated so far
    pub fn average(&self) -> PrfScore {
        let exact = if self.total > 0 {
            self.exact as f64 / self.total as f64
        } else {
            0.0
        };
        PrfScore::new(self.correct, self.guessed, self.gold, exact)
    }

    pub fn display(&self, out: &mut impl Write) -> io::Result<()> {
        self.average().write("[Average]", out)
    }
}
