use std::collections::HashMap;

use crate::reader::treebank::ROOT_LABEL;
use crate::tree::Tree;

use super::annotate::{annotate_tree, unannotate_tree};
use super::{flat_tree, Parser, ParserFactory};

mod grammar;
mod lexicon;

pub use grammar::{BinaryRule, ClosedUnary, Grammar, UnaryRule};
pub use lexicon::Lexicon;

#[derive(Debug, Clone, Copy)]
enum BinaryBack {
    Tag,
    Split { split: usize, left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy)]
enum UnaryBack {
    Identity,
    /// Index into the closed unaries of `child`
    Chain { child: u32, closure: usize },
}

/// Best score per label of one span, before and after applying unary chains
#[derive(Debug, Default, Clone)]
struct Cell {
    binary: HashMap<u32, (f64, BinaryBack)>,
    unary: HashMap<u32, (f64, UnaryBack)>,
}

/// Viterbi CKY over a PCFG with unary closure
///
/// Training trees are parent annotated and markovized before the grammar and lexicon are read
/// off them, parses are unannotated again. Every chart cell holds two layers: labels built by a
/// binary rule (or a tag over a word) and labels reached from those through one closed unary
/// chain, so that unary cycles cannot grow a parse.
#[derive(Debug)]
pub struct GenerativeParser {
    grammar: Grammar,
    lexicon: Lexicon,
    /// Grammar ids of the lexicon's tags
    tags: Vec<(u32, String)>,
}

impl GenerativeParser {
    pub fn train(training: &[Tree<String>]) -> Self {
        let annotated = training.iter().map(annotate_tree).collect::<Vec<_>>();
        let grammar = Grammar::train(&annotated);
        let lexicon = Lexicon::train(&annotated);
        let mut tags = lexicon
            .tags()
            .filter_map(|tag| Some((grammar.labels().index_of(tag)?, tag.to_string())))
            .collect::<Vec<_>>();
        tags.sort();
        Self {
            grammar,
            lexicon,
            tags,
        }
    }

    fn close(&self, cell: &mut Cell) {
        for (&label, &(score, _)) in &cell.binary {
            relax(&mut cell.unary, label, score, UnaryBack::Identity);
            for (idx, chain) in self.grammar.closed_unaries_by_child(label).iter().enumerate() {
                relax(
                    &mut cell.unary,
                    chain.parent,
                    score + chain.score,
                    UnaryBack::Chain {
                        child: label,
                        closure: idx,
                    },
                );
            }
        }
    }

    fn chart(&self, sentence: &[String]) -> Vec<Cell> {
        let len = sentence.len();
        let at = |start: usize, end: usize| start * (len + 1) + end;
        let mut chart = vec![Cell::default(); (len + 1) * (len + 1)];

        for (start, word) in sentence.iter().enumerate() {
            let mut cell = Cell::default();
            for (tag, name) in &self.tags {
                let prob = self.lexicon.score(word, name);
                if prob > 0.0 {
                    cell.binary.insert(*tag, (prob.ln(), BinaryBack::Tag));
                }
            }
            self.close(&mut cell);
            chart[at(start, start + 1)] = cell;
        }

        for span in 2..=len {
            for start in 0..=len - span {
                let end = start + span;
                let mut cell = Cell::default();
                for split in start + 1..end {
                    let left_cell = &chart[at(start, split)];
                    let right_cell = &chart[at(split, end)];
                    for (&left, &(left_score, _)) in &left_cell.unary {
                        for rule in self.grammar.binary_rules_by_left(left) {
                            if let Some(&(right_score, _)) = right_cell.unary.get(&rule.right) {
                                relax(
                                    &mut cell.binary,
                                    rule.parent,
                                    left_score + right_score + rule.score,
                                    BinaryBack::Split {
                                        split,
                                        left,
                                        right: rule.right,
                                    },
                                );
                            }
                        }
                    }
                }
                self.close(&mut cell);
                chart[at(start, end)] = cell;
            }
        }
        chart
    }

    fn build_unary(
        &self,
        chart: &[Cell],
        sentence: &[String],
        (start, end): (usize, usize),
        label: u32,
    ) -> Option<Tree<String>> {
        let cell = &chart[start * (sentence.len() + 1) + end];
        match cell.unary.get(&label)?.1 {
            UnaryBack::Identity => self.build_binary(chart, sentence, (start, end), label),
            UnaryBack::Chain { child, closure } => {
                let chain = self.grammar.closed_unaries_by_child(child).get(closure)?;
                let mut tree = self.build_binary(chart, sentence, (start, end), child)?;
                for intermediate in chain.path.iter().rev() {
                    tree = Tree::new(self.label(*intermediate)?, vec![tree]);
                }
                Some(Tree::new(self.label(label)?, vec![tree]))
            }
        }
    }

    fn build_binary(
        &self,
        chart: &[Cell],
        sentence: &[String],
        (start, end): (usize, usize),
        label: u32,
    ) -> Option<Tree<String>> {
        let cell = &chart[start * (sentence.len() + 1) + end];
        let children = match cell.binary.get(&label)?.1 {
            BinaryBack::Tag => vec![Tree::leaf(sentence[start].clone())],
            BinaryBack::Split { split, left, right } => vec![
                self.build_unary(chart, sentence, (start, split), left)?,
                self.build_unary(chart, sentence, (split, end), right)?,
            ],
        };
        Some(Tree::new(self.label(label)?, children))
    }

    fn label(&self, id: u32) -> Option<String> {
        self.grammar.labels().word(id).map(str::to_string)
    }

    /// Most likely tag per word on its own
    fn best_tags(&self, sentence: &[String]) -> Vec<String> {
        sentence
            .iter()
            .map(|word| {
                self.tags
                    .iter()
                    .map(|(_, tag)| (self.lexicon.score(word, tag), tag))
                    .max_by(|a, b| a.0.total_cmp(&b.0))
                    .map_or_else(|| ROOT_LABEL.to_string(), |(_, tag)| tag.clone())
            })
            .collect()
    }
}

fn relax<B>(layer: &mut HashMap<u32, (f64, B)>, label: u32, score: f64, back: B) {
    match layer.get(&label) {
        Some((known, _)) if *known >= score => {}
        _ => {
            layer.insert(label, (score, back));
        }
    }
}

impl Parser for GenerativeParser {
    fn best_parse(&self, sentence: &[String]) -> Tree<String> {
        let root = self.grammar.labels().index_of(ROOT_LABEL);
        let parse = root.filter(|_| !sentence.is_empty()).and_then(|root| {
            let chart = self.chart(sentence);
            self.build_unary(&chart, sentence, (0, sentence.len()), root)
        });
        match parse {
            Some(tree) => unannotate_tree(&tree),
            None => {
                tracing::debug!(?sentence, "no parse, falling back to a flat tree");
                flat_tree(sentence, &self.best_tags(sentence))
            }
        }
    }
}

pub struct GenerativeParserFactory;

impl ParserFactory for GenerativeParserFactory {
    fn new_parser(&self, training: &[Tree<String>]) -> Box<dyn Parser> {
        Box::new(GenerativeParser::train(training))
    }
}

#[cfg(test)]
mod test;
