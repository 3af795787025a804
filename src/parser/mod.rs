use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::reader::treebank::ROOT_LABEL;
use crate::tree::Tree;

pub mod annotate;
mod baseline;
pub mod eval;
pub mod generative;

pub use baseline::{BaselineParser, BaselineParserFactory};
pub use eval::LabeledConstituentEval;
pub use generative::{GenerativeParser, GenerativeParserFactory};

pub trait Parser {
    /// Best tree over `sentence`, rooted in [ROOT_LABEL]
    fn best_parse(&self, sentence: &[String]) -> Tree<String>;
}

pub trait ParserFactory {
    fn new_parser(&self, training: &[Tree<String>]) -> Box<dyn Parser>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ParserType {
    Baseline,
    Generative,
}

impl ParserType {
    pub fn factory(&self) -> Box<dyn ParserFactory> {
        match self {
            ParserType::Baseline => Box::new(BaselineParserFactory),
            ParserType::Generative => Box::new(GenerativeParserFactory),
        }
    }
}

impl fmt::Display for ParserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserType::Baseline => "BASELINE",
            ParserType::Generative => "GENERATIVE",
        };
        f.write_str(name)
    }
}

/// Key with the highest count, ties go to the smallest key
pub(crate) fn argmax<K: Ord + Clone + Hash>(counts: &HashMap<K, usize>) -> Option<K> {
    counts
        .iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map(|(key, _)| key.clone())
}

/// `ROOT -> (tag word)*`, the tree of last resort
pub(crate) fn flat_tree(sentence: &[String], tags: &[String]) -> Tree<String> {
    let preterminals = sentence
        .iter()
        .zip(tags)
        .map(|(word, tag)| Tree::new(tag.clone(), vec![Tree::leaf(word.clone())]))
        .collect();
    Tree::new(ROOT_LABEL.to_string(), preterminals)
}
