use std::collections::HashMap;

use crate::reader::treebank::ROOT_LABEL;
use crate::tree::Tree;

use super::{argmax, Parser, ParserFactory};

/// Label of merged nodes when nothing better is known
const DEFAULT_LABEL: &str = "NP";

/// Tags words with their most frequent tag and builds a tree from the tag sequence
///
/// Tag sequences seen in training reuse the most frequent training tree with that sequence.
/// Other sequences get a right-branching binary tree, each merged node takes the label most
/// often seen above its two children's labels, then the label most often seen over a span of
/// that length.
#[derive(Debug)]
pub struct BaselineParser {
    word_tags: HashMap<String, String>,
    default_tag: String,
    /// First seen trees of a tag sequence and how often they occurred
    known_parses: HashMap<Vec<String>, Vec<(Tree<String>, usize)>>,
    pair_parents: HashMap<(String, String), HashMap<String, usize>>,
    span_labels: HashMap<usize, HashMap<String, usize>>,
}

impl BaselineParser {
    pub fn train(training: &[Tree<String>]) -> Self {
        let mut tag_counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut all_tags: HashMap<String, usize> = HashMap::new();
        let mut known_parses: HashMap<Vec<String>, Vec<(Tree<String>, usize)>> = HashMap::new();
        let mut parser = Self {
            word_tags: HashMap::new(),
            default_tag: String::new(),
            known_parses: HashMap::new(),
            pair_parents: HashMap::new(),
            span_labels: HashMap::new(),
        };

        for tree in training {
            for preterminal in tree.preterminals() {
                let word = preterminal.children()[0].label();
                let tag = preterminal.label();
                *tag_counts
                    .entry(word.clone())
                    .or_default()
                    .entry(tag.clone())
                    .or_default() += 1;
                *all_tags.entry(tag.clone()).or_default() += 1;
            }
            let parses = known_parses.entry(tree.preterminal_yield()).or_default();
            match parses.iter_mut().find(|(known, _)| known == tree) {
                Some((_, count)) => *count += 1,
                None => parses.push((tree.clone(), 1)),
            }
            parser.tally(tree);
        }

        parser.word_tags = tag_counts
            .iter()
            .filter_map(|(word, tags)| Some((word.clone(), argmax(tags)?)))
            .collect();
        parser.default_tag = argmax(&all_tags).unwrap_or_else(|| DEFAULT_LABEL.to_string());
        parser.known_parses = known_parses;
        tracing::info!(
            "baseline parser: {} words, {} tag sequences",
            parser.word_tags.len(),
            parser.known_parses.len()
        );
        parser
    }

    fn tally(&mut self, tree: &Tree<String>) {
        if !tree.is_phrasal() {
            return;
        }
        if tree.label() != ROOT_LABEL {
            *self
                .span_labels
                .entry(tree.yield_len())
                .or_default()
                .entry(tree.label().clone())
                .or_default() += 1;
        }
        if let [left, right] = tree.children() {
            *self
                .pair_parents
                .entry((left.label().clone(), right.label().clone()))
                .or_default()
                .entry(tree.label().clone())
                .or_default() += 1;
        }
        tree.children().iter().for_each(|child| self.tally(child));
    }

    fn tag(&self, word: &str) -> String {
        self.word_tags
            .get(word)
            .cloned()
            .unwrap_or_else(|| self.default_tag.clone())
    }

    fn best_known_parse(&self, tags: &[String], sentence: &[String]) -> Option<Tree<String>> {
        let parses = self.known_parses.get(tags)?;
        let (tree, _) = parses.iter().rev().max_by_key(|(_, count)| *count)?;
        let mut words = sentence.iter();
        Some(tree.map_labels(&mut |node| {
            if node.is_leaf() {
                words.next().cloned().unwrap_or_else(|| node.label().clone())
            } else {
                node.label().clone()
            }
        }))
    }

    fn merge_label(&self, left: &Tree<String>, right: &Tree<String>) -> String {
        let pair = (left.label().clone(), right.label().clone());
        self.pair_parents
            .get(&pair)
            .and_then(argmax)
            .or_else(|| {
                self.span_labels
                    .get(&(left.yield_len() + right.yield_len()))
                    .and_then(argmax)
            })
            .unwrap_or_else(|| DEFAULT_LABEL.to_string())
    }

    fn right_branching_parse(&self, tags: &[String], sentence: &[String]) -> Tree<String> {
        let mut preterminals = sentence
            .iter()
            .zip(tags)
            .map(|(word, tag)| Tree::new(tag.clone(), vec![Tree::leaf(word.clone())]))
            .rev();
        let mut tree = match preterminals.next() {
            Some(last) => last,
            None => return Tree::new(ROOT_LABEL.to_string(), vec![]),
        };
        for left in preterminals {
            let label = self.merge_label(&left, &tree);
            tree = Tree::new(label, vec![left, tree]);
        }
        Tree::new(ROOT_LABEL.to_string(), vec![tree])
    }
}

impl Parser for BaselineParser {
    fn best_parse(&self, sentence: &[String]) -> Tree<String> {
        let tags = sentence.iter().map(|w| self.tag(w)).collect::<Vec<_>>();
        self.best_known_parse(&tags, sentence)
            .unwrap_or_else(|| self.right_branching_parse(&tags, sentence))
    }
}

pub struct BaselineParserFactory;

impl ParserFactory for BaselineParserFactory {
    fn new_parser(&self, training: &[Tree<String>]) -> Box<dyn Parser> {
        Box::new(BaselineParser::train(training))
    }
}

#[cfg(test)]
mod test {
    use super::BaselineParser;
    use crate::parser::Parser;
    use crate::tree::test::{dog_barks, node, pt};
    use crate::tree::Tree;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn training() -> Vec<Tree<String>> {
        vec![
            dog_barks(),
            node(
                "ROOT",
                vec![node(
                    "S",
                    vec![
                        node("NP", vec![pt("DT", "the"), pt("NN", "cat")]),
                        node("VP", vec![pt("VBZ", "sleeps")]),
                        pt(".", "."),
                    ],
                )],
            ),
            node(
                "ROOT",
                vec![node(
                    "NP",
                    vec![pt("DT", "the"), pt("NN", "dog")],
                )],
            ),
        ]
    }

    #[test]
    fn reuses_known_tag_sequences() {
        let parser = BaselineParser::train(&training());
        let parse = parser.best_parse(&words("the cat barks ."));
        assert_eq!(
            parse.to_string(),
            "(ROOT (S (NP (DT the) (NN cat)) (VP (VBZ barks)) (. .)))"
        );
    }

    #[test]
    fn unknown_sequences_branch_right() {
        let parser = BaselineParser::train(&training());
        // DT NN DT NN was never seen, "(DT, NN)" was always an NP
        let parse = parser.best_parse(&words("the dog the cat"));
        assert_eq!(parse.label(), "ROOT");
        assert_eq!(parse.terminal_yield(), words("the dog the cat"));
        assert_eq!(parse.preterminal_yield(), words("DT NN DT NN"));
        let top = &parse.children()[0];
        assert_eq!(top.children().len(), 2);
        assert_eq!(top.children()[1].children()[1].to_string(), "(NP (DT the) (NN cat))");
    }

    #[test]
    fn unknown_words_get_the_most_frequent_tag() {
        let parser = BaselineParser::train(&training());
        let parse = parser.best_parse(&words("zebra"));
        // DT and NN occur three times each, ties go to the smaller tag
        assert_eq!(parse.preterminal_yield(), words("DT"));
        assert_eq!(parser.best_parse(&[]).to_string(), "ROOT");
    }
}
