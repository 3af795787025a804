use std::collections::HashMap;

use crate::tree::Tree;

/// Words seen less often than this share probability mass with unknown words
const RARE_WORD_THRESHOLD: f64 = 10.0;

/// Emission model P(word | tag)
///
/// Estimated through Bayes from P(tag | word). Rare and unknown words mix in the tag
/// distribution of word types, i.e. how readily a tag takes on new words.
#[derive(Debug, Default)]
pub struct Lexicon {
    word_counts: HashMap<String, f64>,
    tag_counts: HashMap<String, f64>,
    word_tag_counts: HashMap<String, HashMap<String, f64>>,
    /// Number of word types first seen with a tag
    type_tag_counts: HashMap<String, f64>,
    total_tokens: f64,
    total_word_types: f64,
}

impl Lexicon {
    pub fn train(trees: &[Tree<String>]) -> Self {
        let mut lexicon = Self::default();
        for tree in trees {
            for preterminal in tree.preterminals() {
                let word = preterminal.children()[0].label();
                lexicon.observe(word, preterminal.label());
            }
        }
        lexicon
    }

    fn observe(&mut self, word: &str, tag: &str) {
        let tags = self.word_tag_counts.entry(word.to_string()).or_default();
        if tags.is_empty() {
            self.total_word_types += 1.0;
            *self.type_tag_counts.entry(tag.to_string()).or_default() += 1.0;
        }
        *tags.entry(tag.to_string()).or_default() += 1.0;
        *self.word_counts.entry(word.to_string()).or_default() += 1.0;
        *self.tag_counts.entry(tag.to_string()).or_default() += 1.0;
        self.total_tokens += 1.0;
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tag_counts.keys().map(String::as_str)
    }

    /// P(word | tag), 0 for tags the lexicon never saw
    pub fn score(&self, word: &str, tag: &str) -> f64 {
        let tag_count = self.tag_counts.get(tag).copied().unwrap_or(0.0);
        if tag_count == 0.0 {
            return 0.0;
        }
        let p_tag = tag_count / self.total_tokens;
        let mut word_count = self.word_counts.get(word).copied().unwrap_or(0.0);
        let mut tag_and_word = self
            .word_tag_counts
            .get(word)
            .and_then(|tags| tags.get(tag))
            .copied()
            .unwrap_or(0.0);
        if word_count < RARE_WORD_THRESHOLD {
            word_count += 1.0;
            tag_and_word +=
                self.type_tag_counts.get(tag).copied().unwrap_or(0.0) / self.total_word_types;
        }
        let p_word = (1.0 + word_count) / (self.total_tokens + self.total_word_types);
        let p_tag_given_word = tag_and_word / word_count;
        p_tag_given_word / p_tag * p_word
    }
}
