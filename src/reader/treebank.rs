use std::io::Read;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::CharIndices;

use itertools::Itertools;

use crate::reader::open_corpus;
use crate::tree::Tree;
use crate::Error;

pub const ROOT_LABEL: &str = "ROOT";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TreeReadError {
    #[error("Expected '(' at byte {0}")]
    ExpectedOpen(usize),
    #[error("Unbalanced parentheses, input ended inside a tree")]
    UnexpectedEnd,
    #[error("A tree node without label or children at byte {0}")]
    EmptyNode(usize),
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Open(usize),
    Close(usize),
    Word(&'a str),
}

struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
        let (start, c) = self.chars.next()?;
        match c {
            '(' => Some(Token::Open(start)),
            ')' => Some(Token::Close(start)),
            _ => {
                let mut end = start + c.len_utf8();
                while let Some((idx, c)) = self.chars.peek() {
                    if c.is_whitespace() || *c == '(' || *c == ')' {
                        break;
                    }
                    end = idx + c.len_utf8();
                    self.chars.next();
                }
                Some(Token::Word(&self.input[start..end]))
            }
        }
    }
}

/// Reads bracketed Penn treebank trees
///
/// A tree is `(LABEL child ...)` where a child is either a nested tree or a bare word. The
/// treebank wraps every sentence in an unlabeled bracket, `( (S ...) )`, that node gets the
/// label [ROOT_LABEL]. Text between trees that is not a bracket is skipped.
pub struct PennTreeReader<'a> {
    tokens: Peekable<Tokenizer<'a>>,
}

impl<'a> PennTreeReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: Tokenizer::new(input).peekable(),
        }
    }

    pub fn read_all(input: &str) -> Result<Vec<Tree<String>>, TreeReadError> {
        PennTreeReader::new(input).collect()
    }

    fn read_tree(&mut self, open_at: usize, top_level: bool) -> Result<Tree<String>, TreeReadError> {
        let label = match self.tokens.peek() {
            Some(Token::Word(word)) => {
                let word = word.to_string();
                self.tokens.next();
                word
            }
            _ => String::new(),
        };
        let mut children = vec![];
        loop {
            match self.tokens.next() {
                Some(Token::Open(at)) => children.push(self.read_tree(at, false)?),
                Some(Token::Word(word)) => children.push(Tree::leaf(word.to_string())),
                Some(Token::Close(_)) => break,
                None => return Err(TreeReadError::UnexpectedEnd),
            }
        }
        if label.is_empty() {
            if children.is_empty() {
                return Err(TreeReadError::EmptyNode(open_at));
            }
            if top_level {
                return Ok(Tree::new(ROOT_LABEL.to_string(), children));
            }
        }
        Ok(Tree::new(label, children))
    }
}

impl<'a> Iterator for PennTreeReader<'a> {
    type Item = Result<Tree<String>, TreeReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.tokens.next()? {
                Token::Open(at) => return Some(self.read_tree(at, true)),
                Token::Close(at) => return Some(Err(TreeReadError::ExpectedOpen(at))),
                Token::Word(_) => continue,
            }
        }
    }
}

/// Section number of a treebank file, `wsj_2201.mrg` is 2201
fn file_number(path: &Path) -> Option<u32> {
    if path.extension()? != "mrg" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.trim_start_matches(|c: char| !c.is_ascii_digit());
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn collect_files(dir: &Path, low: u32, high: u32, out: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, low, high, out)?;
        } else if file_number(&path).map_or(false, |n| (low..=high).contains(&n)) {
            out.push(path);
        }
    }
    Ok(())
}

/// Reads every tree of the files numbered `low..=high` below `base`
///
/// Files are searched recursively and read in path order. Compressed `.mrg.gz` files are not
/// recognised, the treebank is expected unpacked.
pub fn read_trees(base: impl AsRef<Path>, low: u32, high: u32) -> Result<Vec<Tree<String>>, Error> {
    let base = base.as_ref();
    if !base.is_dir() {
        return Err(Error::FileNotFound(base.display().to_string()));
    }
    let mut files = vec![];
    collect_files(base, low, high, &mut files)?;
    let mut trees = vec![];
    for file in files.into_iter().sorted() {
        let mut contents = String::new();
        open_corpus(&file)?.read_to_string(&mut contents)?;
        tracing::debug!("reading trees from {}", file.display());
        trees.extend(PennTreeReader::read_all(&contents)?);
    }
    Ok(trees)
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::{file_number, read_trees, PennTreeReader, TreeReadError};
    use crate::tree::test::{node, pt};

    #[test]
    fn reads_unlabeled_root() {
        let trees = PennTreeReader::read_all("( (S (NP (NN it)) (VP (VBZ rains))) )").unwrap();
        assert_eq!(
            trees,
            vec![node(
                "ROOT",
                vec![node(
                    "S",
                    vec![
                        node("NP", vec![pt("NN", "it")]),
                        node("VP", vec![pt("VBZ", "rains")])
                    ]
                )]
            )]
        );
    }

    #[test]
    fn reads_several_trees_and_keeps_labels() {
        let input = "(ROOT (NP (NN a)))\n\n( (X (Y b)) )\n";
        let trees = PennTreeReader::read_all(input).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].label(), "ROOT");
        assert_eq!(trees[1].label(), "ROOT");
        assert_eq!(trees[1].terminal_yield(), vec!["b"]);
    }

    #[test]
    fn bracket_labels_survive() {
        let trees = PennTreeReader::read_all("( (NP (-LRB- -LRB-) (NN x) (-RRB- -RRB-)) )").unwrap();
        assert_eq!(trees[0].preterminal_yield(), vec!["-LRB-", "NN", "-RRB-"]);
    }

    #[test]
    fn unbalanced_input_fails() {
        let err = PennTreeReader::read_all("( (S (NP (NN it))").unwrap_err();
        assert_eq!(err, TreeReadError::UnexpectedEnd);
        let err = PennTreeReader::read_all(") (S x)").unwrap_err();
        assert_eq!(err, TreeReadError::ExpectedOpen(0));
    }

    #[test]
    fn file_numbers() {
        assert_eq!(file_number(Path::new("02/wsj_0201.mrg")), Some(201));
        assert_eq!(file_number(Path::new("wsj_2300.mrg")), Some(2300));
        assert_eq!(file_number(Path::new("wsj_2300.txt")), None);
        assert_eq!(file_number(Path::new("README.mrg")), None);
    }

    #[test]
    fn reads_section_range() {
        let train = read_trees("test_data/treebank", 200, 299).unwrap();
        assert_eq!(train.len(), 6);
        let validation = read_trees("test_data/treebank", 2200, 2299).unwrap();
        assert_eq!(validation.len(), 3);
        assert!(read_trees("no-treebank-here", 0, 1).is_err());
    }
}
