use std::fmt;

mod normalize;
mod render;

pub use normalize::{StandardTreeNormalizer, TreeTransformer};
pub use render::PennTreeRenderer;

/// A labeled ordered tree
///
/// Leaves carry the words of a sentence, their parents (preterminals) carry part-of-speech
/// tags and everything above carries phrasal categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tree<L> {
    label: L,
    children: Vec<Tree<L>>,
}

impl<L> Tree<L> {
    pub fn new(label: L, children: Vec<Tree<L>>) -> Self {
        Self { label, children }
    }

    pub fn leaf(label: L) -> Self {
        Self {
            label,
            children: vec![],
        }
    }

    pub fn label(&self) -> &L {
        &self.label
    }

    pub fn children(&self) -> &[Tree<L>] {
        &self.children
    }

    pub fn into_parts(self) -> (L, Vec<Tree<L>>) {
        (self.label, self.children)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_preterminal(&self) -> bool {
        self.children.len() == 1 && self.children[0].is_leaf()
    }

    /// Neither a leaf nor a preterminal
    pub fn is_phrasal(&self) -> bool {
        !self.is_leaf() && !self.is_preterminal()
    }

    /// Preterminal nodes in left to right order
    pub fn preterminals(&self) -> Vec<&Tree<L>> {
        let mut out = vec![];
        self.collect_preterminals(&mut out);
        out
    }

    fn collect_preterminals<'a>(&'a self, out: &mut Vec<&'a Tree<L>>) {
        if self.is_preterminal() {
            out.push(self);
        } else {
            self.children
                .iter()
                .for_each(|child| child.collect_preterminals(out));
        }
    }

    /// Number of leaves below this node
    pub fn yield_len(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Tree::yield_len).sum()
        }
    }

    pub fn map_labels<M, F>(&self, f: &mut F) -> Tree<M>
    where
        F: FnMut(&Tree<L>) -> M,
    {
        Tree {
            label: f(self),
            children: self.children.iter().map(|c| c.map_labels(f)).collect(),
        }
    }
}

impl<L: Clone> Tree<L> {
    /// Leaf labels in left to right order, i.e. the sentence
    pub fn terminal_yield(&self) -> Vec<L> {
        let mut out = vec![];
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<L>) {
        if self.is_leaf() {
            out.push(self.label.clone());
        } else {
            self.children
                .iter()
                .for_each(|child| child.collect_leaves(out));
        }
    }

    /// Preterminal labels in left to right order, i.e. the tag sequence
    pub fn preterminal_yield(&self) -> Vec<L> {
        self.preterminals()
            .into_iter()
            .map(|p| p.label.clone())
            .collect()
    }
}

/// Single-line bracketed form, `(ROOT (S (NP (DT the) (NN dog))))`
impl<L: fmt::Display> fmt::Display for Tree<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            return write!(f, "{}", self.label);
        }
        write!(f, "({}", self.label)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        write!(f, ")")
    }
}
