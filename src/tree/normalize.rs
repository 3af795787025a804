use super::Tree;

pub trait TreeTransformer<L> {
    /// Transformed copy of `tree`, None if nothing is left of it.
    fn transform_tree(&self, tree: &Tree<L>) -> Option<Tree<L>>;
}

/// Treebank cleanup applied to every tree the harness reads
///
/// 1. function tags and coindexation are cut from phrasal and tag labels (`NP-SBJ-1` becomes
///    `NP`, `NP=2` becomes `NP`); labels starting with `-` such as `-LRB-` are left alone.
/// 2. `-NONE-` preterminals and constituents that end up empty are removed.
/// 3. a node whose only child is a non-leaf with the same label is collapsed into it.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardTreeNormalizer;

const EMPTY_TAG: &str = "-NONE-";

impl StandardTreeNormalizer {
    pub fn transform_label(label: &str) -> &str {
        let cut = [label.find('-'), label.find('=')]
            .into_iter()
            .flatten()
            .filter(|idx| *idx > 0)
            .min();
        match cut {
            Some(idx) => &label[..idx],
            None => label,
        }
    }

    fn strip(tree: &Tree<String>) -> Option<Tree<String>> {
        if tree.is_leaf() {
            return Some(tree.clone());
        }
        if tree.is_preterminal() && tree.label() == EMPTY_TAG {
            return None;
        }
        let children = tree
            .children()
            .iter()
            .filter_map(Self::strip)
            .collect::<Vec<_>>();
        if children.is_empty() {
            return None;
        }
        let label = Self::transform_label(tree.label()).to_string();
        Some(Self::remove_x_over_x(Tree::new(label, children)))
    }

    fn remove_x_over_x(tree: Tree<String>) -> Tree<String> {
        let mut tree = tree;
        loop {
            let collapse = tree.children().len() == 1 && {
                let child = &tree.children()[0];
                !child.is_leaf() && child.label() == tree.label()
            };
            if !collapse {
                return tree;
            }
            let (label, mut children) = tree.into_parts();
            let (_, grandchildren) = children.remove(0).into_parts();
            tree = Tree::new(label, grandchildren);
        }
    }
}

impl TreeTransformer<String> for StandardTreeNormalizer {
    fn transform_tree(&self, tree: &Tree<String>) -> Option<Tree<String>> {
        Self::strip(tree)
    }
}
