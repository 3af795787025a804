use crate::tree::Tree;

/// Labels of nodes introduced by binarization start with this
pub const INTERMEDIATE_PREFIX: char = '@';
/// Separates a label from its parent annotation, `NP^S`
pub const PARENT_SEPARATOR: char = '^';
/// Siblings remembered in intermediate labels
pub const HORIZONTAL_MARKOV_ORDER: usize = 2;

/// Parent annotates phrasal labels and binarizes to the right
///
/// A node `X` with children `A B C D` becomes `X -> A @X->_A`, `@X->_A -> B @X->_A_B`,
/// `@X->_A_B -> C D`; intermediate labels keep the last [HORIZONTAL_MARKOV_ORDER] siblings.
/// Phrasal nodes below the root get their parent's bare label appended, preterminals and words
/// are left alone.
pub fn annotate_tree(tree: &Tree<String>) -> Tree<String> {
    annotate(tree, None)
}

fn annotate(tree: &Tree<String>, parent: Option<&str>) -> Tree<String> {
    if !tree.is_phrasal() {
        return tree.clone();
    }
    let label = match parent {
        Some(parent) => format!("{}{PARENT_SEPARATOR}{parent}", tree.label()),
        None => tree.label().clone(),
    };
    let children = tree
        .children()
        .iter()
        .map(|child| annotate(child, Some(tree.label())))
        .collect::<Vec<_>>();
    binarize(label, children)
}

fn binarize(label: String, mut children: Vec<Tree<String>>) -> Tree<String> {
    if children.len() <= 2 {
        return Tree::new(label, children);
    }
    let first = children.remove(0);
    let history = vec![bare_label(first.label()).to_string()];
    let rest = intermediate(&label, history, children);
    Tree::new(label, vec![first, rest])
}

fn intermediate(
    base: &str,
    mut history: Vec<String>,
    mut children: Vec<Tree<String>>,
) -> Tree<String> {
    let context = history[history.len().saturating_sub(HORIZONTAL_MARKOV_ORDER)..]
        .iter()
        .map(|sibling| format!("_{sibling}"))
        .collect::<String>();
    let label = format!("{INTERMEDIATE_PREFIX}{base}->{context}");
    if children.len() <= 2 {
        return Tree::new(label, children);
    }
    let first = children.remove(0);
    history.push(bare_label(first.label()).to_string());
    let rest = intermediate(base, history, children);
    Tree::new(label, vec![first, rest])
}

/// `label` without its parent annotation
pub fn bare_label(label: &str) -> &str {
    label
        .split(PARENT_SEPARATOR)
        .next()
        .unwrap_or(label)
}

/// Inverse of [annotate_tree]: splices out intermediate nodes and strips parent annotations
pub fn unannotate_tree(tree: &Tree<String>) -> Tree<String> {
    if tree.is_leaf() {
        return tree.clone();
    }
    let mut children = vec![];
    splice(tree.children(), &mut children);
    Tree::new(bare_label(tree.label()).to_string(), children)
}

fn splice(children: &[Tree<String>], out: &mut Vec<Tree<String>>) {
    for child in children {
        if !child.is_leaf() && child.label().starts_with(INTERMEDIATE_PREFIX) {
            splice(child.children(), out);
        } else {
            out.push(unannotate_tree(child));
        }
    }
}
