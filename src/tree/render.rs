use std::fmt::Write;

use super::Tree;

/// Multi-line bracketed rendering
///
/// Phrasal nodes open a new line indented by two spaces per level, preterminals stay on the
/// line of their parent:
///
/// ```text
/// (ROOT
///   (S
///     (NP (DT the) (NN dog))
///     (VP (VBZ barks))))
/// ```
pub struct PennTreeRenderer;

impl PennTreeRenderer {
    pub fn render(tree: &Tree<String>) -> String {
        let mut out = String::new();
        Self::render_node(tree, 0, &mut out);
        out
    }

    fn render_node(tree: &Tree<String>, depth: usize, out: &mut String) {
        if tree.is_leaf() {
            out.push_str(tree.label());
            return;
        }
        // writing into a String cannot fail
        let _ = write!(out, "({}", tree.label());
        for child in tree.children() {
            if child.is_phrasal() {
                out.push('\n');
                out.push_str(&"  ".repeat(depth + 1));
            } else {
                out.push(' ');
            }
            Self::render_node(child, depth + 1, out);
        }
        out.push(')');
    }
}
