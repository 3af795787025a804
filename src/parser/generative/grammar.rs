use std::collections::{HashMap, VecDeque};

use crate::mapping::{BidirectionalMapping, StringIndexer};
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryRule {
    pub parent: u32,
    pub left: u32,
    pub right: u32,
    /// ln P(left right | parent)
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryRule {
    pub parent: u32,
    pub child: u32,
    pub score: f64,
}

/// Best chain of unary rules from `parent` down to `child`
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedUnary {
    pub parent: u32,
    pub child: u32,
    pub score: f64,
    /// Labels strictly between parent and child, top down
    pub path: Vec<u32>,
}

/// Maximum likelihood PCFG read off (annotated, binarized) training trees
///
/// Labels are interned in the grammar's own [StringIndexer]. Preterminal rewrites belong to the
/// lexicon and are not part of the grammar.
#[derive(Debug)]
pub struct Grammar {
    labels: StringIndexer,
    binary_by_left: Vec<Vec<BinaryRule>>,
    closure_by_child: Vec<Vec<ClosedUnary>>,
}

impl Grammar {
    pub fn train(trees: &[Tree<String>]) -> Self {
        let mut labels = StringIndexer::new();
        let mut binary_counts: HashMap<(u32, u32, u32), f64> = HashMap::new();
        let mut unary_counts: HashMap<(u32, u32), f64> = HashMap::new();
        let mut parent_counts: HashMap<u32, f64> = HashMap::new();
        let mut stack = trees.iter().collect::<Vec<_>>();
        while let Some(tree) = stack.pop() {
            if !tree.is_phrasal() {
                // tags still need an id so that chart cells can hold them
                if tree.is_preterminal() {
                    labels.add_and_get_index(tree.label());
                }
                continue;
            }
            let parent = labels.add_and_get_index(tree.label());
            match tree.children() {
                [child] => {
                    let child = labels.add_and_get_index(child.label());
                    *unary_counts.entry((parent, child)).or_default() += 1.0;
                }
                [left, right] => {
                    let left = labels.add_and_get_index(left.label());
                    let right = labels.add_and_get_index(right.label());
                    *binary_counts.entry((parent, left, right)).or_default() += 1.0;
                }
                children => {
                    tracing::warn!(
                        label = tree.label().as_str(),
                        arity = children.len(),
                        "skipping rule that is not binarized"
                    );
                    continue;
                }
            }
            *parent_counts.entry(parent).or_default() += 1.0;
            stack.extend(tree.children());
        }

        let score = |parent: u32, count: f64| (count / parent_counts[&parent]).ln();
        let mut binary_by_left = vec![vec![]; labels.len()];
        for ((parent, left, right), count) in binary_counts {
            binary_by_left[left as usize].push(BinaryRule {
                parent,
                left,
                right,
                score: score(parent, count),
            });
        }
        let unary_rules = unary_counts
            .into_iter()
            .map(|((parent, child), count)| UnaryRule {
                parent,
                child,
                score: score(parent, count),
            })
            .collect::<Vec<_>>();
        let closure_by_child = close_unaries(&unary_rules, labels.len());
        tracing::info!(
            "grammar: {} labels, {} binary rules, {} unary rules",
            labels.len(),
            binary_by_left.iter().map(Vec::len).sum::<usize>(),
            unary_rules.len()
        );
        Self {
            labels,
            binary_by_left,
            closure_by_child,
        }
    }

    pub fn labels(&self) -> &StringIndexer {
        &self.labels
    }

    pub fn binary_rules_by_left(&self, left: u32) -> &[BinaryRule] {
        self.binary_by_left
            .get(left as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Non-trivial unary chains ending in `child`
    pub fn closed_unaries_by_child(&self, child: u32) -> &[ClosedUnary] {
        self.closure_by_child
            .get(child as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Best unary chain between every pair of labels, by relaxation from each child
///
/// Rule scores are log probabilities, so no cycle improves a chain and relaxing until nothing
/// changes terminates.
fn close_unaries(rules: &[UnaryRule], num_labels: usize) -> Vec<Vec<ClosedUnary>> {
    let mut by_child: Vec<Vec<&UnaryRule>> = vec![vec![]; num_labels];
    for rule in rules {
        by_child[rule.child as usize].push(rule);
    }

    let mut closure = vec![vec![]; num_labels];
    for child in 0..num_labels as u32 {
        if by_child[child as usize].is_empty() {
            continue;
        }
        // label -> (score, next label down the chain)
        let mut best: HashMap<u32, (f64, u32)> = HashMap::new();
        best.insert(child, (0.0, child));
        let mut queue = VecDeque::from([child]);
        while let Some(label) = queue.pop_front() {
            let base = best[&label].0;
            for rule in &by_child[label as usize] {
                if rule.parent == child {
                    continue;
                }
                let score = base + rule.score;
                let improves = best
                    .get(&rule.parent)
                    .map_or(true, |(known, _)| score > *known);
                if improves {
                    best.insert(rule.parent, (score, label));
                    queue.push_back(rule.parent);
                }
            }
        }

        for (&parent, &(score, _)) in &best {
            if parent == child {
                continue;
            }
            let mut path = vec![];
            let mut next = best[&parent].1;
            while next != child && path.len() < num_labels {
                path.push(next);
                next = best[&next].1;
            }
            closure[child as usize].push(ClosedUnary {
                parent,
                child,
                score,
                path,
            });
        }
    }
    closure
}
