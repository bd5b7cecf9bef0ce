//! Structural path matching against the route tree

use super::node::{join_path, RouteNode};

/// Result of matching a path against the tree
///
/// `chain` always starts with the root node. A match is usable for
/// navigation only when [`RouteMatch::is_resolved`] holds.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    chain: Vec<&'a RouteNode>,
    leftover: Vec<String>,
}

impl<'a> RouteMatch<'a> {
    /// Matched nodes from root to deepest match
    pub fn chain(&self) -> &[&'a RouteNode] {
        &self.chain
    }

    /// Path segments that no node consumed
    pub fn leftover(&self) -> &[String] {
        &self.leftover
    }

    /// Deepest matched node
    pub fn terminal(&self) -> &'a RouteNode {
        // The root is always present
        self.chain[self.chain.len() - 1]
    }

    /// Whole path consumed and the terminal node can end a navigation
    pub fn is_resolved(&self) -> bool {
        self.leftover.is_empty() && self.chain.len() > 1 && self.terminal().is_routable()
    }

    /// Path of the terminal node built from consumed segments
    pub fn matched_path(&self) -> String {
        self.chain
            .iter()
            .fold(String::new(), |path, node| join_path(&path, node.segment()))
    }
}

/// Partial walk below a node; nodes are collected deepest first
struct Walk<'a> {
    reversed: Vec<&'a RouteNode>,
    consumed: usize,
}

impl<'a> Walk<'a> {
    fn empty() -> Self {
        Self {
            reversed: Vec::new(),
            consumed: 0,
        }
    }

    fn enter(mut self, node: &'a RouteNode, consumes: usize) -> Self {
        self.reversed.push(node);
        self.consumed += consumes;
        self
    }

    fn terminal_routable(&self) -> bool {
        self.reversed.first().is_some_and(|node| node.is_routable())
    }
}

/// Match `segments` below `root`
///
/// At every level a literal child equal to the next segment wins and is never
/// revisited. Otherwise the empty-segment children are tried in declared
/// order: the first whose subtree consumes the rest of the path at a routable
/// node is taken, else the one that consumed the most. Once the input is
/// exhausted, the first empty-segment child is entered as the index route.
pub(crate) fn match_segments<'a>(root: &'a RouteNode, segments: &[String]) -> RouteMatch<'a> {
    let walk = walk(root, segments).enter(root, 0);
    let mut chain = walk.reversed;
    chain.reverse();

    RouteMatch {
        chain,
        leftover: segments[walk.consumed..].to_vec(),
    }
}

fn walk<'a>(node: &'a RouteNode, input: &[String]) -> Walk<'a> {
    let Some((head, rest)) = input.split_first() else {
        return match node.children().iter().find(|child| child.is_index()) {
            Some(index) => walk(index, input).enter(index, 0),
            None => Walk::empty(),
        };
    };

    if let Some(literal) = node
        .children()
        .iter()
        .find(|child| !child.is_index() && child.segment() == head)
    {
        // Aliases only match the full remaining path
        if literal.is_redirect() && !rest.is_empty() {
            return Walk::empty();
        }
        return walk(literal, rest).enter(literal, 1);
    }

    let mut best = Walk::empty();
    for candidate in node
        .children()
        .iter()
        .filter(|child| child.is_index() && !child.is_redirect())
    {
        let attempt = walk(candidate, input).enter(candidate, 0);
        if attempt.consumed == input.len() && attempt.terminal_routable() {
            return attempt;
        }
        if attempt.consumed > best.consumed {
            best = attempt;
        }
    }

    best
}
