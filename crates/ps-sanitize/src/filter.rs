//! Keep/drop path filtering.
//!
//! Runs before content sanitization. Both pattern sets are evaluated against
//! raw paths of the input tree in a single pass, so concrete indices in
//! patterns always refer to input positions.

use crate::node::{render_path, Mapping, Node, PathStep};
use crate::path::PathPatternSet;
use crate::stats::SanitizeStats;
use std::borrow::Cow;

/// Compiled keep and drop pattern sets.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    keep: PathPatternSet,
    drop: PathPatternSet,
}

impl PathFilter {
    pub fn new(keep: PathPatternSet, drop: PathPatternSet) -> Self {
        Self { keep, drop }
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.drop.is_empty()
    }

    /// Apply keep then drop patterns.
    ///
    /// With keep patterns present, a node survives if it lies inside a kept
    /// subtree, or if it is an ancestor of a kept path and keeps at least one
    /// surviving child. Drop patterns excise matching nodes anywhere.
    /// Containers emptied by filtering are removed too.
    pub fn apply<'a>(&self, node: &'a Node, stats: &mut SanitizeStats) -> Option<Cow<'a, Node>> {
        if self.is_empty() {
            return Some(Cow::Borrowed(node));
        }
        let mut steps = Vec::new();
        self.walk(node, &mut steps, self.keep.is_empty(), stats)
            .map(Cow::Owned)
    }

    fn walk(
        &self,
        node: &Node,
        steps: &mut Vec<PathStep>,
        inside_keep: bool,
        stats: &mut SanitizeStats,
    ) -> Option<Node> {
        let path = render_path(steps);
        let inside_keep = inside_keep || self.keep.matches_prefix_of(&path);

        if !inside_keep && !self.keep.could_match_descendant(steps) {
            stats.pruned_by_keep += 1;
            return None;
        }
        if !steps.is_empty() && self.drop.matches(&path) {
            stats.dropped_paths += 1;
            return None;
        }

        match node {
            Node::Mapping(map) => {
                if inside_keep && self.drop.is_empty() {
                    return Some(node.clone());
                }
                let mut out = Mapping::with_capacity(map.len());
                let mut removed = false;
                for (key, value) in map {
                    steps.push(PathStep::Key(key.clone()));
                    let child = self.walk(value, steps, inside_keep, stats);
                    steps.pop();
                    match child {
                        Some(child) => {
                            out.insert(key.clone(), child);
                        }
                        None => removed = true,
                    }
                }
                if out.is_empty() && (removed || !inside_keep) {
                    None
                } else {
                    Some(Node::Mapping(out))
                }
            }
            Node::Sequence(items) => {
                if inside_keep && self.drop.is_empty() {
                    return Some(node.clone());
                }
                let mut out = Vec::with_capacity(items.len());
                let mut removed = false;
                for (idx, item) in items.iter().enumerate() {
                    steps.push(PathStep::Index(idx));
                    let child = self.walk(item, steps, inside_keep, stats);
                    steps.pop();
                    match child {
                        Some(child) => out.push(child),
                        None => removed = true,
                    }
                }
                if out.is_empty() && (removed || !inside_keep) {
                    None
                } else {
                    Some(Node::Sequence(out))
                }
            }
            scalar => {
                if inside_keep {
                    Some(scalar.clone())
                } else {
                    // An ancestor position holding a scalar cannot contain the kept path
                    stats.pruned_by_keep += 1;
                    None
                }
            }
        }
    }
}
