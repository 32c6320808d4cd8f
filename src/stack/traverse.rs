//! Traversal iterators over a [StackTree].
//!
//! Both orderings are lazy, finite, and restartable: calling
//! [StackTree::traverse] or [StackTree::rtraverse] again yields a fresh
//! iterator over the same tree.

use super::{StackNode, StackTree};

/// One visited branch: its name, its parent's name (or [None] when stacked
/// directly on the synthetic root), and its derived depth (root = 0).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StackEntry<'a> {
    /// The branch name.
    pub branch: &'a str,
    /// The parent branch name, if the parent is a real branch.
    pub parent: Option<&'a str>,
    /// Depth within the tree; branches on the root have depth 1.
    pub depth: usize,
}

impl StackTree {
    /// Pre-order traversal: a parent is always yielded strictly before its
    /// descendants. When `include_root` is false, branches stacked directly
    /// on the synthetic root are not yielded themselves (their descendants
    /// still are).
    pub fn traverse(&self, include_root: bool) -> ForwardTraversal<'_> {
        let mut work = Vec::new();
        push_children(&mut work, self.root(), None, 1);
        ForwardTraversal { work, include_root }
    }

    /// Reverse traversal: all entries of the deepest level first (in forward
    /// order), then each shallower level in turn. Every descendant of a node
    /// is therefore yielded strictly before the node itself. `include_root`
    /// has the same meaning as in [StackTree::traverse].
    pub fn rtraverse(&self, include_root: bool) -> ReverseTraversal<'_> {
        let depth = self.max_depth();
        ReverseTraversal {
            tree: self,
            current_depth: depth,
            min_depth: if include_root { 1 } else { 2 },
            inner: self.traverse(true),
        }
    }

    /// The depth of the deepest tracked branch, or 0 for an empty tree.
    pub fn max_depth(&self) -> usize {
        self.traverse(true).map(|entry| entry.depth).max().unwrap_or(0)
    }
}

fn push_children<'a>(
    work: &mut Vec<(&'a StackNode, Option<&'a str>, usize)>,
    node: &'a StackNode,
    parent: Option<&'a str>,
    depth: usize,
) {
    for child in node.children.iter().rev() {
        work.push((child, parent, depth));
    }
}

/// Lazy pre-order iterator over a [StackTree]. See [StackTree::traverse].
pub struct ForwardTraversal<'a> {
    work: Vec<(&'a StackNode, Option<&'a str>, usize)>,
    include_root: bool,
}

impl<'a> Iterator for ForwardTraversal<'a> {
    type Item = StackEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, parent, depth)) = self.work.pop() {
            push_children(&mut self.work, node, Some(node.branch.as_str()), depth + 1);
            if parent.is_some() || self.include_root {
                return Some(StackEntry {
                    branch: node.branch.as_str(),
                    parent,
                    depth,
                });
            }
        }
        None
    }
}

/// Lazy deepest-level-first iterator over a [StackTree]. See
/// [StackTree::rtraverse].
pub struct ReverseTraversal<'a> {
    tree: &'a StackTree,
    current_depth: usize,
    min_depth: usize,
    inner: ForwardTraversal<'a>,
}

impl<'a> Iterator for ReverseTraversal<'a> {
    type Item = StackEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_depth < self.min_depth {
                return None;
            }
            match self.inner.by_ref().find(|e| e.depth == self.current_depth) {
                Some(entry) => return Some(entry),
                None => {
                    self.current_depth -= 1;
                    self.inner = self.tree.traverse(true);
                }
            }
        }
    }
}
