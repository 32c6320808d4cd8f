//! Structured representation of a stack of branches.
//!
//! A [StackTree] is an n-ary tree of branch names rooted at a single synthetic
//! node that is not itself a branch. Each node exclusively owns its children;
//! parent and depth are derived by walking down from the root rather than held
//! as back-pointers. The tree is persisted as a depth-indented text file, one
//! branch per line, one leading `\t` per level below the first.

use crate::errors::{StError, StResult};
use std::path::Path;

mod check;
mod traverse;

pub use check::{divergences, restack_worklist, Divergence, RestackStep};
pub use traverse::{ForwardTraversal, ReverseTraversal, StackEntry};

/// A single branch within a [StackTree], together with the branches stacked
/// on top of it. Children are kept in insertion order, which is the stacking
/// order of the persisted file.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct StackNode {
    /// The branch name. Empty only on the synthetic root.
    pub branch: String,
    /// The branches stacked directly on this one.
    pub children: Vec<StackNode>,
}

impl StackNode {
    /// Creates a new [StackNode] with the given branch name and no children.
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            children: Vec::default(),
        }
    }
}

/// An ordered tree of stacked branches with a synthetic root.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct StackTree {
    root: StackNode,
}

impl StackTree {
    /// Creates an empty [StackTree].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [StackTree] with a single branch stacked on the root.
    pub fn seeded(branch: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.root.children.push(StackNode::new(branch));
        tree
    }

    /// Returns `true` if the tree tracks no branches.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// The synthetic root node. Not a real branch; its name is empty.
    pub(crate) fn root(&self) -> &StackNode {
        &self.root
    }

    /// Appends a new branch under the node reached by `parent_path` from the
    /// root, or directly under the root when the path is empty.
    ///
    /// ## Returns
    /// - `Err(StError::NotFound)` - `parent_path` does not resolve.
    /// - `Err(StError::InvariantViolation)` - `branch` is already tracked.
    pub fn add_child<S: AsRef<str>>(&mut self, parent_path: &[S], branch: &str) -> StResult<()> {
        if self.find(branch).is_some() {
            return Err(StError::InvariantViolation(format!(
                "Branch `{}` is already tracked in the stack.",
                branch
            )));
        }

        let mut node = &mut self.root;
        for segment in parent_path {
            let segment = segment.as_ref();
            node = node
                .children
                .iter_mut()
                .find(|child| child.branch == segment)
                .ok_or_else(|| StError::NotFound(segment.to_string()))?;
        }
        node.children.push(StackNode::new(branch));

        Ok(())
    }

    /// Finds the node for `branch`, if it is tracked.
    pub fn find(&self, branch: &str) -> Option<&StackNode> {
        fn search<'a>(node: &'a StackNode, branch: &str) -> Option<&'a StackNode> {
            node.children
                .iter()
                .find_map(|child| (child.branch == branch).then_some(child).or_else(|| search(child, branch)))
        }
        search(&self.root, branch)
    }

    /// Returns the unique ancestor directly above `branch`, recomputed by
    /// walking down from the root. `Ok(None)` for branches stacked directly
    /// on the synthetic root.
    ///
    /// ## Returns
    /// - `Err(StError::InvariantViolation)` - called on the root itself.
    /// - `Err(StError::NotFound)` - `branch` is not tracked.
    pub fn parent_of(&self, branch: &str) -> StResult<Option<&StackNode>> {
        if branch.is_empty() {
            return Err(StError::InvariantViolation(
                "The stack root has no parent.".to_string(),
            ));
        }

        fn search<'a>(node: &'a StackNode, branch: &str) -> Option<&'a StackNode> {
            if node.children.iter().any(|child| child.branch == branch) {
                return Some(node);
            }
            node.children.iter().find_map(|child| search(child, branch))
        }

        match search(&self.root, branch) {
            Some(parent) => Ok((!parent.branch.is_empty()).then_some(parent)),
            None => Err(StError::NotFound(branch.to_string())),
        }
    }

    /// Returns the depth of `branch`. The synthetic root has depth 0, so
    /// branches stacked directly on it have depth 1.
    pub fn depth_of(&self, branch: &str) -> StResult<usize> {
        self.traverse(true)
            .find(|entry| entry.branch == branch)
            .map(|entry| entry.depth)
            .ok_or_else(|| StError::NotFound(branch.to_string()))
    }

    /// Produces the depth-indented text form of the tree, in pre-order.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for entry in self.traverse(true) {
            out.push_str(&"\t".repeat(entry.depth - 1));
            out.push_str(entry.branch);
            out.push('\n');
        }
        out
    }

    /// Parses the depth-indented text form. Blank lines and lines starting
    /// with `#` are skipped. A line indented more than one level deeper than
    /// its predecessor fails with [StError::MalformedStack].
    pub fn deserialize(text: &str) -> StResult<Self> {
        let mut tree = Self::new();
        let mut parents: Vec<String> = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let depth = line.bytes().take_while(|b| *b == b'\t').count();
            let branch = &line[depth..];
            if depth > parents.len() || branch.is_empty() {
                return Err(StError::MalformedStack {
                    line: i + 1,
                    text: raw.to_string(),
                });
            }

            parents.truncate(depth);
            tree.add_child(&parents, branch)
                .map_err(|_| StError::MalformedStack {
                    line: i + 1,
                    text: raw.to_string(),
                })?;
            parents.push(branch.to_string());
        }

        Ok(tree)
    }

    /// Loads a [StackTree] from `path`, or [None] if the file does not exist.
    pub fn load(path: &Path) -> StResult<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Self::deserialize(&std::fs::read_to_string(path)?)?))
    }

    /// Persists the tree to `path` in its serialized text form.
    pub fn save(&self, path: &Path) -> StResult<()> {
        std::fs::write(path, self.serialize())?;
        Ok(())
    }
}
