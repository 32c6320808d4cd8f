//! Divergence detection between stacked branches and their parents.
//!
//! Both walks consume an ahead/behind oracle, `oracle(base, target) ->
//! Option<(ahead, behind)>`, where `ahead` is the number of commits reachable
//! from `base` but not from `target`. [None] means one of the refs does not
//! exist locally and the entry cannot be checked.

use super::StackTree;

/// A branch that has fallen behind its parent: `ahead` commits of the parent
/// are missing from the branch.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Divergence<'a> {
    /// The diverged branch.
    pub branch: &'a str,
    /// Its parent branch.
    pub parent: &'a str,
    /// Derived depth of the diverged branch.
    pub depth: usize,
    /// Commits present in the parent but absent from the branch.
    pub ahead: usize,
}

/// Scans the stack in reverse order and reports divergences, deepest first.
///
/// After a divergence is recorded at some depth, the scan stops as soon as it
/// reaches a shallower depth: when an entire ancestor chain has drifted for
/// the same underlying reason, only the deepest records surface. Entries at
/// the same depth in sibling subtrees are still reported. Entries whose refs
/// cannot be resolved by the oracle are skipped silently.
pub fn divergences<'a, O>(tree: &'a StackTree, mut oracle: O) -> Vec<Divergence<'a>>
where
    O: FnMut(&str, &str) -> Option<(usize, usize)>,
{
    let mut found = Vec::new();
    let mut floor = 0;

    for entry in tree.rtraverse(false) {
        if entry.depth < floor {
            break;
        }
        let Some(parent) = entry.parent else {
            continue;
        };
        let Some((ahead, _)) = oracle(parent, entry.branch) else {
            continue;
        };
        if ahead != 0 {
            found.push(Divergence {
                branch: entry.branch,
                parent,
                depth: entry.depth,
                ahead,
            });
            floor = entry.depth;
        }
    }

    found
}

/// One item of the restack worklist: `ahead == 0` means the branch is already
/// up to date on its parent.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RestackStep<'a> {
    /// The branch to (potentially) rebase.
    pub branch: &'a str,
    /// The branch to rebase onto.
    pub parent: &'a str,
    /// Commits present in the parent but absent from the branch.
    pub ahead: usize,
}

/// Walks the stack in forward order, parents before dependents, and reports
/// every checkable branch independently: an exhaustive worklist rather than a
/// root-cause alert, so no suppression applies.
pub fn restack_worklist<'a, O>(tree: &'a StackTree, mut oracle: O) -> Vec<RestackStep<'a>>
where
    O: FnMut(&str, &str) -> Option<(usize, usize)>,
{
    tree.traverse(false)
        .filter_map(|entry| {
            let parent = entry.parent?;
            let (ahead, _) = oracle(parent, entry.branch)?;
            Some(RestackStep {
                branch: entry.branch,
                parent,
                ahead,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    /// Oracle backed by a map of `(base, target) -> ahead`; absent pairs are
    /// treated as missing refs.
    fn oracle<'a>(
        ahead: &'a [((&'static str, &'static str), usize)],
    ) -> impl FnMut(&str, &str) -> Option<(usize, usize)> + 'a {
        let map: HashMap<(&str, &str), usize> = ahead.iter().copied().collect();
        move |base, target| map.get(&(base, target)).map(|a| (*a, 0))
    }

    #[test]
    fn single_divergence_reported() {
        let tree = StackTree::deserialize("root\n\tfeature-1\n\t\tfeature-2\n").unwrap();
        let found = divergences(
            &tree,
            oracle(&[(("root", "feature-1"), 0), (("feature-1", "feature-2"), 3)]),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].branch, "feature-2");
        assert_eq!(found[0].ahead, 3);
    }

    #[test]
    fn deepest_divergence_suppresses_ancestors() {
        // a <- b <- c: both b and c have drifted; only c, the deepest, is
        // reported because the scan stops once it reaches b's depth.
        let tree = StackTree::deserialize("root\n\ta\n\t\tb\n\t\t\tc\n").unwrap();
        let found = divergences(
            &tree,
            oracle(&[
                (("root", "a"), 0),
                (("a", "b"), 2),
                (("b", "c"), 1),
            ]),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].branch, "c");
        assert_eq!(found[0].ahead, 1);
        assert_eq!(found[0].depth, 4);
    }

    #[test]
    fn equal_depth_siblings_both_reported() {
        let tree = StackTree::deserialize("root\n\ta\n\t\tb\n\tc\n\t\td\n").unwrap();
        let found = divergences(
            &tree,
            oracle(&[
                (("root", "a"), 0),
                (("root", "c"), 5),
                (("a", "b"), 1),
                (("c", "d"), 1),
            ]),
        );
        // b and d share a depth, so both surface; the shallower drift of c is
        // suppressed.
        let branches: Vec<_> = found.iter().map(|d| d.branch).collect();
        assert_eq!(branches, ["b", "d"]);
    }

    #[test]
    fn missing_refs_skipped_silently() {
        let tree = StackTree::deserialize("root\n\tfeature-1\n\t\tfeature-2\n").unwrap();
        // feature-2's ref is unknown to the oracle.
        let found = divergences(&tree, oracle(&[(("root", "feature-1"), 0)]));
        assert!(found.is_empty());
    }

    #[test]
    fn worklist_reports_every_branch() {
        let tree = StackTree::deserialize("root\n\tfeature-1\n\t\tfeature-2\n").unwrap();
        let steps = restack_worklist(
            &tree,
            oracle(&[(("root", "feature-1"), 0), (("feature-1", "feature-2"), 3)]),
        );
        assert_eq!(
            steps,
            [
                RestackStep { branch: "feature-1", parent: "root", ahead: 0 },
                RestackStep { branch: "feature-2", parent: "feature-1", ahead: 3 },
            ]
        );
    }
}
