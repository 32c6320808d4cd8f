//! The in-memory context of the `gst` application.

use crate::{
    constants::STACK_FILE_NAME,
    errors::{StError, StResult},
    git::RepositoryExt,
    stack::StackTree,
};
use git2::Repository;
use nu_ansi_term::Color;
use std::path::PathBuf;

mod fmt;
pub use fmt::DisplayBranch;

/// The in-memory context of the `gst` application: the repository, the stack
/// tree, and where the tree lives on disk.
pub struct StContext<'a> {
    /// The repository the stack lives in.
    pub repository: &'a Repository,
    /// The tree of stacked branches.
    pub tree: StackTree,
    /// Path of the persisted stack file.
    pub stack_path: PathBuf,
    /// Whether remote operations are disabled for this invocation.
    pub offline: bool,
}

impl<'a> StContext<'a> {
    /// Loads the stack file for the given [Repository], or seeds a fresh
    /// single-branch stack from the checked-out branch when no file exists.
    ///
    /// ## Takes
    /// - `stack_override` - An explicit stack file path, replacing the
    ///   default `<workdir>/.gst.stack`.
    pub fn load_or_seed(
        repository: &'a Repository,
        stack_override: Option<PathBuf>,
        offline: bool,
    ) -> StResult<Self> {
        let stack_path = match stack_override {
            Some(path) => path,
            None => repository
                .workdir()
                .ok_or_else(|| StError::NotFound("repository workdir".to_string()))?
                .join(STACK_FILE_NAME),
        };

        let tree = match StackTree::load(&stack_path)? {
            Some(tree) => tree,
            // An unborn HEAD has no branch to seed from.
            None if repository.is_empty()? => StackTree::new(),
            None => StackTree::seeded(repository.current_branch_name()?),
        };

        Ok(Self {
            repository,
            tree,
            stack_path,
            offline,
        })
    }

    /// Persists the stack tree to its file.
    pub fn save(&self) -> StResult<()> {
        self.tree.save(&self.stack_path)
    }

    /// Checks out `branch`, and warns when it has fallen behind its stack
    /// parent, showing the parent commits it is missing.
    pub fn checkout(&self, branch: &str) -> StResult<()> {
        self.repository.checkout_branch(branch)?;

        if let Some(parent) = self.tree.parent_of(branch)? {
            let behind = self
                .repository
                .ahead_behind(&parent.branch, branch)?
                .map_or(0, |(ahead, _)| ahead);
            if behind > 0 {
                println!(
                    "{}",
                    Color::Yellow.paint(format!(
                        "{branch} is {behind} commit{} behind {}:",
                        if behind == 1 { "" } else { "s" },
                        parent.branch
                    ))
                );
                for line in self.repository.last_commits(&parent.branch, behind.min(3))? {
                    println!("  {} {}", Color::Cyan.paint(line.short_id), line.summary);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::git::testing::repo_with_commit;
    use git2::Repository;
    use tempfile::TempDir;

    #[test]
    fn unborn_head_loads_an_empty_tree() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path()).unwrap();

        let ctx = StContext::load_or_seed(&repository, None, true).unwrap();
        assert!(ctx.tree.is_empty());
    }

    #[test]
    fn fresh_repository_seeds_the_checked_out_branch() {
        let (_dir, repository) = repo_with_commit();
        let current = repository.current_branch_name().unwrap();

        let ctx = StContext::load_or_seed(&repository, None, true).unwrap();
        assert!(ctx.tree.find(&current).is_some());
    }
}
