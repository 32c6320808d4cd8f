//! Utilities for interacting with `git` repositories for the `gst` application.

use crate::errors::{StError, StResult};
use git2::{BranchType, Cred, FetchOptions, PushOptions, Remote, RemoteCallbacks, Repository};
use std::cell::RefCell;

/// A single commit rendered for guidance output.
#[derive(Debug, Clone)]
pub struct CommitLine {
    /// Abbreviated commit id.
    pub short_id: String,
    /// First line of the commit message.
    pub summary: String,
}

/// Extension trait for the [Repository] type to expose helper functions
/// related to stack management.
pub trait RepositoryExt {
    /// Returns the name of the currently checked out branch.
    fn current_branch_name(&self) -> StResult<String>;

    /// Checks out a local branch with the given `branch_name`.
    fn checkout_branch(&self, branch_name: &str) -> StResult<()>;

    /// The ahead/behind oracle: the number of commits reachable from `base`
    /// but not from `target`, and vice versa. [None] when either branch does
    /// not exist locally.
    fn ahead_behind(&self, base: &str, target: &str) -> StResult<Option<(usize, usize)>>;

    /// Returns up to `n` most recent commits reachable from `branch_name`.
    fn last_commits(&self, branch_name: &str, n: usize) -> StResult<Vec<CommitLine>>;

    /// Returns `true` if the local branch has an upstream configured.
    fn has_upstream(&self, branch_name: &str) -> StResult<bool>;

    /// Pushes a local branch to `remote`, surfacing the remote's failure
    /// text as [StError::PushRejected].
    fn push_branch(&self, remote: &mut Remote<'_>, branch_name: &str) -> StResult<()>;

    /// Records the upstream of `branch_name` by transforming the remote's
    /// first refspec and stripping the `refs/remotes/` prefix.
    ///
    /// TODO: derivation by refspec transform mirrors the remote's default
    /// layout only; a remote with a non-standard fetch refspec will produce a
    /// tracking ref we cannot resolve.
    fn update_upstream(&self, remote: &Remote<'_>, branch_name: &str) -> StResult<String>;

    /// Fetches from `remote`, returning (received objects, total deltas,
    /// total objects).
    fn fetch_remote(&self, remote: &mut Remote<'_>) -> StResult<(usize, usize, usize)>;
}

/// Remote callbacks wired for ssh-agent credentials.
fn agent_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username, _allowed| {
        Cred::ssh_key_from_agent(username.unwrap_or("git"))
    });
    callbacks
}

impl RepositoryExt for Repository {
    fn current_branch_name(&self) -> StResult<String> {
        let head = self.head()?;
        let name = head
            .shorthand()
            .ok_or_else(|| StError::NotFound("HEAD".to_string()))?;
        Ok(name.to_string())
    }

    fn checkout_branch(&self, branch_name: &str) -> StResult<()> {
        self.set_head(format!("refs/heads/{}", branch_name).as_str())?;
        self.checkout_head(None)?;
        Ok(())
    }

    fn ahead_behind(&self, base: &str, target: &str) -> StResult<Option<(usize, usize)>> {
        let (Ok(base), Ok(target)) = (
            self.find_branch(base, BranchType::Local),
            self.find_branch(target, BranchType::Local),
        ) else {
            return Ok(None);
        };
        let (Some(base_oid), Some(target_oid)) = (base.get().target(), target.get().target())
        else {
            return Ok(None);
        };
        Ok(Some(self.graph_ahead_behind(base_oid, target_oid)?))
    }

    fn last_commits(&self, branch_name: &str, n: usize) -> StResult<Vec<CommitLine>> {
        let branch = self.find_branch(branch_name, BranchType::Local)?;
        let target = branch
            .get()
            .target()
            .ok_or_else(|| StError::NotFound(branch_name.to_string()))?;

        let mut walk = self.revwalk()?;
        walk.push(target)?;

        let mut commits = Vec::with_capacity(n);
        for oid in walk.take(n) {
            let commit = self.find_commit(oid?)?;
            let short_id = commit
                .as_object()
                .short_id()?
                .as_str()
                .unwrap_or_default()
                .to_string();
            commits.push(CommitLine {
                short_id,
                summary: commit.summary().unwrap_or_default().to_string(),
            });
        }
        Ok(commits)
    }

    fn has_upstream(&self, branch_name: &str) -> StResult<bool> {
        let branch = self.find_branch(branch_name, BranchType::Local)?;
        Ok(branch.upstream().is_ok())
    }

    fn push_branch(&self, remote: &mut Remote<'_>, branch_name: &str) -> StResult<()> {
        let refname = format!("refs/heads/{}", branch_name);
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = agent_callbacks();
            callbacks.push_update_reference(|_reference, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some(message.to_string());
                }
                Ok(())
            });
            let mut opts = PushOptions::new();
            opts.remote_callbacks(callbacks);
            remote.push(&[refname.as_str()], Some(&mut opts))?;
        }

        match rejection.into_inner() {
            Some(message) => Err(StError::PushRejected {
                branch: branch_name.to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn update_upstream(&self, remote: &Remote<'_>, branch_name: &str) -> StResult<String> {
        let refspec = remote
            .refspecs()
            .next()
            .ok_or_else(|| StError::NotFound("remote refspec".to_string()))?;
        let tracking = refspec
            .transform(format!("refs/heads/{}", branch_name).as_str())?
            .as_str()
            .ok_or_else(|| StError::NotFound("tracking ref".to_string()))?
            .trim_start_matches("refs/remotes/")
            .to_string();

        // The remote-tracking branch must exist before it can be recorded.
        self.find_branch(&tracking, BranchType::Remote)?;
        let mut branch = self.find_branch(branch_name, BranchType::Local)?;
        branch.set_upstream(Some(&tracking))?;

        Ok(tracking)
    }

    fn fetch_remote(&self, remote: &mut Remote<'_>) -> StResult<(usize, usize, usize)> {
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(agent_callbacks());
        remote.fetch(&[] as &[&str], Some(&mut opts), None)?;

        let stats = remote.stats();
        Ok((
            stats.received_objects(),
            stats.total_deltas(),
            stats.total_objects(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use git2::{BranchType, Repository, Signature};
    use tempfile::TempDir;

    /// Initializes a repository with one commit and an `origin` remote.
    pub(crate) fn repo_with_commit() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "test").unwrap();
            config.set_str("user.email", "test@example.invalid").unwrap();
        }
        {
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = Signature::now("test", "test@example.invalid").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }
        repo.remote("origin", "https://github.com/me/repo.git")
            .unwrap();
        (dir, repo)
    }

    /// Creates a local branch at `HEAD` with a recorded `origin` upstream,
    /// so syncing it skips the push step.
    pub(crate) fn branch_with_upstream(repo: &Repository, name: &str) {
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch(name, &head, false).unwrap();
        repo.reference(
            &format!("refs/remotes/origin/{name}"),
            head.id(),
            true,
            "test fixture",
        )
        .unwrap();
        repo.find_branch(name, BranchType::Local)
            .unwrap()
            .set_upstream(Some(&format!("origin/{name}")))
            .unwrap();
    }
}
