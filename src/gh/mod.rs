//! GitHub integration: a once-per-invocation client over the GraphQL
//! capability surface, plus the stack-aware queries and mutations built on
//! top of it.

use crate::{
    constants::{COMMENT_BEGIN, COMMENT_END, COMMENT_FIRST_LINE, PR_TEMPLATE_DIRS},
    errors::{StError, StResult},
    stack::StackTree,
};
use git2::Repository;
use itertools::Itertools;
use serde_json::Value;
use std::{collections::HashMap, env, path::Path, process::Command};
use tracing::debug;

pub mod graphql;
pub mod model;
pub mod pages;
pub mod status;

use graphql::{
    add_comment_mutation, comment_reactions_query, create_pr_mutation, pr_details_query,
    prs_query, repo_id_query, update_comment_mutation, update_pr_base_mutation, GraphQlClient,
    HttpGraphQl, COMMENT, COMMIT, REVIEW, REVIEW_THREAD,
};
use model::{make_comment, make_commit, make_pr, make_reaction, make_review, make_thread, Pr};
use pages::Pages;

/// The GitHub client for one repository, constructed once at command start
/// and threaded through explicitly.
pub struct GitHub<C = HttpGraphQl> {
    pub(crate) client: C,
    /// Repository owner parsed from the `origin` URL.
    pub owner: String,
    /// Repository name parsed from the `origin` URL.
    pub repository: String,
    template: Option<String>,
}

impl GitHub<HttpGraphQl> {
    /// Builds a client from the repository's `origin` remote, with the token
    /// taken from `GITHUB_TOKEN` or `git credential fill`.
    ///
    /// ## Returns
    /// - `Err(StError::RemoteUnavailable)` - `origin` is not a GitHub remote.
    pub fn from_repository(repo: &Repository) -> StResult<Self> {
        let origin = repo.find_remote("origin")?;
        let url = origin
            .url()
            .ok_or_else(|| StError::NotFound("origin URL".to_string()))?;
        let (owner, repository) = parse_owner_repo(url)?;

        let template = repo.workdir().and_then(discover_template);
        match &template {
            Some(_) => debug!("found PR template"),
            None => debug!("no PR templates found"),
        }

        Ok(Self {
            client: HttpGraphQl::new(github_token()?),
            owner,
            repository,
            template,
        })
    }
}

impl<C: GraphQlClient + Sync> GitHub<C> {
    /// Creates a client over an explicit transport. Used by tests.
    pub fn new(client: C, owner: String, repository: String, template: Option<String>) -> Self {
        Self {
            client,
            owner,
            repository,
            template,
        }
    }

    /// Fetches every pull request whose head is one of `heads`, paging the
    /// search to completion first and then each PR's nested collections
    /// (comments with their reactions, review threads, reviews, commits)
    /// independently.
    pub async fn search_stack_prs(&self, heads: &[String]) -> StResult<Vec<Pr>> {
        if heads.is_empty() {
            return Ok(Vec::new());
        }
        let heads_q = heads.iter().map(|h| format!("head:{h}")).join(" ");

        let mut pages = Pages::empty("search");
        pages
            .append_all(&self.client, make_pr, |after| {
                prs_query(&self.owner, &self.repository, &heads_q, after)
            })
            .await?;
        let mut prs = pages.into_items();

        for pr in &mut prs {
            let number = pr.number;
            if !pr.comments.complete() {
                pr.comments
                    .append_all(&self.client, make_comment, |after| {
                        self.details_query("comments", &COMMENT, number, after)
                    })
                    .await?;
            }
            for comment in pr.comments.items_mut() {
                if !comment.reactions.complete() {
                    let cursor = comment.cursor.clone();
                    comment
                        .reactions
                        .append_all(&self.client, make_reaction, |after| {
                            comment_reactions_query(
                                &self.owner,
                                &self.repository,
                                number,
                                cursor.as_deref(),
                                after,
                            )
                        })
                        .await?;
                }
            }

            if !pr.threads.complete() {
                pr.threads
                    .append_all(&self.client, make_thread, |after| {
                        self.details_query("reviewThreads", &REVIEW_THREAD, number, after)
                    })
                    .await?;
            }
            if !pr.reviews.complete() {
                pr.reviews
                    .append_all(&self.client, make_review, |after| {
                        self.details_query("reviews", &REVIEW, number, after)
                    })
                    .await?;
            }
            if !pr.commits.complete() {
                pr.commits
                    .append_all(&self.client, make_commit, |after| {
                        self.details_query("commits", &COMMIT, number, after)
                    })
                    .await?;
            }
        }
        Ok(prs)
    }

    fn details_query(
        &self,
        detail: &str,
        detail_fields: &str,
        number: u64,
        after: Option<&str>,
    ) -> String {
        pr_details_query(
            detail,
            detail_fields,
            &self.owner,
            &self.repository,
            number,
            after,
        )
    }

    /// Creates a pull request with the given base and head branches. The
    /// title defaults to the head branch name; the body comes from the
    /// repository's PR template, if any.
    pub async fn create_pr(
        &self,
        base: &str,
        head_branch: &str,
        title: &str,
        draft: bool,
    ) -> StResult<Pr> {
        debug!(base, head = head_branch, "creating PR");
        let response = self.client.run(&repo_id_query(&self.owner, &self.repository)).await?;
        let repository_id = response
            .pointer("/data/repository/id")
            .and_then(Value::as_str)
            .ok_or_else(|| StError::RemoteDataMissing("repository id".to_string()))?
            .to_string();

        let head = format!("{}:{}", self.owner, head_branch);
        let title = serde_json::to_string(if title.is_empty() { head_branch } else { title })?;
        let body = serde_json::to_string(self.template.as_deref().unwrap_or_default())?;

        let response = self
            .client
            .run(&create_pr_mutation(
                &repository_id,
                base,
                &head,
                &title,
                draft,
                &body,
            ))
            .await?;
        let node = response
            .pointer("/data/createPullRequest/pullRequest")
            .ok_or_else(|| StError::RemoteDataMissing("created pull request".to_string()))?;
        make_pr(&serde_json::json!({ "node": node }))
    }

    /// Posts the stack comment on `pr`, or brings the existing one up to
    /// date. Returns `true` when a new comment was created, `false` when an
    /// existing one was updated or already current.
    pub async fn comment(&self, pr: &Pr, body: &str) -> StResult<bool> {
        match pr
            .comments
            .items()
            .iter()
            .find(|c| c.body.contains(COMMENT_BEGIN))
        {
            Some(existing) => {
                if existing.body.trim_end() != body.trim_end() {
                    debug!(comment = existing.id, "updating stack comment");
                    self.client
                        .run(&update_comment_mutation(
                            &existing.id,
                            &serde_json::to_string(body)?,
                        ))
                        .await?;
                }
                Ok(false)
            }
            None => {
                debug!(pr = pr.number, "adding stack comment");
                self.client
                    .run(&add_comment_mutation(&pr.id, &serde_json::to_string(body)?))
                    .await?;
                Ok(true)
            }
        }
    }

    /// Retargets `pr` onto `base`, updating the local mirror on success.
    /// Returns `false` when the base is already current.
    pub async fn update_pr_base(&self, pr: &mut Pr, base: &str) -> StResult<bool> {
        if pr.base == base {
            return Ok(false);
        }
        debug!(pr = pr.number, from = pr.base, to = base, "updating PR base");
        self.client
            .run(&update_pr_base_mutation(&pr.id, base))
            .await?;
        pr.base = base.to_string();
        Ok(true)
    }
}

/// Groups fetched pull requests by their head branch name, the join key back
/// to the stack tree.
pub fn prs_by_head(prs: Vec<Pr>) -> HashMap<String, Vec<Pr>> {
    let mut map: HashMap<String, Vec<Pr>> = HashMap::new();
    for pr in prs {
        map.entry(pr.head.clone()).or_default().push(pr);
    }
    map
}

/// Renders the marker-delimited stack comment for `current_pr`: one line per
/// stack entry, indented by depth, naming either the entry's PRs or a link
/// to the branch.
pub fn stack_comment(
    tree: &StackTree,
    prs: &HashMap<String, Vec<Pr>>,
    current_pr: u64,
) -> String {
    let mut md = vec![
        COMMENT_BEGIN.to_string(),
        COMMENT_FIRST_LINE.to_string(),
        String::new(),
    ];
    for entry in tree.traverse(true) {
        let indent = "  ".repeat(entry.depth - 1);
        match prs.get(entry.branch).filter(|list| !list.is_empty()) {
            Some(list) => {
                for pr in list {
                    let marker = if pr.number == current_pr { " 👈" } else { "" };
                    md.push(format!("{indent}* **PR #{}**{marker}", pr.number));
                }
            }
            None => md.push(format!(
                "{indent}* [{branch}](../tree/{branch})",
                branch = entry.branch
            )),
        }
    }
    md.push(COMMENT_END.to_string());
    md.join("\n")
}

/// Splits an `origin` URL into owner and repository name. Accepts both the
/// ssh (`git@github.com:owner/repo.git`) and https forms.
///
/// ## Returns
/// - `Err(StError::RemoteUnavailable)` - the URL does not point at GitHub.
pub fn parse_owner_repo(url: &str) -> StResult<(String, String)> {
    if !url.contains("github.com") {
        return Err(StError::RemoteUnavailable(format!(
            "`origin` is not a GitHub remote: {url}"
        )));
    }

    let path = url
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit_once("github.com")
        .map(|(_, path)| path.trim_start_matches([':', '/']))
        .unwrap_or_default();

    path.split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
        .map(|(owner, repo)| (owner.to_string(), repo.to_string()))
        .ok_or_else(|| {
            StError::RemoteUnavailable(format!("Cannot parse owner/repository from {url}"))
        })
}

/// Reads the token from `GITHUB_TOKEN`, falling back to `git credential
/// fill`.
fn github_token() -> StResult<String> {
    if let Ok(token) = env::var("GITHUB_TOKEN") {
        return Ok(token);
    }

    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new("git")
        .args(["credential", "fill"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(b"protocol=https\nhost=github.com\n\n")?;
    }
    let output = child.wait_with_output()?;

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.strip_prefix("password=").map(ToOwned::to_owned))
        .ok_or_else(|| {
            StError::RemoteUnavailable(
                "No GitHub token found. Set GITHUB_TOKEN or configure a git credential helper."
                    .to_string(),
            )
        })
}

/// Probes the conventional locations for a PR body template.
fn discover_template(workdir: &Path) -> Option<String> {
    PR_TEMPLATE_DIRS
        .iter()
        .map(|dir| workdir.join(dir).join("pull_request_template.md"))
        .find(|path| path.is_file())
        .and_then(|path| std::fs::read_to_string(path).ok())
}
