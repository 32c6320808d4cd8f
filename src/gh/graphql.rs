//! GraphQL query construction and transport for the GitHub API.
//!
//! Queries are assembled from a small set of combinators rather than written
//! out longhand, so the paginated shape (`pageInfo { endCursor }` plus
//! `edges { cursor node { … } }`) is applied uniformly to every collection.

use crate::{
    constants::GITHUB_GRAPHQL_URL,
    errors::{StError, StResult},
};
use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Executes GraphQL documents against a remote endpoint. The single seam
/// between the fetch engine and the network.
#[async_trait]
pub trait GraphQlClient {
    /// Runs a query or mutation and returns the raw response document.
    async fn run(&self, query: &str) -> StResult<Value>;
}

/// [GraphQlClient] for the GitHub GraphQL API over HTTPS.
pub struct HttpGraphQl {
    http: reqwest::Client,
    token: String,
}

impl HttpGraphQl {
    /// Creates a new client authenticating with `token`.
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }
}

#[async_trait]
impl GraphQlClient for HttpGraphQl {
    async fn run(&self, query: &str) -> StResult<Value> {
        debug!(query, "posting GraphQL document");
        let response = self
            .http
            .post(GITHUB_GRAPHQL_URL)
            .bearer_auth(&self.token)
            .header("User-Agent", "gst")
            .header("Accept", "application/vnd.github.v3+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&json!({ "query": query }))
            .send()
            .await?
            .error_for_status()?;

        let result: Value = response.json().await?;
        if let Some(errors) = result.get("errors").and_then(Value::as_array) {
            let mut messages = Vec::with_capacity(errors.len());
            for e in errors {
                let message = e
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                match e.get("type").and_then(Value::as_str) {
                    Some(kind) => error!("{kind}: {message}"),
                    None => error!("{message}"),
                }
                messages.push(message.to_string());
            }
            return Err(StError::RemoteProtocolError(messages.join("; ")));
        }
        Ok(result)
    }
}

// region: builder

fn fields(f: &[&str]) -> String {
    f.join(" ")
}

fn obj(name: &str, f: &[&str]) -> String {
    format!("{}{{ {} }}", name, fields(f))
}

fn on(t: &str, f: &[&str]) -> String {
    obj(&format!("... on {}", t), f)
}

fn func(name: &str, args: &[(&str, String)], f: &[&str]) -> String {
    let extra = args.iter().map(|(k, v)| format!("{k}: {v}")).join(", ");
    obj(&format!("{name}({extra})"), f)
}

/// Wraps a connection field with the uniform pagination shape.
fn paged(name: &str, args: &[(&str, String)], f: &[&str]) -> String {
    func(
        name,
        args,
        &[
            &obj("pageInfo", &["endCursor"]),
            &obj("edges", &["cursor", &obj("node", f)]),
        ],
    )
}

fn first_few() -> Vec<(&'static str, String)> {
    vec![("first", "10".to_string())]
}

fn cursor_or_null(c: Option<&str>) -> String {
    c.map(|c| format!("\"{c}\"")).unwrap_or_else(|| "null".to_string())
}

/// Renders mutation input arguments as a single `input: { … }` argument.
fn input(args: &[(&str, String)]) -> Vec<(&'static str, String)> {
    let extra = args.iter().map(|(k, v)| format!("{k}: {v}")).join(", ");
    vec![("input", format!("{{ {extra} }}"))]
}

// endregion: builder

// region: fragments

static AUTHOR: Lazy<String> = Lazy::new(|| obj("author", &["login", &on("User", &["name"])]));

static REACTION: Lazy<String> =
    Lazy::new(|| fields(&["content", &obj("user", &["login", "name"])]));

pub(crate) static COMMENT: Lazy<String> = Lazy::new(|| {
    fields(&[
        "id",
        "url",
        "body",
        &AUTHOR,
        &paged("reactions", &first_few(), &[&REACTION]),
    ])
});

pub(crate) static REVIEW_THREAD: Lazy<String> = Lazy::new(|| {
    fields(&[
        "path",
        "isResolved",
        "isOutdated",
        &paged("comments", &[("last", "1".to_string())], &[&COMMENT]),
    ])
});

pub(crate) static REVIEW: Lazy<String> = Lazy::new(|| fields(&["state", "url", &AUTHOR]));

pub(crate) static COMMIT: Lazy<String> = Lazy::new(|| {
    obj(
        "commit",
        &[&paged("comments", &[("last", "1".to_string())], &[&COMMENT])],
    )
});

static PR: Lazy<String> = Lazy::new(|| {
    fields(&[
        "number",
        "id",
        "title",
        &AUTHOR,
        "baseRefName",
        "headRefName",
        "isDraft",
        "locked",
        "closed",
        "merged",
        "state",
        &paged("comments", &first_few(), &[&COMMENT]),
        &paged("reviewThreads", &first_few(), &[&REVIEW_THREAD]),
        &paged("reviews", &first_few(), &[&REVIEW]),
        &paged("commits", &first_few(), &[&COMMIT]),
    ])
});

// endregion: fragments

// region: queries

/// The top-level search for pull requests whose heads match the stack.
pub(crate) fn prs_query(owner: &str, repository: &str, heads: &str, after: Option<&str>) -> String {
    let mut args = first_few();
    args.push(("after", cursor_or_null(after)));
    args.push(("type", "ISSUE".to_string()));
    args.push((
        "query",
        format!("\"repo:{owner}/{repository} is:pr {heads}\""),
    ));
    obj("query search_prs", &[&paged("search", &args, &[&on("PullRequest", &[&PR])])])
}

/// One nested collection of a single pull request, paged independently.
pub(crate) fn pr_details_query(
    detail: &str,
    detail_fields: &str,
    owner: &str,
    repository: &str,
    pr_number: u64,
    after: Option<&str>,
) -> String {
    let mut args = first_few();
    args.push(("after", cursor_or_null(after)));
    obj(
        &format!("query pr_{detail}"),
        &[&func(
            "repository",
            &[
                ("owner", format!("\"{owner}\"")),
                ("name", format!("\"{repository}\"")),
            ],
            &[&func(
                "pullRequest",
                &[("number", pr_number.to_string())],
                &[&paged(detail, &args, &[detail_fields])],
            )],
        )],
    )
}

/// Reactions of one comment, addressed by the comment's own cursor.
pub(crate) fn comment_reactions_query(
    owner: &str,
    repository: &str,
    pr_number: u64,
    comment_cursor: Option<&str>,
    after: Option<&str>,
) -> String {
    let mut args = first_few();
    args.push(("after", cursor_or_null(after)));
    obj(
        "query pr_comments_reactions",
        &[&func(
            "repository",
            &[
                ("owner", format!("\"{owner}\"")),
                ("name", format!("\"{repository}\"")),
            ],
            &[&func(
                "pullRequest",
                &[("number", pr_number.to_string())],
                &[&paged(
                    "comments",
                    &[
                        ("first", "1".to_string()),
                        ("after", cursor_or_null(comment_cursor)),
                    ],
                    &[&paged("reactions", &args, &[&REACTION])],
                )],
            )],
        )],
    )
}

pub(crate) fn repo_id_query(owner: &str, repository: &str) -> String {
    obj(
        "query get_repo_id",
        &[&func(
            "repository",
            &[
                ("owner", format!("\"{owner}\"")),
                ("name", format!("\"{repository}\"")),
            ],
            &["id"],
        )],
    )
}

// endregion: queries

// region: mutations

/// `subject_id` is the PR's opaque id; `body` must already be JSON-encoded.
pub(crate) fn add_comment_mutation(subject_id: &str, body: &str) -> String {
    obj(
        "mutation add_pr_comment",
        &[&func(
            "addComment",
            &input(&[
                ("subjectId", format!("\"{subject_id}\"")),
                ("body", body.to_string()),
            ]),
            &["clientMutationId"],
        )],
    )
}

pub(crate) fn update_comment_mutation(comment_id: &str, body: &str) -> String {
    obj(
        "mutation update_pr_comment",
        &[&func(
            "updateIssueComment",
            &input(&[
                ("id", format!("\"{comment_id}\"")),
                ("body", body.to_string()),
            ]),
            &["clientMutationId"],
        )],
    )
}

/// `title` and `body` must already be JSON-encoded.
pub(crate) fn create_pr_mutation(
    repository_id: &str,
    base: &str,
    head: &str,
    title: &str,
    draft: bool,
    body: &str,
) -> String {
    obj(
        "mutation create_pr",
        &[&func(
            "createPullRequest",
            &input(&[
                ("repositoryId", format!("\"{repository_id}\"")),
                ("baseRefName", format!("\"{base}\"")),
                ("headRefName", format!("\"{head}\"")),
                ("title", title.to_string()),
                ("draft", draft.to_string()),
                ("body", body.to_string()),
            ]),
            &["clientMutationId", &obj("pullRequest", &[&PR])],
        )],
    )
}

pub(crate) fn update_pr_base_mutation(pr_id: &str, base: &str) -> String {
    obj(
        "mutation update_pr",
        &[&func(
            "updatePullRequest",
            &input(&[
                ("pullRequestId", format!("\"{pr_id}\"")),
                ("baseRefName", format!("\"{base}\"")),
            ]),
            &["clientMutationId"],
        )],
    )
}

// endregion: mutations


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_shapes() {
        assert_eq!(obj("pageInfo", &["endCursor"]), "pageInfo{ endCursor }");
        assert_eq!(
            func("repository", &[("owner", "\"me\"".to_string())], &["id"]),
            "repository(owner: \"me\"){ id }"
        );
        assert_eq!(on("User", &["name"]), "... on User{ name }");
        assert_eq!(
            paged("reviews", &first_few(), &["state"]),
            "reviews(first: 10){ pageInfo{ endCursor } edges{ cursor node{ state } } }"
        );
    }

    #[test]
    fn cursor_rendering() {
        assert_eq!(cursor_or_null(None), "null");
        assert_eq!(cursor_or_null(Some("abc")), "\"abc\"");
    }

    #[test]
    fn search_query_carries_cursor_and_heads() {
        let q = prs_query("me", "repo", "head:feature-1 head:feature-2", Some("xyz"));
        assert!(q.starts_with("query search_prs{ search("));
        assert!(q.contains("after: \"xyz\""));
        assert!(q.contains("\"repo:me/repo is:pr head:feature-1 head:feature-2\""));
        assert!(q.contains("... on PullRequest"));
    }

    #[test]
    fn mutation_inputs_are_wrapped() {
        let m = update_pr_base_mutation("PR_x", "main");
        assert!(m.contains("updatePullRequest(input: { pullRequestId: \"PR_x\", baseRefName: \"main\" })"));

        let c = add_comment_mutation("PR_x", "\"hello\"");
        assert!(c.contains("addComment(input: { subjectId: \"PR_x\", body: \"hello\" })"));
    }
}
