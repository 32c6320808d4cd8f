//! Local mirror of the remote pull-request entities, constructed from raw
//! GraphQL edges. Field names on the wire follow the GitHub schema.

use super::pages::{edges_of, Pages};
use crate::errors::{StError, StResult};
use serde_json::Value;
use std::fmt::Display;

/// A pull request mirrored from the remote, with each nested collection
/// tracked by its own [Pages].
#[derive(Debug, Clone, PartialEq)]
pub struct Pr {
    pub number: u64,
    /// Opaque node id, used as the mutation target.
    pub id: String,
    pub author: Author,
    pub title: String,
    pub state: String,
    pub closed: bool,
    pub merged: bool,
    pub locked: bool,
    pub draft: bool,
    /// Base branch name; the stack parent this PR currently merges into.
    pub base: String,
    /// Head branch name; the join key back to a [StackNode].
    ///
    /// [StackNode]: crate::stack::StackNode
    pub head: String,
    pub comments: Pages<Comment>,
    pub threads: Pages<CodeThread>,
    pub reviews: Pages<Review>,
    pub commits: Pages<Commit>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Author {
    pub login: String,
    pub name: Option<String>,
}

impl Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.login),
            None => write!(f, "{}", self.login),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: Author,
    pub body: String,
    pub url: String,
    /// The comment's own edge cursor, used to address its reactions.
    pub cursor: Option<String>,
    pub reactions: Pages<Reaction>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Reaction {
    pub content: String,
    pub author: Author,
}

/// A review thread on a file path.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeThread {
    pub path: String,
    pub resolved: bool,
    pub outdated: bool,
    pub comments: Pages<Comment>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Review {
    pub author: Author,
    pub state: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub comments: Pages<Comment>,
}

// region: field accessors

fn field<'v>(value: &'v Value, key: &str) -> StResult<&'v Value> {
    value
        .get(key)
        .ok_or_else(|| StError::RemoteDataMissing(format!("`{key}` field")))
}

fn str_field(value: &Value, key: &str) -> StResult<String> {
    field(value, key)?
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| StError::RemoteDataMissing(format!("string `{key}` field")))
}

fn bool_field(value: &Value, key: &str) -> StResult<bool> {
    field(value, key)?
        .as_bool()
        .ok_or_else(|| StError::RemoteDataMissing(format!("boolean `{key}` field")))
}

fn u64_field(value: &Value, key: &str) -> StResult<u64> {
    field(value, key)?
        .as_u64()
        .ok_or_else(|| StError::RemoteDataMissing(format!("numeric `{key}` field")))
}

// endregion: field accessors

// region: constructors

/// Builds a [Pages] for the first page of `name` embedded in `node`,
/// constructing one item per embedded edge.
fn seed_pages<T>(
    node: &Value,
    name: &str,
    make: impl Fn(&Value) -> StResult<T>,
) -> StResult<Pages<T>> {
    let items = node
        .get(name)
        .into_iter()
        .flat_map(edges_of)
        .map(|edge| make(edge))
        .collect::<StResult<Vec<_>>>()?;
    Ok(Pages::from_node(node, name, items))
}

fn make_author(value: &Value) -> StResult<Author> {
    Ok(Author {
        login: str_field(value, "login")?,
        name: value
            .get("name")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
    })
}

pub(crate) fn make_reaction(edge: &Value) -> StResult<Reaction> {
    let node = field(edge, "node")?;
    Ok(Reaction {
        content: str_field(node, "content")?,
        author: make_author(field(node, "user")?)?,
    })
}

pub(crate) fn make_comment(edge: &Value) -> StResult<Comment> {
    let node = field(edge, "node")?;
    Ok(Comment {
        id: str_field(node, "id")?,
        author: make_author(field(node, "author")?)?,
        body: str_field(node, "body")?,
        url: str_field(node, "url")?,
        cursor: edge
            .get("cursor")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        reactions: seed_pages(node, "reactions", make_reaction)?,
    })
}

pub(crate) fn make_review(edge: &Value) -> StResult<Review> {
    let node = field(edge, "node")?;
    Ok(Review {
        author: make_author(field(node, "author")?)?,
        state: str_field(node, "state")?,
        url: str_field(node, "url")?,
    })
}

pub(crate) fn make_thread(edge: &Value) -> StResult<CodeThread> {
    let node = field(edge, "node")?;
    Ok(CodeThread {
        path: str_field(node, "path")?,
        resolved: bool_field(node, "isResolved")?,
        outdated: bool_field(node, "isOutdated")?,
        comments: seed_pages(node, "comments", make_comment)?,
    })
}

pub(crate) fn make_commit(edge: &Value) -> StResult<Commit> {
    // The search query wraps commit fields in a `commit` object.
    let node = field(edge, "node")?;
    let commit = node.get("commit").unwrap_or(node);
    Ok(Commit {
        comments: seed_pages(commit, "comments", make_comment)?,
    })
}

pub(crate) fn make_pr(edge: &Value) -> StResult<Pr> {
    let node = field(edge, "node")?;
    Ok(Pr {
        number: u64_field(node, "number")?,
        id: str_field(node, "id")?,
        author: make_author(field(node, "author")?)?,
        title: str_field(node, "title")?,
        state: str_field(node, "state")?,
        closed: bool_field(node, "closed")?,
        merged: bool_field(node, "merged")?,
        locked: bool_field(node, "locked")?,
        draft: bool_field(node, "isDraft")?,
        base: str_field(node, "baseRefName")?,
        head: str_field(node, "headRefName")?,
        comments: seed_pages(node, "comments", make_comment)?,
        threads: seed_pages(node, "reviewThreads", make_thread)?,
        reviews: seed_pages(node, "reviews", make_review)?,
        commits: seed_pages(node, "commits", make_commit)?,
    })
}

// endregion: constructors


#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn pr_from_search_edge() {
        let edge = fixtures::pr_edge(7, "feature-2", "main", false);
        let pr = make_pr(&edge).unwrap();
        assert_eq!(pr.number, 7);
        assert_eq!(pr.id, "PR_7");
        assert_eq!(pr.head, "feature-2");
        assert_eq!(pr.base, "main");
        assert!(!pr.closed);
        assert_eq!(pr.author.to_string(), "Octo Cat (octocat)");
        // Embedded empty collections are already complete.
        assert!(pr.comments.complete());
        assert!(pr.threads.complete());
    }

    #[test]
    fn comment_with_partial_reactions() {
        let edge = json!({
            "cursor": "cm1",
            "node": {
                "id": "IC_1",
                "url": "https://example.invalid/1",
                "body": "hello",
                "author": { "login": "octocat" },
                "reactions": {
                    "pageInfo": { "endCursor": "r9" },
                    "edges": [
                        { "cursor": "r1", "node": { "content": "THUMBS_UP", "user": { "login": "a", "name": null } } }
                    ],
                },
            }
        });
        let comment = make_comment(&edge).unwrap();
        assert_eq!(comment.cursor.as_deref(), Some("cm1"));
        assert_eq!(comment.reactions.items().len(), 1);
        assert!(!comment.reactions.complete());
        assert_eq!(comment.author.to_string(), "octocat");
    }

    #[test]
    fn missing_field_is_remote_data_missing() {
        let edge = json!({ "node": { "number": 1 } });
        let err = make_pr(&edge).unwrap_err();
        assert!(matches!(err, StError::RemoteDataMissing(_)));
    }
}
