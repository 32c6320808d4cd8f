//! Review status of a pull request, derived from its fetched collections.

use super::model::{Author, CodeThread, Comment, Pr, Review};

/// Aggregated review state of one pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct PrStatus {
    /// Review-thread comments still waiting on the PR author, grouped per
    /// commenter in first-seen order.
    pub unresolved: Vec<(Author, Vec<Comment>)>,
    /// Latest review per reviewer requesting changes.
    pub change_requested: Vec<Review>,
    /// Latest review per reviewer approving.
    pub approved: Vec<Review>,
    /// Whether the PR base matches the branch's stack parent.
    pub in_sync: bool,
}

/// Computes the [PrStatus] of `pr` against its branch's stack `parent`.
///
/// A review thread counts as unresolved while it is not marked resolved and
/// the PR author has neither written its last comment nor reacted to it
/// (`EYES` and `CONFUSED` reactions do not count as a reply). Review tallies
/// keep only the latest review of each reviewer.
pub fn pr_status(pr: &Pr, parent: Option<&str>) -> PrStatus {
    let mut unresolved: Vec<(Author, Vec<Comment>)> = Vec::new();
    for thread in pr.threads.items() {
        if thread.resolved || author_replied(pr, thread) {
            continue;
        }
        for comment in thread.comments.items() {
            match unresolved
                .iter_mut()
                .find(|(author, _)| *author == comment.author)
            {
                Some((_, comments)) => comments.push(comment.clone()),
                None => unresolved.push((comment.author.clone(), vec![comment.clone()])),
            }
        }
    }

    // The latest review of each reviewer wins.
    let mut latest: Vec<&Review> = Vec::new();
    for review in pr.reviews.items() {
        match latest
            .iter_mut()
            .find(|previous| previous.author.login == review.author.login)
        {
            Some(slot) => *slot = review,
            None => latest.push(review),
        }
    }

    PrStatus {
        unresolved,
        change_requested: latest
            .iter()
            .filter(|review| review.state == "CHANGES_REQUESTED")
            .map(|review| (*review).clone())
            .collect(),
        approved: latest
            .iter()
            .filter(|review| review.state == "APPROVED")
            .map(|review| (*review).clone())
            .collect(),
        in_sync: parent.is_none_or(|parent| pr.base == parent),
    }
}

/// Whether the PR author has answered the thread's last comment, either by
/// writing it or by reacting to it with anything but `EYES` or `CONFUSED`.
fn author_replied(pr: &Pr, thread: &CodeThread) -> bool {
    let Some(last) = thread.comments.items().last() else {
        return false;
    };
    if last.author.login == pr.author.login {
        return true;
    }
    last.reactions.items().iter().any(|reaction| {
        reaction.author.login == pr.author.login
            && !matches!(reaction.content.as_str(), "EYES" | "CONFUSED")
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gh::model::{fixtures::pr_edge, make_pr};
    use serde_json::{json, Value};

    fn page(edges: Vec<Value>) -> Value {
        let end = edges
            .last()
            .and_then(|edge| edge.get("cursor"))
            .cloned()
            .unwrap_or(Value::Null);
        json!({ "pageInfo": { "endCursor": end }, "edges": edges })
    }

    fn reaction_edge(i: usize, login: &str, content: &str) -> Value {
        json!({
            "cursor": format!("r{i}"),
            "node": { "content": content, "user": { "login": login, "name": null } }
        })
    }

    fn comment_edge(i: usize, login: &str, reactions: Vec<Value>) -> Value {
        json!({
            "cursor": format!("c{i}"),
            "node": {
                "id": format!("IC_{i}"),
                "url": "https://example.invalid",
                "body": format!("comment {i}"),
                "author": { "login": login },
                "reactions": page(reactions),
            }
        })
    }

    fn thread_edge(i: usize, resolved: bool, comments: Vec<Value>) -> Value {
        json!({
            "cursor": format!("t{i}"),
            "node": {
                "path": "src/lib.rs",
                "isResolved": resolved,
                "isOutdated": false,
                "comments": page(comments),
            }
        })
    }

    fn review_edge(i: usize, login: &str, state: &str) -> Value {
        json!({
            "cursor": format!("v{i}"),
            "node": {
                "state": state,
                "url": "https://example.invalid",
                "author": { "login": login, "name": null },
            }
        })
    }

    /// An open PR by `octocat` from `feature-1` onto `main`.
    fn pr_with(threads: Vec<Value>, reviews: Vec<Value>) -> Pr {
        let mut edge = pr_edge(1, "feature-1", "main", false);
        edge["node"]["reviewThreads"] = page(threads);
        edge["node"]["reviews"] = page(reviews);
        make_pr(&edge).unwrap()
    }

    #[test]
    fn unresolved_threads_group_comments_per_commenter() {
        let pr = pr_with(
            vec![
                thread_edge(1, true, vec![comment_edge(1, "reviewer", vec![])]),
                thread_edge(
                    2,
                    false,
                    vec![
                        comment_edge(2, "reviewer", vec![]),
                        comment_edge(3, "other", vec![]),
                    ],
                ),
            ],
            vec![],
        );
        let status = pr_status(&pr, Some("main"));

        // The resolved thread is skipped; the open one surfaces both
        // commenters in order.
        assert_eq!(status.unresolved.len(), 2);
        assert_eq!(status.unresolved[0].0.login, "reviewer");
        assert_eq!(status.unresolved[0].1.len(), 1);
        assert_eq!(status.unresolved[1].0.login, "other");
        assert!(status.in_sync);
    }

    #[test]
    fn author_reply_settles_a_thread() {
        // The author wrote the last comment of the first thread, and reacted
        // with a thumbs-up on the second.
        let pr = pr_with(
            vec![
                thread_edge(
                    1,
                    false,
                    vec![
                        comment_edge(1, "reviewer", vec![]),
                        comment_edge(2, "octocat", vec![]),
                    ],
                ),
                thread_edge(
                    2,
                    false,
                    vec![comment_edge(
                        3,
                        "reviewer",
                        vec![reaction_edge(1, "octocat", "THUMBS_UP")],
                    )],
                ),
            ],
            vec![],
        );
        assert!(pr_status(&pr, Some("main")).unresolved.is_empty());
    }

    #[test]
    fn eyes_reaction_is_not_a_reply() {
        let pr = pr_with(
            vec![thread_edge(
                1,
                false,
                vec![comment_edge(
                    1,
                    "reviewer",
                    vec![reaction_edge(1, "octocat", "EYES")],
                )],
            )],
            vec![],
        );
        assert_eq!(pr_status(&pr, Some("main")).unresolved.len(), 1);
    }

    #[test]
    fn latest_review_per_reviewer_wins() {
        let pr = pr_with(
            vec![],
            vec![
                review_edge(1, "alice", "CHANGES_REQUESTED"),
                review_edge(2, "bob", "CHANGES_REQUESTED"),
                review_edge(3, "alice", "APPROVED"),
            ],
        );
        let status = pr_status(&pr, Some("main"));

        assert_eq!(status.approved.len(), 1);
        assert_eq!(status.approved[0].author.login, "alice");
        assert_eq!(status.change_requested.len(), 1);
        assert_eq!(status.change_requested[0].author.login, "bob");
    }

    #[test]
    fn base_mismatch_is_out_of_sync() {
        let pr = pr_with(vec![], vec![]);
        assert!(pr_status(&pr, Some("main")).in_sync);
        assert!(!pr_status(&pr, Some("develop")).in_sync);
        // Trunk branches have no stack parent to drift from.
        assert!(pr_status(&pr, None).in_sync);
    }
}
