//! `sync` subcommand: push every stack branch and create or refresh its pull
//! requests, bottom of the stack first.

use crate::{
    ctx::StContext,
    errors::{StError, StResult},
    gh::{
        graphql::GraphQlClient, model::Pr, prs_by_head, stack_comment, GitHub,
    },
    git::RepositoryExt,
    stack::StackTree,
};
use clap::Args;
use git2::Remote;
use nu_ansi_term::Color;
use std::collections::HashMap;

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct SyncCmd;

impl SyncCmd {
    /// Run the `sync` subcommand.
    pub async fn run(self, ctx: StContext<'_>) -> StResult<()> {
        let gh = remote_context(&ctx)?;
        let mut origin = ctx.repository.find_remote("origin")?;

        println!("Fetching from {}", origin.url().unwrap_or("origin"));
        let (received, deltas, objects) = ctx.repository.fetch_remote(&mut origin)?;
        println!("\treceived objects: {received}");
        println!("\ttotal deltas: {deltas}");
        println!("\ttotal objects: {objects}");

        let heads = ctx
            .tree
            .traverse(false)
            .map(|entry| entry.branch.to_string())
            .collect::<Vec<_>>();
        let mut prs = prs_by_head(gh.search_stack_prs(&heads).await?);

        sync_stack(&ctx, &gh, &mut origin, &mut prs).await
    }
}

/// Syncs every stack branch in forward order, parents first. A rejected push
/// or a protocol failure aborts that branch only; the rest of the stack
/// still syncs, and the command fails with [StError::SyncIncomplete] once
/// all branches have been processed.
pub(super) async fn sync_stack<C: GraphQlClient + Sync>(
    ctx: &StContext<'_>,
    gh: &GitHub<C>,
    origin: &mut Remote<'_>,
    prs: &mut HashMap<String, Vec<Pr>>,
) -> StResult<()> {
    let entries = ctx
        .tree
        .traverse(false)
        .filter_map(|entry| {
            entry
                .parent
                .map(|parent| (entry.branch.to_string(), parent.to_string()))
        })
        .collect::<Vec<_>>();

    let mut failed = 0;
    for (branch, parent) in entries {
        match sync_branch(ctx, gh, origin, &branch, &parent, prs, "", false).await {
            Ok(()) => {}
            Err(err @ (StError::PushRejected { .. } | StError::RemoteProtocolError(_))) => {
                eprintln!("{err}");
                failed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    if failed > 0 {
        return Err(StError::SyncIncomplete { failed });
    }
    Ok(())
}

/// Builds the GitHub client, refusing when the invocation is offline.
pub(super) fn remote_context<'a>(ctx: &StContext<'a>) -> StResult<GitHub> {
    if ctx.offline {
        return Err(StError::RemoteUnavailable(
            "Remote operations are disabled in offline mode".to_string(),
        ));
    }
    GitHub::from_repository(ctx.repository)
}

/// Syncs one stack branch: pushes it when it has no upstream yet, then
/// creates or refreshes its pull requests.
pub(super) async fn sync_branch<C: GraphQlClient + Sync>(
    ctx: &StContext<'_>,
    gh: &GitHub<C>,
    origin: &mut Remote<'_>,
    branch: &str,
    parent: &str,
    prs: &mut HashMap<String, Vec<Pr>>,
    title: &str,
    draft: bool,
) -> StResult<()> {
    if ctx
        .repository
        .find_branch(branch, git2::BranchType::Local)
        .is_err()
    {
        println!(
            "{} {} {}",
            Color::Yellow.paint("No local branch"),
            Color::Default.bold().paint(branch),
            Color::Yellow.paint("found")
        );
        return Ok(());
    }

    if !ctx.repository.has_upstream(branch)? {
        ctx.repository.push_branch(origin, branch)?;
        println!(
            "Pushed {} to remote {}.",
            Color::Default.bold().paint(branch),
            Color::Default.bold().paint(origin.url().unwrap_or("origin"))
        );
        let upstream = ctx.repository.update_upstream(origin, branch)?;
        println!("Set upstream to {}.", Color::Default.bold().paint(upstream));
    }

    sync_pull_requests(&ctx.tree, gh, branch, parent, prs, title, draft).await
}

/// Creates or refreshes the pull requests of one branch: posts the stack
/// comment and retargets the base of every existing PR when at least one of
/// them is still open, creates a fresh PR onto the parent otherwise.
pub(super) async fn sync_pull_requests<C: GraphQlClient + Sync>(
    tree: &StackTree,
    gh: &GitHub<C>,
    branch: &str,
    parent: &str,
    prs: &mut HashMap<String, Vec<Pr>>,
    title: &str,
    draft: bool,
) -> StResult<()> {
    let any_open = prs
        .get(branch)
        .is_some_and(|list| list.iter().any(|pr| !pr.closed));

    if any_open {
        let numbers = prs
            .get(branch)
            .map(|list| list.iter().map(|pr| pr.number).collect::<Vec<_>>())
            .unwrap_or_default();
        for number in numbers {
            // The comment body snapshots the whole PR map, so render it
            // before borrowing this PR mutably.
            let body = stack_comment(tree, prs, number);
            let Some(pr) = prs
                .get_mut(branch)
                .and_then(|list| list.iter_mut().find(|pr| pr.number == number))
            else {
                continue;
            };

            if gh.comment(pr, &body).await? {
                println!("Commented PR #{number}.");
            } else {
                println!("Updated comment in PR #{number}.");
            }
            if gh.update_pr_base(pr, parent).await? {
                println!(
                    "Set PR #{number} base branch to {}.",
                    Color::Default.bold().paint(parent)
                );
            }
        }
    } else {
        let pr = gh.create_pr(parent, branch, title, draft).await?;
        let number = pr.number;
        println!("Created {}PR #{number}.", if draft { "draft " } else { "" });
        prs.entry(branch.to_string()).or_default().push(pr);

        // The fresh PR gets its stack comment right away; inserting it into
        // the map first lets the body point at its own entry.
        let body = stack_comment(tree, prs, number);
        if let Some(pr) = prs
            .get_mut(branch)
            .and_then(|list| list.iter_mut().find(|pr| pr.number == number))
        {
            gh.comment(pr, &body).await?;
            println!("Commented PR #{number}.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gh::graphql::testing::FakeClient;
    use crate::gh::model::{fixtures::pr_edge, make_pr};
    use serde_json::json;

    fn fake_github(responses: Vec<serde_json::Value>) -> GitHub<FakeClient> {
        GitHub::new(
            FakeClient::new(responses),
            "me".to_string(),
            "repo".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn branch_without_prs_creates_one() {
        let tree = StackTree::deserialize("main\n\tfeature-1\n").unwrap();
        let mut prs = HashMap::new();

        let gh = fake_github(vec![
            json!({ "data": { "repository": { "id": "R_1" } } }),
            json!({ "data": { "createPullRequest": {
                "pullRequest": pr_edge(11, "feature-1", "main", false)["node"],
            } } }),
            json!({ "data": {} }),
        ]);

        sync_pull_requests(&tree, &gh, "feature-1", "main", &mut prs, "", false)
            .await
            .unwrap();

        let queries = gh.client.recorded();
        assert_eq!(queries.len(), 3);
        assert!(queries[0].contains("get_repo_id"));
        assert!(queries[1].contains("createPullRequest"));
        assert!(queries[1].contains("headRefName: \"me:feature-1\""));
        assert!(queries[1].contains("baseRefName: \"main\""));
        // The fresh PR carries the stack comment, pointing at itself.
        assert!(queries[2].contains("addComment"));
        assert!(queries[2].contains("PR #11"));
        assert_eq!(prs["feature-1"][0].number, 11);
    }

    #[tokio::test]
    async fn branch_with_open_pr_comments_and_retargets() {
        let tree = StackTree::deserialize("main\n\tfeature-1\n").unwrap();
        // The PR still bases on a stale branch and carries no stack comment.
        let mut prs = HashMap::new();
        prs.insert(
            "feature-1".to_string(),
            vec![make_pr(&pr_edge(7, "feature-1", "develop", false)).unwrap()],
        );

        let gh = fake_github(vec![json!({ "data": {} }), json!({ "data": {} })]);

        sync_pull_requests(&tree, &gh, "feature-1", "main", &mut prs, "", false)
            .await
            .unwrap();

        let queries = gh.client.recorded();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("addComment"));
        assert!(queries[1].contains("updatePullRequest"));
        assert!(queries[1].contains("baseRefName: \"main\""));
        assert!(!queries.iter().any(|q| q.contains("createPullRequest")));
        assert_eq!(prs["feature-1"][0].base, "main");
    }

    #[tokio::test]
    async fn closed_pr_does_not_block_creation() {
        let tree = StackTree::deserialize("main\n\tfeature-1\n").unwrap();
        let mut prs = HashMap::new();
        prs.insert(
            "feature-1".to_string(),
            vec![make_pr(&pr_edge(3, "feature-1", "main", true)).unwrap()],
        );

        let gh = fake_github(vec![
            json!({ "data": { "repository": { "id": "R_1" } } }),
            json!({ "data": { "createPullRequest": {
                "pullRequest": pr_edge(12, "feature-1", "main", false)["node"],
            } } }),
            json!({ "data": {} }),
        ]);

        sync_pull_requests(&tree, &gh, "feature-1", "main", &mut prs, "", false)
            .await
            .unwrap();

        assert!(gh
            .client
            .recorded()
            .iter()
            .any(|q| q.contains("createPullRequest")));
        assert_eq!(prs["feature-1"].len(), 2);
    }

    #[tokio::test]
    async fn failed_branch_does_not_abort_siblings() {
        let (dir, repo) = crate::git::testing::repo_with_commit();
        crate::git::testing::branch_with_upstream(&repo, "feature-1");
        crate::git::testing::branch_with_upstream(&repo, "feature-2");

        let ctx = StContext {
            repository: &repo,
            tree: StackTree::deserialize("main\n\tfeature-1\n\tfeature-2\n").unwrap(),
            stack_path: dir.path().join(".gst.stack"),
            offline: false,
        };
        let mut origin = repo.find_remote("origin").unwrap();

        let mut prs = HashMap::new();
        prs.insert(
            "feature-1".to_string(),
            vec![make_pr(&pr_edge(1, "feature-1", "main", false)).unwrap()],
        );
        prs.insert(
            "feature-2".to_string(),
            vec![make_pr(&pr_edge(2, "feature-2", "develop", false)).unwrap()],
        );

        // feature-1's comment mutation fails remotely; feature-2 still gets
        // its comment and retarget, and the command reports the failure.
        let gh = fake_github(vec![
            json!({ "errors": [{ "message": "something went wrong" }] }),
            json!({ "data": {} }),
            json!({ "data": {} }),
        ]);

        let err = sync_stack(&ctx, &gh, &mut origin, &mut prs)
            .await
            .unwrap_err();
        assert!(matches!(err, StError::SyncIncomplete { failed: 1 }));

        let queries = gh.client.recorded();
        assert_eq!(queries.len(), 3);
        assert!(queries[0].contains("addComment"));
        assert!(queries[1].contains("addComment"));
        assert!(queries[2].contains("updatePullRequest"));
        assert_eq!(prs["feature-2"][0].base, "main");
    }
}
