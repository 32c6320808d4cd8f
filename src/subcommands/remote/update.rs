//! `pr update` subcommand.

use super::sync::{remote_context, sync_branch};
use crate::{
    ctx::StContext,
    errors::{StError, StResult},
    gh::prs_by_head,
    git::RepositoryExt,
};
use clap::{Args, Subcommand};

/// Pull-request subcommands for the current branch.
#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum PrCmd {
    /// Push the current branch and create or refresh its pull request.
    Update(UpdateCmd),
}

impl PrCmd {
    /// Run the selected `pr` subcommand.
    pub async fn run(self, ctx: StContext<'_>) -> StResult<()> {
        match self {
            Self::Update(args) => args.run(ctx).await,
        }
    }
}

/// CLI arguments for the `pr update` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UpdateCmd {
    /// Title for a newly created pull request. Defaults to the branch name.
    #[clap(long, short)]
    title: Option<String>,
    /// Create the pull request as a draft.
    #[clap(long)]
    draft: bool,
}

impl UpdateCmd {
    /// Run the `pr update` subcommand.
    pub async fn run(self, ctx: StContext<'_>) -> StResult<()> {
        let gh = remote_context(&ctx)?;
        let mut origin = ctx.repository.find_remote("origin")?;

        let current = ctx.repository.current_branch_name()?;
        let parent = ctx
            .tree
            .parent_of(&current)?
            .ok_or_else(|| StError::NotFound("current branch in the stack".to_string()))?
            .branch
            .clone();

        let heads = vec![current.clone()];
        let mut prs = prs_by_head(gh.search_stack_prs(&heads).await?);

        sync_branch(
            &ctx,
            &gh,
            &mut origin,
            &current,
            &parent,
            &mut prs,
            self.title.as_deref().unwrap_or_default(),
            self.draft,
        )
        .await
    }
}
