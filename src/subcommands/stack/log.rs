//! `log` subcommand.

use crate::{
    ctx::StContext,
    errors::StResult,
    gh::{prs_by_head, GitHub},
};
use clap::Args;
use tracing::debug;

/// CLI arguments for the `log` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct LogCmd;

impl LogCmd {
    /// Run the `log` subcommand. Unless the invocation is offline, every
    /// branch line is annotated with the review status of its pull requests.
    pub async fn run(self, ctx: StContext<'_>) -> StResult<()> {
        if ctx.tree.is_empty() {
            return Ok(());
        }

        let prs = if ctx.offline {
            None
        } else {
            match GitHub::from_repository(ctx.repository) {
                Ok(gh) => {
                    let heads = ctx
                        .tree
                        .traverse(false)
                        .map(|entry| entry.branch.to_string())
                        .collect::<Vec<_>>();
                    Some(prs_by_head(gh.search_stack_prs(&heads).await?))
                }
                Err(err) => {
                    debug!("rendering without pull requests: {err}");
                    None
                }
            }
        };

        ctx.print_tree(prs.as_ref())
    }
}
