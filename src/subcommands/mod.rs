//! The subcommands for the `gst` application.

use crate::ctx::StContext;
use clap::Subcommand;

mod navigate;
mod remote;
mod stack;

use navigate::{BottomCmd, CheckoutCmd, DownCmd, TopCmd, UpCmd};
use remote::{PrCmd, SyncCmd};
use stack::{CheckCmd, InitCmd, LogCmd, RestackCmd};

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum Subcommands {
    /// Start tracking the current branch as the bottom of a new stack.
    Init(InitCmd),
    /// Print the tree of stacked branches.
    #[clap(aliases = ["l", "ls"])]
    Log(LogCmd),
    /// Report branches that have fallen behind their stack parents.
    Check(CheckCmd),
    /// List the rebases needed to bring every branch back onto its parent.
    Restack(RestackCmd),
    /// Push stack branches and create or refresh their pull requests.
    Sync(SyncCmd),
    /// Pull-request operations for the current branch.
    #[clap(subcommand)]
    Pr(PrCmd),
    /// Check out a branch tracked in the stack.
    #[clap(alias = "co")]
    Checkout(CheckoutCmd),
    /// Check out the previous branch in the stack.
    Up(UpCmd),
    /// Check out the next branch in the stack.
    Down(DownCmd),
    /// Check out the first branch of the stack.
    Top(TopCmd),
    /// Check out the last branch of the stack.
    Bottom(BottomCmd),
}

impl Subcommands {
    /// Run the subcommand with the given context.
    pub async fn run(self, ctx: StContext<'_>) -> anyhow::Result<()> {
        match self {
            Self::Init(args) => args.run(ctx)?,
            Self::Log(args) => args.run(ctx).await?,
            Self::Check(args) => args.run(ctx)?,
            Self::Restack(args) => args.run(ctx)?,
            Self::Sync(args) => args.run(ctx).await?,
            Self::Pr(args) => args.run(ctx).await?,
            Self::Checkout(args) => args.run(ctx)?,
            Self::Up(args) => args.run(ctx)?,
            Self::Down(args) => args.run(ctx)?,
            Self::Top(args) => args.run(ctx)?,
            Self::Bottom(args) => args.run(ctx)?,
        }
        Ok(())
    }
}
