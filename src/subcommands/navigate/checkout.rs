//! `checkout` subcommand.

use crate::{ctx::StContext, errors::StResult};
use clap::Args;

/// CLI arguments for the `checkout` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CheckoutCmd;

impl CheckoutCmd {
    /// Run the `checkout` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        let branches = ctx.display_branches()?;

        let branch = inquire::Select::new("Select a branch to checkout", branches)
            .with_formatter(&|f| f.value.branch_name.clone())
            .prompt()?;
        ctx.checkout(&branch.branch_name)
    }
}
