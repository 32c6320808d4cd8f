//! `restack` subcommand.

use super::check::print_behind;
use crate::{ctx::StContext, errors::StResult, git::RepositoryExt, stack::restack_worklist};
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `restack` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct RestackCmd;

impl RestackCmd {
    /// Run the `restack` subcommand. Unlike `check`, this reports every
    /// branch of the stack, up-to-date ones included.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        let repository = ctx.repository;

        for entry in ctx.tree.traverse(false) {
            if repository
                .find_branch(entry.branch, git2::BranchType::Local)
                .is_err()
            {
                println!(
                    "{} {} {}",
                    Color::Yellow.paint("No local branch"),
                    Color::Default.bold().paint(entry.branch),
                    Color::Yellow.paint("found")
                );
            }
        }

        for step in restack_worklist(&ctx.tree, |base, target| {
            repository.ahead_behind(base, target).ok().flatten()
        }) {
            if step.ahead == 0 {
                println!(
                    "{} {} {} {}",
                    Color::Green.paint("🗸"),
                    Color::Default.bold().paint(step.branch),
                    Color::Green.paint("is already on"),
                    Color::Default.bold().paint(step.parent)
                );
                continue;
            }
            println!();
            print_behind(&ctx, step.parent, step.branch, step.ahead)?;
        }
        Ok(())
    }
}
