//! `check` subcommand.

use crate::{ctx::StContext, errors::StResult, git::RepositoryExt, stack::divergences};
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `check` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CheckCmd;

impl CheckCmd {
    /// Run the `check` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        let repository = ctx.repository;
        let diverged = divergences(&ctx.tree, |base, target| {
            repository.ahead_behind(base, target).ok().flatten()
        });

        if diverged.is_empty() {
            println!("{}", Color::Green.paint("🗸 The stack is in shape."));
            return Ok(());
        }

        for d in &diverged {
            print_behind(&ctx, d.parent, d.branch, d.ahead)?;
        }
        Ok(())
    }
}

/// Prints one fallen-behind branch with the parent commits it is missing and
/// the rebase command that brings it back up to date.
pub(super) fn print_behind(
    ctx: &StContext<'_>,
    parent: &str,
    branch: &str,
    ahead: usize,
) -> StResult<()> {
    println!(
        "{} {} {} {} {}",
        Color::Yellow.paint("🗶"),
        Color::Default.bold().paint(parent),
        Color::Yellow.paint("is ahead of"),
        Color::Default.bold().paint(branch),
        Color::Yellow.paint("with:")
    );
    for commit in ctx.repository.last_commits(parent, ahead)? {
        println!(
            "\t{}",
            Color::DarkGray.paint(format!("[{}] {}", commit.short_id, commit.summary))
        );
    }
    println!("  Run `git rebase -i {parent} {branch}`.");
    Ok(())
}
