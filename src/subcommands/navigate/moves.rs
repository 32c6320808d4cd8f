//! `up`, `down`, `top` and `bottom` subcommands, moving along the stack in
//! its rendered order.

use crate::{
    ctx::StContext,
    errors::{StError, StResult},
    git::RepositoryExt,
};
use clap::Args;

/// CLI arguments for the `up` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UpCmd;

impl UpCmd {
    /// Run the `up` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        step(&ctx, -1)
    }
}

/// CLI arguments for the `down` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct DownCmd;

impl DownCmd {
    /// Run the `down` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        step(&ctx, 1)
    }
}

/// CLI arguments for the `top` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct TopCmd;

impl TopCmd {
    /// Run the `top` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        jump(&ctx, Edge::First)
    }
}

/// CLI arguments for the `bottom` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct BottomCmd;

impl BottomCmd {
    /// Run the `bottom` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        jump(&ctx, Edge::Last)
    }
}

enum Edge {
    First,
    Last,
}

/// The stack's branches in rendered order.
fn branch_order(ctx: &StContext<'_>) -> Vec<String> {
    ctx.tree
        .traverse(true)
        .map(|entry| entry.branch.to_string())
        .collect()
}

/// Checks out the branch `delta` positions away from the current one. Stays
/// put at the edges of the stack.
fn step(ctx: &StContext<'_>, delta: isize) -> StResult<()> {
    let order = branch_order(ctx);
    let current = ctx.repository.current_branch_name()?;
    let position = order
        .iter()
        .position(|branch| *branch == current)
        .ok_or_else(|| StError::NotFound("current branch in the stack".to_string()))?;

    let target = position as isize + delta;
    if target < 0 || target as usize >= order.len() {
        return Ok(());
    }
    ctx.checkout(&order[target as usize])
}

fn jump(ctx: &StContext<'_>, edge: Edge) -> StResult<()> {
    let order = branch_order(ctx);
    let current = ctx.repository.current_branch_name()?;
    let target = match edge {
        Edge::First => order.first(),
        Edge::Last => order.last(),
    };
    match target {
        Some(target) if *target != current => ctx.checkout(target),
        _ => Ok(()),
    }
}
