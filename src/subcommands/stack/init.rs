//! `init` subcommand.

use crate::{
    constants::STACK_FILE_NAME, ctx::StContext, errors::StResult, git::RepositoryExt,
};
use clap::Args;
use nu_ansi_term::Color;
use std::{fs::OpenOptions, io::Write};

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct InitCmd;

impl InitCmd {
    /// Run the `init` subcommand.
    pub fn run(self, ctx: StContext<'_>) -> StResult<()> {
        if ctx.stack_path.exists() {
            println!(
                "Stack file {} already exists.",
                Color::Cyan.paint(ctx.stack_path.display().to_string())
            );
            return Ok(());
        }

        // Ignore the stack file unless the repository already does.
        if let Some(workdir) = ctx.repository.workdir() {
            let inside_workdir = ctx.stack_path.starts_with(workdir);
            let already_ignored = ctx
                .repository
                .is_path_ignored(&ctx.stack_path)
                .unwrap_or(false);
            if inside_workdir && !already_ignored {
                let ignored_name = ctx
                    .stack_path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(STACK_FILE_NAME);
                let mut gitignore = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(workdir.join(".gitignore"))?;
                writeln!(gitignore, "{ignored_name}")?;
            }
        }

        ctx.save()?;
        println!(
            "Tracking {} in {}.",
            Color::Green.paint(ctx.repository.current_branch_name()?),
            Color::Cyan.paint(ctx.stack_path.display().to_string())
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ctx::StContext, git::testing::repo_with_commit, stack::StackTree};

    #[test]
    fn gitignore_records_the_stack_file_name() {
        let (dir, repo) = repo_with_commit();
        let ctx = StContext {
            repository: &repo,
            tree: StackTree::seeded("main"),
            stack_path: dir.path().join("custom.stack"),
            offline: true,
        };

        InitCmd.run(ctx).unwrap();

        // The override's own file name lands in .gitignore, not the default.
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(gitignore.lines().any(|line| line == "custom.stack"));
        assert!(!gitignore.contains(STACK_FILE_NAME));
        assert!(dir.path().join("custom.stack").is_file());
    }
}
