//! Formatting logic for the [StContext] struct.

use super::StContext;
use crate::{
    constants::{
        BOTTOM_LEFT_BOX, COLORS, EMPTY_CIRCLE, FILLED_CIRCLE, HORIZONTAL_BOX, LEFT_FORK_BOX,
        VERTICAL_BOX,
    },
    errors::{StError, StResult},
    gh::{
        model::Pr,
        status::{pr_status, PrStatus},
    },
    git::RepositoryExt,
    stack::StackNode,
};
use nu_ansi_term::Color;
use std::{
    collections::HashMap,
    fmt::{Display, Write},
};

impl<'a> StContext<'a> {
    /// Gathers an in-order list of [DisplayBranch]es, containing the log-line
    /// and branch name.
    ///
    /// This function is particularly useful when creating prompts with
    /// [inquire::Select].
    pub fn display_branches(&self) -> StResult<Vec<DisplayBranch>> {
        let branches = self
            .tree
            .traverse(true)
            .map(|entry| entry.branch.to_string())
            .collect::<Vec<_>>();

        let mut buf = String::new();
        self.write_tree(&mut buf)?;
        let log_lines = buf.trim_end().lines().collect::<Vec<_>>();

        if branches.len() != log_lines.len() {
            return Err(StError::InvariantViolation(format!(
                "Mismatch between branches and log-lines: {} branches, {} log-lines",
                branches.len(),
                log_lines.len()
            )));
        }

        let display_branches = branches
            .into_iter()
            .zip(log_lines)
            .map(|(branch_name, log_line)| DisplayBranch {
                display_value: log_line.to_string(),
                branch_name,
            })
            .collect();
        Ok(display_branches)
    }

    /// Prints the tree of branches contained within the [StContext]. When a
    /// pull-request map is given, each branch line is annotated with the
    /// review status of its pull requests.
    pub fn print_tree(&self, prs: Option<&HashMap<String, Vec<Pr>>>) -> StResult<()> {
        let mut buf = String::new();
        for trunk in &self.tree.root().children {
            self.write_tree_recursive(&mut buf, trunk, None, 0, "", "", true, prs)?;
        }
        print!("{}", buf);
        Ok(())
    }

    /// Writes the tree of branches contained within the [StContext] to the
    /// given [Write]r, without pull-request annotations.
    pub fn write_tree<W: Write>(&self, w: &mut W) -> StResult<()> {
        for trunk in &self.tree.root().children {
            self.write_tree_recursive(w, trunk, None, 0, "", "", true, None)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_tree_recursive<W: Write>(
        &self,
        w: &mut W,
        node: &StackNode,
        parent: Option<&str>,
        depth: usize,
        prefix: &str,
        connection: &str,
        is_parent_last_child: bool,
        prs: Option<&HashMap<String, Vec<Pr>>>,
    ) -> StResult<()> {
        let checked_out = self.repository.current_branch_name()?;
        let branch = node.branch.as_str();
        let exists_locally = self
            .repository
            .find_branch(branch, git2::BranchType::Local)
            .is_ok();

        // Form the log-line for the current branch.
        let checked_out_icon = (branch == checked_out)
            .then_some(FILLED_CIRCLE)
            .unwrap_or(EMPTY_CIRCLE);
        let color = COLORS[depth % COLORS.len()];
        let rendered_branch = if exists_locally {
            color.paint(format!("{connection}{checked_out_icon} {branch}"))
        } else {
            Color::DarkGray
                .dimmed()
                .paint(format!("{connection}{checked_out_icon} {branch}"))
        };

        let mut metadata = String::new();
        if exists_locally {
            if !self.repository.has_upstream(branch)? {
                metadata.push('*');
            }
            let behind = parent
                .map(|p| self.repository.ahead_behind(p, branch))
                .transpose()?
                .flatten()
                .map_or(0, |(ahead, _)| ahead);
            if behind > 0 {
                write!(
                    metadata,
                    " {}",
                    Color::Yellow.paint(format!("({behind} behind)"))
                )?;
            }
        } else {
            write!(metadata, " {}", Color::DarkGray.paint("(no local branch)"))?;
        }

        if let Some(prs) = prs {
            for pr in prs.get(branch).into_iter().flatten() {
                write!(metadata, " {}", pr_annotation(pr, &pr_status(pr, parent)))?;
            }
        }

        writeln!(w, "{prefix}{rendered_branch}{metadata}")?;

        // Write the children of the branch recursively.
        let mut children = node.children.iter().peekable();
        while let Some(child) = children.next() {
            // Form the connection between the previous log-line and the
            // current log-line.
            let is_last_child = children.peek().is_none();
            let connection = format!(
                "{}{}",
                is_last_child
                    .then_some(BOTTOM_LEFT_BOX)
                    .unwrap_or(LEFT_FORK_BOX),
                HORIZONTAL_BOX
            );

            // Form the prefix for the current log-line.
            let prefix = if depth > 0 {
                is_parent_last_child
                    .then(|| format!("{prefix}  "))
                    .unwrap_or(format!(
                        "{prefix}{} ",
                        color.paint(VERTICAL_BOX.to_string())
                    ))
            } else {
                prefix.to_string()
            };

            self.write_tree_recursive(
                w,
                child,
                Some(branch),
                depth + 1,
                prefix.as_str(),
                connection.as_str(),
                is_last_child,
                prs,
            )?;
        }

        Ok(())
    }
}

/// Renders the review status of one pull request as a short suffix for its
/// branch's tree line: the PR number styled by state, the current base when
/// it does not match the stack parent, and the approval, change-request and
/// unresolved-comment tallies.
fn pr_annotation(pr: &Pr, status: &PrStatus) -> String {
    let state_color = if pr.merged {
        Color::Purple
    } else if pr.closed {
        Color::Red
    } else if pr.draft {
        Color::DarkGray
    } else {
        Color::Green
    };
    let mut out = state_color.paint(format!("#{}", pr.number)).to_string();

    if !status.in_sync {
        out.push_str(&format!(" {}", Color::Yellow.paint(format!("(base {})", pr.base))));
    }
    if !status.approved.is_empty() {
        out.push_str(&format!(
            " {}",
            Color::Green.paint(format!("🗸{}", status.approved.len()))
        ));
    }
    if !status.change_requested.is_empty() {
        out.push_str(&format!(
            " {}",
            Color::Red.paint(format!("🗶{}", status.change_requested.len()))
        ));
    }
    let waiting: usize = status.unresolved.iter().map(|(_, comments)| comments.len()).sum();
    if waiting > 0 {
        out.push_str(&format!(
            " {}",
            Color::Yellow.paint(format!("{waiting} unresolved"))
        ));
    }

    out
}

/// A pair of a log-line and a branch name, which implements [Display].
#[derive(Debug)]
pub struct DisplayBranch {
    /// The log-line to display.
    pub(crate) display_value: String,
    /// The branch name corresponding to the log-line.
    pub(crate) branch_name: String,
}

impl Display for DisplayBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_value)
    }
}

#[cfg(test)]
mod test {
    use super::pr_annotation;
    use crate::gh::{
        model::{fixtures::pr_edge, make_pr, Author, Review},
        status::{pr_status, PrStatus},
    };

    #[test]
    fn annotation_carries_review_tallies() {
        let pr = make_pr(&pr_edge(7, "feature-1", "develop", false)).unwrap();
        let review = |login: &str, state: &str| Review {
            author: Author {
                login: login.to_string(),
                name: None,
            },
            state: state.to_string(),
            url: "https://example.invalid".to_string(),
        };
        let status = PrStatus {
            unresolved: Vec::new(),
            change_requested: vec![review("bob", "CHANGES_REQUESTED")],
            approved: vec![review("alice", "APPROVED")],
            in_sync: false,
        };

        let line = pr_annotation(&pr, &status);
        assert!(line.contains("#7"));
        assert!(line.contains("(base develop)"));
        assert!(line.contains("🗸1"));
        assert!(line.contains("🗶1"));
        assert!(!line.contains("unresolved"));
    }

    #[test]
    fn clean_open_pr_is_just_its_number() {
        let pr = make_pr(&pr_edge(3, "feature-1", "main", false)).unwrap();
        let line = pr_annotation(&pr, &pr_status(&pr, Some("main")));
        assert!(line.contains("#3"));
        assert!(!line.contains("base"));
        assert!(!line.contains('🗸'));
    }
}
