//! Constants for the `gst` application.

use nu_ansi_term::Color;

/// Name of the persisted stack file, relative to the repository workdir.
pub(crate) const STACK_FILE_NAME: &str = ".gst.stack";

/// GitHub GraphQL API endpoint.
pub(crate) const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Directories probed for a `pull_request_template.md`, in order.
pub(crate) const PR_TEMPLATE_DIRS: [&str; 3] = [".github", "docs", ""];

/// Markers delimiting the stack comment maintained on each pull request.
pub(crate) const COMMENT_BEGIN: &str = "<!-- GST dependencies begin -->";
pub(crate) const COMMENT_FIRST_LINE: &str = "Current dependencies on/for this PR:";
pub(crate) const COMMENT_END: &str = "<!-- GST dependencies end -->";

pub(crate) const COLORS: [Color; 6] = [
    Color::Blue,
    Color::Cyan,
    Color::Green,
    Color::Red,
    Color::Yellow,
    Color::Purple,
];

pub(crate) const FILLED_CIRCLE: char = '●';
pub(crate) const EMPTY_CIRCLE: char = '○';
pub(crate) const BOTTOM_LEFT_BOX: char = '└';
pub(crate) const LEFT_FORK_BOX: char = '├';
pub(crate) const VERTICAL_BOX: char = '│';
pub(crate) const HORIZONTAL_BOX: char = '─';
