//! Error types for the `gst` application.

use nu_ansi_term::Color;
use thiserror::Error;

/// Errors that can occur while operating on a stack or its remote pull requests.
#[derive(Error, Debug)]
pub enum StError {
    /// A referenced branch or stack path does not exist.
    #[error("`{}` not found.", Color::Blue.paint(.0))]
    NotFound(String),
    /// An operation violated a structural invariant of the stack tree.
    #[error("{0}")]
    InvariantViolation(String),
    /// The persisted stack file has inconsistent indentation.
    #[error("Malformed stack file at line {line}: `{text}`")]
    MalformedStack {
        /// 1-based line number of the offending line.
        line: usize,
        /// The offending line, as read.
        text: String,
    },
    /// A GraphQL response lacked an expected data payload.
    #[error("GitHub GraphQL: no {0} in response")]
    RemoteDataMissing(String),
    /// A GraphQL response carried an `errors` array.
    #[error("Errors in GraphQL response: {0}")]
    RemoteProtocolError(String),
    /// The remote rejected a push.
    #[error("Failed to push `{}`: {message}", Color::Blue.paint(.branch))]
    PushRejected {
        /// The branch that failed to push.
        branch: String,
        /// The remote's failure message.
        message: String,
    },
    /// The GitHub client is unavailable (offline, or `origin` is not a GitHub remote).
    #[error("{0}")]
    RemoteUnavailable(String),
    /// One or more branches failed to sync; siblings were still processed.
    #[error("Failed to sync {failed} branch(es).")]
    SyncIncomplete {
        /// Number of branches whose sync step failed.
        failed: usize,
    },
    /// A [git2::Error] occurred.
    #[error("libgit2 error: {0}")]
    Git2(#[from] git2::Error),
    /// A [reqwest::Error] occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// A [serde_json::Error] occurred.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// An [std::io::Error] occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An [std::fmt::Error] occurred while rendering output.
    #[error("fmt error: {0}")]
    Fmt(#[from] std::fmt::Error),
    /// An [inquire::InquireError] occurred.
    #[error("inquire error: {0}")]
    Inquire(#[from] inquire::InquireError),
}

/// Short-hand result type alias for [StError].
pub type StResult<T> = Result<T, StError>;
