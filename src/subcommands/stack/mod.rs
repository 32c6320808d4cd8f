//! Subcommands operating on the local stack file.

mod check;
mod init;
mod log;
mod restack;

pub use check::CheckCmd;
pub use init::InitCmd;
pub use log::LogCmd;
pub use restack::RestackCmd;
