//! Subcommands talking to the GitHub remote.

mod sync;
mod update;

pub use sync::SyncCmd;
pub use update::PrCmd;
