//! Subcommands moving the working copy between stack branches.

mod checkout;
mod moves;

pub use checkout::CheckoutCmd;
pub use moves::{BottomCmd, DownCmd, TopCmd, UpCmd};
