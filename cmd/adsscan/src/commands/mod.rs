//! A thin module wrapper that contains all the different files that each
//! handle one command.

mod inventory;
mod scan;

pub use inventory::*;
pub use scan::*;
