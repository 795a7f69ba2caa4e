//! The series of knobs that you can use to configure `adsscan`.
//!
//! NOTE: this doesn't include the logging knobs, those live in [`scanlog`].

pub mod cli;
pub mod env;
