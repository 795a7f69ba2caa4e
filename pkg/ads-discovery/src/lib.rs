#![doc = include_str!("../README.md")]
#![allow(
	// I dislike this rule... We import things elsewhere, usually outside of
	// modules themselves.
	clippy::module_name_repetitions,
)]

pub mod ads;
pub mod errors;
pub mod inventory;
