//! Subcommand implementations.

pub mod decode;
pub mod pack;
pub mod run;
