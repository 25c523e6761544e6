//! Command-line tooling
//!
//! Argument parsing, command execution, and text formatting for the
//! `hoyofiles` binary.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
