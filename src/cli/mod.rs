//! CLI module for vibe - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
