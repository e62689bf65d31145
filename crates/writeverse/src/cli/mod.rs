//! Command-line interface for writeverse.
//!
//! This module provides the CLI structure for the `wvcap` binary; the
//! handlers live in the binary itself.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AssistCommand, CommentCommand, ConfigCommand, EssayCommand, GrammarCommand, LikeCommand,
    PendingCommand, StatsCommand, SuggestionKindArg, WriteCommand, WriteTarget,
};

/// wvcap - Write for WriteVerse without copy and paste
///
/// Captures text one keystroke at a time in a locked-down terminal session
/// and delivers it to the WriteVerse essay and challenge platform.
#[derive(Debug, Parser)]
#[command(name = "wvcap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Type text in a secure session and submit it
    Write(WriteCommand),

    /// Submit or save a whole essay from a file
    #[command(subcommand)]
    Essay(EssayCommand),

    /// Like or unlike an essay
    Like(LikeCommand),

    /// Comment on an essay
    Comment(CommentCommand),

    /// Check grammar and spelling
    Grammar(GrammarCommand),

    /// Ask the AI writing assistant
    Assist(AssistCommand),

    /// Count characters and words
    Stats(StatsCommand),

    /// Manage submissions that failed to reach the server
    #[command(subcommand)]
    Pending(PendingCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
