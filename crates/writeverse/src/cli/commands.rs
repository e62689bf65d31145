//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::api::SuggestionKind;

/// Secure writing session arguments.
#[derive(Debug, Args)]
pub struct WriteCommand {
    /// Copy the finalized text to the clipboard when the session ends
    #[arg(long)]
    pub copy: bool,

    /// Where the text goes
    #[command(subcommand)]
    pub target: WriteTarget,
}

/// Destinations for a secure writing session.
#[derive(Debug, Subcommand)]
pub enum WriteTarget {
    /// One paragraph of an essay
    Paragraph {
        /// Essay identifier
        essay: Uuid,

        /// Paragraph number, starting at 1
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
        number: u16,
    },

    /// A character-limited challenge
    Character {
        /// Challenge identifier
        challenge: Uuid,

        /// Character limit to show while typing
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// The final save of a timed challenge
    Timed {
        /// Submission identifier from starting the challenge
        submission: Uuid,
    },
}

/// Whole-essay commands driven from a text file.
#[derive(Debug, Subcommand)]
pub enum EssayCommand {
    /// Save every paragraph and submit the essay
    Submit {
        /// Essay identifier
        essay: Uuid,

        /// Plain text file, paragraphs separated by blank lines
        file: PathBuf,
    },

    /// Save every paragraph and mark the essay a draft
    Draft {
        /// Essay identifier
        essay: Uuid,

        /// Plain text file, paragraphs separated by blank lines
        file: PathBuf,
    },
}

/// Like toggle arguments.
#[derive(Debug, Args)]
pub struct LikeCommand {
    /// Essay identifier
    pub essay: Uuid,
}

/// Comment arguments.
#[derive(Debug, Args)]
pub struct CommentCommand {
    /// Essay identifier
    pub essay: Uuid,

    /// Comment text
    #[arg(short, long, conflicts_with = "file")]
    pub message: Option<String>,

    /// Text file holding the comment (standard input when neither is given)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Grammar check arguments.
#[derive(Debug, Args)]
pub struct GrammarCommand {
    /// Text file to check (standard input when omitted)
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// AI writing assistant arguments.
#[derive(Debug, Args)]
pub struct AssistCommand {
    /// What to ask for
    #[arg(short, long, value_enum, default_value = "improve")]
    pub kind: SuggestionKindArg,

    /// Text file to work on (standard input when omitted)
    pub file: Option<PathBuf>,

    /// Essay the text belongs to
    #[arg(short, long)]
    pub essay: Option<Uuid>,

    /// Mark the suggestion as accepted
    #[arg(long)]
    pub accept: bool,
}

/// Text statistics arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Text file to count (standard input when omitted)
    pub file: Option<PathBuf>,

    /// Character limit to compare against
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Outbox commands.
#[derive(Debug, Subcommand)]
pub enum PendingCommand {
    /// List stashed submissions
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Try delivering stashed submissions again
    Retry {
        /// Entry to retry (all entries when omitted)
        id: Option<i64>,
    },

    /// Discard a stashed submission
    Drop {
        /// Entry to discard
        id: i64,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Suggestion kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuggestionKindArg {
    /// Improve the text
    Improve,
    /// Expand the content
    Expand,
    /// Summarize
    Summarize,
    /// Rephrase
    Rephrase,
    /// Grammar pass
    Grammar,
    /// Adjust tone
    Tone,
    /// Creative suggestions
    Creative,
}

impl From<SuggestionKindArg> for SuggestionKind {
    fn from(arg: SuggestionKindArg) -> Self {
        match arg {
            SuggestionKindArg::Improve => Self::Improve,
            SuggestionKindArg::Expand => Self::Expand,
            SuggestionKindArg::Summarize => Self::Summarize,
            SuggestionKindArg::Rephrase => Self::Rephrase,
            SuggestionKindArg::Grammar => Self::Grammar,
            SuggestionKindArg::Tone => Self::Tone,
            SuggestionKindArg::Creative => Self::Creative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_kind_arg_conversion() {
        assert_eq!(
            SuggestionKind::from(SuggestionKindArg::Improve),
            SuggestionKind::Improve
        );
        assert_eq!(
            SuggestionKind::from(SuggestionKindArg::Tone),
            SuggestionKind::Tone
        );
        assert_eq!(
            SuggestionKind::from(SuggestionKindArg::Creative),
            SuggestionKind::Creative
        );
    }

    #[test]
    fn test_pending_command_debug() {
        let cmd = PendingCommand::Retry { id: Some(3) };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Retry"));
        assert!(debug_str.contains('3'));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
