//! Character and word counts for display next to the input.

use std::fmt;

use serde::Serialize;

/// Counts for a piece of text, optionally against a character limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextStats {
    /// Unicode scalar values.
    pub chars: usize,
    /// Whitespace-separated words.
    pub words: usize,
    /// Character limit, if any.
    pub limit: Option<usize>,
    /// Whether `chars` exceeds `limit`.
    pub over_limit: bool,
}

impl TextStats {
    /// Count `text` with no limit.
    #[must_use]
    pub fn measure(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            words: text.split_whitespace().count(),
            limit: None,
            over_limit: false,
        }
    }

    /// Count `text` against `limit` characters.
    #[must_use]
    pub fn with_limit(text: &str, limit: usize) -> Self {
        let stats = Self::measure(text);
        Self {
            limit: Some(limit),
            over_limit: stats.chars > limit,
            ..stats
        }
    }

    /// Characters left before the limit (zero once over).
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.chars))
    }
}

impl fmt::Display for TextStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{}/{} characters", self.chars, limit)?,
            None => write!(f, "{} characters", self.chars)?,
        }
        write!(f, ", {} words", self.words)?;
        if self.over_limit {
            write!(f, " (over limit)")?;
        }
        Ok(())
    }
}
