//! Typed client for the platform's AJAX endpoints.
//!
//! Request bodies and paths follow what the platform's own pages send. The
//! server-side collaborators (grammar checker, AI assistant, PDF generation)
//! are opaque; this module only encodes requests and decodes responses.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{Receipt, SubmitSink};
use crate::stats::TextStats;
use crate::transport::{Payload, Transport};

/// Shortest text the grammar checker accepts.
pub const MIN_GRAMMAR_CHARS: usize = 10;

/// Page anonymous form posts are redirected to.
const LOGIN_PATH: &str = "login/";

/// Publication status of an essay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EssayStatus {
    /// Work in progress.
    Draft,
    /// Waiting for review.
    Submitted,
    /// Visible to everyone.
    Published,
    /// Refused by a reviewer.
    Rejected,
    /// Hidden from listings.
    Archived,
}

impl fmt::Display for EssayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Submitted => write!(f, "submitted"),
            Self::Published => write!(f, "published"),
            Self::Rejected => write!(f, "rejected"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// What the AI writing assistant should do with the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Improve the text.
    #[default]
    Improve,
    /// Expand the content.
    Expand,
    /// Summarize.
    Summarize,
    /// Rephrase.
    Rephrase,
    /// Grammar pass.
    Grammar,
    /// Adjust tone.
    Tone,
    /// Creative suggestions.
    Creative,
}

/// Response to saving one paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParagraphSaved {
    /// Server-side identifier of the paragraph.
    pub paragraph_id: Option<String>,
}

/// Response to the final essay submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FinalSubmitted {
    /// Page to continue to (the generated PDF view).
    pub redirect_url: Option<String>,
}

/// Like state after toggling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikeStatus {
    /// Whether the current user now likes the essay.
    pub liked: bool,
    /// Total likes on the essay.
    #[serde(alias = "like_count")]
    pub likes_count: u64,
    /// Server message.
    pub message: Option<String>,
}

/// One grammar suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarSuggestion {
    /// What to change.
    pub message: String,
    /// Replacement, when offered.
    pub suggestion: Option<String>,
}

/// Grammar check results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarReport {
    /// Grammar score, percent.
    pub grammar_score: f64,
    /// Spelling score, percent.
    pub spelling_score: f64,
    /// Overall score, percent.
    pub score: f64,
    /// Number of grammar issues.
    pub grammar_issues: u32,
    /// Number of spelling issues.
    pub spelling_issues: u32,
    /// Individual suggestions.
    pub suggestions: Vec<GrammarSuggestion>,
    /// Words the checker did not recognise.
    pub misspelled_words: Vec<String>,
}

/// AI assistant output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSuggestion {
    /// Suggested text.
    pub suggestion: String,
    /// Session to accept the suggestion against.
    pub session_id: String,
}

/// Result of a character-limited challenge entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CharacterChallengeResult {
    /// Server message.
    pub message: Option<String>,
    /// Points awarded.
    pub points_earned: i64,
    /// Characters counted by the server.
    pub character_count: usize,
    /// Words counted by the server.
    pub word_count: usize,
    /// Whether the entry respected the limit.
    pub is_valid: bool,
}

/// Result of saving a timed challenge entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimedChallengeProgress {
    /// Server message.
    pub message: Option<String>,
    /// Words counted by the server.
    pub word_count: usize,
    /// Points awarded, on the final save.
    pub points_earned: Option<i64>,
    /// Seconds the server recorded.
    pub time_spent: Option<u64>,
}

/// Where a secure session's text goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitTarget {
    /// One paragraph of an essay (zero-based index).
    Paragraph {
        /// Essay identifier.
        essay: Uuid,
        /// Zero-based paragraph index.
        index: usize,
    },
    /// A character-limited challenge.
    CharacterChallenge {
        /// Challenge identifier.
        challenge: Uuid,
    },
    /// The final save of a timed challenge.
    TimedChallenge {
        /// Submission identifier handed out when the challenge started.
        submission: Uuid,
        /// Seconds spent; measured from session start when `None`.
        time_spent_secs: Option<u64>,
    },
}

impl fmt::Display for SubmitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paragraph { essay, index } => {
                write!(f, "essay {essay} paragraph {}", index + 1)
            }
            Self::CharacterChallenge { challenge } => write!(f, "character challenge {challenge}"),
            Self::TimedChallenge { submission, .. } => write!(f, "timed challenge {submission}"),
        }
    }
}

/// Client for the platform endpoints.
#[derive(Debug, Clone)]
pub struct EssayClient<T> {
    transport: T,
}

impl<T: Transport> EssayClient<T> {
    /// Wrap a transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(&self, path: &str, payload: Payload) -> Result<R> {
        let body = self.transport.post(path, payload).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Save one paragraph of an essay.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn save_paragraph(
        &self,
        essay: Uuid,
        index: usize,
        content: &str,
    ) -> Result<ParagraphSaved> {
        debug!(%essay, index, len = content.chars().count(), "saving paragraph");
        self.call(
            &format!("essays/{essay}/write/"),
            Payload::Json(json!({ "content": content, "paragraph_index": index })),
        )
        .await
    }

    /// Change an essay's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn update_status(&self, essay: Uuid, status: EssayStatus) -> Result<()> {
        self.transport
            .post(
                "essay/update-status/",
                Payload::Json(json!({ "essay_id": essay, "status": status })),
            )
            .await
            .map(drop)
    }

    /// Submit the whole essay; the server generates its PDF.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn final_submit(&self, essay: Uuid) -> Result<FinalSubmitted> {
        self.call(
            "essay/final-submit/",
            Payload::Json(json!({ "essay_id": essay })),
        )
        .await
    }

    /// Toggle the current user's like on an essay.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn toggle_like(&self, essay: Uuid) -> Result<LikeStatus> {
        self.call(&format!("essays/{essay}/like/"), Payload::Empty)
            .await
    }

    /// Post a comment on an essay.
    ///
    /// The comment endpoint is a plain form that redirects back to the essay
    /// page. Landing on the login page instead means the session is not
    /// signed in.
    ///
    /// # Errors
    ///
    /// Returns a validation error without any request for blank text, a
    /// server error when redirected to the login page, otherwise any request
    /// failure.
    pub async fn add_comment(&self, essay: Uuid, content: &str) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation("Please enter a comment."));
        }
        debug!(%essay, len = content.chars().count(), "posting comment");
        let landed = self
            .transport
            .post_form(
                &format!("essays/{essay}/comment/"),
                Payload::Form(vec![("content".to_string(), content.to_string())]),
            )
            .await?;
        if landed.starts_with(LOGIN_PATH) {
            return Err(Error::server("not signed in; set server.session_cookie"));
        }
        Ok(())
    }

    /// Run the server's grammar check.
    ///
    /// # Errors
    ///
    /// Returns a validation error without any request when the text is
    /// shorter than [`MIN_GRAMMAR_CHARS`], otherwise any request failure.
    pub async fn check_grammar(&self, content: &str) -> Result<GrammarReport> {
        if content.trim().chars().count() < MIN_GRAMMAR_CHARS {
            return Err(Error::validation(format!(
                "Please write at least {MIN_GRAMMAR_CHARS} characters to check grammar."
            )));
        }
        self.call(
            "api/check-grammar/",
            Payload::Form(vec![("content".to_string(), content.to_string())]),
        )
        .await
    }

    /// Ask the AI writing assistant for a suggestion.
    ///
    /// # Errors
    ///
    /// Returns a validation error without any request for blank text,
    /// otherwise any request failure.
    pub async fn ai_assist(
        &self,
        text: &str,
        kind: SuggestionKind,
        essay: Option<Uuid>,
    ) -> Result<AiSuggestion> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("Please enter some text to get suggestions"));
        }
        let mut body = json!({ "text": text, "type": kind });
        if let Some(essay) = essay {
            body["essay_id"] = json!(essay);
        }
        self.call("ai/assist/", Payload::Json(body)).await
    }

    /// Mark an AI suggestion as accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is unknown.
    pub async fn ai_accept(&self, session_id: &str) -> Result<()> {
        self.transport
            .post(
                "ai/accept/",
                Payload::Json(json!({ "session_id": session_id })),
            )
            .await
            .map(drop)
    }

    /// Enter a character-limited challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses (for
    /// instance a second entry).
    pub async fn submit_character_challenge(
        &self,
        challenge: Uuid,
        content: &str,
    ) -> Result<CharacterChallengeResult> {
        self.call(
            &format!("challenges/character/{challenge}/submit/"),
            Payload::Json(json!({ "content": content })),
        )
        .await
    }

    /// Save a timed challenge entry, optionally as the final version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn save_timed_challenge(
        &self,
        submission: Uuid,
        content: &str,
        time_spent_secs: u64,
        is_final: bool,
    ) -> Result<TimedChallengeProgress> {
        self.call(
            &format!("challenges/timed/{submission}/save/"),
            Payload::Json(json!({
                "content": content,
                "time_spent": time_spent_secs,
                "is_final": is_final,
            })),
        )
        .await
    }

    /// Deliver secure-session text to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn deliver_to(&self, target: &SubmitTarget, content: &str) -> Result<Receipt> {
        match *target {
            SubmitTarget::Paragraph { essay, index } => {
                let saved = self.save_paragraph(essay, index, content).await?;
                Ok(Receipt {
                    message: Some(format!("Paragraph {} saved", index + 1)),
                    reference: saved.paragraph_id,
                    redirect_url: None,
                })
            }
            SubmitTarget::CharacterChallenge { challenge } => {
                let result = self.submit_character_challenge(challenge, content).await?;
                let stats = TextStats::measure(content);
                Ok(Receipt {
                    message: Some(format!(
                        "{} ({} characters, {} points{})",
                        result.message.as_deref().unwrap_or("Submission successful!"),
                        stats.chars,
                        result.points_earned,
                        if result.is_valid { "" } else { ", over the limit" },
                    )),
                    reference: None,
                    redirect_url: None,
                })
            }
            SubmitTarget::TimedChallenge {
                submission,
                time_spent_secs,
            } => {
                let progress = self
                    .save_timed_challenge(submission, content, time_spent_secs.unwrap_or(0), true)
                    .await?;
                Ok(Receipt {
                    message: progress.message,
                    reference: progress.points_earned.map(|p| format!("{p} points")),
                    redirect_url: None,
                })
            }
        }
    }
}

/// A [`SubmitSink`] bound to one target.
///
/// Timed challenges without a recorded duration are measured from when the
/// sink was created.
#[derive(Debug, Clone)]
pub struct TargetedSubmit<T> {
    client: EssayClient<T>,
    target: SubmitTarget,
    started: Instant,
}

impl<T: Transport> TargetedSubmit<T> {
    /// Bind `client` to `target`, starting the clock now.
    #[must_use]
    pub fn new(client: EssayClient<T>, target: SubmitTarget) -> Self {
        Self {
            client,
            target,
            started: Instant::now(),
        }
    }

    /// The target with any measured duration filled in.
    #[must_use]
    pub fn resolved_target(&self) -> SubmitTarget {
        match self.target {
            SubmitTarget::TimedChallenge {
                submission,
                time_spent_secs: None,
            } => SubmitTarget::TimedChallenge {
                submission,
                time_spent_secs: Some(self.started.elapsed().as_secs()),
            },
            other => other,
        }
    }
}

#[async_trait]
impl<T: Transport> SubmitSink for TargetedSubmit<T> {
    async fn deliver(&self, content: &str) -> Result<Receipt> {
        self.client.deliver_to(&self.resolved_target(), content).await
    }
}
