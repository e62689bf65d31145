//! Secure capture session.
//!
//! A [`SecureSession`] owns the hidden buffer that is the only value ever
//! submitted, and the lock state guarding it. The visible field on its
//! [`InputSurface`] is cleared after every keystroke so it never holds more
//! than one pending character.
//!
//! Lifecycle: editable → (finalize) → locked → (submit, possibly retried) →
//! saved. Every precondition failure is a [`Rejection`]: it is surfaced once as
//! a warning notice and leaves the buffer untouched.
//!
//! # Example
//!
//! ```
//! use writeverse::session::SecureSession;
//! use writeverse::surface::MemorySurface;
//!
//! let mut session = SecureSession::new(MemorySurface::new());
//! for c in "Hello".chars() {
//!     session.on_character_input(c).unwrap();
//! }
//! session.on_delete().unwrap();
//! session.on_delete().unwrap();
//! session.finalize().unwrap();
//!
//! assert_eq!(session.surface().review.as_deref(), Some("Hel"));
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use zeroize::Zeroizing;

use crate::config::CaptureConfig;
use crate::error::{Error, Result};
use crate::surface::{ClipboardKind, InputEvent, InputSurface, Notice};

/// A local, non-fatal refusal of a session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Edit attempted after the text was locked.
    #[error("Text is locked and can no longer be edited")]
    Locked,

    /// Finalize attempted on already locked text.
    #[error("Text is already locked")]
    AlreadyLocked,

    /// Finalize or submit attempted with nothing typed.
    #[error("Please type some content first")]
    EmptyBuffer,

    /// Submit attempted before finalize.
    #[error("Lock your text before submitting")]
    LockBeforeSubmit,

    /// Submit attempted while another submit is outstanding.
    #[error("A submission is already in progress")]
    SubmitPending,

    /// Submit attempted after the server accepted the text.
    #[error("This text has already been submitted")]
    AlreadySaved,

    /// Clipboard or drag-and-drop operation on the secure field.
    #[error("{}", .0.warning())]
    ClipboardBlocked(ClipboardKind),

    /// More than one character arrived in a single field change.
    #[error("Only typed input is accepted ({chars} characters arrived at once)")]
    BulkInsert {
        /// Number of characters in the rejected change.
        chars: usize,
    },

    /// The buffer reached its configured maximum length.
    #[error("Maximum length of {max} characters reached")]
    TooLong {
        /// Configured maximum.
        max: usize,
    },
}

/// Limits applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Maximum number of characters in the buffer.
    pub max_length: usize,
    /// Accept multi-character field values instead of rejecting them.
    pub bulk_insert_allowed: bool,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for SessionLimits {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            max_length: config.max_length,
            bulk_insert_allowed: config.bulk_insert_allowed,
        }
    }
}

/// Server acknowledgement of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Message returned by the server.
    pub message: Option<String>,
    /// Identifier of the stored record, when the server returns one.
    pub reference: Option<String>,
    /// Page the server suggests navigating to.
    pub redirect_url: Option<String>,
}

/// Where locked text is delivered.
#[async_trait]
pub trait SubmitSink: Send + Sync {
    /// Deliver `content` to the server collaborator.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the server refuses.
    async fn deliver(&self, content: &str) -> Result<Receipt>;
}

/// Why a submit did not complete.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Refused locally; no request was made.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The request was made and failed; the session is retryable.
    #[error(transparent)]
    Failed(#[from] Error),
}

/// Text taken out of a locked session for delivery.
pub struct Submission {
    content: Zeroizing<String>,
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("len", &self.content.chars().count())
            .finish_non_exhaustive()
    }
}

impl Submission {
    /// The text to send.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// One secure editing session.
pub struct SecureSession<S: InputSurface> {
    surface: S,
    buffer: Zeroizing<String>,
    len: usize,
    locked: bool,
    in_flight: bool,
    saved: bool,
    submit_enabled: bool,
    limits: SessionLimits,
}

impl<S: InputSurface + fmt::Debug> fmt::Debug for SecureSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Buffer contents stay out of debug output
        f.debug_struct("SecureSession")
            .field("surface", &self.surface)
            .field("len", &self.len)
            .field("locked", &self.locked)
            .field("in_flight", &self.in_flight)
            .field("saved", &self.saved)
            .field("submit_enabled", &self.submit_enabled)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl<S: InputSurface> SecureSession<S> {
    /// Start a session on `surface` with default limits.
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self::with_limits(surface, SessionLimits::default())
    }

    /// Start a session on `surface` with explicit limits.
    #[must_use]
    pub fn with_limits(mut surface: S, limits: SessionLimits) -> Self {
        surface.clear_field();
        surface.set_field_enabled(true);
        surface.set_submit_enabled(false);
        surface.set_busy(false);
        Self {
            surface,
            buffer: Zeroizing::new(String::new()),
            len: 0,
            locked: false,
            in_flight: false,
            saved: false,
            submit_enabled: false,
            limits,
        }
    }

    /// Dispatch a surface event.
    ///
    /// `Submit` returns the reserved [`Submission`]; the caller delivers it and
    /// reports back through [`Self::complete_submit`].
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] already surfaced to the writer.
    pub fn handle(
        &mut self,
        event: InputEvent,
    ) -> std::result::Result<Option<Submission>, Rejection> {
        match event {
            InputEvent::Character(c) => self.on_character_input(c).map(|()| None),
            InputEvent::FieldValue(value) => self.on_field_value(&value).map(|()| None),
            InputEvent::Delete => self.on_delete().map(|()| None),
            InputEvent::Clipboard(kind) => self.on_clipboard_attempt(kind).map(|()| None),
            InputEvent::Finalize => self.finalize().map(|()| None),
            InputEvent::Submit => self.begin_submit().map(Some),
        }
    }

    /// Append one typed character.
    ///
    /// # Errors
    ///
    /// [`Rejection::Locked`] after finalize, [`Rejection::TooLong`] at the
    /// length limit.
    pub fn on_character_input(&mut self, c: char) -> std::result::Result<(), Rejection> {
        self.surface.clear_field();
        if self.locked {
            return Err(self.reject(Rejection::Locked));
        }
        if self.len >= self.limits.max_length {
            return Err(self.reject(Rejection::TooLong {
                max: self.limits.max_length,
            }));
        }

        self.buffer.push(c);
        self.len += 1;
        trace!(len = self.len, "character captured");
        self.sync_controls();
        Ok(())
    }

    /// Capture from the field's current value.
    ///
    /// The field is emptied after every keystroke, so its value is exactly
    /// what arrived since the last event.
    ///
    /// # Errors
    ///
    /// [`Rejection::BulkInsert`] when several characters arrive at once and
    /// bulk insertion is not allowed, plus anything
    /// [`Self::on_character_input`] rejects.
    pub fn on_field_value(&mut self, value: &str) -> std::result::Result<(), Rejection> {
        let mut chars = value.chars();
        let (Some(first), rest) = (chars.next(), chars.as_str()) else {
            return Ok(());
        };
        if rest.is_empty() {
            return self.on_character_input(first);
        }

        if self.locked {
            self.surface.clear_field();
            return Err(self.reject(Rejection::Locked));
        }
        if !self.limits.bulk_insert_allowed {
            self.surface.clear_field();
            return Err(self.reject(Rejection::BulkInsert {
                chars: value.chars().count(),
            }));
        }

        self.surface.clear_field();
        let count = value.chars().count();
        if self.len + count > self.limits.max_length {
            return Err(self.reject(Rejection::TooLong {
                max: self.limits.max_length,
            }));
        }
        self.buffer.push_str(value);
        self.len += count;
        trace!(len = self.len, added = count, "bulk insert captured");
        self.sync_controls();
        Ok(())
    }

    /// Remove the last character, if any.
    ///
    /// # Errors
    ///
    /// [`Rejection::Locked`] after finalize.
    pub fn on_delete(&mut self) -> std::result::Result<(), Rejection> {
        if self.locked {
            return Err(self.reject(Rejection::Locked));
        }
        if self.buffer.pop().is_some() {
            self.len -= 1;
            trace!(len = self.len, "character removed");
            self.sync_controls();
        }
        Ok(())
    }

    /// Refuse a clipboard or drag-and-drop operation.
    ///
    /// # Errors
    ///
    /// Always [`Rejection::ClipboardBlocked`].
    pub fn on_clipboard_attempt(&mut self, kind: ClipboardKind) -> std::result::Result<(), Rejection> {
        Err(self.reject(Rejection::ClipboardBlocked(kind)))
    }

    /// Lock the text and show it for review.
    ///
    /// # Errors
    ///
    /// [`Rejection::AlreadyLocked`] on a second call, [`Rejection::EmptyBuffer`]
    /// with nothing typed.
    pub fn finalize(&mut self) -> std::result::Result<(), Rejection> {
        if self.locked {
            return Err(self.reject(Rejection::AlreadyLocked));
        }
        if self.buffer.is_empty() {
            return Err(self.reject(Rejection::EmptyBuffer));
        }

        self.locked = true;
        self.surface.set_field_enabled(false);
        self.surface.show_review(&self.buffer);
        self.sync_controls();
        info!(len = self.len, "text locked for review");
        Ok(())
    }

    /// Reserve the locked text for delivery.
    ///
    /// Disables the submit control until [`Self::complete_submit`] is called,
    /// so at most one submission is in flight.
    ///
    /// # Errors
    ///
    /// [`Rejection::SubmitPending`], [`Rejection::LockBeforeSubmit`],
    /// [`Rejection::EmptyBuffer`] or [`Rejection::AlreadySaved`]; no request
    /// may be made in those cases.
    pub fn begin_submit(&mut self) -> std::result::Result<Submission, Rejection> {
        if self.in_flight {
            return Err(self.reject(Rejection::SubmitPending));
        }
        if self.saved {
            return Err(self.reject(Rejection::AlreadySaved));
        }
        if !self.locked {
            return Err(self.reject(Rejection::LockBeforeSubmit));
        }
        if self.buffer.is_empty() {
            return Err(self.reject(Rejection::EmptyBuffer));
        }

        self.in_flight = true;
        self.surface.set_busy(true);
        self.sync_controls();
        debug!(len = self.len, "submission started");
        Ok(Submission {
            content: Zeroizing::new(self.buffer.as_str().to_owned()),
        })
    }

    /// Record the outcome of the delivery started by [`Self::begin_submit`].
    ///
    /// On failure the text stays locked and the submit control is re-enabled
    /// for a manual retry.
    ///
    /// # Errors
    ///
    /// Returns the delivery error, after surfacing it.
    pub fn complete_submit(
        &mut self,
        outcome: Result<Receipt>,
    ) -> std::result::Result<Receipt, SubmitError> {
        if !self.in_flight {
            return Err(SubmitError::Failed(Error::internal(
                "no submission in flight",
            )));
        }
        self.in_flight = false;
        self.surface.set_busy(false);

        match outcome {
            Ok(receipt) => {
                self.saved = true;
                self.sync_controls();
                let message = receipt
                    .message
                    .clone()
                    .unwrap_or_else(|| "Saved successfully".to_string());
                self.surface.notify(Notice::success(message));
                info!(len = self.len, "submission accepted");
                Ok(receipt)
            }
            Err(err) => {
                self.sync_controls();
                warn!(error = %err, "submission failed; text kept for retry");
                self.surface.notify(Notice::error(err.to_string()));
                Err(SubmitError::Failed(err))
            }
        }
    }

    /// Deliver the locked text through `sink`.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Rejected`] without any request, or
    /// [`SubmitError::Failed`] when delivery failed.
    pub async fn submit<K>(&mut self, sink: &K) -> std::result::Result<Receipt, SubmitError>
    where
        K: SubmitSink + ?Sized,
    {
        let submission = self.begin_submit()?;
        let outcome = sink.deliver(submission.content()).await;
        self.complete_submit(outcome)
    }

    /// The locked text, once finalized.
    #[must_use]
    pub fn locked_text(&self) -> Option<&str> {
        self.locked.then_some(self.buffer.as_str())
    }

    /// Number of captured characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the text is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether a submission is outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether the server accepted the text.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Whether the finalize/submit control is enabled.
    #[must_use]
    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    /// The surface this session drives.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn reject(&mut self, rejection: Rejection) -> Rejection {
        debug!(?rejection, "operation rejected");
        self.surface.notify(Notice::warning(rejection.to_string()));
        rejection
    }

    fn sync_controls(&mut self) {
        let enabled = !self.buffer.is_empty() && !self.in_flight && !self.saved;
        if enabled != self.submit_enabled {
            self.submit_enabled = enabled;
            self.surface.set_submit_enabled(enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;
    use crate::surface::{MemorySurface, NoticeLevel};

    #[derive(Debug, Default)]
    struct RecordingSink {
        calls: AtomicUsize,
        payloads: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SubmitSink for RecordingSink {
        async fn deliver(&self, content: &str) -> Result<Receipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payloads.lock().unwrap().push(content.to_string());
            if self.fail {
                Err(Error::Http {
                    status: 502,
                    message: "Bad Gateway".to_string(),
                })
            } else {
                Ok(Receipt {
                    message: Some("Paragraph saved".to_string()),
                    reference: Some("42".to_string()),
                    redirect_url: None,
                })
            }
        }
    }

    fn session() -> SecureSession<MemorySurface> {
        SecureSession::new(MemorySurface::new())
    }

    fn type_text(session: &mut SecureSession<MemorySurface>, text: &str) {
        for c in text.chars() {
            session.surface_mut().type_into_field(&c.to_string());
            let value = session.surface().field.clone();
            session.on_field_value(&value).unwrap();
        }
    }

    fn warnings(session: &SecureSession<MemorySurface>) -> usize {
        session.surface().notices_at(NoticeLevel::Warning).len()
    }

    #[test]
    fn test_new_session_is_unlocked_and_disabled() {
        let s = session();
        assert!(!s.is_locked());
        assert!(s.is_empty());
        assert!(!s.submit_enabled());
        assert!(!s.surface().submit_enabled);
        assert!(s.surface().field_enabled);
    }

    #[test]
    fn test_hello_scenario() {
        let mut s = session();
        type_text(&mut s, "Hello");
        assert_eq!(s.buffer.as_str(), "Hello");
        assert!(s.surface().submit_enabled);

        s.on_delete().unwrap();
        s.on_delete().unwrap();
        assert_eq!(s.buffer.as_str(), "Hel");

        s.finalize().unwrap();
        assert!(s.is_locked());
        assert!(!s.surface().field_enabled);
        assert_eq!(s.surface().review.as_deref(), Some("Hel"));
        assert_eq!(s.locked_text(), Some("Hel"));
    }

    #[tokio::test]
    async fn test_hello_scenario_submits_locked_text() {
        let mut s = session();
        type_text(&mut s, "Hello");
        s.on_delete().unwrap();
        s.on_delete().unwrap();
        s.finalize().unwrap();

        let sink = RecordingSink::default();
        let receipt = s.submit(&sink).await.unwrap();

        assert_eq!(receipt.reference.as_deref(), Some("42"));
        assert_eq!(*sink.payloads.lock().unwrap(), vec!["Hel".to_string()]);
        assert!(s.is_saved());
        assert!(!s.submit_enabled());
        assert_eq!(s.surface().notices_at(NoticeLevel::Success).len(), 1);
    }

    #[test]
    fn test_field_cleared_after_every_accepted_input() {
        let mut s = session();
        for c in "héllo wörld".chars() {
            s.surface_mut().type_into_field(&c.to_string());
            let value = s.surface().field.clone();
            s.on_field_value(&value).unwrap();
            assert!(s.surface().field.is_empty());
        }
        assert_eq!(s.len(), 11);
    }

    #[test]
    fn test_submit_control_tracks_buffer() {
        let mut s = session();
        s.on_character_input('a').unwrap();
        assert!(s.surface().submit_enabled);
        s.on_delete().unwrap();
        assert!(!s.surface().submit_enabled);
        assert!(s.is_empty());
    }

    #[test]
    fn test_delete_on_empty_is_silent() {
        let mut s = session();
        assert!(s.on_delete().is_ok());
        assert!(s.surface().notices.is_empty());
    }

    #[test]
    fn test_paste_is_blocked_once() {
        let mut s = session();
        type_text(&mut s, "ab");

        let result = s.on_clipboard_attempt(ClipboardKind::Paste);
        assert_eq!(result, Err(Rejection::ClipboardBlocked(ClipboardKind::Paste)));
        assert_eq!(s.buffer.as_str(), "ab");
        assert_eq!(warnings(&s), 1);
        assert_eq!(
            s.surface().notices[0].message,
            ClipboardKind::Paste.warning()
        );
    }

    #[test]
    fn test_all_clipboard_kinds_blocked() {
        let mut s = session();
        for kind in [
            ClipboardKind::Copy,
            ClipboardKind::Paste,
            ClipboardKind::Cut,
            ClipboardKind::Drop,
        ] {
            assert!(s.handle(InputEvent::Clipboard(kind)).is_err());
        }
        assert_eq!(warnings(&s), 4);
        assert!(s.is_empty());
    }

    #[test]
    fn test_bulk_field_value_rejected() {
        let mut s = session();
        type_text(&mut s, "x");
        s.surface_mut().type_into_field("pasted text");

        let value = s.surface().field.clone();
        let result = s.on_field_value(&value);

        assert_eq!(result, Err(Rejection::BulkInsert { chars: 11 }));
        assert_eq!(s.buffer.as_str(), "x");
        assert!(s.surface().field.is_empty());
    }

    #[test]
    fn test_bulk_field_value_allowed_by_limits() {
        let limits = SessionLimits {
            max_length: 100,
            bulk_insert_allowed: true,
        };
        let mut s = SecureSession::with_limits(MemorySurface::new(), limits);
        s.on_field_value("かな").unwrap();
        assert_eq!(s.buffer.as_str(), "かな");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_bulk_field_value_over_limit_leaves_buffer_untouched() {
        let limits = SessionLimits {
            max_length: 3,
            bulk_insert_allowed: true,
        };
        let mut s = SecureSession::with_limits(MemorySurface::new(), limits);
        s.on_character_input('a').unwrap();

        assert_eq!(
            s.on_field_value("bcdef"),
            Err(Rejection::TooLong { max: 3 })
        );
        assert_eq!(s.buffer.as_str(), "a");
        assert_eq!(s.len(), 1);
        assert_eq!(s.surface().notices.len(), 1);

        s.on_field_value("bc").unwrap();
        assert_eq!(s.buffer.as_str(), "abc");
    }

    #[test]
    fn test_empty_field_value_is_noop() {
        let mut s = session();
        assert!(s.on_field_value("").is_ok());
        assert!(s.is_empty());
        assert!(s.surface().notices.is_empty());
    }

    #[test]
    fn test_max_length_enforced() {
        let limits = SessionLimits {
            max_length: 3,
            bulk_insert_allowed: false,
        };
        let mut s = SecureSession::with_limits(MemorySurface::new(), limits);
        for c in "abc".chars() {
            s.on_character_input(c).unwrap();
        }
        assert_eq!(
            s.on_character_input('d'),
            Err(Rejection::TooLong { max: 3 })
        );
        assert_eq!(s.buffer.as_str(), "abc");
    }

    #[test]
    fn test_edits_after_lock_rejected() {
        let mut s = session();
        type_text(&mut s, "done");
        s.finalize().unwrap();

        assert_eq!(s.on_character_input('!'), Err(Rejection::Locked));
        assert_eq!(s.on_delete(), Err(Rejection::Locked));
        assert_eq!(s.on_field_value("more"), Err(Rejection::Locked));
        assert_eq!(s.buffer.as_str(), "done");
        assert!(s.surface().field.is_empty());
    }

    #[test]
    fn test_second_finalize_rejected() {
        let mut s = session();
        type_text(&mut s, "text");
        s.finalize().unwrap();

        assert_eq!(s.finalize(), Err(Rejection::AlreadyLocked));
        assert_eq!(s.buffer.as_str(), "text");
        assert_eq!(s.surface().review.as_deref(), Some("text"));
    }

    #[test]
    fn test_finalize_empty_rejected() {
        let mut s = session();
        assert_eq!(s.finalize(), Err(Rejection::EmptyBuffer));
        assert!(!s.is_locked());
    }

    #[tokio::test]
    async fn test_submit_before_lock_makes_no_request() {
        let mut s = session();
        type_text(&mut s, "draft");

        let sink = RecordingSink::default();
        let err = s.submit(&sink).await.unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Rejected(Rejection::LockBeforeSubmit)
        ));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
        assert_eq!(s.buffer.as_str(), "draft");
    }

    #[tokio::test]
    async fn test_submit_empty_unlocked_makes_no_request() {
        let mut s = session();
        let sink = RecordingSink::default();

        assert!(s.submit(&sink).await.is_err());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_second_submit_while_pending_rejected() {
        let mut s = session();
        type_text(&mut s, "once");
        s.finalize().unwrap();

        let first = s.begin_submit().unwrap();
        assert_eq!(first.content(), "once");
        assert!(s.is_in_flight());
        assert!(!s.surface().submit_enabled);
        assert!(s.surface().busy);

        assert_eq!(s.begin_submit().unwrap_err(), Rejection::SubmitPending);
        assert_eq!(
            s.handle(InputEvent::Submit).unwrap_err(),
            Rejection::SubmitPending
        );

        s.complete_submit(Ok(Receipt::default())).unwrap();
        assert!(!s.is_in_flight());
        assert!(!s.surface().busy);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_text_for_retry() {
        let mut s = session();
        type_text(&mut s, "retry me");
        s.finalize().unwrap();

        let failing = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let err = s.submit(&failing).await.unwrap_err();
        assert!(matches!(err, SubmitError::Failed(Error::Http { status: 502, .. })));

        assert!(s.is_locked());
        assert!(!s.is_saved());
        assert!(!s.is_in_flight());
        assert!(s.surface().submit_enabled);
        assert_eq!(s.locked_text(), Some("retry me"));
        assert_eq!(s.surface().notices_at(NoticeLevel::Error).len(), 1);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

        let working = RecordingSink::default();
        s.submit(&working).await.unwrap();
        assert_eq!(*working.payloads.lock().unwrap(), vec!["retry me".to_string()]);
        assert!(s.is_saved());
    }

    #[tokio::test]
    async fn test_submit_after_saved_rejected() {
        let mut s = session();
        type_text(&mut s, "final");
        s.finalize().unwrap();

        let sink = RecordingSink::default();
        s.submit(&sink).await.unwrap();
        let err = s.submit(&sink).await.unwrap_err();

        assert!(matches!(err, SubmitError::Rejected(Rejection::AlreadySaved)));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_complete_without_begin_is_error() {
        let mut s = session();
        assert!(matches!(
            s.complete_submit(Ok(Receipt::default())),
            Err(SubmitError::Failed(Error::Internal(_)))
        ));
    }

    #[test]
    fn test_locked_text_hidden_until_finalize() {
        let mut s = session();
        type_text(&mut s, "secret");
        assert!(s.locked_text().is_none());
        assert!(s.surface().review.is_none());
    }

    #[test]
    fn test_handle_dispatches_events() {
        let mut s = session();
        s.handle(InputEvent::Character('h')).unwrap();
        s.handle(InputEvent::FieldValue("i".to_string())).unwrap();
        s.handle(InputEvent::Delete).unwrap();
        s.handle(InputEvent::Character('o')).unwrap();
        assert!(s.handle(InputEvent::Finalize).unwrap().is_none());
        assert_eq!(s.locked_text(), Some("ho"));

        let submission = s.handle(InputEvent::Submit).unwrap().unwrap();
        assert_eq!(submission.content(), "ho");
        assert!(s.is_in_flight());
    }

    #[test]
    fn test_debug_output_redacts_buffer() {
        let mut s = session();
        type_text(&mut s, "hidden words");

        let debug_str = format!("{s:?}");
        assert!(debug_str.contains("SecureSession"));
        assert!(debug_str.contains("len: 12"));
        assert!(!debug_str.contains("hidden"));

        s.finalize().unwrap();
        let submission = s.begin_submit().unwrap();
        assert!(!format!("{submission:?}").contains("hidden"));
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::EmptyBuffer.to_string(),
            "Please type some content first"
        );
        assert_eq!(
            Rejection::ClipboardBlocked(ClipboardKind::Copy).to_string(),
            "Copying is not allowed"
        );
        assert!(Rejection::TooLong { max: 10 }.to_string().contains("10"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Type(char),
        Delete,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => any::<char>().prop_map(Op::Type),
            1 => Just(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn prop_buffer_replays_as_stack(ops in proptest::collection::vec(op(), 0..200)) {
            let mut s = session();
            let mut expected: Vec<char> = Vec::new();

            for op in &ops {
                match op {
                    Op::Type(c) => {
                        s.on_character_input(*c).unwrap();
                        expected.push(*c);
                        prop_assert!(s.surface().field.is_empty());
                    }
                    Op::Delete => {
                        s.on_delete().unwrap();
                        expected.pop();
                    }
                }
                prop_assert_eq!(s.surface().submit_enabled, !expected.is_empty());
            }

            let expected: String = expected.into_iter().collect();
            prop_assert_eq!(s.buffer.as_str(), expected.as_str());
            prop_assert_eq!(s.len(), expected.chars().count());
        }
    }
}
