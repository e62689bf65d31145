//! Paragraph-by-paragraph essay editor.
//!
//! An essay is written one paragraph at a time. Moving on saves and locks the
//! paragraph just written; earlier paragraphs can only be changed again in
//! edit mode. Paragraphs after the current one are not editable yet.

use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{EssayClient, EssayStatus, FinalSubmitted};
use crate::error::{Error, Result};
use crate::transport::Transport;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Paragraph {
    content: String,
    locked: bool,
}

/// Split plain text into paragraphs at blank lines.
///
/// Lines inside a paragraph keep their breaks; surrounding whitespace is
/// trimmed and empty paragraphs are dropped.
#[must_use]
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }
    paragraphs
}

/// Editor state for one essay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphEditor {
    essay: Uuid,
    paragraphs: Vec<Paragraph>,
    current: usize,
    edit_mode: bool,
}

impl ParagraphEditor {
    /// Editor for `essay` with `total` empty paragraphs.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `total` is zero.
    pub fn new(essay: Uuid, total: usize) -> Result<Self> {
        if total == 0 {
            return Err(Error::validation("an essay needs at least one paragraph"));
        }
        Ok(Self {
            essay,
            paragraphs: vec![Paragraph::default(); total],
            current: 0,
            edit_mode: false,
        })
    }

    /// Fill paragraphs from already-written text without saving anything.
    ///
    /// The last given paragraph becomes current; the ones before it are
    /// locked as if the writer had stepped through them.
    ///
    /// # Errors
    ///
    /// Returns a validation error when there is no text or more paragraphs
    /// than the essay holds.
    pub fn load<I, S>(&mut self, contents: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let contents: Vec<String> = contents.into_iter().map(Into::into).collect();
        if contents.is_empty() {
            return Err(Error::validation("no paragraphs to load"));
        }
        if contents.len() > self.total() {
            return Err(Error::validation(format!(
                "{} paragraphs given but the essay holds {}",
                contents.len(),
                self.total()
            )));
        }

        let last = contents.len() - 1;
        for (i, content) in contents.into_iter().enumerate() {
            self.paragraphs[i] = Paragraph {
                content,
                locked: i < last,
            };
        }
        self.current = last;
        Ok(())
    }

    /// The essay being edited.
    #[must_use]
    pub fn essay(&self) -> Uuid {
        self.essay
    }

    /// Number of paragraphs.
    #[must_use]
    pub fn total(&self) -> usize {
        self.paragraphs.len()
    }

    /// Index of the paragraph being written.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Whether edit mode is on.
    #[must_use]
    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Text of paragraph `index`.
    #[must_use]
    pub fn content(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(|p| p.content.as_str())
    }

    /// Whether paragraph `index` is locked.
    #[must_use]
    pub fn is_locked(&self, index: usize) -> bool {
        self.paragraphs.get(index).is_some_and(|p| p.locked)
    }

    /// Whether paragraph `index` may be changed right now.
    #[must_use]
    pub fn is_editable(&self, index: usize) -> bool {
        match self.paragraphs.get(index) {
            None => false,
            Some(_) if self.edit_mode => true,
            Some(p) => index == self.current && !p.locked,
        }
    }

    /// Replace the text of paragraph `index`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the paragraph is not editable.
    pub fn set_content(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        if !self.is_editable(index) {
            return Err(Error::validation(format!(
                "paragraph {} is locked",
                index + 1
            )));
        }
        self.paragraphs[index].content = text.into();
        Ok(())
    }

    /// Save the current paragraph, lock it, and move to the next one.
    ///
    /// Returns `false` without doing anything on the last paragraph.
    ///
    /// # Errors
    ///
    /// Returns an error if saving fails; the editor stays where it was.
    pub async fn next<T: Transport>(&mut self, client: &EssayClient<T>) -> Result<bool> {
        if self.current + 1 >= self.total() {
            return Ok(false);
        }
        client
            .save_paragraph(self.essay, self.current, &self.paragraphs[self.current].content)
            .await?;
        self.paragraphs[self.current].locked = true;
        self.current += 1;
        debug!(current = self.current, "advanced to next paragraph");
        Ok(true)
    }

    /// Move back one paragraph. Returns `false` on the first paragraph.
    pub fn prev(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Toggle edit mode and return the new state.
    ///
    /// Entering unlocks every paragraph; leaving locks every paragraph
    /// before the current one.
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        let current = self.current;
        for (i, paragraph) in self.paragraphs.iter_mut().enumerate() {
            if self.edit_mode {
                paragraph.locked = false;
            } else if i < current {
                paragraph.locked = true;
            }
        }
        self.edit_mode
    }

    /// Completion percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        (self.current + 1) as f64 / self.total() as f64 * 100.0
    }

    async fn save_written<T: Transport>(&self, client: &EssayClient<T>) -> Result<()> {
        for (i, paragraph) in self.paragraphs[..=self.current].iter().enumerate() {
            client
                .save_paragraph(self.essay, i, &paragraph.content)
                .await?;
        }
        Ok(())
    }

    /// Save every paragraph up to the current one and mark the essay a draft.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error.
    pub async fn save_draft<T: Transport>(&self, client: &EssayClient<T>) -> Result<()> {
        self.save_written(client).await?;
        client.update_status(self.essay, EssayStatus::Draft).await?;
        info!(essay = %self.essay, paragraphs = self.current + 1, "draft saved");
        Ok(())
    }

    /// Save every paragraph up to the current one and submit the essay.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error.
    pub async fn final_submit<T: Transport>(
        &self,
        client: &EssayClient<T>,
    ) -> Result<FinalSubmitted> {
        self.save_written(client).await?;
        let submitted = client.final_submit(self.essay).await?;
        info!(essay = %self.essay, "essay submitted");
        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::fake::FakeTransport;
    use crate::transport::Payload;

    fn editor(total: usize) -> ParagraphEditor {
        ParagraphEditor::new(Uuid::nil(), total).unwrap()
    }

    fn client() -> (EssayClient<FakeTransport>, FakeTransport) {
        let fake = FakeTransport::new();
        (EssayClient::new(fake.clone()), fake)
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "  First line\nstill first\n\n\n   \nSecond\n\nThird  \n";
        assert_eq!(
            split_paragraphs(text),
            ["First line\nstill first", "Second", "Third"]
        );
        assert!(split_paragraphs(" \n\n ").is_empty());
    }

    #[test]
    fn test_new_requires_a_paragraph() {
        assert!(ParagraphEditor::new(Uuid::nil(), 0).is_err());
    }

    #[test]
    fn test_only_current_paragraph_editable() {
        let mut editor = editor(5);
        assert!(editor.is_editable(0));
        assert!(!editor.is_editable(1));
        assert!(!editor.is_editable(9));

        editor.set_content(0, "Intro").unwrap();
        assert!(editor.set_content(1, "Too early").is_err());
        assert_eq!(editor.content(0), Some("Intro"));
    }

    #[tokio::test]
    async fn test_next_saves_locks_and_advances() {
        let (client, fake) = client();
        let mut editor = editor(3);
        editor.set_content(0, "First").unwrap();

        assert!(editor.next(&client).await.unwrap());

        assert_eq!(editor.current(), 1);
        assert!(editor.is_locked(0));
        assert!(editor.set_content(0, "Changed").is_err());
        assert_eq!(
            fake.requests()[0].1,
            Payload::Json(json!({"content": "First", "paragraph_index": 0}))
        );
    }

    #[tokio::test]
    async fn test_next_on_last_paragraph_is_noop() {
        let (client, fake) = client();
        let mut editor = editor(1);
        assert!(!editor.next(&client).await.unwrap());
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_next_failure_keeps_position() {
        let (client, fake) = client();
        fake.fail(Error::server("boom"));
        let mut editor = editor(3);

        assert!(editor.next(&client).await.is_err());
        assert_eq!(editor.current(), 0);
        assert!(!editor.is_locked(0));
    }

    #[tokio::test]
    async fn test_prev_does_not_unlock() {
        let (client, _) = client();
        let mut editor = editor(3);
        editor.next(&client).await.unwrap();

        assert!(editor.prev());
        assert_eq!(editor.current(), 0);
        assert!(editor.is_locked(0));
        assert!(!editor.is_editable(0));
        assert!(!editor.prev());
    }

    #[tokio::test]
    async fn test_edit_mode_unlocks_then_relocks() {
        let (client, _) = client();
        let mut editor = editor(4);
        editor.next(&client).await.unwrap();
        editor.next(&client).await.unwrap();

        assert!(editor.toggle_edit_mode());
        assert!(editor.is_editable(0));
        assert!(editor.is_editable(3));
        editor.set_content(0, "Revised intro").unwrap();

        assert!(!editor.toggle_edit_mode());
        assert!(editor.is_locked(0));
        assert!(editor.is_locked(1));
        assert!(!editor.is_locked(2));
        assert!(editor.is_editable(2));
        assert_eq!(editor.content(0), Some("Revised intro"));
    }

    #[test]
    fn test_progress() {
        let mut editor = editor(5);
        assert!((editor.progress() - 20.0).abs() < f64::EPSILON);
        editor.load(["a", "b", "c", "d", "e"]).unwrap();
        assert!((editor.progress() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_locks_all_but_last() {
        let mut editor = editor(5);
        editor.load(["one", "two", "three"]).unwrap();

        assert_eq!(editor.current(), 2);
        assert!(editor.is_locked(0));
        assert!(editor.is_locked(1));
        assert!(editor.is_editable(2));
    }

    #[test]
    fn test_load_rejects_too_many() {
        let mut editor = editor(2);
        assert!(editor.load(["a", "b", "c"]).is_err());
        assert!(editor.load(Vec::<String>::new()).is_err());
    }

    #[tokio::test]
    async fn test_save_draft_saves_written_then_status() {
        let (client, fake) = client();
        let mut editor = editor(5);
        editor.load(["one", "two"]).unwrap();

        editor.save_draft(&client).await.unwrap();

        let paths = fake.paths();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("/write/"));
        assert!(paths[1].ends_with("/write/"));
        assert_eq!(paths[2], "essay/update-status/");
    }

    #[tokio::test]
    async fn test_final_submit_returns_redirect() {
        let (client, fake) = client();
        for _ in 0..2 {
            fake.respond(json!({"success": true}));
        }
        fake.respond(json!({"success": true, "redirect_url": "/essays/1/pdf/"}));

        let mut editor = editor(5);
        editor.load(["one", "two"]).unwrap();
        let done = editor.final_submit(&client).await.unwrap();

        assert_eq!(done.redirect_url.as_deref(), Some("/essays/1/pdf/"));
        assert_eq!(fake.paths().last().map(String::as_str), Some("essay/final-submit/"));
    }

    #[tokio::test]
    async fn test_final_submit_stops_at_first_failure() {
        let (client, fake) = client();
        fake.fail(Error::server("nope"));

        let mut editor = editor(5);
        editor.load(["one", "two"]).unwrap();
        assert!(editor.final_submit(&client).await.is_err());
        assert_eq!(fake.requests().len(), 1);
    }
}
