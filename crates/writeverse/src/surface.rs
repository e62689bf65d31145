//! Input surface abstraction.
//!
//! A secure input session never touches a concrete UI. It receives
//! [`InputEvent`]s and drives an [`InputSurface`], the presentation side of a
//! text field: clearing it, enabling controls, showing the review and raising
//! notices. [`MemorySurface`] records every call and is what headless callers
//! and tests use.

use std::fmt;

/// A clipboard-style operation attempted on the secure field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardKind {
    /// Copy selection out of the field.
    Copy,
    /// Paste into the field.
    Paste,
    /// Cut selection out of the field.
    Cut,
    /// Drag-and-drop into the field.
    Drop,
}

impl ClipboardKind {
    /// The warning shown when this operation is blocked.
    #[must_use]
    pub fn warning(self) -> &'static str {
        match self {
            Self::Copy => "Copying is not allowed",
            Self::Paste => "Pasting is not allowed",
            Self::Cut => "Cutting is not allowed",
            Self::Drop => "Drag and drop is not allowed",
        }
    }
}

impl fmt::Display for ClipboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Paste => write!(f, "paste"),
            Self::Cut => write!(f, "cut"),
            Self::Drop => write!(f, "drop"),
        }
    }
}

/// An event reported by an input surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A single typed character.
    Character(char),
    /// The field's current value after a change.
    FieldValue(String),
    /// A deletion keystroke.
    Delete,
    /// A blocked clipboard operation.
    Clipboard(ClipboardKind),
    /// The writer asked to lock the text for review.
    Finalize,
    /// The writer asked to send the locked text.
    Submit,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// An operation completed.
    Success,
    /// A local, non-fatal rejection.
    Warning,
    /// A failed operation the user may retry.
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A transient message shown to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

impl Notice {
    /// Create an info notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    /// Create a success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    /// Create a warning notice.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    /// Create an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// The presentation side of a secure text field.
///
/// Implementors render state; they never hold the authoritative text.
pub trait InputSurface {
    /// Empty the visible field.
    fn clear_field(&mut self);

    /// Enable or disable the finalize/submit control.
    fn set_submit_enabled(&mut self, enabled: bool);

    /// Enable or disable text entry in the visible field.
    fn set_field_enabled(&mut self, enabled: bool);

    /// Show or hide the in-progress indicator on the submit control.
    fn set_busy(&mut self, busy: bool);

    /// Render the locked text read-only for confirmation.
    fn show_review(&mut self, text: &str);

    /// Raise a transient notice.
    fn notify(&mut self, notice: Notice);
}

/// An in-memory surface that records what it was told to display.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    /// Current visible field value.
    pub field: String,
    /// Whether the field accepts text entry.
    pub field_enabled: bool,
    /// Whether the submit control is enabled.
    pub submit_enabled: bool,
    /// Whether the submit control shows progress.
    pub busy: bool,
    /// Review area content, once shown.
    pub review: Option<String>,
    /// Every notice raised, oldest first.
    pub notices: Vec<Notice>,
    /// Number of times the field was cleared.
    pub clears: usize,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self {
            field: String::new(),
            field_enabled: true,
            submit_enabled: false,
            busy: false,
            review: None,
            notices: Vec::new(),
            clears: 0,
        }
    }
}

impl MemorySurface {
    /// Create a fresh surface with an enabled, empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the writer typing into the visible field.
    pub fn type_into_field(&mut self, text: &str) {
        self.field.push_str(text);
    }

    /// Notices of the given level.
    #[must_use]
    pub fn notices_at(&self, level: NoticeLevel) -> Vec<&Notice> {
        self.notices.iter().filter(|n| n.level == level).collect()
    }
}

impl InputSurface for MemorySurface {
    fn clear_field(&mut self) {
        self.field.clear();
        self.clears += 1;
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
    }

    fn set_field_enabled(&mut self, enabled: bool) {
        self.field_enabled = enabled;
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn show_review(&mut self, text: &str) {
        self.review = Some(text.to_string());
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
