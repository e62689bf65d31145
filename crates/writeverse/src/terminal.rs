//! Terminal input surface.
//!
//! The terminal is put in raw mode with bracketed paste enabled, so every key
//! press and every paste arrives as its own event. Typed text is never echoed;
//! only a status line and notices are drawn. A dedicated thread reads
//! terminal events and forwards them over a tokio channel to the async loop in
//! [`run_session`].

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use clipboard_rs::{Clipboard, ClipboardContext};
use crossterm::cursor::MoveToColumn;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::{Receipt, SecureSession, SubmitError, SubmitSink};
use crate::surface::{ClipboardKind, InputEvent, InputSurface, Notice, NoticeLevel};

/// How often the reader thread checks whether it should stop.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What a terminal event means to a secure session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Feed an event to the session.
    Input(InputEvent),
    /// Leave the session.
    Quit,
}

/// Translate a terminal event. `locked` decides what Enter does.
#[must_use]
pub fn map_event(event: &Event, locked: bool) -> Option<Action> {
    match event {
        Event::Paste(_) => Some(Action::Input(InputEvent::Clipboard(ClipboardKind::Paste))),
        Event::Key(key) => map_key(key, locked),
        _ => None,
    }
}

fn map_key(key: &KeyEvent, locked: bool) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let input = |event| Some(Action::Input(event));

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => input(InputEvent::Clipboard(ClipboardKind::Copy)),
            KeyCode::Char('v') => input(InputEvent::Clipboard(ClipboardKind::Paste)),
            KeyCode::Char('x') => input(InputEvent::Clipboard(ClipboardKind::Cut)),
            KeyCode::Char('s') => input(InputEvent::Submit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(c) => input(InputEvent::Character(c)),
        KeyCode::Backspace => input(InputEvent::Delete),
        KeyCode::Enter if locked => input(InputEvent::Submit),
        KeyCode::Enter => input(InputEvent::Finalize),
        KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// Raw mode plus bracketed paste for as long as the guard lives.
#[derive(Debug)]
pub struct RawModeGuard(());

impl RawModeGuard {
    /// Switch the terminal over.
    ///
    /// # Errors
    ///
    /// Returns a terminal error if raw mode cannot be enabled.
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode().map_err(|e| Error::terminal(format!("raw mode: {e}")))?;
        execute!(io::stdout(), EnableBracketedPaste)?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableBracketedPaste);
        let _ = terminal::disable_raw_mode();
    }
}

/// Spawn the thread that forwards terminal events to `tx`.
///
/// The thread ends when `stop` is set, the receiver is dropped, or reading
/// fails.
#[must_use]
pub fn spawn_event_reader(tx: mpsc::Sender<Event>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match event::poll(POLL_INTERVAL) {
                Ok(false) => {}
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "terminal read failed");
                        break;
                    }
                },
                Err(e) => {
                    warn!(error = %e, "terminal poll failed");
                    break;
                }
            }
        }
        debug!("event reader stopped");
    })
}

/// Surface that draws to a terminal.
#[derive(Debug)]
pub struct TerminalSurface<W: Write> {
    out: W,
    limit: Option<usize>,
    field_enabled: bool,
    submit_enabled: bool,
    busy: bool,
}

impl TerminalSurface<io::Stdout> {
    /// Surface on standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    /// Surface on any writer.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            limit: None,
            field_enabled: true,
            submit_enabled: false,
            busy: false,
        }
    }

    /// Show the count against a character limit.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Redraw the status line for a buffer of `len` characters.
    pub fn draw_status(&mut self, len: usize) {
        let line = self.status_line(len);
        self.emit(|out| {
            queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
            out.flush()
        });
    }

    fn status_line(&self, len: usize) -> String {
        let state = if self.busy {
            "saving..."
        } else if !self.field_enabled && self.submit_enabled {
            "locked, Enter to submit"
        } else if !self.field_enabled {
            "locked"
        } else if self.submit_enabled {
            "Enter to finalize"
        } else {
            "type to begin"
        };
        let count = match self.limit {
            Some(limit) if len > limit => format!("{len}/{limit} characters, over limit"),
            Some(limit) => format!("{len}/{limit} characters"),
            None => format!("{len} characters"),
        };
        format!("[{count}] {state} | Esc to quit")
    }

    fn print_block(&mut self, text: &str) {
        // Raw mode: every line break needs its own carriage return
        let text = text.replace('\n', "\r\n");
        self.emit(|out| {
            queue!(
                out,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(text),
                Print("\r\n")
            )?;
            out.flush()
        });
    }

    fn emit(&mut self, draw: impl FnOnce(&mut W) -> io::Result<()>) {
        if let Err(e) = draw(&mut self.out) {
            warn!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write> InputSurface for TerminalSurface<W> {
    fn clear_field(&mut self) {
        // Nothing is echoed, so there is no visible field to clear.
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
        self.print_block(&format!("--- Your text ---\n{text}\n-----------------"));
    }

    fn notify(&mut self, notice: Notice) {
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        self.print_block(&format!("{prefix}: {}", notice.message));
    }
}

/// How an interactive session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server accepted the text.
    Saved(Receipt),
    /// The writer left (or input ended) before a successful save.
    Quit {
        /// Error of the last failed delivery, if any.
        last_error: Option<String>,
    },
}

type Delivery<'a> = Pin<Box<dyn Future<Output = Result<Receipt>> + 'a>>;

async fn finish(delivery: &mut Option<Delivery<'_>>) -> Result<Receipt> {
    match delivery {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

/// Drive `session` from terminal events until it is saved or abandoned.
///
/// Input keeps being handled (and rejected) while a delivery is outstanding.
/// Quitting is refused until that delivery finishes. When the event stream
/// ends, an outstanding delivery is awaited before returning.
///
/// # Errors
///
/// Currently infallible beyond what the session surfaces; the `Result` keeps
/// room for surface failures.
pub async fn run_session<W, K>(
    session: &mut SecureSession<TerminalSurface<W>>,
    sink: &K,
    events: &mut mpsc::Receiver<Event>,
) -> Result<SessionEnd>
where
    W: Write,
    K: SubmitSink + ?Sized,
{
    let mut delivery: Option<Delivery<'_>> = None;
    let mut last_error = None;

    loop {
        let len = session.len();
        session.surface_mut().draw_status(len);

        tokio::select! {
            outcome = finish(&mut delivery), if delivery.is_some() => {
                delivery = None;
                match session.complete_submit(outcome) {
                    Ok(receipt) => return Ok(SessionEnd::Saved(receipt)),
                    Err(SubmitError::Failed(e)) => last_error = Some(e.to_string()),
                    Err(SubmitError::Rejected(_)) => {}
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    if delivery.is_some() {
                        let outcome = finish(&mut delivery).await;
                        match session.complete_submit(outcome) {
                            Ok(receipt) => return Ok(SessionEnd::Saved(receipt)),
                            Err(SubmitError::Failed(e)) => last_error = Some(e.to_string()),
                            Err(SubmitError::Rejected(_)) => {}
                        }
                    }
                    return Ok(SessionEnd::Quit { last_error });
                };
                match map_event(&event, session.is_locked()) {
                    Some(Action::Quit) if delivery.is_some() => {
                        session
                            .surface_mut()
                            .notify(Notice::warning("Wait for the submission to finish"));
                    }
                    Some(Action::Quit) => return Ok(SessionEnd::Quit { last_error }),
                    Some(Action::Input(input)) => {
                        if let Ok(Some(submission)) = session.handle(input) {
                            delivery = Some(Box::pin(async move {
                                sink.deliver(submission.content()).await
                            }));
                        }
                    }
                    None => {}
                }
            }
        }
    }
}

/// Put `text` on the system clipboard.
///
/// # Errors
///
/// Returns a terminal error if the clipboard is unavailable.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let ctx = ClipboardContext::new().map_err(|e| Error::terminal(format!("clipboard: {e}")))?;
    ctx.set_text(text.to_string())
        .map_err(|e| Error::terminal(format!("clipboard: {e}")))
}
