//! `writeverse` - Secure writing client for the WriteVerse platform
//!
//! This library captures text one keystroke at a time into a hidden buffer,
//! locks it for review, and delivers it to the platform's essay and challenge
//! endpoints. Copy, paste, cut and drag-and-drop are refused.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod csrf;
pub mod error;
pub mod logging;
pub mod paragraphs;
pub mod session;
pub mod stats;
pub mod storage;
pub mod surface;
pub mod terminal;
pub mod transport;

pub use api::{EssayClient, SubmitTarget, TargetedSubmit};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use paragraphs::ParagraphEditor;
pub use session::{Receipt, Rejection, SecureSession, SubmitSink};
pub use stats::TextStats;
pub use storage::{Outbox, PendingSubmission};
pub use surface::{InputEvent, InputSurface, MemorySurface};
pub use transport::{HttpTransport, Transport};
