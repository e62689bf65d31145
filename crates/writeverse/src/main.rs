//! `wvcap` - CLI for writeverse
//!
//! This binary runs secure writing sessions in the terminal and talks to the
//! WriteVerse platform on the writer's behalf.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use zeroize::Zeroizing;

use writeverse::api::SubmitTarget;
use writeverse::cli::{
    AssistCommand, Cli, Command, CommentCommand, ConfigCommand, EssayCommand, GrammarCommand,
    LikeCommand, PendingCommand, StatsCommand, WriteCommand, WriteTarget,
};
use writeverse::paragraphs::{split_paragraphs, ParagraphEditor};
use writeverse::session::SessionLimits;
use writeverse::terminal::{
    copy_to_clipboard, run_session, spawn_event_reader, RawModeGuard, SessionEnd,
    TerminalSurface,
};
use writeverse::{
    init_logging, Config, EssayClient, HttpTransport, Outbox, SecureSession, TargetedSubmit,
    TextStats,
};

/// Events buffered between the key reader thread and the session loop.
const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Config commands must work even when the configuration does not load
    let config_path = cli.config.clone();
    let load = || Config::load_from(config_path.clone());

    match cli.command {
        Command::Write(cmd) => handle_write(&load()?, cmd).await,
        Command::Essay(cmd) => handle_essay(&load()?, cmd).await,
        Command::Like(cmd) => handle_like(&load()?, &cmd).await,
        Command::Comment(cmd) => handle_comment(&load()?, cmd).await,
        Command::Grammar(cmd) => handle_grammar(&load()?, cmd).await,
        Command::Assist(cmd) => handle_assist(&load()?, cmd).await,
        Command::Stats(cmd) => handle_stats(cmd),
        Command::Pending(cmd) => handle_pending(&load()?, cmd).await,
        Command::Config(cmd) => handle_config(cli.config, cmd),
    }
}

fn client(config: &Config) -> anyhow::Result<EssayClient<HttpTransport>> {
    let transport = HttpTransport::new(&config.server, config.request_timeout())?;
    Ok(EssayClient::new(transport))
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read standard input")?;
            Ok(text)
        }
    }
}

async fn handle_write(config: &Config, cmd: WriteCommand) -> anyhow::Result<()> {
    let (target, limit) = match cmd.target {
        WriteTarget::Paragraph { essay, number } => (
            SubmitTarget::Paragraph {
                essay,
                index: usize::from(number) - 1,
            },
            None,
        ),
        WriteTarget::Character { challenge, limit } => {
            (SubmitTarget::CharacterChallenge { challenge }, limit)
        }
        WriteTarget::Timed { submission } => (
            SubmitTarget::TimedChallenge {
                submission,
                time_spent_secs: None,
            },
            None,
        ),
    };
    let sink = TargetedSubmit::new(client(config)?, target);

    println!("Writing for {target}. Copy and paste are disabled.");
    println!("Enter finalizes, Enter again (or Ctrl+S) submits, Esc quits.");

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let stop = Arc::new(AtomicBool::new(false));

    let (end, locked, saved) = {
        let _raw = RawModeGuard::enter()?;
        let reader = spawn_event_reader(tx, Arc::clone(&stop));

        let surface = TerminalSurface::stdout().with_limit(limit);
        let mut session = SecureSession::with_limits(surface, SessionLimits::from(&config.capture));
        let end = run_session(&mut session, &sink, &mut rx).await;

        stop.store(true, Ordering::Relaxed);
        drop(rx);
        if reader.join().is_err() {
            warn!("event reader thread panicked");
        }

        let locked = session
            .locked_text()
            .map(|text| Zeroizing::new(text.to_string()));
        (end?, locked, session.is_saved())
    };
    println!();

    match end {
        SessionEnd::Saved(receipt) => {
            if let Some(message) = &receipt.message {
                println!("{message}");
            }
            if let Some(reference) = &receipt.reference {
                println!("Reference: {reference}");
            }
        }
        SessionEnd::Quit { last_error } => match &locked {
            Some(text) if !saved => {
                stash_unsaved(config, &sink.resolved_target(), text, last_error.as_deref())?;
            }
            _ => println!("Nothing was submitted."),
        },
    }

    if cmd.copy {
        match &locked {
            Some(text) => {
                copy_to_clipboard(text)?;
                println!("Text copied to clipboard.");
            }
            None => println!("Nothing finalized to copy."),
        }
    }
    Ok(())
}

fn stash_unsaved(
    config: &Config,
    target: &SubmitTarget,
    text: &str,
    last_error: Option<&str>,
) -> anyhow::Result<()> {
    if !config.outbox.enabled {
        warn!("outbox disabled; unsaved text discarded");
        println!("The text was not saved and the outbox is disabled.");
        return Ok(());
    }

    let outbox = Outbox::open(config.database_path())?;
    match outbox.stash(target, text)? {
        Some(id) => {
            if let Some(error) = last_error {
                outbox.record_failure(id, error)?;
            }
            println!("Text kept as pending submission #{id}.");
            println!("Retry with: wvcap pending retry {id}");
        }
        None => println!("The same text is already pending; see `wvcap pending list`."),
    }
    Ok(())
}

async fn handle_essay(config: &Config, cmd: EssayCommand) -> anyhow::Result<()> {
    let (essay, file, submit) = match cmd {
        EssayCommand::Submit { essay, file } => (essay, file, true),
        EssayCommand::Draft { essay, file } => (essay, file, false),
    };

    let paragraphs = split_paragraphs(&read_input(Some(&file))?);
    let mut editor = ParagraphEditor::new(essay, config.editor.paragraphs)?;
    editor.load(paragraphs)?;
    let client = client(config)?;

    if submit {
        let done = editor.final_submit(&client).await?;
        println!("Essay submitted ({} paragraphs).", editor.current() + 1);
        if let Some(url) = done.redirect_url {
            println!("PDF: {}", client.transport().endpoint(&url)?);
        }
    } else {
        editor.save_draft(&client).await?;
        println!(
            "Draft saved: {} of {} paragraphs ({:.0}%).",
            editor.current() + 1,
            editor.total(),
            editor.progress()
        );
    }
    Ok(())
}

async fn handle_like(config: &Config, cmd: &LikeCommand) -> anyhow::Result<()> {
    let status = client(config)?.toggle_like(cmd.essay).await?;
    let verb = if status.liked { "Liked" } else { "Unliked" };
    println!("{verb} ({} likes)", status.likes_count);
    Ok(())
}

async fn handle_comment(config: &Config, cmd: CommentCommand) -> anyhow::Result<()> {
    let text = match cmd.message {
        Some(message) => message,
        None => read_input(cmd.file.as_deref())?,
    };
    client(config)?.add_comment(cmd.essay, &text).await?;
    println!("Comment added!");
    Ok(())
}

async fn handle_grammar(config: &Config, cmd: GrammarCommand) -> anyhow::Result<()> {
    let text = read_input(cmd.file.as_deref())?;
    let report = client(config)?.check_grammar(&text).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Overall score:  {:.0}%", report.score);
    println!("Grammar:        {:.0}% ({} issues)", report.grammar_score, report.grammar_issues);
    println!("Spelling:       {:.0}% ({} issues)", report.spelling_score, report.spelling_issues);
    if !report.misspelled_words.is_empty() {
        println!("Misspelled:     {}", report.misspelled_words.join(", "));
    }
    for suggestion in &report.suggestions {
        match &suggestion.suggestion {
            Some(fix) => println!("  - {} (try: {fix})", suggestion.message),
            None => println!("  - {}", suggestion.message),
        }
    }
    Ok(())
}

async fn handle_assist(config: &Config, cmd: AssistCommand) -> anyhow::Result<()> {
    let text = read_input(cmd.file.as_deref())?;
    let client = client(config)?;
    let suggestion = client
        .ai_assist(&text, cmd.kind.into(), cmd.essay)
        .await?;

    println!("{}", suggestion.suggestion);
    if cmd.accept {
        client.ai_accept(&suggestion.session_id).await?;
        info!(session = %suggestion.session_id, "suggestion accepted");
    }
    Ok(())
}

fn handle_stats(cmd: StatsCommand) -> anyhow::Result<()> {
    let text = read_input(cmd.file.as_deref())?;
    let stats = match cmd.limit {
        Some(limit) => TextStats::with_limit(&text, limit),
        None => TextStats::measure(&text),
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{stats}");
    }
    Ok(())
}

async fn handle_pending(config: &Config, cmd: PendingCommand) -> anyhow::Result<()> {
    let outbox = Outbox::open(config.database_path())?;

    match cmd {
        PendingCommand::List { json } => {
            let entries = outbox.list()?;
            if json {
                let rows: Vec<_> = entries
                    .iter()
                    .map(|entry| {
                        json!({
                            "id": entry.id,
                            "created": entry.created,
                            "target": entry.target,
                            "characters": entry.content.chars().count(),
                            "attempts": entry.attempts,
                            "last_error": entry.last_error,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if entries.is_empty() {
                println!("No pending submissions.");
            } else {
                for entry in &entries {
                    println!(
                        "#{:<4} {}  {}  {} characters, {} attempts",
                        entry.id,
                        entry.created.format("%Y-%m-%d %H:%M"),
                        entry.target,
                        entry.content.chars().count(),
                        entry.attempts,
                    );
                    if let Some(error) = &entry.last_error {
                        println!("       last error: {error}");
                    }
                }
            }
        }
        PendingCommand::Retry { id } => {
            let entries = match id {
                Some(id) => vec![outbox
                    .get(id)?
                    .with_context(|| format!("no pending submission #{id}"))?],
                None => outbox.list()?,
            };
            if entries.is_empty() {
                println!("No pending submissions.");
                return Ok(());
            }

            let client = client(config)?;
            let mut failed = 0;
            for entry in entries {
                match client.deliver_to(&entry.target, &entry.content).await {
                    Ok(receipt) => {
                        outbox.remove(entry.id)?;
                        let message = receipt.message.as_deref().unwrap_or("Saved successfully");
                        println!("#{}: {message}", entry.id);
                    }
                    Err(e) => {
                        if !e.is_transport_failure() {
                            warn!(id = entry.id, error = %e, "retrying this entry is unlikely to help");
                        }
                        outbox.record_failure(entry.id, &e.to_string())?;
                        println!("#{}: {e}", entry.id);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} submission(s) still pending");
            }
        }
        PendingCommand::Drop { id } => {
            if !outbox.remove(id)? {
                bail!("no pending submission #{id}");
            }
            println!("Dropped pending submission #{id}.");
        }
    }
    Ok(())
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Base URL:           {}", config.server.base_url);
                println!("  CSRF cookie:        {}", config.server.csrf_cookie);
                println!("  CSRF header:        {}", config.server.csrf_header);
                println!(
                    "  Session cookie:     {}",
                    config.server.session_cookie.as_deref().unwrap_or("(not set)")
                );
                println!("  Timeout (secs):     {}", config.server.timeout_secs);
                println!();
                println!("[Capture]");
                println!("  Max length:         {}", config.capture.max_length);
                println!("  Bulk insert:        {}", config.capture.bulk_insert_allowed);
                println!();
                println!("[Editor]");
                println!("  Paragraphs:         {}", config.editor.paragraphs);
                println!();
                println!("[Outbox]");
                println!("  Enabled:            {}", config.outbox.enabled);
                println!("  Database path:      {}", config.database_path().display());
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                path.unwrap_or_else(Config::default_config_path).display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
